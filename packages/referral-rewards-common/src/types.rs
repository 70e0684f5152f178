use std::fmt;
use std::str::FromStr;

use cosmwasm_schema::cw_serde;

/// The four fixed reward tiers every tenant carries, from most to least frequent.
#[cw_serde]
#[derive(Copy, Eq, Hash, PartialOrd, Ord)]
pub enum Tier {
    Common,
    Occasional,
    Rare,
    Jackpot,
}

impl Tier {
    /// Stable iteration order used for cumulative intervals and listings.
    pub const ALL: [Tier; 4] = [Tier::Common, Tier::Occasional, Tier::Rare, Tier::Jackpot];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Common => "common",
            Tier::Occasional => "occasional",
            Tier::Rare => "rare",
            Tier::Jackpot => "jackpot",
        }
    }

    pub fn default_label(&self) -> &'static str {
        match self {
            Tier::Common | Tier::Occasional => "10% discount",
            Tier::Rare => "Premium gift",
            Tier::Jackpot => "Grand prize",
        }
    }

    pub fn default_cooldown_months(&self) -> u32 {
        match self {
            Tier::Common | Tier::Occasional => 1,
            Tier::Rare => 3,
            Tier::Jackpot => 6,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tier::ALL
            .into_iter()
            .find(|tier| tier.as_str() == s)
            .ok_or_else(|| format!("unknown tier: {s}"))
    }
}

/// A single cell of a draw pool.
#[cw_serde]
#[derive(Copy, Eq, Hash, PartialOrd, Ord)]
pub enum PoolToken {
    NoHit,
    Common,
    Occasional,
    Rare,
    Jackpot,
}

impl PoolToken {
    pub fn tier(self) -> Option<Tier> {
        match self {
            PoolToken::NoHit => None,
            PoolToken::Common => Some(Tier::Common),
            PoolToken::Occasional => Some(Tier::Occasional),
            PoolToken::Rare => Some(Tier::Rare),
            PoolToken::Jackpot => Some(Tier::Jackpot),
        }
    }

    /// Single-byte tag fed into pool digests.
    pub fn tag(self) -> u8 {
        match self {
            PoolToken::NoHit => 0,
            PoolToken::Common => 1,
            PoolToken::Occasional => 2,
            PoolToken::Rare => 3,
            PoolToken::Jackpot => 4,
        }
    }
}

impl From<Tier> for PoolToken {
    fn from(tier: Tier) -> Self {
        match tier {
            Tier::Common => PoolToken::Common,
            Tier::Occasional => PoolToken::Occasional,
            Tier::Rare => PoolToken::Rare,
            Tier::Jackpot => PoolToken::Jackpot,
        }
    }
}

/// Identifies which ratio a pool encodes.
#[cw_serde]
#[derive(Copy, Eq, Hash, PartialOrd, Ord)]
pub enum PoolKey {
    /// 980 Common / 19 Occasional / 1 Rare.
    Primary,
    /// 99,999 NO_HIT / 1 Jackpot.
    Jackpot,
}

impl PoolKey {
    pub const ALL: [PoolKey; 2] = [PoolKey::Primary, PoolKey::Jackpot];

    pub fn as_str(&self) -> &'static str {
        match self {
            PoolKey::Primary => "primary",
            PoolKey::Jackpot => "jackpot",
        }
    }
}

impl fmt::Display for PoolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PoolKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PoolKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// Result of a draw: a tier, or the defined "no reward this time" outcome.
#[cw_serde]
#[derive(Copy, Eq, Hash)]
pub enum TierOutcome {
    Tier(Tier),
    NoHit,
}

impl TierOutcome {
    pub fn tier(&self) -> Option<Tier> {
        match self {
            TierOutcome::Tier(tier) => Some(*tier),
            TierOutcome::NoHit => None,
        }
    }

    pub fn is_hit(&self) -> bool {
        matches!(self, TierOutcome::Tier(_))
    }
}

impl From<Option<Tier>> for TierOutcome {
    fn from(tier: Option<Tier>) -> Self {
        tier.map_or(TierOutcome::NoHit, TierOutcome::Tier)
    }
}

impl fmt::Display for TierOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TierOutcome::Tier(tier) => tier.fmt(f),
            TierOutcome::NoHit => f.write_str("no_hit"),
        }
    }
}

/// Which allocation engine issues grants for a deployment.
#[cw_serde]
#[derive(Copy, Eq, Default)]
pub enum DrawStrategy {
    /// Skip-and-advance over fixed-composition pools; exact long-run counts.
    #[default]
    Cyclic,
    /// Renormalised weighted sample; no persistent state.
    Normalized,
}

/// Lifecycle of a grant. Only creation is driven by the engine.
#[cw_serde]
#[derive(Copy, Eq, Hash)]
pub enum GrantState {
    Pending,
    Sent,
    Disabled,
    Archived,
}

impl GrantState {
    pub fn as_str(&self) -> &'static str {
        match self {
            GrantState::Pending => "pending",
            GrantState::Sent => "sent",
            GrantState::Disabled => "disabled",
            GrantState::Archived => "archived",
        }
    }

    pub fn can_transition_to(self, next: GrantState) -> bool {
        use GrantState::*;
        matches!(
            (self, next),
            (Pending, Sent | Disabled | Archived) | (Sent, Archived) | (Disabled, Pending | Archived)
        )
    }
}

impl fmt::Display for GrantState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-tier eligibility of one beneficiary at one point in time.
#[cw_serde]
#[derive(Copy, Eq, Default)]
pub struct Eligibility {
    pub referral_count: u64,
    pub common: bool,
    pub occasional: bool,
    pub rare: bool,
    pub jackpot: bool,
}

impl Eligibility {
    /// Fold `(tier, minimum)` rows into eligibility for `referral_count`.
    ///
    /// When a tier appears more than once the largest minimum wins. A tier with
    /// no row at all stays ineligible.
    pub fn from_thresholds(
        referral_count: u64,
        thresholds: impl IntoIterator<Item = (Tier, u64)>,
    ) -> Self {
        let mut strictest: [Option<u64>; 4] = [None; 4];
        for (tier, minimum) in thresholds {
            let slot = &mut strictest[tier_index(tier)];
            *slot = Some(slot.map_or(minimum, |current| current.max(minimum)));
        }

        let unlocked = |tier: Tier| {
            strictest[tier_index(tier)].is_some_and(|minimum| referral_count >= minimum)
        };

        Eligibility {
            referral_count,
            common: unlocked(Tier::Common),
            occasional: unlocked(Tier::Occasional),
            rare: unlocked(Tier::Rare),
            jackpot: unlocked(Tier::Jackpot),
        }
    }

    pub fn all(referral_count: u64) -> Self {
        Eligibility {
            referral_count,
            common: true,
            occasional: true,
            rare: true,
            jackpot: true,
        }
    }

    pub fn allows(&self, tier: Tier) -> bool {
        match tier {
            Tier::Common => self.common,
            Tier::Occasional => self.occasional,
            Tier::Rare => self.rare,
            Tier::Jackpot => self.jackpot,
        }
    }

    pub fn eligible_tiers(&self) -> impl Iterator<Item = Tier> + '_ {
        Tier::ALL.into_iter().filter(|tier| self.allows(*tier))
    }

    pub fn any(&self) -> bool {
        self.eligible_tiers().next().is_some()
    }
}

fn tier_index(tier: Tier) -> usize {
    match tier {
        Tier::Common => 0,
        Tier::Occasional => 1,
        Tier::Rare => 2,
        Tier::Jackpot => 3,
    }
}
