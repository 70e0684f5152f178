use cosmwasm_schema::cw_serde;
use cosmwasm_std::Timestamp;
use cw_storage_plus::{Item, Map};
use referral_rewards_common::{GrantState, PoolKey, Run, Tier};

use crate::msg::EngineConfig;

pub const CONFIG: Item<EngineConfig> = Item::new("config");

/// (tenant, tier) -> catalog row
pub const TIERS: Map<(u64, &str), RewardTier> = Map::new("tiers");

/// (tenant, pool key) -> pool row
pub const POOLS: Map<(u64, &str), DrawPool> = Map::new("pools");

/// (tenant, referral id) -> referral
pub const REFERRALS: Map<(u64, u64), Referral> = Map::new("referrals");
/// (tenant, referee) -> referral id; one referral per referee per tenant
pub const REFEREES: Map<(u64, u64), u64> = Map::new("referees");
/// (tenant, referrer) -> number of referrals made
pub const REFERRAL_COUNT: Map<(u64, u64), u64> = Map::new("referral_count");

/// Last grant id handed out per tenant.
pub const GRANT_SEQ: Map<u64, u64> = Map::new("grant_seq");
/// (tenant, grant id) -> grant
pub const GRANTS: Map<(u64, u64), RewardGrant> = Map::new("grants");
/// (tenant, beneficiary, referral) -> grant id; the one-grant-per-referral constraint
pub const GRANT_BY_REFERRAL: Map<(u64, u64, u64), u64> = Map::new("grant_by_referral");
/// (tenant, beneficiary, grant id) -> ()
pub const BENEFICIARY_GRANTS: Map<(u64, u64, u64), ()> = Map::new("beneficiary_grants");
/// claim token -> (tenant, grant id)
pub const GRANT_TOKENS: Map<&str, (u64, u64)> = Map::new("grant_tokens");

#[cw_serde]
pub struct RewardTier {
    pub tenant: u64,
    pub tier: Tier,
    pub label: String,
    pub cooldown_months: u32,
    /// Referrals the beneficiary must have made before this tier can be drawn.
    pub min_referrals: u64,
}

impl RewardTier {
    pub fn with_defaults(tenant: u64, tier: Tier) -> Self {
        RewardTier {
            tenant,
            tier,
            label: tier.default_label().to_string(),
            cooldown_months: tier.default_cooldown_months(),
            min_referrals: 0,
        }
    }

    /// Always derived from months; a month counts as 30 days.
    pub fn cooldown_days(&self) -> u32 {
        self.cooldown_months.saturating_mul(30)
    }
}

#[cw_serde]
pub struct DrawPool {
    pub tenant: u64,
    pub key: PoolKey,
    pub runs: Vec<Run>,
    pub size: u32,
    /// Next cell to consume; always < size.
    pub cursor: u32,
    /// sha256 of `runs`, hex-encoded
    pub digest: String,
    /// Bumped on every write to the row.
    pub version: u64,
}

#[cw_serde]
pub struct Referral {
    pub tenant: u64,
    pub id: u64,
    pub referrer: u64,
    pub referee: u64,
    pub created_at: Timestamp,
}

#[cw_serde]
pub struct RewardGrant {
    pub id: u64,
    pub tenant: u64,
    pub beneficiary: u64,
    pub referral: Option<u64>,
    /// `None` only on disabled NO_HIT placeholders.
    pub tier: Option<Tier>,
    /// Copied from the tier at issuance time.
    pub label: String,
    pub cooldown_days: u32,
    pub state: GrantState,
    pub created_at: Timestamp,
    pub token: Option<String>,
    pub token_expires_at: Option<Timestamp>,
}

impl RewardGrant {
    /// End of the reward's validity window; `None` means unlimited.
    ///
    /// Saturates at the last representable timestamp.
    pub fn valid_until(&self) -> Option<Timestamp> {
        if self.cooldown_days == 0 {
            return None;
        }
        Some(
            checked_plus_days(self.created_at, self.cooldown_days)
                .unwrap_or_else(|| Timestamp::from_nanos(u64::MAX)),
        )
    }

    pub fn token_live_at(&self, now: Timestamp) -> bool {
        match (&self.token, self.token_expires_at) {
            (Some(_), Some(expires_at)) => now < expires_at,
            (Some(_), None) => true,
            _ => false,
        }
    }
}

const NANOS_PER_DAY: u64 = 86_400 * 1_000_000_000;

/// `start` plus `days`, or `None` past the end of the timestamp range.
pub fn checked_plus_days(start: Timestamp, days: u32) -> Option<Timestamp> {
    u64::from(days)
        .checked_mul(NANOS_PER_DAY)
        .and_then(|nanos| start.nanos().checked_add(nanos))
        .map(Timestamp::from_nanos)
}

// ─── Row lock resources ───

pub fn pool_lock(tenant: u64, key: PoolKey) -> String {
    format!("pool/{tenant}/{key}")
}

pub fn tier_lock(tenant: u64, tier: Tier) -> String {
    format!("tier/{tenant}/{tier}")
}

pub fn grant_lock(tenant: u64, beneficiary: u64, referral: u64) -> String {
    format!("grant/{tenant}/{beneficiary}/{referral}")
}

pub fn grant_seq_lock(tenant: u64) -> String {
    format!("grant-seq/{tenant}")
}

pub fn grant_row_lock(tenant: u64, grant: u64) -> String {
    format!("grant-row/{tenant}/{grant}")
}

pub fn referral_lock(tenant: u64, referral: u64) -> String {
    format!("referral/{tenant}/{referral}")
}

pub fn referee_lock(tenant: u64, referee: u64) -> String {
    format!("referee/{tenant}/{referee}")
}

pub fn referrer_lock(tenant: u64, referrer: u64) -> String {
    format!("referrer/{tenant}/{referrer}")
}
