use cosmwasm_schema::cw_serde;
use cosmwasm_std::Decimal256;

use crate::types::{Eligibility, Tier};

/// Canonical weights in units of 10^-5 percent (Common 80%, Occasional 19%,
/// Rare 0.99999%, Jackpot 0.00001%). Sums to exactly 100%.
pub const BASE_WEIGHTS: [(Tier, u64); 4] = [
    (Tier::Common, 8_000_000),
    (Tier::Occasional, 1_900_000),
    (Tier::Rare, 99_999),
    (Tier::Jackpot, 1),
];

pub const WEIGHT_SCALE: u64 = 10_000_000;

/// Base weights with every ineligible tier zeroed, in `Tier::ALL` order.
pub fn eligible_weights(eligibility: &Eligibility) -> [(Tier, u64); 4] {
    BASE_WEIGHTS.map(|(tier, weight)| {
        if eligibility.allows(tier) {
            (tier, weight)
        } else {
            (tier, 0)
        }
    })
}

pub fn total_weight(weights: &[(Tier, u64)]) -> u64 {
    weights.iter().map(|(_, weight)| weight).sum()
}

/// Select the tier whose cumulative interval contains `sample`.
///
/// `sample` must lie in `[0, total_weight)`. Intervals are laid out in the
/// order given. If no interval contains the sample, falls back to the rarest
/// tier with a positive weight. Returns `None` only when every weight is 0.
pub fn pick(weights: &[(Tier, u64)], sample: u64) -> Option<Tier> {
    let mut upper = 0u64;
    for &(tier, weight) in weights {
        if weight == 0 {
            continue;
        }
        upper += weight;
        if sample < upper {
            return Some(tier);
        }
    }

    weights
        .iter()
        .rev()
        .find(|(_, weight)| *weight > 0)
        .map(|(tier, _)| *tier)
}

#[cw_serde]
pub struct TierOdds {
    pub tier: Tier,
    /// Percentage in [0, 100].
    pub percent: Decimal256,
}

#[cw_serde]
pub struct DisplayOdds {
    pub referral_count: u64,
    pub odds: Vec<TierOdds>,
}

impl DisplayOdds {
    pub fn percent(&self, tier: Tier) -> Decimal256 {
        self.odds
            .iter()
            .find(|entry| entry.tier == tier)
            .map_or(Decimal256::zero(), |entry| entry.percent)
    }

    pub fn total(&self) -> Decimal256 {
        self.odds
            .iter()
            .fold(Decimal256::zero(), |acc, entry| acc + entry.percent)
    }
}

/// Renormalise the eligible base weights so they sum to 100.
///
/// Every tier is listed; ineligible tiers read 0. When nothing is eligible
/// every tier reads 0.
pub fn display_odds(eligibility: &Eligibility) -> DisplayOdds {
    let weights = eligible_weights(eligibility);
    let total = total_weight(&weights);

    let odds = weights
        .iter()
        .map(|&(tier, weight)| {
            let percent = if total == 0 || weight == 0 {
                Decimal256::zero()
            } else {
                Decimal256::from_ratio(u128::from(weight) * 100, u128::from(total))
            };
            TierOdds { tier, percent }
        })
        .collect();

    DisplayOdds {
        referral_count: eligibility.referral_count,
        odds,
    }
}
