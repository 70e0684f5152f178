use cosmwasm_std::Storage;
use rand::Rng;
use referral_rewards_common::odds::{eligible_weights, pick, total_weight};
use referral_rewards_common::{display_odds, DisplayOdds, Eligibility, TierOutcome};

use crate::eligibility;
use crate::error::EngineError;

/// One weighted sample over the eligible tiers. No state is read or written
/// besides `rng`.
pub fn sample<R: Rng + ?Sized>(eligibility: &Eligibility, rng: &mut R) -> TierOutcome {
    let weights = eligible_weights(eligibility);
    let total = total_weight(&weights);
    if total == 0 {
        return TierOutcome::NoHit;
    }
    pick(&weights, rng.gen_range(0..total)).into()
}

pub fn draw<R: Rng + ?Sized>(
    storage: &dyn Storage,
    tenant: u64,
    beneficiary: u64,
    rng: &mut R,
) -> Result<TierOutcome, EngineError> {
    let elig = eligibility::resolve(storage, tenant, beneficiary)?;
    let outcome = sample(&elig, rng);
    tracing::debug!(tenant, beneficiary, outcome = %outcome, "weighted draw");
    Ok(outcome)
}

pub fn display_probabilities(
    storage: &dyn Storage,
    tenant: u64,
    beneficiary: u64,
) -> Result<DisplayOdds, EngineError> {
    let elig = eligibility::resolve(storage, tenant, beneficiary)?;
    Ok(display_odds(&elig))
}
