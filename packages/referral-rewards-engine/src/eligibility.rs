use cosmwasm_std::Storage;
use referral_rewards_common::Eligibility;

use crate::catalog;
use crate::error::EngineError;
use crate::state::REFERRAL_COUNT;

pub fn referral_count(storage: &dyn Storage, tenant: u64, client: u64) -> Result<u64, EngineError> {
    Ok(REFERRAL_COUNT
        .may_load(storage, (tenant, client))?
        .unwrap_or_default())
}

/// Which tiers `beneficiary` may currently receive in `tenant`.
///
/// Pure read. A tier is unlocked once the beneficiary's referral count reaches
/// its `min_referrals`; a tier without a catalog row stays locked.
pub fn resolve(
    storage: &dyn Storage,
    tenant: u64,
    beneficiary: u64,
) -> Result<Eligibility, EngineError> {
    let rows = catalog::tiers(storage, tenant)?;
    if rows.is_empty() {
        return Err(EngineError::CatalogMissing { tenant });
    }
    let count = referral_count(storage, tenant, beneficiary)?;
    Ok(Eligibility::from_thresholds(
        count,
        rows.iter().map(|row| (row.tier, row.min_referrals)),
    ))
}
