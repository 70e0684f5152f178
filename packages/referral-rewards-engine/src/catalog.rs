use cosmwasm_std::Storage;
use referral_rewards_common::Tier;

use crate::error::EngineError;
use crate::ledger::Transaction;
use crate::msg::UpdateTierParams;
use crate::state::{tier_lock, RewardTier, TIERS};

const MAX_LABEL_LEN: usize = 120;
/// 100 years.
pub const MAX_COOLDOWN_MONTHS: u32 = 1_200;

/// Create any missing tier row with its defaults. Existing rows are returned
/// untouched, so the call is safe to repeat.
pub fn ensure_tiers(tx: &mut Transaction, tenant: u64) -> Result<Vec<RewardTier>, EngineError> {
    let mut rows = Vec::with_capacity(Tier::ALL.len());
    for tier in Tier::ALL {
        tx.lock_row(&tier_lock(tenant, tier))?;
        let row = match TIERS.may_load(tx, (tenant, tier.as_str()))? {
            Some(row) => row,
            None => {
                let row = RewardTier::with_defaults(tenant, tier);
                TIERS.save(tx, (tenant, tier.as_str()), &row)?;
                tracing::debug!(tenant, %tier, "created default reward tier");
                row
            }
        };
        rows.push(row);
    }
    Ok(rows)
}

pub fn tier(storage: &dyn Storage, tenant: u64, tier: Tier) -> Result<RewardTier, EngineError> {
    TIERS
        .may_load(storage, (tenant, tier.as_str()))?
        .ok_or(EngineError::TierNotFound { tenant, tier })
}

/// Catalog rows in tier order. Empty when the tenant was never provisioned.
pub fn tiers(storage: &dyn Storage, tenant: u64) -> Result<Vec<RewardTier>, EngineError> {
    let mut rows = Vec::with_capacity(Tier::ALL.len());
    for tier in Tier::ALL {
        if let Some(row) = TIERS.may_load(storage, (tenant, tier.as_str()))? {
            rows.push(row);
        }
    }
    Ok(rows)
}

pub fn update_tier(
    tx: &mut Transaction,
    tenant: u64,
    tier: Tier,
    params: UpdateTierParams,
) -> Result<RewardTier, EngineError> {
    tx.lock_row(&tier_lock(tenant, tier))?;
    let mut row = self::tier(tx, tenant, tier)?;

    if let Some(label) = params.label {
        let label = label.trim().to_string();
        if label.is_empty() {
            return Err(EngineError::InvalidTierUpdate {
                reason: "label must not be empty".to_string(),
            });
        }
        if label.chars().count() > MAX_LABEL_LEN {
            return Err(EngineError::InvalidTierUpdate {
                reason: format!("label exceeds {MAX_LABEL_LEN} characters"),
            });
        }
        row.label = label;
    }
    if let Some(cooldown_months) = params.cooldown_months {
        if cooldown_months > MAX_COOLDOWN_MONTHS {
            return Err(EngineError::InvalidTierUpdate {
                reason: format!(
                    "cooldown_months must be at most {MAX_COOLDOWN_MONTHS}, got {cooldown_months}"
                ),
            });
        }
        row.cooldown_months = cooldown_months;
    }
    if let Some(min_referrals) = params.min_referrals {
        row.min_referrals = min_referrals;
    }

    TIERS.save(tx, (tenant, tier.as_str()), &row)?;
    tracing::info!(
        tenant,
        %tier,
        cooldown_months = row.cooldown_months,
        min_referrals = row.min_referrals,
        "reward tier updated"
    );
    Ok(row)
}
