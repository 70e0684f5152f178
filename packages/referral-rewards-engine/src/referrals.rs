use cosmwasm_std::{Storage, Timestamp};

use crate::error::EngineError;
use crate::ledger::Transaction;
use crate::msg::NewReferral;
use crate::state::{
    referee_lock, referral_lock, referrer_lock, Referral, REFEREES, REFERRALS, REFERRAL_COUNT,
};

/// Persist a referral and bump the referrer's count.
///
/// Referral ids are unique per tenant and a client can be referred only once
/// per tenant.
pub fn record_referral(
    tx: &mut Transaction,
    tenant: u64,
    new: NewReferral,
    now: Timestamp,
) -> Result<Referral, EngineError> {
    tx.lock_row(&referral_lock(tenant, new.id))?;
    if REFERRALS.has(tx, (tenant, new.id)) {
        return Err(EngineError::ReferralExists {
            tenant,
            referral: new.id,
        });
    }

    tx.lock_row(&referee_lock(tenant, new.referee))?;
    if REFEREES.has(tx, (tenant, new.referee)) {
        return Err(EngineError::RefereeAlreadyReferred {
            tenant,
            referee: new.referee,
        });
    }

    tx.lock_row(&referrer_lock(tenant, new.referrer))?;
    let count = REFERRAL_COUNT
        .may_load(tx, (tenant, new.referrer))?
        .unwrap_or_default()
        + 1;

    let referral = Referral {
        tenant,
        id: new.id,
        referrer: new.referrer,
        referee: new.referee,
        created_at: now,
    };
    REFERRALS.save(tx, (tenant, new.id), &referral)?;
    REFEREES.save(tx, (tenant, new.referee), &new.id)?;
    REFERRAL_COUNT.save(tx, (tenant, new.referrer), &count)?;

    tracing::info!(
        tenant,
        referral = new.id,
        referrer = new.referrer,
        referee = new.referee,
        referral_count = count,
        "referral recorded"
    );
    Ok(referral)
}

pub fn referral(storage: &dyn Storage, tenant: u64, id: u64) -> Result<Option<Referral>, EngineError> {
    Ok(REFERRALS.may_load(storage, (tenant, id))?)
}
