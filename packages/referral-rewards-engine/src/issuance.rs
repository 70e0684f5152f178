use cosmwasm_std::{StdError, Storage, Timestamp};
use rand::rngs::OsRng;
use rand::RngCore;
use referral_rewards_common::{GrantState, Tier, TierOutcome};

use crate::catalog;
use crate::error::EngineError;
use crate::ledger::Transaction;
use crate::state::{
    checked_plus_days, grant_lock, grant_row_lock, grant_seq_lock, RewardGrant,
    BENEFICIARY_GRANTS, GRANTS, GRANT_BY_REFERRAL, GRANT_SEQ, GRANT_TOKENS,
};

/// 192 bits of entropy per claim token.
const TOKEN_BYTES: usize = 24;
const TOKEN_ATTEMPTS: usize = 4;
const NO_HIT_LABEL: &str = "—";

/// Knobs issuance needs from the engine configuration.
#[derive(Clone, Copy, Debug)]
pub struct IssueOptions {
    pub now: Timestamp,
    pub record_no_hit: bool,
    pub default_token_ttl_days: u32,
}

/// Turn a draw outcome into a grant.
///
/// NO_HIT never yields a grant. With a referral id, at most one grant ever
/// exists per (tenant, beneficiary, referral): a repeat call returns the
/// stored row, giving it a claim token if it still lacks one. A NO_HIT
/// placeholder for the same referral is promoted to the winning tier.
pub fn issue(
    tx: &mut Transaction,
    tenant: u64,
    beneficiary: u64,
    referral: Option<u64>,
    outcome: TierOutcome,
    opts: IssueOptions,
) -> Result<Option<RewardGrant>, EngineError> {
    let Some(tier) = outcome.tier() else {
        if let (true, Some(referral)) = (opts.record_no_hit, referral) {
            record_no_hit(tx, tenant, beneficiary, referral, opts.now)?;
        }
        return Ok(None);
    };

    if let Some(referral) = referral {
        tx.lock_row(&grant_lock(tenant, beneficiary, referral))?;
        if let Some(existing) = existing_grant(tx, tenant, beneficiary, referral)? {
            if existing.tier.is_none() {
                return promote_placeholder(tx, existing, tier, opts).map(Some);
            }
            tracing::info!(
                tenant,
                beneficiary,
                referral,
                grant = existing.id,
                "grant already issued for referral"
            );
            return ensure_token(tx, existing, opts).map(Some);
        }
    }

    let row = catalog::tier(tx, tenant, tier)?;
    let cooldown_days = row.cooldown_days();
    let mut grant = RewardGrant {
        id: next_grant_id(tx, tenant)?,
        tenant,
        beneficiary,
        referral,
        tier: Some(tier),
        label: row.label,
        cooldown_days,
        state: GrantState::Pending,
        created_at: opts.now,
        token: None,
        token_expires_at: None,
    };
    assign_token(tx, &mut grant, opts)?;
    save_new(tx, &grant)?;

    tracing::info!(
        tenant,
        beneficiary,
        referral = ?referral,
        grant = grant.id,
        tier = %tier,
        "reward granted"
    );
    Ok(Some(grant))
}

/// Disabled, tier-less row kept as an audit trail of a miss.
fn record_no_hit(
    tx: &mut Transaction,
    tenant: u64,
    beneficiary: u64,
    referral: u64,
    now: Timestamp,
) -> Result<RewardGrant, EngineError> {
    tx.lock_row(&grant_lock(tenant, beneficiary, referral))?;
    if let Some(existing) = existing_grant(tx, tenant, beneficiary, referral)? {
        return Ok(existing);
    }

    let grant = RewardGrant {
        id: next_grant_id(tx, tenant)?,
        tenant,
        beneficiary,
        referral: Some(referral),
        tier: None,
        label: NO_HIT_LABEL.to_string(),
        cooldown_days: 0,
        state: GrantState::Disabled,
        created_at: now,
        token: None,
        token_expires_at: None,
    };
    save_new(tx, &grant)?;
    tracing::info!(tenant, beneficiary, referral, grant = grant.id, "no-hit recorded");
    Ok(grant)
}

fn promote_placeholder(
    tx: &mut Transaction,
    mut grant: RewardGrant,
    tier: Tier,
    opts: IssueOptions,
) -> Result<RewardGrant, EngineError> {
    tx.lock_row(&grant_row_lock(grant.tenant, grant.id))?;
    let row = catalog::tier(tx, grant.tenant, tier)?;
    grant.cooldown_days = row.cooldown_days();
    grant.tier = Some(tier);
    grant.label = row.label;
    grant.state = GrantState::Pending;
    assign_token(tx, &mut grant, opts)?;

    GRANTS.save(tx, (grant.tenant, grant.id), &grant)?;
    if let Some(token) = &grant.token {
        GRANT_TOKENS.save(tx, token, &(grant.tenant, grant.id))?;
    }
    tracing::info!(
        tenant = grant.tenant,
        beneficiary = grant.beneficiary,
        grant = grant.id,
        tier = %tier,
        "no-hit placeholder promoted"
    );
    Ok(grant)
}

fn existing_grant(
    storage: &dyn Storage,
    tenant: u64,
    beneficiary: u64,
    referral: u64,
) -> Result<Option<RewardGrant>, EngineError> {
    match GRANT_BY_REFERRAL.may_load(storage, (tenant, beneficiary, referral))? {
        Some(id) => Ok(Some(GRANTS.load(storage, (tenant, id))?)),
        None => Ok(None),
    }
}

fn next_grant_id(tx: &mut Transaction, tenant: u64) -> Result<u64, EngineError> {
    tx.lock_row(&grant_seq_lock(tenant))?;
    let id = GRANT_SEQ.may_load(tx, tenant)?.unwrap_or_default() + 1;
    GRANT_SEQ.save(tx, tenant, &id)?;
    Ok(id)
}

fn save_new(tx: &mut Transaction, grant: &RewardGrant) -> Result<(), EngineError> {
    GRANTS.save(tx, (grant.tenant, grant.id), grant)?;
    BENEFICIARY_GRANTS.save(tx, (grant.tenant, grant.beneficiary, grant.id), &())?;
    if let Some(referral) = grant.referral {
        GRANT_BY_REFERRAL.save(tx, (grant.tenant, grant.beneficiary, referral), &grant.id)?;
    }
    if let Some(token) = &grant.token {
        GRANT_TOKENS.save(tx, token, &(grant.tenant, grant.id))?;
    }
    Ok(())
}

fn ensure_token(
    tx: &mut Transaction,
    mut grant: RewardGrant,
    opts: IssueOptions,
) -> Result<RewardGrant, EngineError> {
    if grant.token.is_some() || grant.tier.is_none() {
        return Ok(grant);
    }
    tx.lock_row(&grant_row_lock(grant.tenant, grant.id))?;
    assign_token(tx, &mut grant, opts)?;
    GRANTS.save(tx, (grant.tenant, grant.id), &grant)?;
    if let Some(token) = &grant.token {
        GRANT_TOKENS.save(tx, token, &(grant.tenant, grant.id))?;
    }
    Ok(grant)
}

/// Expiry follows the tier cooldown, or the configured TTL when the tier has none.
fn assign_token(
    storage: &dyn Storage,
    grant: &mut RewardGrant,
    opts: IssueOptions,
) -> Result<(), EngineError> {
    let days = if grant.cooldown_days > 0 {
        grant.cooldown_days
    } else {
        opts.default_token_ttl_days
    };
    let expires_at = checked_plus_days(opts.now, days)
        .ok_or_else(|| StdError::generic_err(format!("token expiry overflows: {days} days")))?;
    grant.token = Some(generate_token(storage)?);
    grant.token_expires_at = Some(expires_at);
    Ok(())
}

fn generate_token(storage: &dyn Storage) -> Result<String, EngineError> {
    for _ in 0..TOKEN_ATTEMPTS {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        let token = hex::encode(bytes);
        if !GRANT_TOKENS.has(storage, &token) {
            return Ok(token);
        }
    }
    Err(StdError::generic_err("could not generate a unique claim token").into())
}

pub fn set_grant_state(
    tx: &mut Transaction,
    tenant: u64,
    id: u64,
    state: GrantState,
) -> Result<RewardGrant, EngineError> {
    tx.lock_row(&grant_row_lock(tenant, id))?;
    let mut grant = GRANTS
        .may_load(tx, (tenant, id))?
        .ok_or(EngineError::GrantNotFound { tenant, grant: id })?;

    if grant.state == state {
        return Ok(grant);
    }
    if !grant.state.can_transition_to(state) {
        return Err(EngineError::InvalidGrantTransition {
            grant: id,
            from: grant.state,
            to: state,
        });
    }

    let from = grant.state;
    grant.state = state;
    GRANTS.save(tx, (tenant, id), &grant)?;
    tracing::info!(tenant, grant = id, %from, to = %state, "grant state changed");
    Ok(grant)
}
