use cosmwasm_std::{Order, Storage};
use cw_storage_plus::Bound;

use crate::error::EngineError;
use crate::msg::GrantsResponse;
use crate::state::{RewardGrant, BENEFICIARY_GRANTS, GRANTS, GRANT_TOKENS};

const DEFAULT_LIMIT: u32 = 20;
const MAX_LIMIT: u32 = 100;

pub fn query_grant(storage: &dyn Storage, tenant: u64, id: u64) -> Result<RewardGrant, EngineError> {
    GRANTS
        .may_load(storage, (tenant, id))?
        .ok_or(EngineError::GrantNotFound { tenant, grant: id })
}

/// Resolve a claim token to its grant. Expiry is the caller's call.
pub fn query_grant_by_token(storage: &dyn Storage, token: &str) -> Result<RewardGrant, EngineError> {
    let (tenant, id) = GRANT_TOKENS
        .may_load(storage, token)?
        .ok_or(EngineError::TokenNotFound)?;
    query_grant(storage, tenant, id)
}

/// Grants of one beneficiary in id order, paged by `start_after`.
pub fn query_grants_for(
    storage: &dyn Storage,
    tenant: u64,
    beneficiary: u64,
    start_after: Option<u64>,
    limit: Option<u32>,
) -> Result<GrantsResponse, EngineError> {
    let limit = limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT) as usize;
    let start = start_after.map(Bound::exclusive);

    let ids = BENEFICIARY_GRANTS
        .prefix((tenant, beneficiary))
        .keys(storage, start, None, Order::Ascending)
        .take(limit)
        .collect::<Result<Vec<u64>, _>>()?;

    let grants = ids
        .into_iter()
        .map(|id| query_grant(storage, tenant, id))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(GrantsResponse {
        tenant,
        beneficiary,
        grants,
    })
}
