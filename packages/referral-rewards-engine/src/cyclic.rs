use std::sync::OnceLock;

use cosmwasm_std::Storage;
use referral_rewards_common::pool::{build_runs, composition, layout_digest, scan, total_cells};
use referral_rewards_common::{PoolKey, PoolLayout, PoolToken, Run, Tier, TierOutcome};

use crate::eligibility;
use crate::error::EngineError;
use crate::ledger::Transaction;
use crate::state::{pool_lock, DrawPool, POOLS};

const PRIMARY_TOKENS: [PoolToken; 3] = [PoolToken::Common, PoolToken::Occasional, PoolToken::Rare];

struct ExpectedLayout {
    runs: Vec<Run>,
    size: u32,
    digest: String,
}

/// Pool compositions never change at runtime, so each (key, layout) pair is
/// expanded once per process.
fn expected_layout(key: PoolKey, layout: PoolLayout) -> &'static ExpectedLayout {
    static LAYOUTS: [[OnceLock<ExpectedLayout>; 2]; 2] = [
        [OnceLock::new(), OnceLock::new()],
        [OnceLock::new(), OnceLock::new()],
    ];
    let row = match key {
        PoolKey::Primary => 0,
        PoolKey::Jackpot => 1,
    };
    let col = match layout {
        PoolLayout::Contiguous => 0,
        PoolLayout::Interleaved => 1,
    };
    LAYOUTS[row][col].get_or_init(|| {
        let runs = build_runs(composition(key), layout);
        ExpectedLayout {
            size: total_cells(&runs),
            digest: layout_digest(&runs),
            runs,
        }
    })
}

fn fresh_pool(
    tenant: u64,
    key: PoolKey,
    layout: PoolLayout,
    version: u64,
) -> Result<DrawPool, EngineError> {
    let expected = expected_layout(key, layout);
    if expected.size == 0 {
        return Err(EngineError::InvalidPool { tenant, key });
    }
    Ok(DrawPool {
        tenant,
        key,
        runs: expected.runs.clone(),
        size: expected.size,
        cursor: 0,
        digest: expected.digest.clone(),
        version,
    })
}

/// Load the pool row, creating it on first use and rebuilding it when the
/// stored layout no longer matches `layout`. Caller must hold the pool lock.
fn load_or_build(
    tx: &mut Transaction,
    tenant: u64,
    key: PoolKey,
    layout: PoolLayout,
) -> Result<DrawPool, EngineError> {
    let expected = expected_layout(key, layout);
    match POOLS.may_load(tx, (tenant, key.as_str()))? {
        Some(pool) if pool.size == expected.size && pool.digest == expected.digest => {
            if pool.size == 0 {
                return Err(EngineError::InvalidPool { tenant, key });
            }
            Ok(pool)
        }
        Some(stale) => {
            tracing::warn!(
                tenant,
                pool = %key,
                stored_size = stale.size,
                expected_size = expected.size,
                "pool layout mismatch, rebuilding with cursor 0"
            );
            let pool = fresh_pool(tenant, key, layout, stale.version + 1)?;
            POOLS.save(tx, (tenant, key.as_str()), &pool)?;
            Ok(pool)
        }
        None => {
            let pool = fresh_pool(tenant, key, layout, 1)?;
            POOLS.save(tx, (tenant, key.as_str()), &pool)?;
            tracing::debug!(tenant, pool = %key, size = pool.size, "pool created");
            Ok(pool)
        }
    }
}

/// Take the first cell in `allowed` at or after the cursor, wrapping at most
/// once, and advance the cursor past every cell looked at.
///
/// Holds the pool's row lock until the enclosing transaction ends. A full
/// cycle without a match returns `None` and leaves the cursor where it was.
pub fn consume(
    tx: &mut Transaction,
    tenant: u64,
    key: PoolKey,
    allowed: &[PoolToken],
    layout: PoolLayout,
) -> Result<Option<PoolToken>, EngineError> {
    tx.lock_row(&pool_lock(tenant, key))?;
    let mut pool = load_or_build(tx, tenant, key, layout)?;

    let (token, scanned) = scan(&pool.runs, pool.cursor, allowed);
    pool.cursor = (pool.cursor + scanned) % pool.size;
    pool.version += 1;
    POOLS.save(tx, (tenant, key.as_str()), &pool)?;

    tracing::debug!(
        tenant,
        pool = %key,
        cursor = pool.cursor,
        scanned,
        token = ?token,
        "pool consumed"
    );
    Ok(token)
}

/// Draw through the jackpot pool, then the primary pool.
pub fn draw(
    tx: &mut Transaction,
    tenant: u64,
    beneficiary: u64,
    layout: PoolLayout,
) -> Result<TierOutcome, EngineError> {
    let elig = eligibility::resolve(tx, tenant, beneficiary)?;

    let jackpot_allowed: &[PoolToken] = if elig.jackpot {
        &[PoolToken::NoHit, PoolToken::Jackpot]
    } else {
        &[PoolToken::NoHit]
    };
    if consume(tx, tenant, PoolKey::Jackpot, jackpot_allowed, layout)? == Some(PoolToken::Jackpot) {
        return Ok(TierOutcome::Tier(Tier::Jackpot));
    }

    let primary_allowed: Vec<PoolToken> = PRIMARY_TOKENS
        .into_iter()
        .filter(|token| token.tier().is_some_and(|tier| elig.allows(tier)))
        .collect();
    if primary_allowed.is_empty() {
        // a full cycle over nothing would leave the cursor in place anyway
        return Ok(TierOutcome::NoHit);
    }

    let token = consume(tx, tenant, PoolKey::Primary, &primary_allowed, layout)?;
    Ok(token.and_then(PoolToken::tier).into())
}

/// Regenerate the pool's composition and put the cursor back at 0.
pub fn rebuild_pool(
    tx: &mut Transaction,
    tenant: u64,
    key: PoolKey,
    layout: PoolLayout,
) -> Result<DrawPool, EngineError> {
    tx.lock_row(&pool_lock(tenant, key))?;
    let version = POOLS
        .may_load(tx, (tenant, key.as_str()))?
        .map_or(1, |previous| previous.version + 1);
    let pool = fresh_pool(tenant, key, layout, version)?;
    POOLS.save(tx, (tenant, key.as_str()), &pool)?;
    tracing::info!(tenant, pool = %key, size = pool.size, "pool rebuilt");
    Ok(pool)
}

pub fn reset_cursor(tx: &mut Transaction, tenant: u64, key: PoolKey) -> Result<DrawPool, EngineError> {
    tx.lock_row(&pool_lock(tenant, key))?;
    let mut pool = pool(tx, tenant, key)?;
    let previous = pool.cursor;
    pool.cursor = 0;
    pool.version += 1;
    POOLS.save(tx, (tenant, key.as_str()), &pool)?;
    tracing::info!(tenant, pool = %key, previous, "pool cursor reset");
    Ok(pool)
}

/// Parse an operator-supplied pool name.
pub fn pool_key(raw: &str) -> Result<PoolKey, EngineError> {
    raw.parse::<PoolKey>()
        .map_err(|key| EngineError::UnknownPoolKey { key })
}

pub fn pool(storage: &dyn Storage, tenant: u64, key: PoolKey) -> Result<DrawPool, EngineError> {
    POOLS
        .may_load(storage, (tenant, key.as_str()))?
        .ok_or(EngineError::PoolNotFound { tenant, key })
}
