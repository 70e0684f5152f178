//! End-to-end tests for the referral reward engine.
//!
//! Every test drives the public `Engine` facade over an in-memory store.
//! Contention tests share one engine across `std::thread`s.
//!
//! Run:
//! ```bash
//! cargo test -p referral-rewards-integration-tests
//! ```

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::thread;

use cosmwasm_std::{Decimal256, Timestamp};
use rand::rngs::StdRng;
use rand::SeedableRng;
use referral_rewards_common::{DrawStrategy, GrantState, PoolKey, PoolLayout, Tier, TierOutcome};
use referral_rewards_engine::weighted::sample;
use referral_rewards_engine::{
    Engine, EngineConfig, EngineError, FixedClock, NewReferral, UpdateConfigParams,
    UpdateTierParams,
};

// ─── Constants ───

const TENANT: u64 = 1;
const OTHER_TENANT: u64 = 2;
const REFERRER: u64 = 7;
const NOW_SECONDS: u64 = 1_700_000_000;
const DAY: u64 = 86_400;

/// Thresholds from the reference scenario: Rare at 10 referrals, Jackpot at 12.
const SCENARIO_THRESHOLDS: [u64; 4] = [0, 0, 10, 12];

// ─── Helpers ───

fn engine_with(config: EngineConfig, thresholds: [u64; 4]) -> Engine {
    let engine = Engine::in_memory(config)
        .unwrap()
        .with_clock(FixedClock(Timestamp::from_seconds(NOW_SECONDS)));
    for tenant in [TENANT, OTHER_TENANT] {
        engine.ensure_tiers(tenant).unwrap();
        set_thresholds(&engine, tenant, thresholds);
    }
    engine
}

fn engine(thresholds: [u64; 4]) -> Engine {
    engine_with(EngineConfig::default(), thresholds)
}

fn set_thresholds(engine: &Engine, tenant: u64, thresholds: [u64; 4]) {
    for (tier, min_referrals) in Tier::ALL.into_iter().zip(thresholds) {
        let params = UpdateTierParams {
            min_referrals: Some(min_referrals),
            ..Default::default()
        };
        engine.update_tier(tenant, tier, params).unwrap();
    }
}

/// Record referrals for `referrer` until its count reaches `target`.
fn refer_until(engine: &Engine, tenant: u64, referrer: u64, target: u64) {
    let mut count = engine.referral_count(tenant, referrer).unwrap();
    while count < target {
        let id = referrer * 1_000 + count + 1;
        let new = NewReferral {
            id,
            referrer,
            referee: 1_000_000 + id,
        };
        engine.record_referral(tenant, new).unwrap();
        count += 1;
    }
    assert_eq!(engine.referral_count(tenant, referrer).unwrap(), target);
}

fn draw_many(
    engine: &Engine,
    tenant: u64,
    beneficiary: u64,
    n: usize,
) -> HashMap<TierOutcome, usize> {
    let mut counts = HashMap::new();
    for _ in 0..n {
        *counts
            .entry(engine.draw(tenant, beneficiary).unwrap())
            .or_default() += 1;
    }
    counts
}

fn hits(counts: &HashMap<TierOutcome, usize>, tier: Tier) -> usize {
    counts.get(&TierOutcome::Tier(tier)).copied().unwrap_or(0)
}

fn misses(counts: &HashMap<TierOutcome, usize>) -> usize {
    counts.get(&TierOutcome::NoHit).copied().unwrap_or(0)
}

fn reset_pools(engine: &Engine, tenant: u64) {
    for key in PoolKey::ALL {
        engine.rebuild_pool(tenant, key).unwrap();
    }
}

// ─── Exact ratios ───

#[test]
fn test_primary_pool_exact_ratio() {
    let engine = engine([0, 0, 0, 0]);
    reset_pools(&engine, TENANT);

    let counts = draw_many(&engine, TENANT, REFERRER, 1_000);
    assert_eq!(hits(&counts, Tier::Common), 980);
    assert_eq!(hits(&counts, Tier::Occasional), 19);
    assert_eq!(hits(&counts, Tier::Rare), 1);
    assert_eq!(hits(&counts, Tier::Jackpot), 0);
    assert_eq!(engine.pool(TENANT, PoolKey::Primary).unwrap().cursor, 0);
}

#[test]
fn test_jackpot_pool_exact_ratio() {
    let engine = engine([0, 0, 0, 0]);
    reset_pools(&engine, TENANT);

    let counts = draw_many(&engine, TENANT, REFERRER, 100_000);
    assert_eq!(hits(&counts, Tier::Jackpot), 1);
    // the other 99,999 draws fell through to the primary pool
    assert_eq!(hits(&counts, Tier::Common), 98_000);
    assert_eq!(hits(&counts, Tier::Occasional), 1_900);
    assert_eq!(hits(&counts, Tier::Rare), 99);
    assert_eq!(misses(&counts), 0);
    assert_eq!(engine.pool(TENANT, PoolKey::Jackpot).unwrap().cursor, 0);
}

#[test]
fn test_interleaved_layout_keeps_exact_ratio() {
    let config = EngineConfig {
        pool_layout: PoolLayout::Interleaved,
        ..EngineConfig::default()
    };
    let engine = engine_with(config, [0, 0, 0, 0]);

    let counts = draw_many(&engine, TENANT, REFERRER, 1_000);
    // the interleaved jackpot pool holds its jackpot in cell 1
    assert_eq!(hits(&counts, Tier::Jackpot), 1);
    let primary = hits(&counts, Tier::Common)
        + hits(&counts, Tier::Occasional)
        + hits(&counts, Tier::Rare);
    assert_eq!(primary, 999);
    assert_eq!(hits(&counts, Tier::Rare), 1);
}

// ─── Eligibility ───

#[test]
fn test_reference_scenario() {
    let engine = engine(SCENARIO_THRESHOLDS);
    reset_pools(&engine, TENANT);

    refer_until(&engine, TENANT, REFERRER, 9);
    let counts = draw_many(&engine, TENANT, REFERRER, 1_000);
    assert_eq!(hits(&counts, Tier::Common), 981);
    assert_eq!(hits(&counts, Tier::Occasional), 19);
    assert_eq!(hits(&counts, Tier::Rare), 0);
    assert_eq!(hits(&counts, Tier::Jackpot), 0);

    refer_until(&engine, TENANT, REFERRER, 10);
    let counts = draw_many(&engine, TENANT, REFERRER, 1_000);
    assert_eq!(hits(&counts, Tier::Common), 980);
    assert_eq!(hits(&counts, Tier::Occasional), 19);
    assert_eq!(hits(&counts, Tier::Rare), 1);
    assert_eq!(hits(&counts, Tier::Jackpot), 0);

    refer_until(&engine, TENANT, REFERRER, 12);
    engine.reset_cursor(TENANT, PoolKey::Jackpot).unwrap();
    let counts = draw_many(&engine, TENANT, REFERRER, 100_000);
    assert_eq!(hits(&counts, Tier::Jackpot), 1);
}

#[test]
fn test_locked_tier_reachable_on_next_draw_once_unlocked() {
    let engine = engine([0, 0, 3, 100]);
    reset_pools(&engine, TENANT);
    refer_until(&engine, TENANT, REFERRER, 2);

    // 999 draws park the primary cursor on the Rare cell
    let counts = draw_many(&engine, TENANT, REFERRER, 999);
    assert_eq!(hits(&counts, Tier::Rare), 0);
    assert_eq!(engine.pool(TENANT, PoolKey::Primary).unwrap().cursor, 999);

    refer_until(&engine, TENANT, REFERRER, 3);
    assert_eq!(
        engine.draw(TENANT, REFERRER).unwrap(),
        TierOutcome::Tier(Tier::Rare)
    );
}

#[test]
fn test_locked_tier_never_appears() {
    let engine = engine([0, 0, 5, 5]);
    refer_until(&engine, TENANT, REFERRER, 4);
    let counts = draw_many(&engine, TENANT, REFERRER, 3_000);
    assert_eq!(hits(&counts, Tier::Rare), 0);
    assert_eq!(hits(&counts, Tier::Jackpot), 0);
    assert_eq!(hits(&counts, Tier::Common) + hits(&counts, Tier::Occasional), 3_000);
}

#[test]
fn test_nothing_eligible_is_no_hit_not_error() {
    let engine = engine([1, 1, 1, 1]);
    let counts = draw_many(&engine, TENANT, REFERRER, 50);
    assert_eq!(misses(&counts), 50);
    let grant = engine
        .issue_grant(TENANT, REFERRER, Some(1), TierOutcome::NoHit)
        .unwrap();
    assert_eq!(grant, None);
}

#[test]
fn test_missing_catalog_is_configuration_error() {
    let engine = Engine::in_memory(EngineConfig::default()).unwrap();
    let err = engine.draw(9, REFERRER).unwrap_err();
    assert!(matches!(err, EngineError::CatalogMissing { tenant: 9 }));
    assert!(err.is_configuration());
    assert!(!err.is_retryable());
}

// ─── Cursor ───

#[test]
fn test_cursor_tracks_cells_scanned() {
    let engine = engine([0, 0, 10, 0]);
    reset_pools(&engine, TENANT);

    // 999 single-cell draws, one draw skipping Rare (2 cells), then 234 more
    draw_many(&engine, TENANT, REFERRER, 1_234);
    assert_eq!(engine.pool(TENANT, PoolKey::Primary).unwrap().cursor, 235);
    assert_eq!(engine.pool(TENANT, PoolKey::Jackpot).unwrap().cursor, 1_234);

    let rebuilt = engine.rebuild_pool(TENANT, PoolKey::Primary).unwrap();
    assert_eq!(rebuilt.cursor, 0);
    let reset = engine.reset_cursor(TENANT, PoolKey::Jackpot).unwrap();
    assert_eq!(reset.cursor, 0);
    assert_eq!(reset.size, 100_000);
}

#[test]
fn test_reset_cursor_on_missing_pool() {
    let engine = engine([0, 0, 0, 0]);
    let err = engine.reset_cursor(TENANT, PoolKey::Primary).unwrap_err();
    assert!(matches!(err, EngineError::PoolNotFound { .. }));
    assert!(err.is_configuration());
}

#[test]
fn test_pool_state_survives_reopen() {
    let engine = engine([0, 0, 0, 0]);
    draw_many(&engine, TENANT, REFERRER, 17);
    let storage = engine.into_storage();

    let reopened = Engine::open(storage, EngineConfig::default()).unwrap();
    assert_eq!(reopened.pool(TENANT, PoolKey::Primary).unwrap().cursor, 17);
    reopened.draw(TENANT, REFERRER).unwrap();
    assert_eq!(reopened.pool(TENANT, PoolKey::Primary).unwrap().cursor, 18);
}

// ─── Tenants ───

#[test]
fn test_tenants_are_isolated() {
    let engine = engine([0, 0, 0, 0]);
    refer_until(&engine, TENANT, REFERRER, 5);

    draw_many(&engine, TENANT, REFERRER, 40);
    draw_many(&engine, OTHER_TENANT, REFERRER, 3);
    assert_eq!(engine.pool(TENANT, PoolKey::Primary).unwrap().cursor, 40);
    assert_eq!(engine.pool(OTHER_TENANT, PoolKey::Primary).unwrap().cursor, 3);
    assert_eq!(engine.referral_count(OTHER_TENANT, REFERRER).unwrap(), 0);

    let grant = engine
        .issue_grant(TENANT, REFERRER, Some(1), TierOutcome::Tier(Tier::Common))
        .unwrap()
        .unwrap();
    let other = engine
        .issue_grant(OTHER_TENANT, REFERRER, Some(1), TierOutcome::Tier(Tier::Common))
        .unwrap()
        .unwrap();
    // grant ids are allocated per tenant
    assert_eq!(grant.id, 1);
    assert_eq!(other.id, 1);
    assert_ne!(grant.token, other.token);
}

// ─── Issuance ───

#[test]
fn test_issue_grant_is_idempotent() {
    let engine = engine([0, 0, 0, 0]);
    let first = engine
        .issue_grant(TENANT, REFERRER, Some(5), TierOutcome::Tier(Tier::Rare))
        .unwrap()
        .unwrap();
    let second = engine
        .issue_grant(TENANT, REFERRER, Some(5), TierOutcome::Tier(Tier::Rare))
        .unwrap()
        .unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(first.token, second.token);

    let listed = engine.grants_for(TENANT, REFERRER, None, None).unwrap();
    assert_eq!(listed.grants.len(), 1);
}

#[test]
fn test_concurrent_issuance_converges_on_one_grant() {
    let engine = Arc::new(engine([0, 0, 0, 0]));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                engine
                    .issue_grant(TENANT, REFERRER, Some(42), TierOutcome::Tier(Tier::Common))
                    .unwrap()
                    .unwrap()
            })
        })
        .collect();
    let grants: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert!(grants.iter().all(|grant| grant.id == grants[0].id));
    assert!(grants.iter().all(|grant| grant.token == grants[0].token));
    let listed = engine.grants_for(TENANT, REFERRER, None, None).unwrap();
    assert_eq!(listed.grants.len(), 1);
}

#[test]
fn test_grant_token_and_lifecycle() {
    let engine = engine([0, 0, 0, 0]);
    let grant = engine
        .issue_grant(TENANT, REFERRER, Some(1), TierOutcome::Tier(Tier::Jackpot))
        .unwrap()
        .unwrap();
    assert_eq!(grant.label, "Grand prize");
    assert_eq!(grant.cooldown_days, 180);
    assert_eq!(
        grant.token_expires_at,
        Some(Timestamp::from_seconds(NOW_SECONDS + 180 * DAY))
    );

    let token = grant.token.clone().unwrap();
    assert_eq!(token.len(), 48);
    assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(engine.grant_by_token(&token).unwrap().id, grant.id);
    assert!(matches!(
        engine.grant_by_token("deadbeef").unwrap_err(),
        EngineError::TokenNotFound
    ));

    let sent = engine.set_grant_state(TENANT, grant.id, GrantState::Sent).unwrap();
    assert_eq!(sent.state, GrantState::Sent);
    let archived = engine
        .set_grant_state(TENANT, grant.id, GrantState::Archived)
        .unwrap();
    assert_eq!(archived.state, GrantState::Archived);
    let err = engine
        .set_grant_state(TENANT, grant.id, GrantState::Pending)
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidGrantTransition { .. }));
    assert_eq!(engine.grant(TENANT, grant.id).unwrap().state, GrantState::Archived);
}

#[test]
fn test_grants_for_paging() {
    let engine = engine([0, 0, 0, 0]);
    for referral in 1..=25 {
        engine
            .issue_grant(TENANT, REFERRER, Some(referral), TierOutcome::Tier(Tier::Common))
            .unwrap();
    }
    let page = engine.grants_for(TENANT, REFERRER, None, None).unwrap();
    assert_eq!(page.grants.len(), 20);
    let rest = engine
        .grants_for(TENANT, REFERRER, page.grants.last().map(|g| g.id), Some(100))
        .unwrap();
    assert_eq!(rest.grants.len(), 5);
    assert_eq!(rest.grants[0].id, 21);
}

// ─── Referral completion ───

#[test]
fn test_complete_referral_awards_both_sides() {
    let engine = engine([0, 0, 0, 0]);
    let award = engine
        .complete_referral(
            TENANT,
            NewReferral {
                id: 1,
                referrer: REFERRER,
                referee: 900,
            },
        )
        .unwrap();

    assert_eq!(award.outcome, TierOutcome::Tier(Tier::Common));
    let referrer_grant = award.referrer_grant.unwrap();
    let referee_grant = award.referee_grant.unwrap();
    assert_eq!(referrer_grant.beneficiary, REFERRER);
    assert_eq!(referee_grant.beneficiary, 900);
    assert_eq!(referee_grant.tier, Some(Tier::Common));
    assert_ne!(referrer_grant.id, referee_grant.id);

    let err = engine
        .complete_referral(
            TENANT,
            NewReferral {
                id: 2,
                referrer: 8,
                referee: 900,
            },
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::RefereeAlreadyReferred { .. }));
}

#[test]
fn test_complete_referral_records_no_hit_when_configured() {
    let config = EngineConfig {
        record_no_hit: true,
        referee_reward: None,
        ..EngineConfig::default()
    };
    let engine = engine_with(config, [5, 5, 5, 5]);
    let award = engine
        .complete_referral(
            TENANT,
            NewReferral {
                id: 1,
                referrer: REFERRER,
                referee: 900,
            },
        )
        .unwrap();
    assert_eq!(award.outcome, TierOutcome::NoHit);
    assert_eq!(award.referrer_grant, None);
    assert_eq!(award.referee_grant, None);

    let listed = engine.grants_for(TENANT, REFERRER, None, None).unwrap();
    assert_eq!(listed.grants.len(), 1);
    let placeholder = &listed.grants[0];
    assert_eq!(placeholder.state, GrantState::Disabled);
    assert_eq!(placeholder.tier, None);
    assert_eq!(placeholder.token, None);
}

#[test]
fn test_concurrent_referrals_keep_counts_exact() {
    let engine = Arc::new(engine([0, 0, 0, 0]));
    let handles: Vec<_> = (0..4u64)
        .map(|worker| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for n in 0..25u64 {
                    let id = worker * 100 + n + 1;
                    engine
                        .complete_referral(
                            TENANT,
                            NewReferral {
                                id,
                                referrer: REFERRER,
                                referee: 10_000 + id,
                            },
                        )
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(engine.referral_count(TENANT, REFERRER).unwrap(), 100);
    assert_eq!(engine.pool(TENANT, PoolKey::Primary).unwrap().cursor, 100);
    let referrer_grants = engine.grants_for(TENANT, REFERRER, None, Some(100)).unwrap();
    assert_eq!(referrer_grants.grants.len(), 100);
}

// ─── Contention ───

#[test]
fn test_concurrent_draws_keep_exact_ratio() {
    let engine = Arc::new(engine([0, 0, 0, 0]));
    reset_pools(&engine, TENANT);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || draw_many(&engine, TENANT, REFERRER, 250))
        })
        .collect();

    let mut totals: HashMap<TierOutcome, usize> = HashMap::new();
    for handle in handles {
        for (outcome, n) in handle.join().unwrap() {
            *totals.entry(outcome).or_default() += n;
        }
    }
    assert_eq!(hits(&totals, Tier::Common), 980);
    assert_eq!(hits(&totals, Tier::Occasional), 19);
    assert_eq!(hits(&totals, Tier::Rare), 1);
    assert_eq!(engine.pool(TENANT, PoolKey::Primary).unwrap().cursor, 0);
}

#[test]
fn test_tenants_draw_in_parallel() {
    let engine = Arc::new(engine([0, 0, 0, 0]));
    let handles: Vec<_> = [TENANT, OTHER_TENANT]
        .into_iter()
        .map(|tenant| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || draw_many(&engine, tenant, REFERRER, 1_000))
        })
        .collect();
    for handle in handles {
        let counts = handle.join().unwrap();
        assert_eq!(hits(&counts, Tier::Common), 980);
        assert_eq!(hits(&counts, Tier::Rare), 1);
    }
}

// ─── Normalized strategy and display ───

#[test]
fn test_display_probabilities_renormalise() {
    let engine = engine(SCENARIO_THRESHOLDS);
    refer_until(&engine, TENANT, REFERRER, 9);

    let odds = engine.display_probabilities(TENANT, REFERRER).unwrap();
    assert_eq!(odds.referral_count, 9);
    assert_eq!(
        odds.percent(Tier::Common),
        Decimal256::from_str("80.808080808080808080").unwrap()
    );
    assert_eq!(
        odds.percent(Tier::Occasional),
        Decimal256::from_str("19.191919191919191919").unwrap()
    );
    assert!(odds.percent(Tier::Rare).is_zero());
    assert!(odds.percent(Tier::Jackpot).is_zero());

    refer_until(&engine, TENANT, REFERRER, 12);
    let odds = engine.display_probabilities(TENANT, REFERRER).unwrap();
    assert_eq!(odds.total(), Decimal256::from_str("100").unwrap());
    assert_eq!(odds.percent(Tier::Jackpot), Decimal256::from_str("0.00001").unwrap());

    let locked = engine_with(EngineConfig::default(), [1, 1, 1, 1]);
    let odds = locked.display_probabilities(TENANT, REFERRER).unwrap();
    assert!(odds.total().is_zero());
}

#[test]
fn test_normalized_strategy_respects_eligibility() {
    let config = EngineConfig::from_json(
        &serde_json::json!({ "strategy": "normalized" }).to_string(),
    )
    .unwrap();
    assert_eq!(config.strategy, DrawStrategy::Normalized);
    let engine = engine_with(config, SCENARIO_THRESHOLDS);
    refer_until(&engine, TENANT, REFERRER, 9);

    let counts = draw_many(&engine, TENANT, REFERRER, 2_000);
    assert_eq!(hits(&counts, Tier::Rare), 0);
    assert_eq!(hits(&counts, Tier::Jackpot), 0);
    assert_eq!(hits(&counts, Tier::Common) + hits(&counts, Tier::Occasional), 2_000);
    assert!(engine.pool(TENANT, PoolKey::Primary).is_err());
}

#[test]
fn test_seeded_weighted_sampling_converges() {
    let engine = engine(SCENARIO_THRESHOLDS);
    refer_until(&engine, TENANT, REFERRER, 10);
    let elig = engine.eligibility(TENANT, REFERRER).unwrap();
    assert!(elig.rare && !elig.jackpot);

    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut counts: HashMap<TierOutcome, usize> = HashMap::new();
    for _ in 0..200_000 {
        *counts.entry(sample(&elig, &mut rng)).or_default() += 1;
    }
    // expected roughly 160,000 / 38,000 / 2,000
    let common = hits(&counts, Tier::Common);
    let occasional = hits(&counts, Tier::Occasional);
    let rare = hits(&counts, Tier::Rare);
    assert!((158_800..161_200).contains(&common), "common = {common}");
    assert!((37_400..38_600).contains(&occasional), "occasional = {occasional}");
    assert!((1_700..2_300).contains(&rare), "rare = {rare}");
    assert_eq!(hits(&counts, Tier::Jackpot), 0);
}

// ─── Configuration ───

#[test]
fn test_update_config_changes_layout_and_rebuilds() {
    let engine = engine([0, 0, 0, 0]);
    draw_many(&engine, TENANT, REFERRER, 10);
    let before = engine.pool(TENANT, PoolKey::Primary).unwrap();

    engine
        .update_config(UpdateConfigParams {
            pool_layout: Some(PoolLayout::Interleaved),
            ..Default::default()
        })
        .unwrap();
    engine.draw(TENANT, REFERRER).unwrap();

    let after = engine.pool(TENANT, PoolKey::Primary).unwrap();
    assert_ne!(after.digest, before.digest);
    assert_eq!(after.cursor, 1);
}

#[test]
fn test_out_of_range_durations_are_rejected_before_issuance() {
    let engine = engine([0, 0, 0, 0]);

    let err = engine
        .update_tier(
            TENANT,
            Tier::Common,
            UpdateTierParams {
                cooldown_months: Some(10_000),
                ..Default::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidTierUpdate { .. }));

    engine
        .update_tier(
            TENANT,
            Tier::Common,
            UpdateTierParams {
                cooldown_months: Some(0),
                ..Default::default()
            },
        )
        .unwrap();
    let err = engine
        .update_config(UpdateConfigParams {
            default_token_ttl_days: Some(u32::MAX),
            ..Default::default()
        })
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidConfig { .. }));

    let grant = engine
        .issue_grant(TENANT, REFERRER, Some(1), TierOutcome::Tier(Tier::Common))
        .unwrap()
        .unwrap();
    assert_eq!(
        grant.token_expires_at,
        Some(Timestamp::from_seconds(NOW_SECONDS + 180 * DAY))
    );
}

#[test]
fn test_config_json_with_typo_is_rejected() {
    let err = EngineConfig::from_json(r#"{"lock_timout_ms":100}"#).unwrap_err();
    assert!(matches!(err, EngineError::InvalidConfig { .. }));
    assert!(err.is_configuration());
}
