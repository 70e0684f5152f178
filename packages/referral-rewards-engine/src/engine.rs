use std::sync::{PoisonError, RwLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use cosmwasm_std::{MemoryStorage, Timestamp};
use cw2::{set_contract_version, CONTRACT};
use rand::thread_rng;
use referral_rewards_common::{
    DisplayOdds, DrawStrategy, Eligibility, GrantState, PoolKey, Tier, TierOutcome,
};

use crate::error::EngineError;
use crate::issuance::{self, IssueOptions};
use crate::ledger::{Ledger, SharedStorage, Transaction};
use crate::msg::{
    validate_lock_timeout, validate_max_attempts, Award, EngineConfig, GrantsResponse,
    NewReferral, UpdateConfigParams, UpdateTierParams,
};
use crate::state::{grant_lock, DrawPool, Referral, RewardGrant, RewardTier, CONFIG};
use crate::{catalog, cyclic, eligibility, query, referrals, weighted};

pub const CONTRACT_NAME: &str = "crates.io:referral-rewards-engine";
pub const CONTRACT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Source of "now" for grant timestamps and token expiry.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX));
        Timestamp::from_nanos(nanos)
    }
}

/// A clock stuck at one instant.
pub struct FixedClock(pub Timestamp);

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.0
    }
}

/// Referral reward allocation for many tenants over one store.
///
/// Safe to share across threads. Mutations run in their own transaction and
/// serialize only on the rows they touch.
pub struct Engine {
    ledger: Ledger,
    config: RwLock<EngineConfig>,
    clock: Box<dyn Clock>,
}

impl Engine {
    /// Open `storage`, stamping and configuring it on first use.
    ///
    /// A store that already carries a config keeps it; `config` only seeds
    /// fresh stores. The draw strategy cannot differ from the stored one.
    pub fn open(storage: SharedStorage, config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let ledger = Ledger::new(storage, Duration::from_millis(config.lock_timeout_ms));

        let config = ledger.transaction(|tx| {
            match CONTRACT.may_load(tx)? {
                Some(stamp) if stamp.contract != CONTRACT_NAME => {
                    return Err(EngineError::SchemaMismatch {
                        expected: CONTRACT_NAME.to_string(),
                        found: stamp.contract,
                    });
                }
                Some(stamp) if stamp.version != CONTRACT_VERSION => {
                    tracing::info!(
                        from_version = %stamp.version,
                        to_version = CONTRACT_VERSION,
                        "restamping store"
                    );
                    set_contract_version(tx, CONTRACT_NAME, CONTRACT_VERSION)?;
                }
                Some(_) => {}
                None => set_contract_version(tx, CONTRACT_NAME, CONTRACT_VERSION)?,
            }

            match CONFIG.may_load(tx)? {
                Some(stored) if stored.strategy != config.strategy => {
                    Err(EngineError::InvalidConfig {
                        reason: format!(
                            "store was created with strategy {:?}, cannot open it as {:?}",
                            stored.strategy, config.strategy
                        ),
                    })
                }
                Some(stored) => {
                    if stored != config {
                        tracing::warn!("store already configured, keeping stored config");
                    }
                    Ok(stored)
                }
                None => {
                    CONFIG.save(tx, &config)?;
                    Ok(config)
                }
            }
        })?;

        ledger.set_lock_timeout(Duration::from_millis(config.lock_timeout_ms));
        tracing::info!(strategy = ?config.strategy, layout = ?config.pool_layout, "engine opened");
        Ok(Engine {
            ledger,
            config: RwLock::new(config),
            clock: Box::new(SystemClock),
        })
    }

    pub fn in_memory(config: EngineConfig) -> Result<Self, EngineError> {
        Engine::open(Box::new(MemoryStorage::new()), config)
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Hand back the store, e.g. to reopen it.
    pub fn into_storage(self) -> SharedStorage {
        self.ledger.into_storage()
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    // ─── Configuration ───

    pub fn config(&self) -> EngineConfig {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn update_config(&self, params: UpdateConfigParams) -> Result<EngineConfig, EngineError> {
        let mut current = self.config.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = current.clone();

        if let Some(pool_layout) = params.pool_layout {
            next.pool_layout = pool_layout;
        }
        if let Some(record_no_hit) = params.record_no_hit {
            next.record_no_hit = record_no_hit;
        }
        if let Some(referee_reward) = params.referee_reward {
            next.referee_reward = referee_reward;
        }
        if let Some(lock_timeout_ms) = params.lock_timeout_ms {
            validate_lock_timeout(lock_timeout_ms)?;
            next.lock_timeout_ms = lock_timeout_ms;
        }
        if let Some(max_attempts) = params.max_attempts {
            validate_max_attempts(max_attempts)?;
            next.max_attempts = max_attempts;
        }
        if let Some(default_token_ttl_days) = params.default_token_ttl_days {
            next.default_token_ttl_days = default_token_ttl_days;
        }
        next.validate()?;

        self.ledger.transaction(|tx| Ok(CONFIG.save(tx, &next)?))?;
        self.ledger
            .set_lock_timeout(Duration::from_millis(next.lock_timeout_ms));
        *current = next.clone();

        tracing::info!(
            layout = ?next.pool_layout,
            record_no_hit = next.record_no_hit,
            lock_timeout_ms = next.lock_timeout_ms,
            max_attempts = next.max_attempts,
            "config updated"
        );
        Ok(next)
    }

    // ─── Tier catalog ───

    pub fn ensure_tiers(&self, tenant: u64) -> Result<Vec<RewardTier>, EngineError> {
        self.ledger
            .transaction(|tx| catalog::ensure_tiers(tx, tenant))
    }

    pub fn tier(&self, tenant: u64, tier: Tier) -> Result<RewardTier, EngineError> {
        self.ledger.read(|storage| catalog::tier(storage, tenant, tier))
    }

    pub fn tiers(&self, tenant: u64) -> Result<Vec<RewardTier>, EngineError> {
        self.ledger.read(|storage| catalog::tiers(storage, tenant))
    }

    pub fn update_tier(
        &self,
        tenant: u64,
        tier: Tier,
        params: UpdateTierParams,
    ) -> Result<RewardTier, EngineError> {
        self.ledger
            .transaction(|tx| catalog::update_tier(tx, tenant, tier, params))
    }

    // ─── Referrals and eligibility ───

    pub fn record_referral(&self, tenant: u64, new: NewReferral) -> Result<Referral, EngineError> {
        let now = self.now();
        self.ledger
            .transaction(|tx| referrals::record_referral(tx, tenant, new, now))
    }

    pub fn referral(&self, tenant: u64, id: u64) -> Result<Option<Referral>, EngineError> {
        self.ledger.read(|storage| referrals::referral(storage, tenant, id))
    }

    pub fn referral_count(&self, tenant: u64, client: u64) -> Result<u64, EngineError> {
        self.ledger
            .read(|storage| eligibility::referral_count(storage, tenant, client))
    }

    pub fn eligibility(&self, tenant: u64, beneficiary: u64) -> Result<Eligibility, EngineError> {
        self.ledger
            .read(|storage| eligibility::resolve(storage, tenant, beneficiary))
    }

    // ─── Draws ───

    /// Draw with this deployment's strategy, in a transaction of its own.
    pub fn draw(&self, tenant: u64, beneficiary: u64) -> Result<TierOutcome, EngineError> {
        let config = self.config();
        let outcome = match config.strategy {
            DrawStrategy::Cyclic => self
                .ledger
                .transaction(|tx| cyclic::draw(tx, tenant, beneficiary, config.pool_layout))?,
            DrawStrategy::Normalized => self.ledger.read(|storage| {
                weighted::draw(storage, tenant, beneficiary, &mut thread_rng())
            })?,
        };
        tracing::info!(tenant, beneficiary, outcome = %outcome, "reward decision");
        Ok(outcome)
    }

    /// Current odds for `beneficiary`, always from the renormalised weights.
    pub fn display_probabilities(
        &self,
        tenant: u64,
        beneficiary: u64,
    ) -> Result<DisplayOdds, EngineError> {
        self.ledger
            .read(|storage| weighted::display_probabilities(storage, tenant, beneficiary))
    }

    fn draw_in(
        &self,
        tx: &mut Transaction,
        config: &EngineConfig,
        tenant: u64,
        beneficiary: u64,
    ) -> Result<TierOutcome, EngineError> {
        match config.strategy {
            DrawStrategy::Cyclic => cyclic::draw(tx, tenant, beneficiary, config.pool_layout),
            DrawStrategy::Normalized => {
                weighted::draw(tx, tenant, beneficiary, &mut thread_rng())
            }
        }
    }

    // ─── Pools ───

    pub fn rebuild_pool(&self, tenant: u64, key: PoolKey) -> Result<DrawPool, EngineError> {
        let layout = self.config().pool_layout;
        self.ledger
            .transaction(|tx| cyclic::rebuild_pool(tx, tenant, key, layout))
    }

    pub fn reset_cursor(&self, tenant: u64, key: PoolKey) -> Result<DrawPool, EngineError> {
        self.ledger
            .transaction(|tx| cyclic::reset_cursor(tx, tenant, key))
    }

    pub fn pool(&self, tenant: u64, key: PoolKey) -> Result<DrawPool, EngineError> {
        self.ledger.read(|storage| cyclic::pool(storage, tenant, key))
    }

    // ─── Grants ───

    pub fn issue_grant(
        &self,
        tenant: u64,
        beneficiary: u64,
        referral: Option<u64>,
        outcome: TierOutcome,
    ) -> Result<Option<RewardGrant>, EngineError> {
        let opts = self.issue_options();
        self.ledger
            .transaction(|tx| issuance::issue(tx, tenant, beneficiary, referral, outcome, opts))
    }

    /// Record the referral, draw for the referrer and issue both grants in one
    /// transaction. Contention reruns the whole unit up to `max_attempts` times.
    pub fn complete_referral(&self, tenant: u64, new: NewReferral) -> Result<Award, EngineError> {
        let config = self.config();
        self.with_retry("complete_referral", tenant, config.max_attempts, || {
            let opts = self.issue_options();
            self.ledger.transaction(|tx| {
                let referral = referrals::record_referral(tx, tenant, new, opts.now)?;
                tx.lock_row(&grant_lock(tenant, new.referrer, new.id))?;
                tx.lock_row(&grant_lock(tenant, new.referee, new.id))?;

                let outcome = self.draw_in(tx, &config, tenant, new.referrer)?;
                let referrer_grant =
                    issuance::issue(tx, tenant, new.referrer, Some(new.id), outcome, opts)?;
                let referee_grant = match config.referee_reward {
                    Some(tier) => issuance::issue(
                        tx,
                        tenant,
                        new.referee,
                        Some(new.id),
                        TierOutcome::Tier(tier),
                        opts,
                    )?,
                    None => None,
                };

                tracing::info!(
                    tenant,
                    referral = new.id,
                    referrer = new.referrer,
                    outcome = %outcome,
                    "referral completed"
                );
                Ok(Award {
                    referral,
                    outcome,
                    referrer_grant,
                    referee_grant,
                })
            })
        })
    }

    pub fn grant(&self, tenant: u64, id: u64) -> Result<RewardGrant, EngineError> {
        self.ledger.read(|storage| query::query_grant(storage, tenant, id))
    }

    pub fn grant_by_token(&self, token: &str) -> Result<RewardGrant, EngineError> {
        self.ledger
            .read(|storage| query::query_grant_by_token(storage, token))
    }

    pub fn grants_for(
        &self,
        tenant: u64,
        beneficiary: u64,
        start_after: Option<u64>,
        limit: Option<u32>,
    ) -> Result<GrantsResponse, EngineError> {
        self.ledger.read(|storage| {
            query::query_grants_for(storage, tenant, beneficiary, start_after, limit)
        })
    }

    pub fn set_grant_state(
        &self,
        tenant: u64,
        id: u64,
        state: GrantState,
    ) -> Result<RewardGrant, EngineError> {
        self.ledger
            .transaction(|tx| issuance::set_grant_state(tx, tenant, id, state))
    }

    fn issue_options(&self) -> IssueOptions {
        let config = self.config();
        IssueOptions {
            now: self.now(),
            record_no_hit: config.record_no_hit,
            default_token_ttl_days: config.default_token_ttl_days,
        }
    }

    fn with_retry<T>(
        &self,
        op: &'static str,
        tenant: u64,
        max_attempts: u32,
        mut run: impl FnMut() -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        let mut attempt = 1;
        loop {
            match run() {
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    tracing::warn!(op, tenant, attempt, error = %err, "retrying after contention");
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}
