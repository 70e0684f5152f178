use cosmwasm_schema::cw_serde;
use referral_rewards_common::{DrawStrategy, PoolLayout, Tier, TierOutcome};
use schemars::schema::RootSchema;
use serde::{Deserialize, Deserializer};

use crate::error::EngineError;
use crate::state::{Referral, RewardGrant};

const MIN_LOCK_TIMEOUT_MS: u64 = 1;
const MAX_LOCK_TIMEOUT_MS: u64 = 60_000;
const MAX_ATTEMPTS: u32 = 10;
/// 100 years.
const MAX_TOKEN_TTL_DAYS: u32 = 36_500;

#[cw_serde]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Authoritative draw engine. Fixed once a store is created.
    pub strategy: DrawStrategy,
    pub pool_layout: PoolLayout,
    /// Persist a disabled placeholder grant when a referral draw misses.
    pub record_no_hit: bool,
    /// Tier handed to the referee on referral completion; `None` disables it.
    pub referee_reward: Option<Tier>,
    pub lock_timeout_ms: u64,
    pub max_attempts: u32,
    /// Claim-token lifetime for tiers without a cooldown.
    pub default_token_ttl_days: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            strategy: DrawStrategy::Cyclic,
            pool_layout: PoolLayout::Contiguous,
            record_no_hit: false,
            referee_reward: Some(Tier::Common),
            lock_timeout_ms: 5_000,
            max_attempts: 3,
            default_token_ttl_days: 180,
        }
    }
}

impl EngineConfig {
    pub fn from_json(raw: &str) -> Result<Self, EngineError> {
        let config: EngineConfig =
            serde_json::from_str(raw).map_err(|err| EngineError::InvalidConfig {
                reason: err.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// JSON schema of the config document, for operator tooling.
    pub fn schema() -> RootSchema {
        schemars::schema_for!(EngineConfig)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        validate_lock_timeout(self.lock_timeout_ms)?;
        validate_max_attempts(self.max_attempts)?;
        validate_token_ttl(self.default_token_ttl_days)
    }
}

pub fn validate_token_ttl(days: u32) -> Result<(), EngineError> {
    if days == 0 || days > MAX_TOKEN_TTL_DAYS {
        return Err(EngineError::InvalidConfig {
            reason: format!("default_token_ttl_days must be in [1, {MAX_TOKEN_TTL_DAYS}], got {days}"),
        });
    }
    Ok(())
}

pub fn validate_lock_timeout(lock_timeout_ms: u64) -> Result<(), EngineError> {
    if !(MIN_LOCK_TIMEOUT_MS..=MAX_LOCK_TIMEOUT_MS).contains(&lock_timeout_ms) {
        return Err(EngineError::InvalidConfig {
            reason: format!(
                "lock_timeout_ms must be in [{MIN_LOCK_TIMEOUT_MS}, {MAX_LOCK_TIMEOUT_MS}], got {lock_timeout_ms}"
            ),
        });
    }
    Ok(())
}

pub fn validate_max_attempts(max_attempts: u32) -> Result<(), EngineError> {
    if max_attempts == 0 || max_attempts > MAX_ATTEMPTS {
        return Err(EngineError::InvalidConfig {
            reason: format!("max_attempts must be in [1, {MAX_ATTEMPTS}], got {max_attempts}"),
        });
    }
    Ok(())
}

/// Every field is optional; `strategy` cannot be changed after creation.
#[cw_serde]
#[derive(Default)]
#[serde(deny_unknown_fields)]
pub struct UpdateConfigParams {
    pub pool_layout: Option<PoolLayout>,
    pub record_no_hit: Option<bool>,
    /// `Some(None)` turns the referee reward off; in JSON an absent field
    /// leaves it alone and `null` turns it off.
    #[serde(default, deserialize_with = "present")]
    pub referee_reward: Option<Option<Tier>>,
    pub lock_timeout_ms: Option<u64>,
    pub max_attempts: Option<u32>,
    pub default_token_ttl_days: Option<u32>,
}

/// Wraps any value that is present in the document, `null` included.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[cw_serde]
#[derive(Default)]
#[serde(deny_unknown_fields)]
pub struct UpdateTierParams {
    pub label: Option<String>,
    pub cooldown_months: Option<u32>,
    pub min_referrals: Option<u64>,
}

#[cw_serde]
#[derive(Copy, Eq)]
pub struct NewReferral {
    pub id: u64,
    pub referrer: u64,
    pub referee: u64,
}

/// Everything a completed referral produced.
#[cw_serde]
pub struct Award {
    pub referral: Referral,
    /// The referrer's draw.
    pub outcome: TierOutcome,
    pub referrer_grant: Option<RewardGrant>,
    pub referee_grant: Option<RewardGrant>,
}

#[cw_serde]
pub struct GrantsResponse {
    pub tenant: u64,
    pub beneficiary: u64,
    pub grants: Vec<RewardGrant>,
}
