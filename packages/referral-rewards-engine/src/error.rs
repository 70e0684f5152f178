use cosmwasm_std::StdError;
use referral_rewards_common::{GrantState, PoolKey, Tier};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("{0}")]
    Std(#[from] StdError),

    #[error("invalid config: {reason}")]
    InvalidConfig { reason: String },

    #[error("store belongs to {found}, expected {expected}")]
    SchemaMismatch { expected: String, found: String },

    #[error("tenant {tenant} has no reward tier catalog")]
    CatalogMissing { tenant: u64 },

    #[error("tier {tier} not found for tenant {tenant}")]
    TierNotFound { tenant: u64, tier: Tier },

    #[error("invalid tier update: {reason}")]
    InvalidTierUpdate { reason: String },

    #[error("pool {key} of tenant {tenant} has no cells")]
    InvalidPool { tenant: u64, key: PoolKey },

    #[error("pool {key} not found for tenant {tenant}")]
    PoolNotFound { tenant: u64, key: PoolKey },

    #[error("unknown pool key: {key}")]
    UnknownPoolKey { key: String },

    #[error("lock wait timeout on {resource}")]
    LockTimeout { resource: String },

    #[error("referral {referral} already recorded for tenant {tenant}")]
    ReferralExists { tenant: u64, referral: u64 },

    #[error("client {referee} already has a referral in tenant {tenant}")]
    RefereeAlreadyReferred { tenant: u64, referee: u64 },

    #[error("grant {grant} not found for tenant {tenant}")]
    GrantNotFound { tenant: u64, grant: u64 },

    #[error("no grant carries this claim token")]
    TokenNotFound,

    #[error("grant {grant} cannot move from {from} to {to}")]
    InvalidGrantTransition {
        grant: u64,
        from: GrantState,
        to: GrantState,
    },
}

impl EngineError {
    /// Contention that a caller may resolve by re-running the whole transaction.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::LockTimeout { .. })
    }

    /// Provisioning bugs an operator must fix; never retried.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            EngineError::InvalidConfig { .. }
                | EngineError::SchemaMismatch { .. }
                | EngineError::CatalogMissing { .. }
                | EngineError::TierNotFound { .. }
                | EngineError::InvalidPool { .. }
                | EngineError::PoolNotFound { .. }
        )
    }
}
