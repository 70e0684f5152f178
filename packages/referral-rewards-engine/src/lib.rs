pub mod catalog;
pub mod cyclic;
pub mod eligibility;
pub mod engine;
pub mod error;
pub mod issuance;
pub mod ledger;
pub mod msg;
pub mod query;
pub mod referrals;
pub mod state;
pub mod weighted;

pub use engine::{Clock, Engine, FixedClock, SystemClock, CONTRACT_NAME, CONTRACT_VERSION};
pub use error::EngineError;
pub use ledger::{Ledger, SharedStorage, Transaction};
pub use msg::{Award, EngineConfig, GrantsResponse, NewReferral, UpdateConfigParams, UpdateTierParams};
pub use state::{DrawPool, Referral, RewardGrant, RewardTier};
