pub mod odds;
pub mod pool;
pub mod types;

pub use odds::{display_odds, DisplayOdds, TierOdds};
pub use pool::{PoolLayout, Run};
pub use types::{DrawStrategy, Eligibility, GrantState, PoolKey, PoolToken, Tier, TierOutcome};
