//! Frecency engine: selection recording and result ranking.
//!
//! # Modules
//!
//! - `store`: [`FrecencyStore`], the persisted aggregate with load/record/evict
//! - `scorer`: [`Scorer`], decay buckets and tiered query matching
//! - `frecency`: [`Frecency`], the per-resource-type facade callers hold

pub mod frecency;
pub mod scorer;
pub mod store;

pub use frecency::{Frecency, SCORE_FIELD};
pub use scorer::{base_score, decay_weight, MatchTier, Score, Scored, Scorer};
pub use store::{CorruptPolicy, FrecencyOptions, FrecencyStore};

/// Current time as Unix milliseconds, the unit of every stored timestamp.
#[must_use]
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
