//! Service layer for the extraction pipeline.
//!
//! This module contains the business logic for:
//! - Request pacing (`RateLimiter`, `AdaptiveRateLimiter`) and fetching (`Fetcher`)
//! - Table and JSON extraction (`table`, `json`, `week`)
//! - Domain extraction (`TeamExtractor`, `GameExtractor`, `PlayerExtractor`, `StatExtractor`,
//!   `SeasonStatExtractor`)
//! - Validation (`DataValidator`)
//! - Fantasy scoring (`FantasyPointsCalculator`, `FantasyService`)

pub mod dedup;
pub mod fantasy;
pub mod fetcher;
pub mod games;
pub mod json;
pub mod players;
pub mod rate_limiter;
pub mod season_stats;
pub mod stats;
pub mod table;
pub mod teams;
pub mod validator;
pub mod week;

pub use fantasy::{FantasyPointsCalculator, FantasyRunSummary, FantasyService};
pub use fetcher::Fetcher;
pub use games::{CodeLookup, GameExtractor};
pub use players::PlayerExtractor;
pub use rate_limiter::{AdaptiveRateLimiter, Outcome, RateLimiter};
pub use season_stats::SeasonStatExtractor;
pub use stats::{AthleteRef, GameRef, PlayerLookup, StatExtractor};
pub use table::{Table, extract_table, extract_table_str};
pub use teams::TeamExtractor;
pub use validator::{DataValidator, RecordKind, ValidationReport};

/// Result of one extraction call.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction<T> {
    /// Normalized, deduplicated records
    pub records: Vec<T>,
    /// Advisory findings over `records`
    pub validation: ValidationReport,
    /// Items dropped during normalization
    pub skipped: usize,
    /// Sub-fetches that failed and were skipped
    pub failed_fetches: usize,
    /// Same natural key seen with different content
    pub conflicts: usize,
}

impl<T> Default for Extraction<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            validation: ValidationReport::default(),
            skipped: 0,
            failed_fetches: 0,
            conflicts: 0,
        }
    }
}
