// src/models/mod.rs

//! Domain models for the NFL data pipeline.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod fantasy;
mod game;
mod player;
mod record;
mod scoring;
mod season;
mod stats;
mod team;

// Re-export all public types
pub use config::{
    Config, ESPN_DOMAIN, HttpConfig, PFR_DOMAIN, RateLimitConfig, SeasonConfig, SourcesConfig,
    StorageConfig, ValidationThresholds,
};
pub use fantasy::{FantasyPoints, PointsBreakdown, TopPerformer};
pub use game::{Game, GameType};
pub use player::{
    DEFENSIVE_POSITIONS, KNOWN_POSITIONS, Player, is_defensive_position, normalize_position,
};
pub use record::{FieldValue, Record};
pub use scoring::ScoringRules;
pub use season::{SeasonPage, SeasonTotals};
pub use stats::{
    Category, DefensiveStats, PassingStats, ReceivingStats, ReturnStats, RushingStats, StatBody,
    StatKey, StatLine, StatSource,
};
pub use team::{
    NFL_TEAMS, Team, TeamInfo, canonical_team_code, pfr_team_code, team_from_pfr_code, team_info,
};
