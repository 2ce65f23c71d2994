//! Pipeline entry points.
//!
//! - `run_teams`, `run_games`, `run_players`, `run_season_stats`, `run_stats`,
//!   `run_fantasy`: one stage each
//! - `run_pipeline`: all stages in order
//! - `run_validate`: configuration check and completeness report

pub mod lookup;
pub mod pipeline;
pub mod stages;
pub mod summary;
pub mod validate;

pub use lookup::{PlayerDirectory, TeamDirectory};
pub use pipeline::run_pipeline;
pub use stages::{
    run_fantasy, run_games, run_players, run_season_stats, run_stats, run_teams,
};
pub use summary::StageSummary;
pub use validate::{CompletenessReport, run_validate};
