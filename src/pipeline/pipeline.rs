// src/pipeline/pipeline.rs

//! Full pipeline driver.

use crate::error::Result;
use crate::models::Config;
use crate::pipeline::stages::{
    run_fantasy, run_games, run_players, run_season_stats, run_stats, run_teams,
};
use crate::pipeline::summary::StageSummary;
use crate::services::Fetcher;
use crate::storage::Storage;

const STAGES: usize = 6;

/// Run every stage in order and return their summaries.
///
/// Fails only when a stage cannot run at all, e.g. the team table could
/// not be built.
pub fn run_pipeline(
    config: &Config,
    fetcher: &mut Fetcher,
    storage: &mut dyn Storage,
    seasons: &[i32],
) -> Result<Vec<StageSummary>> {
    crate::utils::log::header(&format!("NFL data pipeline for seasons {seasons:?}"));
    let mut summaries = Vec::with_capacity(STAGES);

    crate::utils::log::step(1, STAGES, "Teams");
    summaries.push(run_teams(config, fetcher, storage)?);

    crate::utils::log::step(2, STAGES, "Games");
    summaries.push(run_games(config, fetcher, storage, seasons)?);

    crate::utils::log::step(3, STAGES, "Players");
    summaries.push(run_players(config, fetcher, storage, seasons)?);

    crate::utils::log::step(4, STAGES, "Season totals");
    summaries.push(run_season_stats(config, fetcher, storage, seasons)?);

    crate::utils::log::step(5, STAGES, "Statistics");
    summaries.push(run_stats(config, fetcher, storage, seasons)?);

    crate::utils::log::step(6, STAGES, "Fantasy points");
    summaries.push(run_fantasy(config, storage, seasons)?);

    let items: Vec<(&str, String)> = summaries
        .iter()
        .map(|s| {
            (
                s.stage.as_str(),
                format!(
                    "{} inserted, {} skipped, {} failed",
                    s.inserted, s.skipped, s.failed
                ),
            )
        })
        .collect();
    crate::utils::log::summary("Pipeline complete", &items);
    Ok(summaries)
}
