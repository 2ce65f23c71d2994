// src/pipeline/validate.rs

//! Configuration check and database completeness report.

use crate::error::Result;
use crate::models::{Category, Config, FieldValue, NFL_TEAMS};
use crate::services::ValidationReport;
use crate::storage::Storage;

/// Row counts and findings of one completeness check.
#[derive(Debug, Clone, Default)]
pub struct CompletenessReport {
    pub counts: Vec<(String, i64)>,
    pub report: ValidationReport,
}

impl CompletenessReport {
    pub fn is_complete(&self) -> bool {
        self.report.is_valid()
    }

    pub fn log(&self) {
        let items: Vec<(&str, String)> = self
            .counts
            .iter()
            .map(|(name, n)| (name.as_str(), n.to_string()))
            .collect();
        crate::utils::log::summary("Database contents", &items);
        self.report.log("Completeness");
    }
}

/// Validate the configuration, then check what the database holds.
pub fn run_validate(config: &Config, storage: &dyn Storage) -> Result<CompletenessReport> {
    config.validate()?;
    log::info!("Configuration OK");

    let mut result = CompletenessReport::default();
    let thresholds = &config.validation;

    let teams = count(storage, "teams", None)?;
    result.counts.push(("teams".into(), teams));
    if teams != NFL_TEAMS.len() as i64 {
        result
            .report
            .error(format!("Expected {} teams, found {}", NFL_TEAMS.len(), teams));
    }

    let team_count = NFL_TEAMS.len();
    for &season in &config.season.seasons {
        let games = count(storage, "games", Some(("season", season)))?;
        result.counts.push((format!("games {season}"), games));
        let (min, max) = (
            thresholds.min_games_per_season as i64,
            thresholds.max_games_per_season as i64,
        );
        if games == 0 {
            result.report.error(format!("No games stored for {season}"));
        } else if !(min..=max).contains(&games) {
            result
                .report
                .warn(format!("Season {season} has {games} games, expected {min}-{max}"));
        }

        let players = count(storage, "players", Some(("season_extracted", season)))?;
        result.counts.push((format!("players {season}"), players));
        let (min, max) = (
            (thresholds.min_players_per_team * team_count) as i64,
            (thresholds.max_players_per_team * team_count) as i64,
        );
        if !(min..=max).contains(&players) {
            result
                .report
                .warn(format!("Season {season} has {players} players, expected {min}-{max}"));
        }

        let totals = count(storage, "season_stats", Some(("season", season)))?;
        result.counts.push((format!("season_stats {season}"), totals));
    }

    for category in Category::ALL {
        let rows = count(storage, category.table(), None)?;
        result.counts.push((category.table().into(), rows));
        if rows == 0 && matches!(category, Category::Passing | Category::Rushing | Category::Receiving) {
            result.report.warn(format!("No rows in {}", category.table()));
        }
    }
    let points = count(storage, "fantasy_points", None)?;
    result.counts.push(("fantasy_points".into(), points));

    result.log();
    Ok(result)
}

fn count(storage: &dyn Storage, table: &str, filter: Option<(&str, i32)>) -> Result<i64> {
    let rows = match filter {
        Some((column, value)) => storage.query(
            &format!("SELECT COUNT(*) AS n FROM {table} WHERE {column} = ?1"),
            &[FieldValue::from(value)],
        )?,
        None => storage.query(&format!("SELECT COUNT(*) AS n FROM {table}"), &[])?,
    };
    Ok(rows.first().and_then(|r| r.i64("n")).unwrap_or(0))
}
