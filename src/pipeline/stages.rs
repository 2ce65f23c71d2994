// src/pipeline/stages.rs

//! One entry point per pipeline stage.
//!
//! Stages run strictly in order: teams → games → players → season totals →
//! stats → fantasy.
//! Only the team stage is fatal; every later stage resolves identifiers
//! through it. Within a stage, a failed season is counted and skipped.
//!
//! Reference rows (teams, games, players) and season totals are upserted on
//! their natural key so a re-run refreshes them. Per-game stat rows are
//! insert-or-ignore.

use std::collections::BTreeMap;

use crate::error::{AppError, Result};
use crate::models::{Category, Config, FieldValue, Record};
use crate::pipeline::lookup::{PlayerDirectory, TeamDirectory};
use crate::pipeline::summary::StageSummary;
use crate::services::{
    DataValidator, Extraction, FantasyService, Fetcher, GameExtractor, GameRef, PlayerExtractor,
    RecordKind, SeasonStatExtractor, StatExtractor, TeamExtractor,
};
use crate::storage::Storage;

/// Extract and store the team reference table.
///
/// Any failure here is an [`AppError::Dependency`].
pub fn run_teams(
    config: &Config,
    fetcher: &mut Fetcher,
    storage: &mut dyn Storage,
) -> Result<StageSummary> {
    crate::utils::log::header("Teams");
    let mut summary = StageSummary::new("teams", None);

    let extraction = TeamExtractor::new(fetcher, config)
        .extract_with_fallback()
        .map_err(|e| AppError::dependency("teams", e))?;
    record_extraction(&mut summary, &extraction);

    let before = row_count(storage, "teams");
    for team in &extraction.records {
        storage
            .upsert("teams", &team.to_record(), &["team_code"])
            .map_err(|e| AppError::dependency("teams", format!("storing {}: {e}", team.team_code)))?;
    }
    tally_upserts(storage, "teams", before, extraction.records.len(), &mut summary);

    let directory = TeamDirectory::load(storage)?;
    log::info!("Team table holds {} teams", directory.len());
    finish(summary, storage)
}

/// Extract and store the schedule of every season.
pub fn run_games(
    config: &Config,
    fetcher: &mut Fetcher,
    storage: &mut dyn Storage,
    seasons: &[i32],
) -> Result<StageSummary> {
    crate::utils::log::header("Games");
    let teams = TeamDirectory::load(storage)?;
    let mut total = StageSummary::new("games", None);

    for &season in seasons {
        let mut summary = StageSummary::new("games", Some(season));
        match GameExtractor::new(&mut *fetcher, &teams, config).extract(season) {
            Ok(extraction) => {
                record_extraction(&mut summary, &extraction);
                let records: Vec<Record> = extraction.records.iter().map(|g| g.to_record()).collect();
                // scores and completion change after the first sighting
                store_upserts(storage, "games", &records, &["nfl_game_id"], &mut summary);
            }
            Err(e) => {
                log::error!("Games for {} failed: {}", season, e);
                summary.failed += 1;
            }
        }
        total.absorb(&summary);
        finish(summary, storage)?;
    }
    Ok(total)
}

/// Extract and store every roster of every season.
pub fn run_players(
    config: &Config,
    fetcher: &mut Fetcher,
    storage: &mut dyn Storage,
    seasons: &[i32],
) -> Result<StageSummary> {
    crate::utils::log::header("Players");
    let teams = TeamDirectory::load(storage)?;
    let mut total = StageSummary::new("players", None);

    for &season in seasons {
        let mut summary = StageSummary::new("players", Some(season));
        match PlayerExtractor::new(&mut *fetcher, &teams, config).extract(season) {
            Ok(extraction) => {
                record_extraction(&mut summary, &extraction);
                let records: Vec<Record> = extraction.records.iter().map(|p| p.to_record()).collect();
                store_upserts(
                    storage,
                    "players",
                    &records,
                    &["name", "position", "season_extracted"],
                    &mut summary,
                );
            }
            Err(e) => {
                log::error!("Players for {} failed: {}", season, e);
                summary.failed += 1;
            }
        }
        total.absorb(&summary);
        finish(summary, storage)?;
    }
    Ok(total)
}

/// Extract and store leaderboard season totals.
///
/// Totals move every week, so rows are refreshed in place.
pub fn run_season_stats(
    config: &Config,
    fetcher: &mut Fetcher,
    storage: &mut dyn Storage,
    seasons: &[i32],
) -> Result<StageSummary> {
    crate::utils::log::header("Season totals");
    let teams = TeamDirectory::load(storage)?;
    let mut total = StageSummary::new("season_stats", None);

    for &season in seasons {
        let mut summary = StageSummary::new("season_stats", Some(season));
        let extraction = {
            let mut players = PlayerDirectory::load(&mut *storage, &teams, season)?;
            let extraction =
                SeasonStatExtractor::new(&mut *fetcher, &mut players, &teams, config).extract(season);
            if players.created() > 0 {
                log::info!("Created {} players missing from rosters", players.created());
            }
            extraction
        };
        record_extraction(&mut summary, &extraction);

        let records: Vec<Record> = extraction.records.iter().map(|t| t.to_record()).collect();
        store_upserts(
            storage,
            "season_stats",
            &records,
            &["player_id", "season", "category"],
            &mut summary,
        );

        total.absorb(&summary);
        finish(summary, storage)?;
    }
    Ok(total)
}

/// Extract boxscores of completed games that have no statistics yet.
pub fn run_stats(
    config: &Config,
    fetcher: &mut Fetcher,
    storage: &mut dyn Storage,
    seasons: &[i32],
) -> Result<StageSummary> {
    crate::utils::log::header("Statistics");
    let teams = TeamDirectory::load(storage)?;
    let mut total = StageSummary::new("stats", None);

    for &season in seasons {
        let mut summary = StageSummary::new("stats", Some(season));
        let games = pending_games(storage, season)?;
        log::info!("{} games of {} need statistics", games.len(), season);

        let extraction = {
            let mut players = PlayerDirectory::load(&mut *storage, &teams, season)?;
            let extraction =
                StatExtractor::new(&mut *fetcher, &mut players, config).extract_season(&games);
            if players.created() > 0 {
                log::info!("Created {} players missing from rosters", players.created());
            }
            extraction
        };
        record_extraction(&mut summary, &extraction);

        let mut by_table: BTreeMap<&str, Vec<Record>> = BTreeMap::new();
        for line in &extraction.records {
            by_table
                .entry(line.category().table())
                .or_default()
                .push(line.to_record());
        }
        for (table, records) in by_table {
            store(storage, table, &records, &mut summary);
        }

        total.absorb(&summary);
        finish(summary, storage)?;
    }
    Ok(total)
}

/// Score every player-game that has statistics but no points yet.
pub fn run_fantasy(
    config: &Config,
    storage: &mut dyn Storage,
    seasons: &[i32],
) -> Result<StageSummary> {
    crate::utils::log::header("Fantasy points");
    let validator = DataValidator::from_config(config);
    let mut total = StageSummary::new("fantasy", None);

    for &season in seasons {
        let mut summary = StageSummary::new("fantasy", Some(season));
        let run = FantasyService::new(&mut *storage, config.scoring.clone(), config.storage.batch_size)
            .bulk_calculate(Some(season))?;
        summary.extracted = run.pairs;
        summary.inserted = run.stored;
        summary.skipped = run.zero_totals;
        summary.failed = run.failed;

        let stored = storage.query(
            "SELECT player_id, game_id, total_points FROM fantasy_points WHERE season = ?1",
            &[FieldValue::from(season)],
        )?;
        if !stored.is_empty() {
            let report = validator.validate(&stored, RecordKind::Fantasy);
            report.log(&format!("Fantasy points {season}"));
            summary.add_validation(&report);
        }

        total.absorb(&summary);
        finish(summary, storage)?;
    }
    Ok(total)
}

/// Completed games of a season with no stat row in any category.
fn pending_games(storage: &dyn Storage, season: i32) -> Result<Vec<GameRef>> {
    let with_stats = Category::ALL
        .iter()
        .map(|c| format!("SELECT game_id FROM {}", c.table()))
        .collect::<Vec<_>>()
        .join(" UNION ");
    let sql = format!(
        "SELECT game_id, nfl_game_id, season, week FROM games \
         WHERE season = ?1 AND completed = 1 AND game_id NOT IN ({with_stats}) \
         ORDER BY game_date, game_id"
    );
    let rows = storage.query(&sql, &[FieldValue::from(season)])?;
    Ok(rows
        .iter()
        .filter_map(|r| {
            Some(GameRef {
                game_id: r.i64("game_id")?,
                espn_id: r.str("nfl_game_id")?.to_string(),
                season,
                week: r.i64("week").and_then(|w| u32::try_from(w).ok()),
            })
        })
        .collect())
}

fn record_extraction<T>(summary: &mut StageSummary, extraction: &Extraction<T>) {
    summary.extracted += extraction.records.len();
    summary.skipped += extraction.skipped + extraction.conflicts;
    summary.failed += extraction.failed_fetches;
    summary.add_validation(&extraction.validation);
}

/// Bulk insert one batch. A storage failure skips the batch.
fn store(storage: &mut dyn Storage, table: &str, records: &[Record], summary: &mut StageSummary) {
    match storage.bulk_insert(table, records) {
        Ok(inserted) => {
            summary.inserted += inserted;
            summary.skipped += records.len() - inserted;
        }
        Err(e) => {
            log::error!("Storing {} rows into {} failed: {}", records.len(), table, e);
            summary.failed += records.len();
        }
    }
}

/// Upsert row by row on the table's natural key.
///
/// New rows count as inserted, the rest as updated. A failed row is counted
/// and skipped.
fn store_upserts(
    storage: &mut dyn Storage,
    table: &str,
    records: &[Record],
    keys: &[&str],
    summary: &mut StageSummary,
) {
    let before = row_count(storage, table);
    let mut written = 0;
    for record in records {
        match storage.upsert(table, record, keys) {
            Ok(_) => written += 1,
            Err(e) => {
                log::warn!("Storing a {} row failed: {}", table, e);
                summary.failed += 1;
            }
        }
    }
    tally_upserts(storage, table, before, written, summary);
}

fn tally_upserts(
    storage: &dyn Storage,
    table: &str,
    before: Option<i64>,
    written: usize,
    summary: &mut StageSummary,
) {
    let added = match (before, row_count(storage, table)) {
        (Some(before), Some(after)) => usize::try_from(after - before).unwrap_or(0).min(written),
        _ => written,
    };
    summary.inserted += added;
    summary.updated += written - added;
}

fn row_count(storage: &dyn Storage, table: &str) -> Option<i64> {
    storage
        .query(&format!("SELECT COUNT(*) AS n FROM {table}"), &[])
        .ok()?
        .first()?
        .i64("n")
}

fn finish(summary: StageSummary, storage: &mut dyn Storage) -> Result<StageSummary> {
    summary.log();
    summary.persist(storage);
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::models::Player;
    use crate::services::fetcher::testing::{StubHttp, stub_fetcher};
    use crate::storage::SqliteStorage;

    const ESPN: &str = "https://site.api.espn.com/apis/site/v2/sports/football/nfl";
    const PFR: &str = "https://www.pro-football-reference.com";

    fn scoreboard(completed: bool) -> String {
        let (home, away) = if completed { ("20", "21") } else { ("0", "0") };
        json!({"events": [{
            "id": "401547403",
            "date": "2023-09-08T00:20Z",
            "week": {"number": 1},
            "status": {"type": {"completed": completed}},
            "competitions": [{"competitors": [
                {"homeAway": "home", "score": home, "team": {"abbreviation": "KC"}},
                {"homeAway": "away", "score": away, "team": {"abbreviation": "DET"}}
            ]}]
        }]})
        .to_string()
    }

    fn seeded(stub: &StubHttp) -> (Fetcher, SqliteStorage, Config) {
        stub.route(&format!("{ESPN}/teams"), 503, "");
        let (mut fetcher, _) = stub_fetcher(stub);
        let mut config = Config::default();
        config.validation.min_games_per_season = 1;
        let mut storage = SqliteStorage::open_in_memory().unwrap();
        storage.initialize_schema().unwrap();
        run_teams(&config, &mut fetcher, &mut storage).unwrap();
        (fetcher, storage, config)
    }

    #[test]
    fn rerun_refreshes_games_that_finished() {
        let stub = StubHttp::new();
        let url = format!("{ESPN}/scoreboard?seasontype=2&year=2023");
        stub.route(&url, 200, &scoreboard(false))
            .route(&url, 200, &scoreboard(true));
        let (mut fetcher, mut storage, config) = seeded(&stub);

        let first = run_games(&config, &mut fetcher, &mut storage, &[2023]).unwrap();
        assert_eq!((first.inserted, first.updated), (1, 0));
        assert!(pending_games(&storage, 2023).unwrap().is_empty());

        let second = run_games(&config, &mut fetcher, &mut storage, &[2023]).unwrap();
        assert_eq!((second.inserted, second.updated), (0, 1));
        assert_eq!(storage.count("games").unwrap(), 1);

        let rows = storage
            .query("SELECT completed, home_score, away_score FROM games", &[])
            .unwrap();
        assert_eq!(rows[0].i64("completed"), Some(1));
        assert_eq!(rows[0].i64("home_score"), Some(20));
        assert_eq!(rows[0].i64("away_score"), Some(21));

        let pending = pending_games(&storage, 2023).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].espn_id, "401547403");
    }

    #[test]
    fn roster_run_fills_in_stub_players() {
        let stub = StubHttp::new();
        stub.route(
            &format!("{PFR}/teams/kan/2023_roster.htm"),
            200,
            r#"<table id="roster"><thead><tr><th>No.</th><th>Player</th><th>Age</th><th>Pos</th>
            <th>Wt</th><th>Ht</th></tr></thead><tbody><tr><th>15</th>
            <td><a href="/players/M/MahoPa00.htm">Patrick Mahomes</a></td><td>28</td><td>QB</td>
            <td>225</td><td>6-2</td></tr></tbody></table>"#,
        );
        let (mut fetcher, mut storage, config) = seeded(&stub);
        storage
            .upsert(
                "players",
                &Player::stub("Patrick Mahomes", "QB", None, 2023).to_record(),
                &["name", "position", "season_extracted"],
            )
            .unwrap();

        let summary = run_players(&config, &mut fetcher, &mut storage, &[2023]).unwrap();
        assert_eq!((summary.inserted, summary.updated), (0, 1));
        assert_eq!(summary.failed, 31);

        let rows = storage
            .query("SELECT jersey_number, pfr_player_id, team_id FROM players", &[])
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].i64("jersey_number"), Some(15));
        assert_eq!(rows[0].str("pfr_player_id"), Some("MahoPa00"));
        assert!(rows[0].i64("team_id").is_some());
    }

    fn passing_leaders(yards: &str) -> String {
        format!(
            r#"<table id="passing"><thead><tr><th>Rk</th><th>Player</th><th>Tm</th><th>Pos</th>
            <th>G</th><th>GS</th><th>Cmp</th><th>Att</th><th>Yds</th><th>TD</th></tr></thead>
            <tbody><tr><th>1</th><td><a href="/players/M/MahoPa00.htm">Patrick Mahomes</a>*</td>
            <td>KAN</td><td>QB</td><td>16</td><td>16</td><td>401</td><td>597</td><td>{yards}</td>
            <td>27</td></tr></tbody></table>"#
        )
    }

    #[test]
    fn season_totals_refresh_in_place() {
        let stub = StubHttp::new();
        let url = format!("{PFR}/years/2023/passing.htm");
        stub.route(&url, 200, &passing_leaders("3,900"));
        stub.route(&url, 200, &passing_leaders("4,183"));
        let (mut fetcher, mut storage, config) = seeded(&stub);
        let mut mahomes = Player::stub("Patrick Mahomes", "QB", Some(16), 2023);
        mahomes.pfr_player_id = Some("MahoPa00".into());
        let player_id = storage
            .upsert(
                "players",
                &mahomes.to_record(),
                &["name", "position", "season_extracted"],
            )
            .unwrap();

        let first = run_season_stats(&config, &mut fetcher, &mut storage, &[2023]).unwrap();
        assert_eq!((first.inserted, first.updated), (1, 0));
        // rushing, receiving and defense pages are missing
        assert_eq!(first.failed, 3);

        let second = run_season_stats(&config, &mut fetcher, &mut storage, &[2023]).unwrap();
        assert_eq!((second.inserted, second.updated), (0, 1));

        let rows = storage
            .query(
                "SELECT player_id, category, team_id, games_played, passing_yards FROM season_stats",
                &[],
            )
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].i64("player_id"), Some(player_id));
        assert_eq!(rows[0].str("category"), Some("passing"));
        assert_eq!(rows[0].i64("team_id"), Some(16));
        assert_eq!(rows[0].i64("games_played"), Some(16));
        assert_eq!(rows[0].i64("passing_yards"), Some(4183));
        assert_eq!(storage.count("players").unwrap(), 1);
    }
}
