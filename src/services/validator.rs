// src/services/validator.rs

//! Advisory structural and range checks.
//!
//! Validation never fails. Errors mean a record must not be trusted
//! (missing required field, inconsistent counts); warnings flag values that
//! are structurally fine but outside historical bounds.

use std::collections::{BTreeSet, HashSet};

use chrono::{Datelike, NaiveDate};

use crate::models::{
    Category, Config, FantasyPoints, Game, KNOWN_POSITIONS, NFL_TEAMS, Player, Record,
    SeasonTotals, StatLine, Team, ValidationThresholds,
};

/// What a batch of records represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Teams,
    Players,
    Games { season: i32 },
    Stats(Category),
    SeasonTotals(Category),
    Fantasy,
}

impl RecordKind {
    pub fn label(&self) -> String {
        match self {
            Self::Teams => "teams".into(),
            Self::Players => "players".into(),
            Self::Games { season } => format!("games {season}"),
            Self::Stats(category) => format!("{category} stats"),
            Self::SeasonTotals(category) => format!("{category} season totals"),
            Self::Fantasy => "fantasy points".into(),
        }
    }
}

/// Accumulated findings of one validation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn merge(&mut self, other: ValidationReport) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// Write the findings through the log facade.
    pub fn log(&self, label: &str) {
        if !self.errors.is_empty() {
            log::error!(
                "{} validation failed with {} errors:",
                label,
                self.errors.len()
            );
            for error in &self.errors {
                log::error!("  ERROR: {}", error);
            }
        }
        if !self.warnings.is_empty() {
            log::warn!(
                "{} validation completed with {} warnings:",
                label,
                self.warnings.len()
            );
            for warning in &self.warnings {
                log::warn!("  WARNING: {}", warning);
            }
        }
        if self.errors.is_empty() && self.warnings.is_empty() {
            log::info!("{} validation passed", label);
        }
    }
}

pub struct DataValidator {
    thresholds: ValidationThresholds,
    max_week: u32,
}

impl DataValidator {
    pub fn new(thresholds: ValidationThresholds, max_week: u32) -> Self {
        Self {
            thresholds,
            max_week,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.validation.clone(), config.season.max_week)
    }

    pub fn thresholds(&self) -> &ValidationThresholds {
        &self.thresholds
    }

    /// Validate a batch of flat records of one kind.
    pub fn validate(&self, records: &[Record], kind: RecordKind) -> ValidationReport {
        match kind {
            RecordKind::Teams => self.check_teams(records),
            RecordKind::Players => self.check_players(records),
            RecordKind::Games { season } => self.check_games(records, season),
            RecordKind::Stats(category) => self.check_stats(records, category),
            RecordKind::SeasonTotals(category) => self.check_season_totals(records, category),
            RecordKind::Fantasy => self.check_fantasy(records),
        }
    }

    pub fn validate_teams(&self, teams: &[Team]) -> ValidationReport {
        let records: Vec<Record> = teams.iter().map(Team::to_record).collect();
        self.validate(&records, RecordKind::Teams)
    }

    pub fn validate_players(&self, players: &[Player]) -> ValidationReport {
        let records: Vec<Record> = players.iter().map(Player::to_record).collect();
        self.validate(&records, RecordKind::Players)
    }

    pub fn validate_games(&self, games: &[Game], season: i32) -> ValidationReport {
        let records: Vec<Record> = games.iter().map(Game::to_record).collect();
        self.validate(&records, RecordKind::Games { season })
    }

    pub fn validate_stats(&self, lines: &[StatLine], category: Category) -> ValidationReport {
        let records: Vec<Record> = lines
            .iter()
            .filter(|l| l.category() == category)
            .map(StatLine::to_record)
            .collect();
        self.validate(&records, RecordKind::Stats(category))
    }

    pub fn validate_season_totals(
        &self,
        totals: &[SeasonTotals],
        category: Category,
    ) -> ValidationReport {
        let records: Vec<Record> = totals
            .iter()
            .filter(|t| t.category() == category)
            .map(SeasonTotals::to_record)
            .collect();
        self.validate(&records, RecordKind::SeasonTotals(category))
    }

    pub fn validate_fantasy(&self, points: &[FantasyPoints]) -> ValidationReport {
        let records: Vec<Record> = points.iter().map(FantasyPoints::to_record).collect();
        self.validate(&records, RecordKind::Fantasy)
    }

    fn check_teams(&self, teams: &[Record]) -> ValidationReport {
        let mut report = ValidationReport::default();

        if teams.len() != NFL_TEAMS.len() {
            report.error(format!(
                "Expected {} NFL teams, got {}",
                NFL_TEAMS.len(),
                teams.len()
            ));
        }

        for team in teams {
            for field in ["team_code", "team_name", "conference", "division"] {
                if !has_text(team, field) {
                    report.error(format!(
                        "Team missing required field '{field}': {}",
                        describe(team)
                    ));
                }
            }
        }

        let codes: BTreeSet<&str> = teams.iter().filter_map(|t| t.str("team_code")).collect();
        let expected: BTreeSet<&str> = NFL_TEAMS.iter().map(|t| t.code).collect();
        let missing: Vec<_> = expected.difference(&codes).collect();
        let extra: Vec<_> = codes.difference(&expected).collect();
        if !missing.is_empty() {
            report.error(format!("Missing expected team codes: {missing:?}"));
        }
        if !extra.is_empty() {
            report.warn(format!("Unexpected team codes: {extra:?}"));
        }

        let bad_conferences: BTreeSet<&str> = teams
            .iter()
            .filter_map(|t| t.str("conference"))
            .filter(|c| !matches!(*c, "AFC" | "NFC"))
            .collect();
        if !bad_conferences.is_empty() {
            report.error(format!("Invalid conferences found: {bad_conferences:?}"));
        }

        report
    }

    fn check_players(&self, players: &[Record]) -> ValidationReport {
        let mut report = ValidationReport::default();

        if players.is_empty() {
            report.error("No player data provided");
            return report;
        }

        for player in players {
            for field in ["name", "position"] {
                if !has_text(player, field) {
                    report.error(format!(
                        "Player missing required field '{field}': {}",
                        describe(player)
                    ));
                }
            }
        }

        let unexpected: BTreeSet<&str> = players
            .iter()
            .filter_map(|p| p.str("position"))
            .filter(|p| !KNOWN_POSITIONS.contains(p))
            .collect();
        if !unexpected.is_empty() {
            report.warn(format!("Unexpected positions found: {unexpected:?}"));
        }

        let mut keys = HashSet::new();
        for player in players {
            let key = (
                player.str("name").unwrap_or_default(),
                player.str("position").unwrap_or_default(),
                player.i64("team_id"),
            );
            if !keys.insert(key) {
                report.warn(format!("Duplicate player found: {}", describe(player)));
            }
        }

        report
    }

    fn check_games(&self, games: &[Record], season: i32) -> ValidationReport {
        let mut report = ValidationReport::default();

        if games.is_empty() {
            report.error(format!("No game data provided for season {season}"));
            return report;
        }

        let (min, max) = (
            self.thresholds.min_games_per_season,
            self.thresholds.max_games_per_season,
        );
        if !(min..=max).contains(&games.len()) {
            report.warn(format!(
                "Season {season} has {} games, expected {min}-{max}",
                games.len()
            ));
        }

        for game in games {
            for field in ["nfl_game_id", "season", "game_date", "home_team_id", "away_team_id"] {
                if is_missing(game, field) {
                    report.error(format!(
                        "Game missing required field '{field}': {}",
                        describe(game)
                    ));
                }
            }
            if is_missing(game, "week") {
                report.warn(format!("Game has unknown week: {}", describe(game)));
            }
            if let (Some(home), Some(away)) = (game.i64("home_team_id"), game.i64("away_team_id"))
            {
                if home == away {
                    report.error(format!("Game has the same home and away team: {}", describe(game)));
                }
            }
        }

        let seasons: BTreeSet<i64> = games.iter().filter_map(|g| g.i64("season")).collect();
        if seasons.len() > 1 {
            report.error(format!("Multiple seasons in game data: {seasons:?}"));
        }

        let weeks: BTreeSet<i64> = games.iter().filter_map(|g| g.i64("week")).collect();
        if let (Some(first), Some(last)) = (weeks.first(), weeks.last()) {
            if *first < 1 || *last > i64::from(self.max_week) {
                report.warn(format!("Unusual week numbers found: {weeks:?}"));
            }
        }

        for game in games {
            let Some(text) = game.str("game_date") else {
                continue;
            };
            match NaiveDate::parse_from_str(text, "%Y-%m-%d") {
                Ok(date) if date.year() != season && date.year() != season + 1 => {
                    report.warn(format!("Game date {date} seems wrong for season {season}"));
                }
                Ok(_) => {}
                Err(_) => report.error(format!("Invalid game date format: {text}")),
            }
        }

        report
    }

    fn check_stats(&self, stats: &[Record], category: Category) -> ValidationReport {
        let mut report = ValidationReport::default();

        if stats.is_empty() {
            report.warn(format!("No {category} stats provided"));
            return report;
        }

        let required: &[&str] = match category {
            Category::Passing => &["player_id", "game_id", "attempts", "completions", "passing_yards"],
            Category::Rushing => &["player_id", "game_id", "attempts", "rushing_yards"],
            Category::Receiving => &["player_id", "game_id", "targets", "receptions", "receiving_yards"],
            Category::Defensive => &["player_id", "game_id", "tackles_total"],
            Category::SpecialTeams => &["player_id", "game_id"],
        };
        for stat in stats {
            for field in required {
                if is_missing(stat, field) {
                    report.error(format!(
                        "{category} stat missing field '{field}': {}",
                        describe(stat)
                    ));
                }
            }
        }

        let t = &self.thresholds;
        for stat in stats {
            match category {
                Category::Passing => {
                    let yards = stat.i64("passing_yards").unwrap_or(0);
                    if yards < 0 || yards > t.max_passing_yards_game {
                        report.warn(format!("Unusual passing yards: {yards} in {}", describe(stat)));
                    }
                    let completions = stat.i64("completions").unwrap_or(0);
                    let attempts = stat.i64("attempts").unwrap_or(0);
                    if completions > attempts {
                        report.error(format!("Completions > attempts in {}", describe(stat)));
                    }
                }
                Category::Rushing => {
                    let yards = stat.i64("rushing_yards").unwrap_or(0);
                    if yards < t.min_rushing_yards_game || yards > t.max_rushing_yards_game {
                        report.warn(format!("Unusual rushing yards: {yards} in {}", describe(stat)));
                    }
                }
                Category::Receiving => {
                    let yards = stat.i64("receiving_yards").unwrap_or(0);
                    if yards < 0 || yards > t.max_receiving_yards_game {
                        report.warn(format!(
                            "Unusual receiving yards: {yards} in {}",
                            describe(stat)
                        ));
                    }
                    let receptions = stat.i64("receptions").unwrap_or(0);
                    let targets = stat.i64("targets").unwrap_or(0);
                    if targets > 0 && receptions > targets {
                        report.error(format!("Receptions > targets in {}", describe(stat)));
                    }
                }
                Category::Defensive | Category::SpecialTeams => {}
            }
        }

        report
    }

    /// Season totals: games bounded by the schedule, per-game averages
    /// within the single-game limits.
    fn check_season_totals(&self, totals: &[Record], category: Category) -> ValidationReport {
        let mut report = ValidationReport::default();
        if totals.is_empty() {
            report.warn(format!("No {category} season totals provided"));
            return report;
        }

        let t = &self.thresholds;
        for row in totals {
            for field in ["player_id", "season", "games_played"] {
                if is_missing(row, field) {
                    report.error(format!(
                        "{category} totals missing field '{field}': {}",
                        describe(row)
                    ));
                }
            }

            let games = row.i64("games_played").unwrap_or(0);
            if games > i64::from(self.max_week) {
                report.warn(format!("{games} games played in {}", describe(row)));
            }
            if row.i64("games_started").unwrap_or(0) > games {
                report.error(format!("Games started > games played in {}", describe(row)));
            }

            let per_game = |column: &str| row.i64(column).unwrap_or(0) / games.max(1);
            match category {
                Category::Passing => {
                    if row.i64("completions").unwrap_or(0) > row.i64("attempts").unwrap_or(0) {
                        report.error(format!("Completions > attempts in {}", describe(row)));
                    }
                    if per_game("passing_yards") > t.max_passing_yards_game {
                        report.warn(format!("Unusual passing average in {}", describe(row)));
                    }
                }
                Category::Rushing => {
                    if per_game("rushing_yards") > t.max_rushing_yards_game {
                        report.warn(format!("Unusual rushing average in {}", describe(row)));
                    }
                }
                Category::Receiving => {
                    let targets = row.i64("targets").unwrap_or(0);
                    if targets > 0 && row.i64("receptions").unwrap_or(0) > targets {
                        report.error(format!("Receptions > targets in {}", describe(row)));
                    }
                    if per_game("receiving_yards") > t.max_receiving_yards_game {
                        report.warn(format!("Unusual receiving average in {}", describe(row)));
                    }
                }
                Category::Defensive | Category::SpecialTeams => {}
            }
        }
        report
    }

    fn check_fantasy(&self, points: &[Record]) -> ValidationReport {
        let mut report = ValidationReport::default();

        if points.is_empty() {
            report.warn("No fantasy points data provided");
            return report;
        }

        for fp in points {
            for field in ["player_id", "game_id", "total_points"] {
                if is_missing(fp, field) {
                    report.error(format!(
                        "Fantasy points missing field '{field}': {}",
                        describe(fp)
                    ));
                }
            }
            let total = fp.f64("total_points").unwrap_or(0.0);
            if total < self.thresholds.min_fantasy_points_game
                || total > self.thresholds.max_fantasy_points_game
            {
                report.warn(format!("Unusual fantasy points: {total} in {}", describe(fp)));
            }
        }

        report
    }
}

fn is_missing(record: &Record, field: &str) -> bool {
    record.get(field).is_none_or(|v| v.is_null())
}

fn has_text(record: &Record, field: &str) -> bool {
    record.str(field).is_some_and(|s| !s.trim().is_empty())
}

/// Short identification of a record for messages.
fn describe(record: &Record) -> String {
    let parts: Vec<String> = record
        .iter()
        .take(4)
        .map(|(c, v)| format!("{c}={v}"))
        .collect();
    format!("{{{}}}", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GameType, PassingStats, ReceivingStats, StatBody, StatKey};

    fn validator() -> DataValidator {
        DataValidator::new(ValidationThresholds::default(), 22)
    }

    fn key() -> StatKey {
        StatKey {
            player_id: 1,
            game_id: 1,
            season: 2023,
            week: Some(1),
        }
    }

    #[test]
    fn static_teams_are_valid() {
        let report = validator().validate_teams(&Team::static_teams());
        assert!(report.is_valid(), "{:?}", report.errors);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn short_team_list_is_an_error() {
        let mut teams = Team::static_teams();
        teams.truncate(30);
        let report = validator().validate_teams(&teams);
        assert!(!report.is_valid());
        assert!(report.errors.iter().any(|e| e.contains("Expected 32")));
        assert!(report.errors.iter().any(|e| e.contains("Missing expected team codes")));
    }

    #[test]
    fn completions_over_attempts_is_an_error() {
        let line = StatLine::new(
            key(),
            StatBody::Passing(PassingStats {
                completions: 30,
                attempts: 20,
                passing_yards: 250,
                ..Default::default()
            }),
        );
        let report = validator().validate_stats(&[line], Category::Passing);
        assert!(!report.is_valid());
    }

    #[test]
    fn big_yardage_is_only_a_warning() {
        let line = StatLine::new(
            key(),
            StatBody::Receiving(ReceivingStats {
                targets: 15,
                receptions: 12,
                receiving_yards: 400,
                ..Default::default()
            }),
        );
        let report = validator().validate_stats(&[line], Category::Receiving);
        assert!(report.is_valid());
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn missing_required_stat_field_is_an_error() {
        let record = Record::new().with("player_id", 1i64).with("game_id", 2i64);
        let report = validator().validate(&[record], RecordKind::Stats(Category::Rushing));
        assert_eq!(report.errors.len(), 2);
    }

    #[test]
    fn empty_stats_are_valid_with_warning() {
        let report = validator().validate(&[], RecordKind::Stats(Category::Defensive));
        assert!(report.is_valid());
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn games_checks() {
        let game = Game {
            nfl_game_id: "1".into(),
            season: 2023,
            week: None,
            game_date: NaiveDate::from_ymd_opt(2021, 9, 12).unwrap(),
            home_team_id: 1,
            away_team_id: 2,
            home_score: None,
            away_score: None,
            game_type: GameType::Regular,
            completed: false,
            venue_name: None,
            venue_city: None,
            venue_state: None,
        };
        let report = validator().validate_games(&[game], 2023);
        assert!(report.is_valid());
        // count range, unknown week, wrong year
        assert_eq!(report.warnings.len(), 3);
    }

    #[test]
    fn duplicate_players_warn() {
        let player = Player::stub("A", "QB", Some(1), 2023);
        let report = validator().validate_players(&[player.clone(), player]);
        assert!(report.is_valid());
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn season_totals_checks() {
        let totals = SeasonTotals {
            player_id: 1,
            season: 2023,
            team_id: Some(16),
            games_played: 2,
            games_started: 3,
            body: StatBody::Passing(PassingStats {
                completions: 40,
                attempts: 30,
                passing_yards: 1300,
                ..Default::default()
            }),
        };
        let report = validator().validate_season_totals(&[totals], Category::Passing);
        // started > played, completions > attempts
        assert_eq!(report.errors.len(), 2);
        // 650 yards a game
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn fantasy_bounds_warn() {
        let record = Record::new()
            .with("player_id", 1i64)
            .with("game_id", 1i64)
            .with("total_points", 72.5);
        let report = validator().validate(&[record], RecordKind::Fantasy);
        assert!(report.is_valid());
        assert_eq!(report.warnings.len(), 1);
    }
}
