// src/storage/schema.rs

//! SQLite schema for the fantasy database.
//!
//! Tables:
//! - teams: the 32 franchises
//! - players: one row per (name, position, season)
//! - games: one row per ESPN event
//! - passing_stats / rushing_stats / receiving_stats / defensive_stats /
//!   return_stats: one row per (player, game)
//! - fantasy_points: one row per (player, game)
//! - season_stats: leaderboard totals, one row per (player, season, category)
//!
//! Applied only by the explicit `init` command. Extractors never issue DDL.

use rusqlite::Connection;

use crate::error::Result;

/// Tables in dependency order.
pub const TABLES: [&str; 11] = [
    "teams",
    "players",
    "games",
    "passing_stats",
    "rushing_stats",
    "receiving_stats",
    "defensive_stats",
    "return_stats",
    "fantasy_points",
    "season_stats",
    "data_quality_log",
];

const DDL: &str = r#"
CREATE TABLE IF NOT EXISTS teams (
    team_id INTEGER PRIMARY KEY AUTOINCREMENT,
    team_code TEXT NOT NULL UNIQUE,
    team_name TEXT NOT NULL,
    conference TEXT NOT NULL CHECK (conference IN ('AFC', 'NFC')),
    division TEXT NOT NULL,
    espn_id TEXT,
    location TEXT,
    nickname TEXT,
    color TEXT,
    alternate_color TEXT,
    logo_url TEXT,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS players (
    player_id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    position TEXT NOT NULL,
    team_id INTEGER REFERENCES teams(team_id),
    jersey_number INTEGER,
    height_inches INTEGER,
    weight_lbs INTEGER,
    college TEXT,
    experience TEXT,
    pfr_player_id TEXT,
    pfr_url TEXT,
    season_extracted INTEGER NOT NULL,
    age_at_extraction INTEGER,
    created_at TEXT DEFAULT (datetime('now')),
    UNIQUE (name, position, season_extracted)
);

CREATE TABLE IF NOT EXISTS games (
    game_id INTEGER PRIMARY KEY AUTOINCREMENT,
    nfl_game_id TEXT NOT NULL UNIQUE,
    season INTEGER NOT NULL,
    week INTEGER,
    game_date TEXT NOT NULL,
    home_team_id INTEGER NOT NULL REFERENCES teams(team_id),
    away_team_id INTEGER NOT NULL REFERENCES teams(team_id),
    home_score INTEGER,
    away_score INTEGER,
    game_type TEXT NOT NULL DEFAULT 'REG',
    completed INTEGER NOT NULL DEFAULT 0,
    venue_name TEXT,
    venue_city TEXT,
    venue_state TEXT,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS passing_stats (
    stat_id INTEGER PRIMARY KEY AUTOINCREMENT,
    player_id INTEGER NOT NULL REFERENCES players(player_id),
    game_id INTEGER NOT NULL REFERENCES games(game_id),
    season INTEGER NOT NULL,
    week INTEGER,
    completions INTEGER NOT NULL DEFAULT 0,
    attempts INTEGER NOT NULL DEFAULT 0,
    passing_yards INTEGER NOT NULL DEFAULT 0,
    passing_tds INTEGER NOT NULL DEFAULT 0,
    interceptions INTEGER NOT NULL DEFAULT 0,
    sacks INTEGER NOT NULL DEFAULT 0,
    two_point_conversions INTEGER NOT NULL DEFAULT 0,
    UNIQUE (player_id, game_id)
);

CREATE TABLE IF NOT EXISTS rushing_stats (
    stat_id INTEGER PRIMARY KEY AUTOINCREMENT,
    player_id INTEGER NOT NULL REFERENCES players(player_id),
    game_id INTEGER NOT NULL REFERENCES games(game_id),
    season INTEGER NOT NULL,
    week INTEGER,
    attempts INTEGER NOT NULL DEFAULT 0,
    rushing_yards INTEGER NOT NULL DEFAULT 0,
    rushing_tds INTEGER NOT NULL DEFAULT 0,
    fumbles INTEGER NOT NULL DEFAULT 0,
    fumbles_lost INTEGER NOT NULL DEFAULT 0,
    two_point_conversions INTEGER NOT NULL DEFAULT 0,
    UNIQUE (player_id, game_id)
);

CREATE TABLE IF NOT EXISTS receiving_stats (
    stat_id INTEGER PRIMARY KEY AUTOINCREMENT,
    player_id INTEGER NOT NULL REFERENCES players(player_id),
    game_id INTEGER NOT NULL REFERENCES games(game_id),
    season INTEGER NOT NULL,
    week INTEGER,
    targets INTEGER NOT NULL DEFAULT 0,
    receptions INTEGER NOT NULL DEFAULT 0,
    receiving_yards INTEGER NOT NULL DEFAULT 0,
    receiving_tds INTEGER NOT NULL DEFAULT 0,
    fumbles INTEGER NOT NULL DEFAULT 0,
    fumbles_lost INTEGER NOT NULL DEFAULT 0,
    two_point_conversions INTEGER NOT NULL DEFAULT 0,
    UNIQUE (player_id, game_id)
);

CREATE TABLE IF NOT EXISTS defensive_stats (
    stat_id INTEGER PRIMARY KEY AUTOINCREMENT,
    player_id INTEGER NOT NULL REFERENCES players(player_id),
    game_id INTEGER NOT NULL REFERENCES games(game_id),
    season INTEGER NOT NULL,
    week INTEGER,
    tackles_solo INTEGER NOT NULL DEFAULT 0,
    tackles_assisted INTEGER NOT NULL DEFAULT 0,
    tackles_total INTEGER NOT NULL DEFAULT 0,
    sacks REAL NOT NULL DEFAULT 0,
    interceptions INTEGER NOT NULL DEFAULT 0,
    passes_defended INTEGER NOT NULL DEFAULT 0,
    fumbles_forced INTEGER NOT NULL DEFAULT 0,
    fumbles_recovered INTEGER NOT NULL DEFAULT 0,
    safeties INTEGER NOT NULL DEFAULT 0,
    defensive_tds INTEGER NOT NULL DEFAULT 0,
    blocked_kicks INTEGER NOT NULL DEFAULT 0,
    UNIQUE (player_id, game_id)
);

CREATE TABLE IF NOT EXISTS return_stats (
    stat_id INTEGER PRIMARY KEY AUTOINCREMENT,
    player_id INTEGER NOT NULL REFERENCES players(player_id),
    game_id INTEGER NOT NULL REFERENCES games(game_id),
    season INTEGER NOT NULL,
    week INTEGER,
    kick_returns INTEGER NOT NULL DEFAULT 0,
    kick_return_yards INTEGER NOT NULL DEFAULT 0,
    kick_return_tds INTEGER NOT NULL DEFAULT 0,
    punt_returns INTEGER NOT NULL DEFAULT 0,
    punt_return_yards INTEGER NOT NULL DEFAULT 0,
    punt_return_tds INTEGER NOT NULL DEFAULT 0,
    UNIQUE (player_id, game_id)
);

CREATE TABLE IF NOT EXISTS fantasy_points (
    fp_id INTEGER PRIMARY KEY AUTOINCREMENT,
    player_id INTEGER NOT NULL REFERENCES players(player_id),
    game_id INTEGER NOT NULL REFERENCES games(game_id),
    season INTEGER NOT NULL,
    week INTEGER,
    position TEXT,
    passing_points REAL NOT NULL DEFAULT 0,
    rushing_points REAL NOT NULL DEFAULT 0,
    receiving_points REAL NOT NULL DEFAULT 0,
    defensive_points REAL NOT NULL DEFAULT 0,
    special_teams_points REAL NOT NULL DEFAULT 0,
    total_points REAL NOT NULL DEFAULT 0,
    calculated_at TEXT DEFAULT (datetime('now')),
    UNIQUE (player_id, game_id)
);

CREATE TABLE IF NOT EXISTS season_stats (
    season_stat_id INTEGER PRIMARY KEY AUTOINCREMENT,
    player_id INTEGER NOT NULL REFERENCES players(player_id),
    season INTEGER NOT NULL,
    category TEXT NOT NULL,
    team_id INTEGER REFERENCES teams(team_id),
    games_played INTEGER NOT NULL DEFAULT 0,
    games_started INTEGER NOT NULL DEFAULT 0,
    completions INTEGER,
    attempts INTEGER,
    passing_yards INTEGER,
    passing_tds INTEGER,
    interceptions INTEGER,
    sacks REAL,
    two_point_conversions INTEGER,
    rushing_yards INTEGER,
    rushing_tds INTEGER,
    fumbles INTEGER,
    fumbles_lost INTEGER,
    targets INTEGER,
    receptions INTEGER,
    receiving_yards INTEGER,
    receiving_tds INTEGER,
    tackles_solo INTEGER,
    tackles_assisted INTEGER,
    tackles_total INTEGER,
    passes_defended INTEGER,
    fumbles_forced INTEGER,
    fumbles_recovered INTEGER,
    safeties INTEGER,
    defensive_tds INTEGER,
    blocked_kicks INTEGER,
    updated_at TEXT DEFAULT (datetime('now')),
    UNIQUE (player_id, season, category)
);

CREATE TABLE IF NOT EXISTS data_quality_log (
    log_id INTEGER PRIMARY KEY AUTOINCREMENT,
    stage TEXT NOT NULL,
    season INTEGER,
    errors INTEGER NOT NULL DEFAULT 0,
    warnings INTEGER NOT NULL DEFAULT 0,
    inserted INTEGER NOT NULL DEFAULT 0,
    updated INTEGER NOT NULL DEFAULT 0,
    skipped INTEGER NOT NULL DEFAULT 0,
    failed INTEGER NOT NULL DEFAULT 0,
    logged_at TEXT DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_players_team ON players(team_id);
CREATE INDEX IF NOT EXISTS idx_games_season_week ON games(season, week);
CREATE INDEX IF NOT EXISTS idx_passing_game ON passing_stats(game_id);
CREATE INDEX IF NOT EXISTS idx_rushing_game ON rushing_stats(game_id);
CREATE INDEX IF NOT EXISTS idx_receiving_game ON receiving_stats(game_id);
CREATE INDEX IF NOT EXISTS idx_defensive_game ON defensive_stats(game_id);
CREATE INDEX IF NOT EXISTS idx_fantasy_season ON fantasy_points(season, player_id);
CREATE INDEX IF NOT EXISTS idx_season_stats ON season_stats(season, category);
"#;

/// Create every table and index if missing.
pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(DDL)?;
    Ok(())
}
