//! Application configuration structures.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::ScoringRules;

/// Rate-limit domain key for the ESPN site API.
pub const ESPN_DOMAIN: &str = "espn_api";
/// Rate-limit domain key for Pro Football Reference.
pub const PFR_DOMAIN: &str = "pro_football_ref";

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Upstream data sources
    #[serde(default)]
    pub sources: SourcesConfig,

    /// Per-domain throttling
    #[serde(default)]
    pub rate_limits: RateLimitConfig,

    /// Fantasy scoring weights
    #[serde(default)]
    pub scoring: ScoringRules,

    /// Range checks applied by the validator
    #[serde(default)]
    pub validation: ValidationThresholds,

    /// Season scope
    #[serde(default)]
    pub season: SeasonConfig,

    /// Relational store
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Apply `NFL_DATA_ENV` overrides.
    ///
    /// Production runs scrape Pro Football Reference more slowly and allow
    /// more retries on primary fetches.
    pub fn apply_env_overrides(&mut self) {
        if std::env::var("NFL_DATA_ENV").as_deref() == Ok("production") {
            self.rate_limits
                .domains
                .insert(PFR_DOMAIN.to_string(), 5.0);
            self.rate_limits.retry_count = 5;
            log::info!("Applied production overrides (slower PFR interval, 5 retries)");
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::validation("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::validation("http.timeout_secs must be > 0"));
        }
        if self.rate_limits.max_interval_secs <= 0.0 {
            return Err(AppError::validation(
                "rate_limits.max_interval_secs must be > 0",
            ));
        }
        for (domain, interval) in &self.rate_limits.domains {
            if *interval < 0.0 || *interval > self.rate_limits.max_interval_secs {
                return Err(AppError::validation(format!(
                    "rate_limits.domains.{domain} must be within 0..=max_interval_secs"
                )));
            }
        }
        if self.season.seasons.is_empty() {
            return Err(AppError::validation("season.seasons is empty"));
        }
        if self.season.start_weekday().is_none() {
            return Err(AppError::validation(format!(
                "season.start_weekday '{}' is not a weekday",
                self.season.start_weekday
            )));
        }
        if self.season.max_week == 0 || self.season.regular_season_weeks > self.season.max_week {
            return Err(AppError::validation(
                "season.max_week must be > 0 and >= regular_season_weeks",
            ));
        }
        if self.storage.batch_size == 0 {
            return Err(AppError::validation("storage.batch_size must be > 0"));
        }
        if self.scoring.is_empty() {
            return Err(AppError::validation("No scoring rules defined"));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            sources: SourcesConfig::default(),
            rate_limits: RateLimitConfig::default(),
            scoring: ScoringRules::default(),
            validation: ValidationThresholds::default(),
            season: SeasonConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

/// HTTP client settings. Sent on every request; never negotiated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Accept header
    #[serde(default = "defaults::accept")]
    pub accept: String,

    /// Accept-Language header
    #[serde(default = "defaults::accept_language")]
    pub accept_language: String,

    /// Per-request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            accept: defaults::accept(),
            accept_language: defaults::accept_language(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Base URLs of the scrape targets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default = "defaults::espn_base_url")]
    pub espn_base_url: String,

    #[serde(default = "defaults::pfr_base_url")]
    pub pfr_base_url: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            espn_base_url: defaults::espn_base_url(),
            pfr_base_url: defaults::pfr_base_url(),
        }
    }
}

/// Throttling settings shared by every domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Backoff ceiling in seconds
    #[serde(default = "defaults::max_interval")]
    pub max_interval_secs: f64,

    /// Retries allowed on primary fetches. The limiter never enforces this.
    #[serde(default = "defaults::retry_count")]
    pub retry_count: u32,

    /// Base interval in seconds per domain key
    #[serde(default = "defaults::domain_intervals")]
    pub domains: BTreeMap<String, f64>,
}

impl RateLimitConfig {
    /// Base interval for a domain; unknown domains get one second.
    pub fn base_interval(&self, domain: &str) -> Duration {
        let secs = self.domains.get(domain).copied().unwrap_or(1.0);
        Duration::from_secs_f64(secs.max(0.0))
    }

    /// Backoff ceiling.
    pub fn max_interval(&self) -> Duration {
        Duration::from_secs_f64(self.max_interval_secs.max(0.0))
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_interval_secs: defaults::max_interval(),
            retry_count: defaults::retry_count(),
            domains: defaults::domain_intervals(),
        }
    }
}

/// Expected ranges for the advisory validator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationThresholds {
    #[serde(default = "defaults::min_games")]
    pub min_games_per_season: usize,
    #[serde(default = "defaults::max_games")]
    pub max_games_per_season: usize,
    #[serde(default = "defaults::min_players_per_team")]
    pub min_players_per_team: usize,
    #[serde(default = "defaults::max_players_per_team")]
    pub max_players_per_team: usize,
    #[serde(default = "defaults::max_passing_yards")]
    pub max_passing_yards_game: i64,
    #[serde(default = "defaults::min_rushing_yards")]
    pub min_rushing_yards_game: i64,
    #[serde(default = "defaults::max_rushing_yards")]
    pub max_rushing_yards_game: i64,
    #[serde(default = "defaults::max_receiving_yards")]
    pub max_receiving_yards_game: i64,
    #[serde(default = "defaults::min_fantasy_points")]
    pub min_fantasy_points_game: f64,
    #[serde(default = "defaults::max_fantasy_points")]
    pub max_fantasy_points_game: f64,
}

impl Default for ValidationThresholds {
    fn default() -> Self {
        Self {
            min_games_per_season: defaults::min_games(),
            max_games_per_season: defaults::max_games(),
            min_players_per_team: defaults::min_players_per_team(),
            max_players_per_team: defaults::max_players_per_team(),
            max_passing_yards_game: defaults::max_passing_yards(),
            min_rushing_yards_game: defaults::min_rushing_yards(),
            max_rushing_yards_game: defaults::max_rushing_yards(),
            max_receiving_yards_game: defaults::max_receiving_yards(),
            min_fantasy_points_game: defaults::min_fantasy_points(),
            max_fantasy_points_game: defaults::max_fantasy_points(),
        }
    }
}

/// Season scope and calendar rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonConfig {
    /// Seasons processed by default
    #[serde(default = "defaults::seasons")]
    pub seasons: Vec<i32>,

    /// Weekday the season opens on, e.g. "Thu"
    #[serde(default = "defaults::start_weekday")]
    pub start_weekday: String,

    /// Highest week number, playoffs included
    #[serde(default = "defaults::max_week")]
    pub max_week: u32,

    /// Last regular-season week
    #[serde(default = "defaults::regular_season_weeks")]
    pub regular_season_weeks: u32,
}

impl SeasonConfig {
    pub fn start_weekday(&self) -> Option<Weekday> {
        self.start_weekday.parse().ok()
    }
}

impl Default for SeasonConfig {
    fn default() -> Self {
        Self {
            seasons: defaults::seasons(),
            start_weekday: defaults::start_weekday(),
            max_week: defaults::max_week(),
            regular_season_weeks: defaults::regular_season_weeks(),
        }
    }
}

/// SQLite settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "defaults::database")]
    pub database: PathBuf,

    /// Records per bulk insert in fantasy point calculation
    #[serde(default = "defaults::batch_size")]
    pub batch_size: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: defaults::database(),
            batch_size: defaults::batch_size(),
        }
    }
}

mod defaults {
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    use super::{ESPN_DOMAIN, PFR_DOMAIN};

    // HTTP defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
         (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36"
            .into()
    }
    pub fn accept() -> String {
        "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".into()
    }
    pub fn accept_language() -> String {
        "en-US,en;q=0.5".into()
    }
    pub fn timeout() -> u64 {
        30
    }

    // Source defaults
    pub fn espn_base_url() -> String {
        "https://site.api.espn.com/apis/site/v2/sports/football/nfl".into()
    }
    pub fn pfr_base_url() -> String {
        "https://www.pro-football-reference.com".into()
    }

    // Rate limit defaults
    pub fn max_interval() -> f64 {
        60.0
    }
    pub fn retry_count() -> u32 {
        3
    }
    pub fn domain_intervals() -> BTreeMap<String, f64> {
        BTreeMap::from([
            (ESPN_DOMAIN.to_string(), 1.0),
            (PFR_DOMAIN.to_string(), 2.5),
            ("sleeper_api".to_string(), 0.5),
        ])
    }

    // Validation defaults
    pub fn min_games() -> usize {
        250
    }
    pub fn max_games() -> usize {
        285
    }
    pub fn min_players_per_team() -> usize {
        50
    }
    pub fn max_players_per_team() -> usize {
        90
    }
    pub fn max_passing_yards() -> i64 {
        600
    }
    pub fn min_rushing_yards() -> i64 {
        -20
    }
    pub fn max_rushing_yards() -> i64 {
        400
    }
    pub fn max_receiving_yards() -> i64 {
        350
    }
    pub fn min_fantasy_points() -> f64 {
        -10.0
    }
    pub fn max_fantasy_points() -> f64 {
        60.0
    }

    // Season defaults
    pub fn seasons() -> Vec<i32> {
        vec![2020, 2021, 2022, 2023]
    }
    pub fn start_weekday() -> String {
        "Thu".into()
    }
    pub fn max_week() -> u32 {
        22
    }
    pub fn regular_season_weeks() -> u32 {
        18
    }

    // Storage defaults
    pub fn database() -> PathBuf {
        PathBuf::from("data/nfl_fantasy.db")
    }
    pub fn batch_size() -> usize {
        500
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = Config::default();
        config.http.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_interval_above_ceiling() {
        let mut config = Config::default();
        config.rate_limits.domains.insert(ESPN_DOMAIN.into(), 120.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_weekday() {
        let mut config = Config::default();
        config.season.start_weekday = "Someday".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [rate_limits]
            max_interval_secs = 30.0

            [scoring]
            passing_tds = 6.0
            "#,
        )
        .unwrap();

        assert_eq!(config.rate_limits.max_interval(), Duration::from_secs(30));
        assert_eq!(
            config.rate_limits.base_interval(PFR_DOMAIN),
            Duration::from_millis(2500)
        );
        assert_eq!(config.scoring.weight("passing_tds"), 6.0);
        assert_eq!(config.scoring.weight("passing_yards"), 0.0);
        assert_eq!(config.http.timeout_secs, 30);
    }

    #[test]
    fn unknown_domain_uses_one_second() {
        let config = RateLimitConfig::default();
        assert_eq!(config.base_interval("elsewhere"), Duration::from_secs(1));
    }

    #[test]
    fn start_weekday_parses() {
        assert_eq!(SeasonConfig::default().start_weekday(), Some(Weekday::Thu));
    }
}
