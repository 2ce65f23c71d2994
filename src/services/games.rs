// src/services/games.rs

//! Season schedules from the ESPN scoreboard.
//!
//! One season is assembled from up to three kinds of fetches:
//!
//! - the regular-season scoreboard (primary, retried, failure propagates)
//! - the postseason scoreboard (sub-fetch)
//! - week-by-week scoreboards, only when the first two came up short
//!
//! Games are deduplicated by ESPN event id across all of them.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{Config, ESPN_DOMAIN, Game, GameType, SeasonConfig, canonical_team_code};
use crate::services::dedup::{Admission, Deduper};
use crate::services::fetcher::Fetcher;
use crate::services::validator::DataValidator;
use crate::services::week::{extract_week, parse_event_date};
use crate::services::{Extraction, json};
use crate::utils::url::espn_endpoint;

/// Resolves canonical team codes to stored ids.
pub trait CodeLookup {
    fn team_id(&self, code: &str) -> Option<i64>;
}

impl CodeLookup for HashMap<String, i64> {
    fn team_id(&self, code: &str) -> Option<i64> {
        self.get(code).copied()
    }
}

pub struct GameExtractor<'a> {
    fetcher: &'a mut Fetcher,
    teams: &'a dyn CodeLookup,
    base_url: String,
    rules: SeasonConfig,
    min_games: usize,
    validator: DataValidator,
}

impl<'a> GameExtractor<'a> {
    pub fn new(fetcher: &'a mut Fetcher, teams: &'a dyn CodeLookup, config: &Config) -> Self {
        Self {
            fetcher,
            teams,
            base_url: config.sources.espn_base_url.clone(),
            rules: config.season.clone(),
            min_games: config.validation.min_games_per_season,
            validator: DataValidator::from_config(config),
        }
    }

    /// All games of one season.
    pub fn extract(&mut self, season: i32) -> Result<Extraction<Game>> {
        let url = espn_endpoint(&self.base_url, "scoreboard");
        let mut extraction = Extraction::default();
        let mut dedup = Deduper::new();

        log::info!("Fetching {} regular season scoreboard", season);
        let regular = self
            .fetcher
            .get_json_with_retry(ESPN_DOMAIN, &url, &scoreboard_query(GameType::Regular, season, None))?;
        self.collect(&regular, season, GameType::Regular, &mut dedup, &mut extraction);

        match self
            .fetcher
            .get_json(ESPN_DOMAIN, &url, &scoreboard_query(GameType::Post, season, None))
        {
            Ok(post) => self.collect(&post, season, GameType::Post, &mut dedup, &mut extraction),
            Err(e) => {
                log::warn!("Postseason fetch for {} failed: {}", season, e);
                extraction.failed_fetches += 1;
            }
        }

        if extraction.records.len() < self.min_games {
            log::info!(
                "Only {} games for {}, fetching week by week",
                extraction.records.len(),
                season
            );
            self.fetch_weekly(&url, season, &mut dedup, &mut extraction);
        }

        extraction.records.sort_by(|a, b| {
            (a.game_date, &a.nfl_game_id).cmp(&(b.game_date, &b.nfl_game_id))
        });
        extraction.conflicts = dedup.conflicts();

        extraction.validation = self.validator.validate_games(&extraction.records, season);
        extraction.validation.log(&format!("Games {season}"));
        log::info!(
            "Extracted {} games for {} ({} skipped, {} duplicates)",
            extraction.records.len(),
            season,
            extraction.skipped,
            dedup.duplicates()
        );
        Ok(extraction)
    }

    fn fetch_weekly(
        &mut self,
        url: &str,
        season: i32,
        dedup: &mut Deduper<String, Game>,
        extraction: &mut Extraction<Game>,
    ) {
        for week in 1..=self.rules.max_week {
            let past_regular = week > self.rules.regular_season_weeks;
            let query = scoreboard_query(GameType::Regular, season, Some(week));
            match self.fetcher.get_json(ESPN_DOMAIN, url, &query) {
                Ok(body) => {
                    if json::array(&body, "/events").is_empty() {
                        log::debug!("No games in week {} of {}", week, season);
                        if past_regular {
                            break;
                        }
                        continue;
                    }
                    self.collect(&body, season, GameType::Regular, dedup, extraction);
                }
                Err(e) => {
                    log::warn!("Week {} of {} failed: {}", week, season, e);
                    extraction.failed_fetches += 1;
                    if past_regular {
                        break;
                    }
                }
            }
        }
    }

    fn collect(
        &self,
        body: &Value,
        season: i32,
        game_type: GameType,
        dedup: &mut Deduper<String, Game>,
        extraction: &mut Extraction<Game>,
    ) {
        for event in json::array(body, "/events") {
            let game = match parse_event(event, season, game_type, &self.rules, self.teams) {
                Ok(game) => game,
                Err(e) => {
                    log::warn!("Skipping event: {}", e);
                    extraction.skipped += 1;
                    continue;
                }
            };
            match dedup.admit(game.nfl_game_id.clone(), game.clone()) {
                Admission::New => extraction.records.push(game),
                Admission::Duplicate => {}
                Admission::Conflict => {
                    log::warn!("Conflicting copies of game {}, keeping the first", game.nfl_game_id)
                }
            }
        }
    }
}

fn scoreboard_query(game_type: GameType, season: i32, week: Option<u32>) -> Vec<(&'static str, String)> {
    let mut query = vec![
        ("seasontype", game_type.espn_season_type().to_string()),
        ("year", season.to_string()),
    ];
    if let Some(week) = week {
        query.push(("week", week.to_string()));
    }
    query
}

/// Normalize one scoreboard event.
pub fn parse_event(
    event: &Value,
    season: i32,
    default_type: GameType,
    rules: &SeasonConfig,
    teams: &dyn CodeLookup,
) -> Result<Game> {
    let id = json::req_str(event, "/id", "event")?;
    let context = format!("event {id}");
    let date_text = json::req_str(event, "/date", &context)?;
    let game_date = parse_event_date(&date_text)
        .ok_or_else(|| AppError::parse(&context, format!("bad date '{date_text}'")))?;

    let competition = json::at(event, "/competitions/0")
        .ok_or_else(|| AppError::missing(&context, "/competitions/0"))?;
    let competitors = json::array(competition, "/competitors");
    let side = |which: &str| -> Result<(i64, Option<i64>)> {
        let competitor = competitors
            .iter()
            .find(|c| json::opt_str(c, "/homeAway").as_deref() == Some(which))
            .ok_or_else(|| AppError::missing(&context, format!("{which} competitor")))?;
        let code = canonical_team_code(&json::req_str(competitor, "/team/abbreviation", &context)?);
        let team_id = teams
            .team_id(&code)
            .ok_or_else(|| AppError::parse(&context, format!("unknown team code '{code}'")))?;
        Ok((team_id, json::opt_i64(competitor, "/score")))
    };
    let (home_team_id, home_score) = side("home")?;
    let (away_team_id, away_score) = side("away")?;

    let completed = json::opt_bool(event, "/status/type/completed")
        .or_else(|| json::opt_bool(competition, "/status/type/completed"))
        .unwrap_or(false);
    let (home_score, away_score) = if completed {
        (home_score, away_score)
    } else {
        (None, None)
    };

    let game_type = match json::opt_i64(event, "/season/type") {
        Some(3) => GameType::Post,
        Some(2) => GameType::Regular,
        _ => default_type,
    };

    Ok(Game {
        nfl_game_id: id,
        season,
        week: extract_week(event, season, rules),
        game_date,
        home_team_id,
        away_team_id,
        home_score,
        away_score,
        game_type,
        completed,
        venue_name: json::opt_str(competition, "/venue/fullName"),
        venue_city: json::opt_str(competition, "/venue/address/city"),
        venue_state: json::opt_str(competition, "/venue/address/state"),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::services::fetcher::testing::{StubHttp, stub_fetcher};

    const SCOREBOARD: &str = "https://site.api.espn.com/apis/site/v2/sports/football/nfl/scoreboard";

    fn teams() -> HashMap<String, i64> {
        HashMap::from([("KC".to_string(), 1), ("DET".to_string(), 2), ("WAS".to_string(), 3)])
    }

    fn event(id: &str, date: &str, home: &str, away: &str, completed: bool) -> Value {
        json!({
            "id": id,
            "date": date,
            "week": {"number": 1},
            "status": {"type": {"completed": completed}},
            "competitions": [{
                "venue": {"fullName": "Arrowhead", "address": {"city": "Kansas City", "state": "MO"}},
                "competitors": [
                    {"homeAway": "home", "score": "20", "team": {"abbreviation": home}},
                    {"homeAway": "away", "score": "21", "team": {"abbreviation": away}}
                ]
            }]
        })
    }

    fn board(events: Vec<Value>) -> String {
        json!({ "events": events }).to_string()
    }

    fn config(min_games: usize) -> Config {
        let mut config = Config::default();
        config.validation.min_games_per_season = min_games;
        config.season.max_week = 3;
        config.season.regular_season_weeks = 2;
        config
    }

    #[test]
    fn parses_completed_and_scheduled_games() {
        let rules = SeasonConfig::default();
        let lookup = teams();
        let game = parse_event(
            &event("401", "2023-09-08T00:20Z", "KC", "DET", true),
            2023,
            GameType::Regular,
            &rules,
            &lookup,
        )
        .unwrap();
        assert_eq!(game.home_team_id, 1);
        assert_eq!((game.home_score, game.away_score), (Some(20), Some(21)));
        assert_eq!(game.week, Some(1));
        assert_eq!(game.venue_state.as_deref(), Some("MO"));

        let game = parse_event(
            &event("402", "2023-09-10T17:00Z", "WSH", "KC", false),
            2023,
            GameType::Regular,
            &rules,
            &lookup,
        )
        .unwrap();
        assert_eq!(game.home_team_id, 3);
        assert_eq!(game.home_score, None);
        assert!(!game.completed);
    }

    #[test]
    fn events_missing_required_parts_fail_alone() {
        let rules = SeasonConfig::default();
        let lookup = teams();
        let no_date = json!({"id": "1", "competitions": []});
        assert!(matches!(
            parse_event(&no_date, 2023, GameType::Regular, &rules, &lookup),
            Err(AppError::MissingField { .. })
        ));
        let unknown = event("2", "2023-09-10T17:00Z", "KC", "ZZZ", false);
        assert!(parse_event(&unknown, 2023, GameType::Regular, &rules, &lookup).is_err());
    }

    #[test]
    fn season_merges_postseason_and_skips_bad_events() {
        let stub = StubHttp::new();
        stub.route(
            &format!("{SCOREBOARD}?seasontype=2&year=2023"),
            200,
            &board(vec![
                event("1", "2023-09-08T00:20Z", "KC", "DET", true),
                event("2", "2023-09-10T17:00Z", "KC", "ZZZ", true),
            ]),
        );
        stub.route(
            &format!("{SCOREBOARD}?seasontype=3&year=2023"),
            200,
            &board(vec![
                event("1", "2023-09-08T00:20Z", "KC", "DET", true),
                event("9", "2024-02-11T23:30Z", "KC", "WSH", true),
            ]),
        );
        let (mut fetcher, _) = stub_fetcher(&stub);
        let lookup = teams();
        let config = config(1);

        let extraction = GameExtractor::new(&mut fetcher, &lookup, &config)
            .extract(2023)
            .unwrap();
        let ids: Vec<&str> = extraction.records.iter().map(|g| g.nfl_game_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "9"]);
        assert_eq!(extraction.skipped, 1);
        assert_eq!(extraction.failed_fetches, 0);
        assert_eq!(extraction.conflicts, 0);
    }

    #[test]
    fn short_season_goes_week_by_week() {
        let stub = StubHttp::new();
        stub.route(&format!("{SCOREBOARD}?seasontype=2&year=2023"), 200, &board(vec![]));
        stub.route(
            &format!("{SCOREBOARD}?seasontype=2&year=2023&week=1"),
            200,
            &board(vec![event("1", "2023-09-08T00:20Z", "KC", "DET", true)]),
        );
        // week 2 is missing (404) but the regular season continues
        stub.route(&format!("{SCOREBOARD}?seasontype=2&year=2023&week=3"), 200, &board(vec![]));
        let (mut fetcher, _) = stub_fetcher(&stub);
        let lookup = teams();
        let config = config(10);

        let extraction = GameExtractor::new(&mut fetcher, &lookup, &config)
            .extract(2023)
            .unwrap();
        assert_eq!(extraction.records.len(), 1);
        // postseason and week 2
        assert_eq!(extraction.failed_fetches, 2);
        assert!(stub.calls().iter().any(|c| c.ends_with("week=3")));
    }

    #[test]
    fn primary_failure_propagates() {
        let stub = StubHttp::new();
        let (mut fetcher, _) = stub_fetcher(&stub);
        let lookup = teams();
        let config = config(1);
        let err = GameExtractor::new(&mut fetcher, &lookup, &config)
            .extract(2023)
            .unwrap_err();
        assert_eq!(err.status_code(), Some(404));
    }
}
