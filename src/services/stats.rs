// src/services/stats.rs

//! Per-game player statistics from ESPN boxscores.
//!
//! A boxscore lists, per team, one block per stat category. Each block has
//! column `labels` and one `stats` array of strings per athlete. Blocks are
//! folded into one accumulator per athlete, then emitted as typed
//! [`StatLine`]s:
//!
//! - `interceptions` merge into the defensive line
//! - `fumbles` attach to the rushing line, else the receiving line
//! - `kickReturns` and `puntReturns` become the special-teams line

use std::collections::HashMap;

use serde_json::Value;

use crate::error::Result;
use crate::models::{
    Category, Config, DefensiveStats, ESPN_DOMAIN, PassingStats, ReceivingStats, ReturnStats,
    RushingStats, StatBody, StatKey, StatLine, canonical_team_code,
};
use crate::services::dedup::{Admission, Deduper};
use crate::services::fetcher::Fetcher;
use crate::services::validator::{DataValidator, ValidationReport};
use crate::services::{Extraction, json};
use crate::utils::url::espn_endpoint;

/// A game whose boxscore should be read.
#[derive(Debug, Clone, PartialEq)]
pub struct GameRef {
    /// Stored id
    pub game_id: i64,
    /// ESPN event id
    pub espn_id: String,
    pub season: i32,
    pub week: Option<u32>,
}

/// Athlete as named by a stats source: a boxscore or a leaderboard row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AthleteRef {
    pub espn_id: Option<String>,
    /// Pro Football Reference id, e.g. `MahoPa00`
    pub pfr_id: Option<String>,
    pub name: String,
    pub position: String,
    pub team_code: Option<String>,
}

/// Resolves boxscore athletes to stored player ids.
pub trait PlayerLookup {
    fn player_id(&mut self, athlete: &AthleteRef, season: i32) -> Option<i64>;
}

impl PlayerLookup for HashMap<String, i64> {
    fn player_id(&mut self, athlete: &AthleteRef, _season: i32) -> Option<i64> {
        self.get(&athlete.name).copied()
    }
}

pub struct StatExtractor<'a> {
    fetcher: &'a mut Fetcher,
    players: &'a mut dyn PlayerLookup,
    base_url: String,
    validator: DataValidator,
}

impl<'a> StatExtractor<'a> {
    pub fn new(
        fetcher: &'a mut Fetcher,
        players: &'a mut dyn PlayerLookup,
        config: &Config,
    ) -> Self {
        Self {
            fetcher,
            players,
            base_url: config.sources.espn_base_url.clone(),
            validator: DataValidator::from_config(config),
        }
    }

    /// Stat lines of many games. A failed game is logged and skipped.
    pub fn extract_season(&mut self, games: &[GameRef]) -> Extraction<StatLine> {
        let mut extraction = Extraction::default();
        let mut dedup = Deduper::new();

        for (i, game) in games.iter().enumerate() {
            if (i + 1) % 25 == 0 {
                log::info!("Processed {}/{} games", i + 1, games.len());
            }
            let lines = match self.extract_game(game) {
                Ok(lines) => lines,
                Err(e) => {
                    log::warn!("Boxscore for game {} failed: {}", game.espn_id, e);
                    extraction.failed_fetches += 1;
                    continue;
                }
            };
            extraction.skipped += lines.skipped;
            for line in lines.records {
                match dedup.admit(line.identity(), line.clone()) {
                    Admission::New => extraction.records.push(line),
                    Admission::Duplicate => {}
                    Admission::Conflict => log::warn!(
                        "Conflicting {} lines for player {} in game {}, keeping the first",
                        line.category(),
                        line.key.player_id,
                        line.key.game_id
                    ),
                }
            }
        }
        extraction.conflicts = dedup.conflicts();
        extraction.validation = self.validate(&extraction.records);
        log::info!(
            "Extracted {} stat lines from {} games ({} failed)",
            extraction.records.len(),
            games.len(),
            extraction.failed_fetches
        );
        extraction
    }

    /// Stat lines of one game. A failed fetch propagates.
    pub fn extract_game(&mut self, game: &GameRef) -> Result<Extraction<StatLine>> {
        let url = espn_endpoint(&self.base_url, "summary");
        let body = self
            .fetcher
            .get_json(ESPN_DOMAIN, &url, &[("event", game.espn_id.clone())])?;

        let mut extraction = Extraction::default();
        let mut dedup = Deduper::new();
        for acc in parse_boxscore(&body) {
            let Some(player_id) = self.players.player_id(&acc.athlete, game.season) else {
                log::debug!("No player for {} ({})", acc.athlete.name, acc.athlete.position);
                extraction.skipped += 1;
                continue;
            };
            let key = StatKey {
                player_id,
                game_id: game.game_id,
                season: game.season,
                week: game.week,
            };
            for body in acc.into_bodies() {
                let line = StatLine::new(key, body);
                if dedup.admit(line.identity(), line.clone()) == Admission::New {
                    extraction.records.push(line);
                }
            }
        }
        extraction.conflicts = dedup.conflicts();
        Ok(extraction)
    }

    fn validate(&self, lines: &[StatLine]) -> ValidationReport {
        let mut report = ValidationReport::default();
        for category in [Category::Passing, Category::Rushing, Category::Receiving] {
            let part = self.validator.validate_stats(lines, category);
            part.log(&format!("{category} stats"));
            report.merge(part);
        }
        report
    }
}

/// Everything one athlete recorded in one boxscore.
#[derive(Debug, Default)]
pub struct Accumulator {
    pub athlete: AthleteRef,
    passing: Option<PassingStats>,
    rushing: Option<RushingStats>,
    receiving: Option<ReceivingStats>,
    defensive: Option<DefensiveStats>,
    returns: Option<ReturnStats>,
    fumbles: Option<(i64, i64)>,
}

impl Accumulator {
    /// Typed bodies with fumbles attached to exactly one line.
    pub fn into_bodies(mut self) -> Vec<StatBody> {
        if let Some((fumbles, lost)) = self.fumbles.take() {
            if let Some(rushing) = self.rushing.as_mut() {
                rushing.fumbles = fumbles;
                rushing.fumbles_lost = lost;
            } else if let Some(receiving) = self.receiving.as_mut() {
                receiving.fumbles = fumbles;
                receiving.fumbles_lost = lost;
            } else {
                log::debug!("Fumbles for {} have no offensive line", self.athlete.name);
            }
        }

        let mut bodies = Vec::new();
        bodies.extend(self.passing.map(StatBody::Passing));
        bodies.extend(self.rushing.map(StatBody::Rushing));
        bodies.extend(self.receiving.map(StatBody::Receiving));
        bodies.extend(self.defensive.map(StatBody::Defensive));
        bodies.extend(self.returns.map(StatBody::SpecialTeams));
        bodies
    }
}

/// Fold a summary document into per-athlete accumulators, in boxscore order.
pub fn parse_boxscore(summary: &Value) -> Vec<Accumulator> {
    let mut groups = json::array(summary, "/boxscore/players");
    if groups.is_empty() {
        groups = json::array(summary, "/boxscore/teams");
    }

    let mut order: Vec<Accumulator> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for group in groups {
        let team_code = json::opt_str(group, "/team/abbreviation").map(|c| canonical_team_code(&c));
        for block in json::array(group, "/statistics") {
            let Some(name) = json::opt_str(block, "/name") else {
                continue;
            };
            let labels: Vec<String> = json::array(block, "/labels")
                .iter()
                .filter_map(Value::as_str)
                .map(|l| l.trim().to_uppercase())
                .collect();

            for entry in json::array(block, "/athletes") {
                let Some(athlete) = parse_athlete(entry, team_code.clone()) else {
                    continue;
                };
                let cells = read_cells(entry, &labels);
                let key = athlete.espn_id.clone().unwrap_or_else(|| athlete.name.clone());
                let slot = *index.entry(key).or_insert_with(|| {
                    order.push(Accumulator {
                        athlete,
                        ..Default::default()
                    });
                    order.len() - 1
                });
                apply_block(&mut order[slot], &name, &cells);
            }
        }
    }
    order
}

fn parse_athlete(entry: &Value, team_code: Option<String>) -> Option<AthleteRef> {
    let name = json::opt_str(entry, "/athlete/displayName")?;
    Some(AthleteRef {
        espn_id: json::opt_str(entry, "/athlete/id"),
        pfr_id: None,
        name,
        position: json::opt_str(entry, "/athlete/position/abbreviation").unwrap_or_default(),
        team_code,
    })
}

/// Label → cell text. Without labels, `KEY-VALUE` strings are split.
fn read_cells(entry: &Value, labels: &[String]) -> HashMap<String, String> {
    let stats: Vec<&str> = json::array(entry, "/stats")
        .iter()
        .filter_map(Value::as_str)
        .collect();
    if labels.is_empty() {
        stats
            .iter()
            .filter_map(|s| s.split_once('-'))
            .map(|(k, v)| (k.trim().to_uppercase(), v.trim().to_string()))
            .collect()
    } else {
        labels
            .iter()
            .zip(stats)
            .map(|(l, s)| (l.clone(), s.trim().to_string()))
            .collect()
    }
}

fn apply_block(acc: &mut Accumulator, block: &str, cells: &HashMap<String, String>) {
    let int = |label: &str| cells.get(label).map(|c| parse_int(c)).unwrap_or(0);
    match block {
        "passing" => {
            let (completions, attempts) = cells
                .get("C/ATT")
                .and_then(|c| c.split_once('/'))
                .map(|(c, a)| (parse_int(c), parse_int(a)))
                .unwrap_or((0, 0));
            acc.passing = Some(PassingStats {
                completions,
                attempts,
                passing_yards: int("YDS"),
                passing_tds: int("TD"),
                interceptions: int("INT"),
                sacks: cells
                    .get("SACKS")
                    .map(|s| parse_int(s.split('-').next().unwrap_or_default()))
                    .unwrap_or(0),
                two_point_conversions: 0,
            });
        }
        "rushing" => {
            acc.rushing = Some(RushingStats {
                attempts: int("CAR"),
                rushing_yards: int("YDS"),
                rushing_tds: int("TD"),
                ..Default::default()
            });
        }
        "receiving" => {
            acc.receiving = Some(ReceivingStats {
                targets: int("TGTS"),
                receptions: int("REC"),
                receiving_yards: int("YDS"),
                receiving_tds: int("TD"),
                ..Default::default()
            });
        }
        "fumbles" => acc.fumbles = Some((int("FUM"), int("LOST"))),
        "defensive" => {
            let defensive = acc.defensive.get_or_insert_with(Default::default);
            defensive.tackles_total = int("TOT");
            defensive.tackles_solo = int("SOLO");
            defensive.tackles_assisted = (defensive.tackles_total - defensive.tackles_solo).max(0);
            defensive.sacks = cells.get("SACKS").map(|s| parse_float(s)).unwrap_or(0.0);
            defensive.passes_defended = int("PD");
            // A pick-six shows in both blocks
            defensive.defensive_tds = defensive.defensive_tds.max(int("TD"));
        }
        "interceptions" => {
            let defensive = acc.defensive.get_or_insert_with(Default::default);
            defensive.interceptions = int("INT");
            defensive.defensive_tds = defensive.defensive_tds.max(int("TD"));
        }
        "kickReturns" => {
            let returns = acc.returns.get_or_insert_with(Default::default);
            returns.kick_returns = int("NO");
            returns.kick_return_yards = int("YDS");
            returns.kick_return_tds = int("TD");
        }
        "puntReturns" => {
            let returns = acc.returns.get_or_insert_with(Default::default);
            returns.punt_returns = int("NO");
            returns.punt_return_yards = int("YDS");
            returns.punt_return_tds = int("TD");
        }
        other => log::trace!("Ignoring stat block '{}'", other),
    }
}

/// Integer cell; `--`, blanks and garbage count as zero.
fn parse_int(text: &str) -> i64 {
    let text = text.trim();
    text.parse::<i64>()
        .ok()
        .or_else(|| text.parse::<f64>().ok().map(|f| f as i64))
        .unwrap_or(0)
}

fn parse_float(text: &str) -> f64 {
    text.trim().parse().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::services::fetcher::testing::{StubHttp, stub_fetcher};

    const SUMMARY: &str = "https://site.api.espn.com/apis/site/v2/sports/football/nfl/summary";

    fn athlete(id: &str, name: &str, pos: &str, stats: &[&str]) -> Value {
        json!({
            "athlete": {"id": id, "displayName": name, "position": {"abbreviation": pos}},
            "stats": stats
        })
    }

    fn summary() -> Value {
        json!({"boxscore": {"players": [
            {"team": {"abbreviation": "KC"}, "statistics": [
                {"name": "passing", "labels": ["C/ATT", "YDS", "AVG", "TD", "INT", "SACKS", "QBR", "RTG"],
                 "athletes": [athlete("1", "Patrick Mahomes", "QB", &["21/30", "262", "8.7", "2", "1", "3-21", "70.1", "101.5"])]},
                {"name": "rushing", "labels": ["CAR", "YDS", "AVG", "TD", "LONG"],
                 "athletes": [
                    athlete("1", "Patrick Mahomes", "QB", &["4", "18", "4.5", "0", "9"]),
                    athlete("2", "Isiah Pacheco", "RB", &["15", "62", "4.1", "1", "12"])
                 ]},
                {"name": "receiving", "labels": ["REC", "YDS", "AVG", "TD", "LONG", "TGTS"],
                 "athletes": [
                    athlete("3", "Travis Kelce", "TE", &["9", "81", "9.0", "1", "22", "11"]),
                    athlete("2", "Isiah Pacheco", "RB", &["2", "11", "5.5", "0", "7", "3"])
                 ]},
                {"name": "fumbles", "labels": ["FUM", "LOST", "REC"],
                 "athletes": [
                    athlete("2", "Isiah Pacheco", "RB", &["1", "1", "0"]),
                    athlete("3", "Travis Kelce", "TE", &["1", "0", "0"])
                 ]}
            ]},
            {"team": {"abbreviation": "WSH"}, "statistics": [
                {"name": "defensive", "labels": ["TOT", "SOLO", "SACKS", "TFL", "PD", "QB HTS", "TD"],
                 "athletes": [athlete("4", "Jamin Davis", "LB", &["8", "5", "1.5", "1", "1", "2", "0"])]},
                {"name": "interceptions", "labels": ["INT", "YDS", "TD"],
                 "athletes": [athlete("4", "Jamin Davis", "LB", &["1", "35", "1"])]},
                {"name": "kickReturns",
                 "athletes": [athlete("5", "Unknown Returner", "WR", &["NO-2", "YDS-48", "TD-0"])]}
            ]}
        ]}})
    }

    fn lookup() -> HashMap<String, i64> {
        HashMap::from([
            ("Patrick Mahomes".to_string(), 10),
            ("Isiah Pacheco".to_string(), 11),
            ("Travis Kelce".to_string(), 12),
            ("Jamin Davis".to_string(), 13),
        ])
    }

    fn game() -> GameRef {
        GameRef {
            game_id: 100,
            espn_id: "401547403".into(),
            season: 2023,
            week: Some(1),
        }
    }

    #[test]
    fn boxscore_folds_per_athlete() {
        let accs = parse_boxscore(&summary());
        assert_eq!(accs.len(), 5);
        assert_eq!(accs[0].athlete.name, "Patrick Mahomes");
        assert_eq!(accs[3].athlete.team_code.as_deref(), Some("WAS"));

        let bodies = parse_boxscore(&summary()).remove(0).into_bodies();
        let StatBody::Passing(passing) = &bodies[0] else {
            panic!("expected passing first");
        };
        assert_eq!((passing.completions, passing.attempts), (21, 30));
        assert_eq!(passing.sacks, 3);
        assert_eq!(passing.interceptions, 1);
        assert!(matches!(bodies[1], StatBody::Rushing(_)));
    }

    #[test]
    fn fumbles_attach_to_one_line() {
        let mut accs = parse_boxscore(&summary());
        let kelce = accs.remove(2).into_bodies();
        let pacheco = accs.remove(1).into_bodies();

        let lost: Vec<i64> = pacheco
            .iter()
            .map(|b| match b {
                StatBody::Rushing(r) => r.fumbles_lost,
                StatBody::Receiving(r) => r.fumbles_lost,
                _ => 0,
            })
            .collect();
        assert_eq!(lost, vec![1, 0]);

        let StatBody::Receiving(receiving) = &kelce[0] else {
            panic!("expected receiving");
        };
        assert_eq!((receiving.fumbles, receiving.fumbles_lost), (1, 0));
        assert_eq!(receiving.targets, 11);
    }

    #[test]
    fn interceptions_merge_into_defense() {
        let accs = parse_boxscore(&summary());
        let bodies = accs.into_iter().nth(3).unwrap().into_bodies();
        assert_eq!(bodies.len(), 1);
        let StatBody::Defensive(d) = &bodies[0] else {
            panic!("expected defensive");
        };
        assert_eq!((d.tackles_total, d.tackles_solo, d.tackles_assisted), (8, 5, 3));
        assert_eq!(d.sacks, 1.5);
        assert_eq!(d.interceptions, 1);
        assert_eq!(d.defensive_tds, 1);
    }

    #[test]
    fn pick_six_counts_once() {
        fn block(name: &str, labels: &[&str], stats: &[&str]) -> Value {
            json!({"name": name, "labels": labels, "athletes": [athlete("4", "Jamin Davis", "LB", stats)]})
        }
        fn summary_of(blocks: Vec<Value>) -> Value {
            json!({"boxscore": {"players": [
                {"team": {"abbreviation": "WSH"}, "statistics": blocks}
            ]}})
        }
        let defensive = block(
            "defensive",
            &["TOT", "SOLO", "SACKS", "TFL", "PD", "QB HTS", "TD"],
            &["3", "2", "0", "0", "1", "0", "1"],
        );
        let interceptions = block("interceptions", &["INT", "YDS", "TD"], &["1", "42", "1"]);

        for blocks in [
            vec![defensive.clone(), interceptions.clone()],
            vec![interceptions, defensive],
        ] {
            let bodies = parse_boxscore(&summary_of(blocks)).remove(0).into_bodies();
            let StatBody::Defensive(d) = &bodies[0] else {
                panic!("expected defensive");
            };
            assert_eq!(d.interceptions, 1);
            assert_eq!(d.defensive_tds, 1);
        }
    }

    #[test]
    fn unlabeled_cells_use_key_value_pairs() {
        let accs = parse_boxscore(&summary());
        let bodies = accs.into_iter().nth(4).unwrap().into_bodies();
        let StatBody::SpecialTeams(r) = &bodies[0] else {
            panic!("expected returns");
        };
        assert_eq!((r.kick_returns, r.kick_return_yards), (2, 48));
    }

    #[test]
    fn game_lines_resolve_players() {
        let stub = StubHttp::new();
        stub.route(
            &format!("{SUMMARY}?event=401547403"),
            200,
            &summary().to_string(),
        );
        let (mut fetcher, _) = stub_fetcher(&stub);
        let mut players = lookup();
        let config = Config::default();

        let extraction = StatExtractor::new(&mut fetcher, &mut players, &config)
            .extract_game(&game())
            .unwrap();
        // 2 + 2 + 1 + 1 lines, the returner is unknown
        assert_eq!(extraction.records.len(), 6);
        assert_eq!(extraction.skipped, 1);
        assert!(extraction.records.iter().all(|l| l.key.game_id == 100));
    }

    #[test]
    fn season_mode_skips_failed_games() {
        let stub = StubHttp::new();
        stub.route(
            &format!("{SUMMARY}?event=401547403"),
            200,
            &summary().to_string(),
        );
        let (mut fetcher, _) = stub_fetcher(&stub);
        let mut players = lookup();
        let config = Config::default();
        let missing = GameRef {
            game_id: 101,
            espn_id: "404".into(),
            ..game()
        };

        let extraction = StatExtractor::new(&mut fetcher, &mut players, &config)
            .extract_season(&[game(), missing, game()]);
        assert_eq!(extraction.records.len(), 6);
        assert_eq!(extraction.failed_fetches, 1);
        assert!(extraction.validation.is_valid());
    }

    #[test]
    fn cells_tolerate_noise() {
        assert_eq!(parse_int("--"), 0);
        assert_eq!(parse_int(" 12 "), 12);
        assert_eq!(parse_int("4.0"), 4);
        assert_eq!(parse_float("bad"), 0.0);
    }
}
