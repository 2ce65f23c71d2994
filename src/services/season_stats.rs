// src/services/season_stats.rs

//! Season totals from the Pro Football Reference leaderboards.
//!
//! One page per category under `/years/{season}/`. Column names repeat
//! inside a page (`Yds` for passing and sack yards, `TD` for interception
//! and fumble returns); the table extractor suffixes the repeats, so the
//! first occurrence is always the headline stat.

use crate::error::Result;
use crate::models::{
    Config, DefensiveStats, PFR_DOMAIN, PassingStats, Record, ReceivingStats, RushingStats,
    SeasonPage, SeasonTotals, StatBody, normalize_position, team_from_pfr_code,
};
use crate::services::Extraction;
use crate::services::dedup::{Admission, Deduper};
use crate::services::fetcher::Fetcher;
use crate::services::games::CodeLookup;
use crate::services::stats::{AthleteRef, PlayerLookup};
use crate::services::table::{PLAYER_LINK_COLUMN, extract_table};
use crate::services::validator::DataValidator;
use crate::utils::url::{extract_pfr_player_id, pfr_season_stats_url};

pub struct SeasonStatExtractor<'a> {
    fetcher: &'a mut Fetcher,
    players: &'a mut dyn PlayerLookup,
    teams: &'a dyn CodeLookup,
    base_url: String,
    validator: DataValidator,
}

/// One leaderboard row before player resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonRow {
    pub athlete: AthleteRef,
    pub games_played: i64,
    pub games_started: i64,
    pub body: StatBody,
}

impl<'a> SeasonStatExtractor<'a> {
    pub fn new(
        fetcher: &'a mut Fetcher,
        players: &'a mut dyn PlayerLookup,
        teams: &'a dyn CodeLookup,
        config: &Config,
    ) -> Self {
        Self {
            fetcher,
            players,
            teams,
            base_url: config.sources.pfr_base_url.clone(),
            validator: DataValidator::from_config(config),
        }
    }

    /// Every leaderboard of one season. A page that fails is logged and
    /// skipped; the other categories still load.
    pub fn extract(&mut self, season: i32) -> Extraction<SeasonTotals> {
        let mut extraction = Extraction::default();
        let mut dedup = Deduper::new();

        for (i, page) in SeasonPage::ALL.iter().enumerate() {
            crate::utils::log::step(
                i + 1,
                SeasonPage::ALL.len(),
                &format!("{} leaders {}", page.slug(), season),
            );
            let totals = match self.extract_page(*page, season) {
                Ok(totals) => totals,
                Err(e) => {
                    log::warn!("{} leaderboard {} failed: {}", page.slug(), season, e);
                    extraction.failed_fetches += 1;
                    continue;
                }
            };
            extraction.skipped += totals.skipped;
            for row in totals.records {
                match dedup.admit(row.identity(), row.clone()) {
                    Admission::New => extraction.records.push(row),
                    Admission::Duplicate => {}
                    Admission::Conflict => log::warn!(
                        "Conflicting {} totals for player {} in {}, keeping the first",
                        row.category(),
                        row.player_id,
                        season
                    ),
                }
            }
        }
        extraction.conflicts = dedup.conflicts();

        for page in SeasonPage::ALL {
            let category = page.category();
            if extraction.records.iter().any(|t| t.category() == category) {
                let report = self
                    .validator
                    .validate_season_totals(&extraction.records, category);
                report.log(&format!("{category} totals {season}"));
                extraction.validation.merge(report);
            }
        }
        log::info!(
            "Extracted {} season totals for {} ({} pages failed, {} rows skipped)",
            extraction.records.len(),
            season,
            extraction.failed_fetches,
            extraction.skipped
        );
        extraction
    }

    /// One leaderboard page, players resolved.
    pub fn extract_page(&mut self, page: SeasonPage, season: i32) -> Result<Extraction<SeasonTotals>> {
        let url = pfr_season_stats_url(&self.base_url, season, page.slug());
        let document = self.fetcher.get_html(PFR_DOMAIN, &url)?;
        let table = extract_table(&document, Some(page.slug()))?;

        let mut extraction = Extraction::default();
        for row in &table.rows {
            let Some(parsed) = parse_season_row(row, page) else {
                extraction.skipped += 1;
                continue;
            };
            let Some(player_id) = self.players.player_id(&parsed.athlete, season) else {
                log::debug!("No player for {} on the {} page", parsed.athlete.name, page.slug());
                extraction.skipped += 1;
                continue;
            };
            let team_id = parsed
                .athlete
                .team_code
                .as_deref()
                .and_then(|code| self.teams.team_id(code));
            extraction.records.push(SeasonTotals {
                player_id,
                season,
                team_id,
                games_played: parsed.games_played,
                games_started: parsed.games_started,
                body: parsed.body,
            });
        }
        log::debug!(
            "{} {}: {} of {} rows kept",
            page.slug(),
            season,
            extraction.records.len(),
            table.len()
        );
        Ok(extraction)
    }
}

/// Normalize one leaderboard row.
///
/// Rows without a player link are league-total and repeated-header rows
/// and yield `None`.
pub fn parse_season_row(row: &Record, page: SeasonPage) -> Option<SeasonRow> {
    let pfr_id = extract_pfr_player_id(row.str(PLAYER_LINK_COLUMN)?)?;
    let name = row
        .str("Player")?
        .trim()
        .trim_end_matches(['*', '+'])
        .trim()
        .to_string();
    if name.is_empty() {
        return None;
    }
    let position = row
        .str("Pos")
        .map(normalize_position)
        .filter(|p| !p.is_empty())
        .or_else(|| page.default_position().map(str::to_string))
        .unwrap_or_default();
    let team_code = row
        .str("Team")
        .or_else(|| row.str("Tm"))
        .and_then(team_from_pfr_code)
        .map(str::to_string);

    let int = |column: &str| number(row, column).map(|n| n as i64).unwrap_or(0);
    let body = match page {
        SeasonPage::Passing => StatBody::Passing(PassingStats {
            completions: int("Cmp"),
            attempts: int("Att"),
            passing_yards: int("Yds"),
            passing_tds: int("TD"),
            interceptions: int("Int"),
            sacks: int("Sk"),
            ..Default::default()
        }),
        SeasonPage::Rushing => StatBody::Rushing(RushingStats {
            attempts: int("Att"),
            rushing_yards: int("Yds"),
            rushing_tds: int("TD"),
            fumbles: int("Fmb"),
            ..Default::default()
        }),
        SeasonPage::Receiving => StatBody::Receiving(ReceivingStats {
            targets: int("Tgt"),
            receptions: int("Rec"),
            receiving_yards: int("Yds"),
            receiving_tds: int("TD"),
            fumbles: int("Fmb"),
            ..Default::default()
        }),
        // Older pages label the return scores TD and TD_2, newer ones IntTD and FRTD
        SeasonPage::Defense => StatBody::Defensive(DefensiveStats {
            interceptions: int("Int"),
            defensive_tds: first_int(row, &["IntTD", "TD"]) + first_int(row, &["FRTD", "TD_2"]),
            passes_defended: int("PD"),
            fumbles_forced: int("FF"),
            fumbles_recovered: int("FR"),
            sacks: number(row, "Sk").unwrap_or(0.0),
            tackles_total: int("Comb"),
            tackles_solo: int("Solo"),
            tackles_assisted: int("Ast"),
            safeties: int("Sfty"),
            ..Default::default()
        }),
    };

    Some(SeasonRow {
        athlete: AthleteRef {
            espn_id: None,
            pfr_id: Some(pfr_id),
            name,
            position,
            team_code,
        },
        games_played: int("G"),
        games_started: int("GS"),
        body,
    })
}

/// Numeric cell; thousands separators are dropped.
fn number(row: &Record, column: &str) -> Option<f64> {
    let value = row.get(column)?;
    value
        .as_f64()
        .or_else(|| value.as_str()?.replace(',', "").trim().parse().ok())
}

fn first_int(row: &Record, columns: &[&str]) -> i64 {
    columns
        .iter()
        .find_map(|c| number(row, c))
        .map(|n| n as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::models::Category;
    use crate::services::fetcher::testing::{StubHttp, stub_fetcher};
    use crate::services::table::extract_table_str;

    const PFR: &str = "https://www.pro-football-reference.com";

    fn page(id: &str, head: &str, rows: &str) -> String {
        format!(
            r#"<html><body><table id="{id}"><thead><tr>{head}</tr></thead>
            <tbody>{rows}</tbody></table></body></html>"#
        )
    }

    const DEFENSE_HEAD: &str = "<th>Rk</th><th>Player</th><th>Age</th><th>Tm</th><th>Pos</th>\
        <th>G</th><th>GS</th><th>Int</th><th>Yds</th><th>TD</th><th>Lng</th><th>PD</th>\
        <th>FF</th><th>Fmb</th><th>FR</th><th>Yds</th><th>TD</th><th>Sk</th><th>Comb</th>\
        <th>Solo</th><th>Ast</th><th>Sfty</th>";

    const WATT: &str = r#"<tr><th>1</th><td><a href="/players/W/WattT.00.htm">T.J. Watt</a>*+</td>
        <td>29</td><td>PIT</td><td>OLB</td><td>17</td><td>17</td><td>1</td><td>12</td><td>1</td>
        <td>12</td><td>8</td><td>4</td><td>0</td><td>3</td><td>0</td><td>1</td><td>19.0</td>
        <td>68</td><td>51</td><td>17</td><td>0</td></tr>"#;

    const MOVED: &str = r#"<tr><th>2</th><td><a href="/players/S/SmitZa00.htm">Za'Darius Smith</a></td>
        <td>31</td><td>2TM</td><td>DE</td><td>17</td><td>16</td><td>0</td><td>0</td><td>0</td>
        <td>0</td><td>1</td><td>2</td><td>0</td><td>0</td><td>0</td><td>0</td><td>5.5</td>
        <td>41</td><td>27</td><td>14</td><td>0</td></tr>"#;

    const LEAGUE: &str = "<tr><th></th><td>League Average</td><td></td><td></td><td></td>\
        <td>10</td><td>5</td></tr>";

    fn athletes() -> HashMap<String, i64> {
        HashMap::from([
            ("T.J. Watt".to_string(), 7i64),
            ("Za'Darius Smith".to_string(), 8),
            ("Patrick Mahomes".to_string(), 1),
        ])
    }

    #[test]
    fn defense_rows_split_repeated_columns() {
        let html = page("defense", DEFENSE_HEAD, WATT);
        let table = extract_table_str(&html, Some("defense")).unwrap();
        let row = parse_season_row(&table.rows[0], SeasonPage::Defense).unwrap();

        assert_eq!(row.athlete.name, "T.J. Watt");
        assert_eq!(row.athlete.pfr_id.as_deref(), Some("WattT.00"));
        assert_eq!(row.athlete.team_code.as_deref(), Some("PIT"));
        assert_eq!(row.athlete.position, "LB");
        assert_eq!((row.games_played, row.games_started), (17, 17));
        let StatBody::Defensive(d) = row.body else {
            panic!("expected a defensive body");
        };
        assert_eq!(d.sacks, 19.0);
        assert_eq!(d.interceptions, 1);
        // interception return TD plus fumble return TD
        assert_eq!(d.defensive_tds, 2);
        assert_eq!(d.fumbles_forced, 4);
        assert_eq!(d.tackles_total, 68);
    }

    #[test]
    fn passing_rows_keep_headline_yards_and_fall_back_on_position() {
        let head = "<th>Rk</th><th>Player</th><th>Team</th><th>Pos</th><th>G</th><th>GS</th>\
            <th>Cmp</th><th>Att</th><th>Yds</th><th>TD</th><th>Int</th><th>Sk</th><th>Yds</th>";
        let row = r#"<tr><th>1</th><td><a href="/players/M/MahoPa00.htm">Patrick Mahomes</a></td>
            <td>KAN</td><td></td><td>16</td><td>16</td><td>401</td><td>597</td><td>4,183</td>
            <td>27</td><td>14</td><td>27</td><td>-181</td></tr>"#;
        let table = extract_table_str(&page("passing", head, row), Some("passing")).unwrap();
        let parsed = parse_season_row(&table.rows[0], SeasonPage::Passing).unwrap();

        assert_eq!(parsed.athlete.position, "QB");
        assert_eq!(parsed.athlete.team_code.as_deref(), Some("KC"));
        let StatBody::Passing(p) = parsed.body else {
            panic!("expected a passing body");
        };
        assert_eq!(p.passing_yards, 4183);
        assert_eq!(p.completions, 401);
        assert_eq!(p.sacks, 27);
    }

    #[test]
    fn rows_without_a_player_link_are_skipped() {
        let html = page("defense", DEFENSE_HEAD, LEAGUE);
        let table = extract_table_str(&html, Some("defense")).unwrap();
        assert!(parse_season_row(&table.rows[0], SeasonPage::Defense).is_none());
    }

    #[test]
    fn failed_pages_are_skipped() {
        let stub = StubHttp::new();
        let rows = format!("{WATT}{MOVED}{LEAGUE}");
        stub.route(
            &format!("{PFR}/years/2023/defense.htm"),
            200,
            &page("defense", DEFENSE_HEAD, &rows),
        );
        let (mut fetcher, _) = stub_fetcher(&stub);
        let mut players = athletes();
        let teams = HashMap::from([("PIT".to_string(), 25i64)]);
        let config = Config::default();

        let extraction = SeasonStatExtractor::new(&mut fetcher, &mut players, &teams, &config).extract(2023);

        assert_eq!(extraction.failed_fetches, 3);
        assert_eq!(extraction.records.len(), 2);
        assert_eq!(extraction.skipped, 1);
        let watt = &extraction.records[0];
        assert_eq!(watt.player_id, 7);
        assert_eq!(watt.team_id, Some(25));
        assert_eq!(watt.category(), Category::Defensive);
        // two teams in one season
        assert_eq!(extraction.records[1].team_id, None);
        assert_eq!(stub.calls().len(), 4);
    }

    #[test]
    fn unknown_players_are_skipped() {
        let stub = StubHttp::new();
        stub.route(
            &format!("{PFR}/years/2023/defense.htm"),
            200,
            &page("defense", DEFENSE_HEAD, WATT),
        );
        let (mut fetcher, _) = stub_fetcher(&stub);
        let mut players: HashMap<String, i64> = HashMap::new();
        let teams: HashMap<String, i64> = HashMap::new();
        let config = Config::default();

        let extraction = SeasonStatExtractor::new(&mut fetcher, &mut players, &teams, &config)
            .extract_page(SeasonPage::Defense, 2023)
            .unwrap();
        assert!(extraction.records.is_empty());
        assert_eq!(extraction.skipped, 1);
    }
}
