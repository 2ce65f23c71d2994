// src/services/players.rs

//! Rosters from Pro Football Reference team pages.

use crate::error::Result;
use crate::models::{
    Config, NFL_TEAMS, PFR_DOMAIN, Player, Record, ValidationThresholds, normalize_position,
    pfr_team_code,
};
use crate::services::Extraction;
use crate::services::dedup::{Admission, Deduper};
use crate::services::fetcher::Fetcher;
use crate::services::games::CodeLookup;
use crate::services::table::{PLAYER_LINK_COLUMN, extract_table};
use crate::services::validator::DataValidator;
use crate::utils::url::{
    absolute, extract_pfr_player_id, parse_height_inches, parse_leading_number, pfr_roster_url,
};

const ROSTER_TABLE_ID: &str = "roster";

pub struct PlayerExtractor<'a> {
    fetcher: &'a mut Fetcher,
    teams: &'a dyn CodeLookup,
    base_url: String,
    thresholds: ValidationThresholds,
    validator: DataValidator,
}

impl<'a> PlayerExtractor<'a> {
    pub fn new(fetcher: &'a mut Fetcher, teams: &'a dyn CodeLookup, config: &Config) -> Self {
        Self {
            fetcher,
            teams,
            base_url: config.sources.pfr_base_url.clone(),
            thresholds: config.validation.clone(),
            validator: DataValidator::from_config(config),
        }
    }

    /// Every team's roster for one season.
    ///
    /// A team whose page fails is logged and skipped.
    pub fn extract(&mut self, season: i32) -> Result<Extraction<Player>> {
        let mut extraction = Extraction::default();
        let mut dedup = Deduper::new();

        for (i, team) in NFL_TEAMS.iter().enumerate() {
            crate::utils::log::step(i + 1, NFL_TEAMS.len(), &format!("{} roster {}", team.code, season));
            let roster = match self.extract_team(team.code, season) {
                Ok(roster) => roster,
                Err(e) => {
                    log::warn!("Roster for {} {} failed: {}", team.code, season, e);
                    extraction.failed_fetches += 1;
                    continue;
                }
            };

            let (min, max) = (
                self.thresholds.min_players_per_team,
                self.thresholds.max_players_per_team,
            );
            if !(min..=max).contains(&roster.len()) {
                log::warn!(
                    "{} roster has {} players, expected {}-{}",
                    team.code,
                    roster.len(),
                    min,
                    max
                );
            }

            for player in roster {
                match dedup.admit(player.natural_key(), player.clone()) {
                    Admission::New => extraction.records.push(player),
                    Admission::Duplicate => log::debug!("Duplicate player {} dropped", player.name),
                    Admission::Conflict => log::warn!(
                        "Conflicting records for {} ({}) in {}, keeping the first",
                        player.name,
                        player.position,
                        season
                    ),
                }
            }
        }
        extraction.conflicts = dedup.conflicts();

        extraction.validation = self.validator.validate_players(&extraction.records);
        extraction.validation.log(&format!("Players {season}"));
        log::info!(
            "Extracted {} players for {} ({} teams failed, {} conflicts)",
            extraction.records.len(),
            season,
            extraction.failed_fetches,
            extraction.conflicts
        );
        Ok(extraction)
    }

    /// One team's roster page.
    pub fn extract_team(&mut self, team_code: &str, season: i32) -> Result<Vec<Player>> {
        let url = pfr_roster_url(&self.base_url, &pfr_team_code(team_code), season);
        let document = self.fetcher.get_html(PFR_DOMAIN, &url)?;
        let table = extract_table(&document, Some(ROSTER_TABLE_ID))?;
        let team_id = self.teams.team_id(team_code);
        if team_id.is_none() {
            log::warn!("Team {} is not stored, players keep no team", team_code);
        }

        let players: Vec<Player> = table
            .rows
            .iter()
            .filter_map(|row| parse_roster_row(row, team_id, season, &self.base_url))
            .collect();
        log::debug!("{}: {} of {} rows kept", team_code, players.len(), table.len());
        Ok(players)
    }
}

/// Normalize one roster row. Rows without a name or position yield `None`.
pub fn parse_roster_row(
    row: &Record,
    team_id: Option<i64>,
    season: i32,
    base_url: &str,
) -> Option<Player> {
    let name = text(row, "Player")?;
    let position = normalize_position(&text(row, "Pos")?);
    if position.is_empty() {
        return None;
    }

    let mut player = Player::stub(&name, &position, team_id, season);
    player.jersey_number = row.i64("No.");
    player.age = row.i64("Age");
    player.height_inches = text(row, "Ht").and_then(|h| parse_height_inches(&h));
    player.weight_lbs = row
        .i64("Wt")
        .or_else(|| text(row, "Wt").and_then(|w| parse_leading_number(&w)));
    player.college = text(row, "College/Univ");
    player.experience = text(row, "Yrs");
    if let Some(link) = row.str(PLAYER_LINK_COLUMN) {
        player.pfr_player_id = extract_pfr_player_id(link);
        player.pfr_url = Some(absolute(base_url, link));
    }
    Some(player)
}

/// Cell rendered as trimmed text, `None` when null or blank.
fn text(row: &Record, column: &str) -> Option<String> {
    row.get(column)
        .filter(|v| !v.is_null())
        .map(|v| v.to_string().trim().to_string())
        .filter(|s| !s.is_empty())
}
