// src/services/teams.rs

//! Team extraction from the ESPN teams endpoint.

use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{Config, ESPN_DOMAIN, Team, canonical_team_code, team_info};
use crate::services::fetcher::Fetcher;
use crate::services::json;
use crate::services::validator::DataValidator;
use crate::services::Extraction;
use crate::utils::url::espn_endpoint;

/// Extracts the 32 franchises, with the static table as safety net.
pub struct TeamExtractor<'a> {
    fetcher: &'a mut Fetcher,
    base_url: String,
    validator: DataValidator,
}

impl<'a> TeamExtractor<'a> {
    pub fn new(fetcher: &'a mut Fetcher, config: &Config) -> Self {
        Self {
            fetcher,
            base_url: config.sources.espn_base_url.clone(),
            validator: DataValidator::from_config(config),
        }
    }

    /// Fetch and normalize all teams. A failed fetch propagates.
    pub fn extract(&mut self) -> Result<Extraction<Team>> {
        let url = espn_endpoint(&self.base_url, "teams");
        log::info!("Fetching teams from {}", url);
        let body = self.fetcher.get_json_with_retry(ESPN_DOMAIN, &url, &[])?;

        let mut extraction = Extraction::default();
        for entry in json::array(&body, "/sports/0/leagues/0/teams") {
            let raw = entry.get("team").unwrap_or(entry);
            match parse_team(raw) {
                Ok(Some(team)) => {
                    if extraction.records.iter().any(|t: &Team| t.team_code == team.team_code) {
                        log::debug!("Duplicate team {} dropped", team.team_code);
                        extraction.skipped += 1;
                    } else {
                        extraction.records.push(team);
                    }
                }
                Ok(None) => extraction.skipped += 1,
                Err(e) => {
                    log::warn!("Skipping team entry: {}", e);
                    extraction.skipped += 1;
                }
            }
        }
        extraction.records.sort_by(|a, b| a.team_code.cmp(&b.team_code));

        extraction.validation = self.validator.validate_teams(&extraction.records);
        extraction.validation.log("Teams");
        log::info!("Extracted {} teams", extraction.records.len());
        Ok(extraction)
    }

    /// [`TeamExtractor::extract`], reverting to the static table when the
    /// fetch fails or the result is short of the full league.
    ///
    /// Fails only when the static table itself does not validate.
    pub fn extract_with_fallback(&mut self) -> Result<Extraction<Team>> {
        match self.extract() {
            Ok(extraction)
                if extraction.validation.is_valid()
                    || extraction.records.len() == crate::models::NFL_TEAMS.len() =>
            {
                return Ok(extraction);
            }
            Ok(extraction) => log::warn!(
                "ESPN returned {} teams that failed validation, using static data",
                extraction.records.len()
            ),
            Err(e) => log::warn!("ESPN teams fetch failed ({}), using static data", e),
        }
        self.static_fallback()
    }

    fn static_fallback(&self) -> Result<Extraction<Team>> {
        let records = Team::static_teams();
        let validation = self.validator.validate_teams(&records);
        validation.log("Static teams");
        if !validation.is_valid() {
            return Err(AppError::validation(format!(
                "static team table is invalid: {}",
                validation.errors.join("; ")
            )));
        }
        Ok(Extraction {
            records,
            validation,
            ..Default::default()
        })
    }
}

/// Normalize one ESPN team object. Unknown codes yield `None`.
pub fn parse_team(raw: &Value) -> Result<Option<Team>> {
    let abbreviation = json::req_str(raw, "/abbreviation", "team")?;
    let code = canonical_team_code(&abbreviation);
    let Some(info) = team_info(&code) else {
        log::warn!("Unknown team code '{}' ignored", abbreviation);
        return Ok(None);
    };

    let mut team = Team::from_reference(info);
    if let Some(name) = json::opt_str(raw, "/displayName") {
        team.team_name = name;
    }
    team.espn_id = json::opt_str(raw, "/id");
    team.location = json::opt_str(raw, "/location");
    team.nickname = json::opt_str(raw, "/name");
    team.color = json::opt_str(raw, "/color");
    team.alternate_color = json::opt_str(raw, "/alternateColor");
    team.logo_url = pick_logo(json::array(raw, "/logos"));
    Ok(Some(team))
}

/// The logo tagged `default`, else the first one.
fn pick_logo(logos: &[Value]) -> Option<String> {
    logos
        .iter()
        .find(|logo| {
            json::array(logo, "/rel")
                .iter()
                .any(|r| r.as_str() == Some("default"))
        })
        .or_else(|| logos.first())
        .and_then(|logo| json::opt_str(logo, "/href"))
}
