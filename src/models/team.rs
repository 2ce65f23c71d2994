//! NFL teams and the static reference table.

use serde::{Deserialize, Serialize};

use super::Record;

/// Static facts about one franchise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeamInfo {
    pub code: &'static str,
    pub name: &'static str,
    pub conference: &'static str,
    pub division: &'static str,
}

const fn info(
    code: &'static str,
    name: &'static str,
    conference: &'static str,
    division: &'static str,
) -> TeamInfo {
    TeamInfo {
        code,
        name,
        conference,
        division,
    }
}

/// All 32 franchises, keyed by canonical code.
pub const NFL_TEAMS: [TeamInfo; 32] = [
    info("ARI", "Arizona Cardinals", "NFC", "West"),
    info("ATL", "Atlanta Falcons", "NFC", "South"),
    info("BAL", "Baltimore Ravens", "AFC", "North"),
    info("BUF", "Buffalo Bills", "AFC", "East"),
    info("CAR", "Carolina Panthers", "NFC", "South"),
    info("CHI", "Chicago Bears", "NFC", "North"),
    info("CIN", "Cincinnati Bengals", "AFC", "North"),
    info("CLE", "Cleveland Browns", "AFC", "North"),
    info("DAL", "Dallas Cowboys", "NFC", "East"),
    info("DEN", "Denver Broncos", "AFC", "West"),
    info("DET", "Detroit Lions", "NFC", "North"),
    info("GB", "Green Bay Packers", "NFC", "North"),
    info("HOU", "Houston Texans", "AFC", "South"),
    info("IND", "Indianapolis Colts", "AFC", "South"),
    info("JAX", "Jacksonville Jaguars", "AFC", "South"),
    info("KC", "Kansas City Chiefs", "AFC", "West"),
    info("LV", "Las Vegas Raiders", "AFC", "West"),
    info("LAC", "Los Angeles Chargers", "AFC", "West"),
    info("LAR", "Los Angeles Rams", "NFC", "West"),
    info("MIA", "Miami Dolphins", "AFC", "East"),
    info("MIN", "Minnesota Vikings", "NFC", "North"),
    info("NE", "New England Patriots", "AFC", "East"),
    info("NO", "New Orleans Saints", "NFC", "South"),
    info("NYG", "New York Giants", "NFC", "East"),
    info("NYJ", "New York Jets", "AFC", "East"),
    info("PHI", "Philadelphia Eagles", "NFC", "East"),
    info("PIT", "Pittsburgh Steelers", "AFC", "North"),
    info("SF", "San Francisco 49ers", "NFC", "West"),
    info("SEA", "Seattle Seahawks", "NFC", "West"),
    info("TB", "Tampa Bay Buccaneers", "NFC", "South"),
    info("TEN", "Tennessee Titans", "AFC", "South"),
    info("WAS", "Washington Commanders", "NFC", "East"),
];

/// Look up a canonical team code.
pub fn team_info(code: &str) -> Option<&'static TeamInfo> {
    NFL_TEAMS.iter().find(|t| t.code == code)
}

/// Map an ESPN abbreviation onto the canonical code.
pub fn canonical_team_code(espn: &str) -> String {
    let code = espn.trim().to_uppercase();
    match code.as_str() {
        "WSH" => "WAS".to_string(),
        _ => code,
    }
}

/// Team segment used in Pro Football Reference URLs.
pub fn pfr_team_code(code: &str) -> String {
    match code {
        "LV" => "rai",
        "LAR" => "ram",
        "LAC" => "sdg",
        "KC" => "kan",
        "GB" => "gnb",
        "NE" => "nwe",
        "NO" => "nor",
        "SF" => "sfo",
        "TB" => "tam",
        other => return other.to_lowercase(),
    }
    .to_string()
}

/// Canonical code for a team abbreviation on PFR leaderboards.
///
/// Leaderboards mostly use the URL segment uppercased (`KAN`, `GNB`) but keep
/// some canonical codes (`LAR`, `LAC`). Multi-team markers such as `2TM`
/// map to nothing.
pub fn team_from_pfr_code(code: &str) -> Option<&'static str> {
    let code = code.trim().to_uppercase();
    if let Some(info) = team_info(&code) {
        return Some(info.code);
    }
    if code == "LVR" {
        return Some("LV");
    }
    NFL_TEAMS
        .iter()
        .find(|t| pfr_team_code(t.code).eq_ignore_ascii_case(&code))
        .map(|t| t.code)
}

/// A team row as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub team_code: String,
    pub team_name: String,
    pub conference: String,
    pub division: String,
    pub espn_id: Option<String>,
    pub location: Option<String>,
    pub nickname: Option<String>,
    pub color: Option<String>,
    pub alternate_color: Option<String>,
    pub logo_url: Option<String>,
}

impl Team {
    /// Build a team from the reference table alone.
    pub fn from_reference(info: &TeamInfo) -> Self {
        Self {
            team_code: info.code.to_string(),
            team_name: info.name.to_string(),
            conference: info.conference.to_string(),
            division: info.division.to_string(),
            espn_id: None,
            location: None,
            nickname: None,
            color: None,
            alternate_color: None,
            logo_url: None,
        }
    }

    /// All 32 teams from the reference table.
    pub fn static_teams() -> Vec<Self> {
        NFL_TEAMS.iter().map(Self::from_reference).collect()
    }

    pub fn to_record(&self) -> Record {
        Record::new()
            .with("team_code", self.team_code.as_str())
            .with("team_name", self.team_name.as_str())
            .with("conference", self.conference.as_str())
            .with("division", self.division.as_str())
            .with("espn_id", self.espn_id.clone())
            .with("location", self.location.clone())
            .with("nickname", self.nickname.clone())
            .with("color", self.color.clone())
            .with("alternate_color", self.alternate_color.clone())
            .with("logo_url", self.logo_url.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn reference_table_is_complete() {
        let codes: HashSet<_> = NFL_TEAMS.iter().map(|t| t.code).collect();
        assert_eq!(codes.len(), 32);
        let afc = NFL_TEAMS.iter().filter(|t| t.conference == "AFC").count();
        assert_eq!(afc, 16);
    }

    #[test]
    fn espn_codes_remap() {
        assert_eq!(canonical_team_code("wsh"), "WAS");
        assert_eq!(canonical_team_code("KC"), "KC");
    }

    #[test]
    fn pfr_codes() {
        assert_eq!(pfr_team_code("KC"), "kan");
        assert_eq!(pfr_team_code("LV"), "rai");
        assert_eq!(pfr_team_code("WAS"), "was");
        assert_eq!(pfr_team_code("DAL"), "dal");
    }

    #[test]
    fn leaderboard_codes() {
        assert_eq!(team_from_pfr_code("KAN"), Some("KC"));
        assert_eq!(team_from_pfr_code("LVR"), Some("LV"));
        assert_eq!(team_from_pfr_code("LAR"), Some("LAR"));
        assert_eq!(team_from_pfr_code("sfo"), Some("SF"));
        assert_eq!(team_from_pfr_code("2TM"), None);
    }

    #[test]
    fn static_team_record() {
        let teams = Team::static_teams();
        assert_eq!(teams.len(), 32);
        let record = teams[0].to_record();
        assert_eq!(record.str("team_code"), Some("ARI"));
        assert!(record.get("logo_url").is_some_and(|v| v.is_null()));
    }
}
