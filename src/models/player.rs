//! Rostered players.

use serde::{Deserialize, Serialize};

use super::Record;

/// Positions whose individual defensive stats score fantasy points.
pub const DEFENSIVE_POSITIONS: [&str; 7] = ["DT", "DE", "LB", "CB", "S", "DL", "DB"];

/// Positions the validator accepts without a warning.
pub const KNOWN_POSITIONS: [&str; 15] = [
    "QB", "RB", "WR", "TE", "K", "DEF", "DT", "DE", "LB", "CB", "S", "DL", "DB", "P", "LS",
];

pub fn is_defensive_position(position: &str) -> bool {
    DEFENSIVE_POSITIONS.contains(&position)
}

/// Collapse alternate position labels onto one canonical label.
///
/// Multi-position labels such as `DE/LB` keep their first token.
pub fn normalize_position(raw: &str) -> String {
    let upper = raw.trim().to_uppercase();
    let first = upper.split('/').next().unwrap_or_default().trim();
    match first {
        "HB" | "FB" => "RB",
        "ILB" | "OLB" | "MLB" => "LB",
        "FS" | "SS" => "S",
        "NT" => "DT",
        "OT" => "T",
        "OG" => "G",
        other => other,
    }
    .to_string()
}

/// A player as extracted from a roster page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    pub position: String,
    pub team_id: Option<i64>,
    pub jersey_number: Option<i64>,
    pub height_inches: Option<i64>,
    pub weight_lbs: Option<i64>,
    pub college: Option<String>,
    pub experience: Option<String>,
    pub pfr_player_id: Option<String>,
    pub pfr_url: Option<String>,
    pub season: i32,
    pub age: Option<i64>,
}

impl Player {
    /// Minimal player created when stats reference an unknown name.
    pub fn stub(name: &str, position: &str, team_id: Option<i64>, season: i32) -> Self {
        Self {
            name: name.to_string(),
            position: normalize_position(position),
            team_id,
            jersey_number: None,
            height_inches: None,
            weight_lbs: None,
            college: None,
            experience: None,
            pfr_player_id: None,
            pfr_url: None,
            season,
            age: None,
        }
    }

    /// Deduplication key within one extraction run.
    pub fn natural_key(&self) -> (String, String, i32) {
        (self.name.clone(), self.position.clone(), self.season)
    }

    pub fn to_record(&self) -> Record {
        Record::new()
            .with("name", self.name.as_str())
            .with("position", self.position.as_str())
            .with("team_id", self.team_id)
            .with("jersey_number", self.jersey_number)
            .with("height_inches", self.height_inches)
            .with("weight_lbs", self.weight_lbs)
            .with("college", self.college.clone())
            .with("experience", self.experience.clone())
            .with("pfr_player_id", self.pfr_player_id.clone())
            .with("pfr_url", self.pfr_url.clone())
            .with("season_extracted", self.season)
            .with("age_at_extraction", self.age)
    }
}
