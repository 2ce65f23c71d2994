//! Scheduled and completed games.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameType {
    #[serde(rename = "REG")]
    Regular,
    #[serde(rename = "POST")]
    Post,
}

impl GameType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Regular => "REG",
            Self::Post => "POST",
        }
    }

    /// ESPN `seasontype` query value.
    pub fn espn_season_type(&self) -> u8 {
        match self {
            Self::Regular => 2,
            Self::Post => 3,
        }
    }
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    /// ESPN event id
    pub nfl_game_id: String,
    pub season: i32,
    /// Unknown when every week heuristic came up empty
    pub week: Option<u32>,
    pub game_date: NaiveDate,
    pub home_team_id: i64,
    pub away_team_id: i64,
    /// Only set once the game is completed
    pub home_score: Option<i64>,
    pub away_score: Option<i64>,
    pub game_type: GameType,
    pub completed: bool,
    pub venue_name: Option<String>,
    pub venue_city: Option<String>,
    pub venue_state: Option<String>,
}

impl Game {
    pub fn to_record(&self) -> Record {
        Record::new()
            .with("nfl_game_id", self.nfl_game_id.as_str())
            .with("season", self.season)
            .with("week", self.week)
            .with("game_date", self.game_date.format("%Y-%m-%d").to_string())
            .with("home_team_id", self.home_team_id)
            .with("away_team_id", self.away_team_id)
            .with("home_score", self.home_score)
            .with("away_score", self.away_score)
            .with("game_type", self.game_type.as_str())
            .with("completed", self.completed)
            .with("venue_name", self.venue_name.clone())
            .with("venue_city", self.venue_city.clone())
            .with("venue_state", self.venue_state.clone())
    }
}
