//! Derived fantasy point records.

use serde::{Deserialize, Serialize};

use super::{Category, Record};

/// Points per category, each rounded to two decimals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PointsBreakdown {
    pub passing_points: f64,
    pub rushing_points: f64,
    pub receiving_points: f64,
    pub defensive_points: f64,
    pub special_teams_points: f64,
    pub total_points: f64,
}

impl PointsBreakdown {
    pub fn set(&mut self, category: Category, points: f64) {
        let slot = match category {
            Category::Passing => &mut self.passing_points,
            Category::Rushing => &mut self.rushing_points,
            Category::Receiving => &mut self.receiving_points,
            Category::Defensive => &mut self.defensive_points,
            Category::SpecialTeams => &mut self.special_teams_points,
        };
        *slot = points;
    }

    pub fn get(&self, category: Category) -> f64 {
        match category {
            Category::Passing => self.passing_points,
            Category::Rushing => self.rushing_points,
            Category::Receiving => self.receiving_points,
            Category::Defensive => self.defensive_points,
            Category::SpecialTeams => self.special_teams_points,
        }
    }
}

/// One player's fantasy output for one game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FantasyPoints {
    pub player_id: i64,
    pub game_id: i64,
    pub season: i32,
    pub week: Option<u32>,
    pub position: String,
    #[serde(flatten)]
    pub points: PointsBreakdown,
}

impl FantasyPoints {
    pub fn to_record(&self) -> Record {
        Record::new()
            .with("player_id", self.player_id)
            .with("game_id", self.game_id)
            .with("season", self.season)
            .with("week", self.week)
            .with("position", self.position.as_str())
            .with("passing_points", self.points.passing_points)
            .with("rushing_points", self.points.rushing_points)
            .with("receiving_points", self.points.receiving_points)
            .with("defensive_points", self.points.defensive_points)
            .with("special_teams_points", self.points.special_teams_points)
            .with("total_points", self.points.total_points)
    }
}

/// Season aggregate for the leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopPerformer {
    pub name: String,
    pub position: String,
    pub season: i32,
    pub games_played: i64,
    pub total_fantasy_points: f64,
    pub avg_fantasy_points: f64,
    pub best_game: f64,
}
