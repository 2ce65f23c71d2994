//! Season-long statistic totals from league leaderboard pages.

use serde::{Deserialize, Serialize};

use super::{Category, Record, StatBody, StatSource};

/// One leaderboard page of Pro Football Reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeasonPage {
    Passing,
    Rushing,
    Receiving,
    Defense,
}

impl SeasonPage {
    pub const ALL: [SeasonPage; 4] = [Self::Passing, Self::Rushing, Self::Receiving, Self::Defense];

    /// Page name under `/years/{season}/`, also the id of its table.
    pub fn slug(&self) -> &'static str {
        match self {
            Self::Passing => "passing",
            Self::Rushing => "rushing",
            Self::Receiving => "receiving",
            Self::Defense => "defense",
        }
    }

    pub fn category(&self) -> Category {
        match self {
            Self::Passing => Category::Passing,
            Self::Rushing => Category::Rushing,
            Self::Receiving => Category::Receiving,
            Self::Defense => Category::Defensive,
        }
    }

    /// Position assumed for a listed player whose row has none.
    pub fn default_position(&self) -> Option<&'static str> {
        match self {
            Self::Passing => Some("QB"),
            Self::Rushing => Some("RB"),
            Self::Receiving => Some("WR"),
            Self::Defense => None,
        }
    }
}

/// A player's totals in one category over one season.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonTotals {
    pub player_id: i64,
    pub season: i32,
    /// `None` for players who appeared for several teams
    pub team_id: Option<i64>,
    pub games_played: i64,
    pub games_started: i64,
    #[serde(flatten)]
    pub body: StatBody,
}

impl SeasonTotals {
    pub fn category(&self) -> Category {
        self.body.category()
    }

    /// Deduplication identity, also the storage conflict key.
    pub fn identity(&self) -> (i64, i32, Category) {
        (self.player_id, self.season, self.category())
    }

    pub fn to_record(&self) -> Record {
        let mut record = Record::new()
            .with("player_id", self.player_id)
            .with("season", self.season)
            .with("category", self.category().as_str())
            .with("team_id", self.team_id)
            .with("games_played", self.games_played)
            .with("games_started", self.games_started);
        for (column, value) in self.body.columns() {
            record.set(column, value);
        }
        record
    }
}

impl StatSource for SeasonTotals {
    fn stat(&self, column: &str) -> Option<f64> {
        self.body
            .columns()
            .into_iter()
            .find(|(c, _)| *c == column)
            .and_then(|(_, v)| v.as_f64())
    }
}
