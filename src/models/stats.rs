//! Per-category statistic lines for one player in one game.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{FieldValue, Record};

/// One statistical grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Passing,
    Rushing,
    Receiving,
    Defensive,
    SpecialTeams,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Self::Passing,
        Self::Rushing,
        Self::Receiving,
        Self::Defensive,
        Self::SpecialTeams,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passing => "passing",
            Self::Rushing => "rushing",
            Self::Receiving => "receiving",
            Self::Defensive => "defensive",
            Self::SpecialTeams => "special_teams",
        }
    }

    /// Storage table holding this category.
    pub fn table(&self) -> &'static str {
        match self {
            Self::Passing => "passing_stats",
            Self::Rushing => "rushing_stats",
            Self::Receiving => "receiving_stats",
            Self::Defensive => "defensive_stats",
            Self::SpecialTeams => "return_stats",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Anything a scoring rule can read a numeric column from.
pub trait StatSource {
    /// Numeric value of a column, `None` when absent or non-numeric.
    fn stat(&self, column: &str) -> Option<f64>;
}

impl StatSource for Record {
    fn stat(&self, column: &str) -> Option<f64> {
        self.f64(column)
    }
}

impl StatSource for BTreeMap<String, f64> {
    fn stat(&self, column: &str) -> Option<f64> {
        self.get(column).copied()
    }
}

/// Identity shared by every stat line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatKey {
    pub player_id: i64,
    pub game_id: i64,
    pub season: i32,
    pub week: Option<u32>,
}

impl StatKey {
    fn record(&self) -> Record {
        Record::new()
            .with("player_id", self.player_id)
            .with("game_id", self.game_id)
            .with("season", self.season)
            .with("week", self.week)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PassingStats {
    pub completions: i64,
    pub attempts: i64,
    pub passing_yards: i64,
    pub passing_tds: i64,
    pub interceptions: i64,
    pub sacks: i64,
    pub two_point_conversions: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RushingStats {
    pub attempts: i64,
    pub rushing_yards: i64,
    pub rushing_tds: i64,
    pub fumbles: i64,
    pub fumbles_lost: i64,
    pub two_point_conversions: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReceivingStats {
    pub targets: i64,
    pub receptions: i64,
    pub receiving_yards: i64,
    pub receiving_tds: i64,
    pub fumbles: i64,
    pub fumbles_lost: i64,
    pub two_point_conversions: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefensiveStats {
    pub tackles_solo: i64,
    pub tackles_assisted: i64,
    pub tackles_total: i64,
    /// Half sacks are credited
    pub sacks: f64,
    pub interceptions: i64,
    pub passes_defended: i64,
    pub fumbles_forced: i64,
    pub fumbles_recovered: i64,
    pub safeties: i64,
    pub defensive_tds: i64,
    pub blocked_kicks: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReturnStats {
    pub kick_returns: i64,
    pub kick_return_yards: i64,
    pub kick_return_tds: i64,
    pub punt_returns: i64,
    pub punt_return_yards: i64,
    pub punt_return_tds: i64,
}

/// Per-category body of a stat line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum StatBody {
    Passing(PassingStats),
    Rushing(RushingStats),
    Receiving(ReceivingStats),
    Defensive(DefensiveStats),
    SpecialTeams(ReturnStats),
}

impl StatBody {
    pub fn category(&self) -> Category {
        match self {
            Self::Passing(_) => Category::Passing,
            Self::Rushing(_) => Category::Rushing,
            Self::Receiving(_) => Category::Receiving,
            Self::Defensive(_) => Category::Defensive,
            Self::SpecialTeams(_) => Category::SpecialTeams,
        }
    }

    /// Stat columns in storage order.
    pub fn columns(&self) -> Vec<(&'static str, FieldValue)> {
        match self {
            Self::Passing(s) => vec![
                ("completions", s.completions.into()),
                ("attempts", s.attempts.into()),
                ("passing_yards", s.passing_yards.into()),
                ("passing_tds", s.passing_tds.into()),
                ("interceptions", s.interceptions.into()),
                ("sacks", s.sacks.into()),
                ("two_point_conversions", s.two_point_conversions.into()),
            ],
            Self::Rushing(s) => vec![
                ("attempts", s.attempts.into()),
                ("rushing_yards", s.rushing_yards.into()),
                ("rushing_tds", s.rushing_tds.into()),
                ("fumbles", s.fumbles.into()),
                ("fumbles_lost", s.fumbles_lost.into()),
                ("two_point_conversions", s.two_point_conversions.into()),
            ],
            Self::Receiving(s) => vec![
                ("targets", s.targets.into()),
                ("receptions", s.receptions.into()),
                ("receiving_yards", s.receiving_yards.into()),
                ("receiving_tds", s.receiving_tds.into()),
                ("fumbles", s.fumbles.into()),
                ("fumbles_lost", s.fumbles_lost.into()),
                ("two_point_conversions", s.two_point_conversions.into()),
            ],
            Self::Defensive(s) => vec![
                ("tackles_solo", s.tackles_solo.into()),
                ("tackles_assisted", s.tackles_assisted.into()),
                ("tackles_total", s.tackles_total.into()),
                ("sacks", s.sacks.into()),
                ("interceptions", s.interceptions.into()),
                ("passes_defended", s.passes_defended.into()),
                ("fumbles_forced", s.fumbles_forced.into()),
                ("fumbles_recovered", s.fumbles_recovered.into()),
                ("safeties", s.safeties.into()),
                ("defensive_tds", s.defensive_tds.into()),
                ("blocked_kicks", s.blocked_kicks.into()),
            ],
            Self::SpecialTeams(s) => vec![
                ("kick_returns", s.kick_returns.into()),
                ("kick_return_yards", s.kick_return_yards.into()),
                ("kick_return_tds", s.kick_return_tds.into()),
                ("punt_returns", s.punt_returns.into()),
                ("punt_return_yards", s.punt_return_yards.into()),
                ("punt_return_tds", s.punt_return_tds.into()),
            ],
        }
    }
}

/// One row of one category for one player in one game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatLine {
    #[serde(flatten)]
    pub key: StatKey,
    #[serde(flatten)]
    pub body: StatBody,
}

impl StatLine {
    pub fn new(key: StatKey, body: StatBody) -> Self {
        Self { key, body }
    }

    pub fn category(&self) -> Category {
        self.body.category()
    }

    /// Deduplication identity.
    pub fn identity(&self) -> (i64, i64, Category) {
        (self.key.player_id, self.key.game_id, self.category())
    }

    pub fn to_record(&self) -> Record {
        let mut record = self.key.record();
        for (column, value) in self.body.columns() {
            record.set(column, value);
        }
        record
    }
}

impl StatSource for StatLine {
    fn stat(&self, column: &str) -> Option<f64> {
        self.body
            .columns()
            .into_iter()
            .find(|(c, _)| *c == column)
            .and_then(|(_, v)| v.as_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> StatKey {
        StatKey {
            player_id: 11,
            game_id: 3,
            season: 2023,
            week: Some(1),
        }
    }

    #[test]
    fn record_carries_key_and_columns() {
        let line = StatLine::new(
            key(),
            StatBody::Passing(PassingStats {
                completions: 25,
                attempts: 35,
                passing_yards: 300,
                passing_tds: 2,
                interceptions: 1,
                ..Default::default()
            }),
        );
        let record = line.to_record();
        assert_eq!(record.i64("player_id"), Some(11));
        assert_eq!(record.i64("week"), Some(1));
        assert_eq!(record.i64("passing_yards"), Some(300));
        assert_eq!(line.stat("interceptions"), Some(1.0));
        assert_eq!(line.stat("receptions"), None);
        assert_eq!(line.category().table(), "passing_stats");
    }

    #[test]
    fn defensive_sacks_keep_halves() {
        let line = StatLine::new(
            key(),
            StatBody::Defensive(DefensiveStats {
                sacks: 1.5,
                ..Default::default()
            }),
        );
        assert_eq!(line.stat("sacks"), Some(1.5));
        assert_eq!(line.to_record().f64("sacks"), Some(1.5));
    }
}
