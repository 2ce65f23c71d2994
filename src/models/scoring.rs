//! Fantasy scoring weights.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Scoring key → weight table.
///
/// A `[scoring]` table in the config file replaces the league defaults as a
/// whole; keys it does not name weigh zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoringRules(BTreeMap<String, f64>);

impl ScoringRules {
    pub fn new(weights: BTreeMap<String, f64>) -> Self {
        Self(weights)
    }

    /// Weight for a scoring key, zero when unconfigured.
    pub fn weight(&self, key: &str) -> f64 {
        self.0.get(key).copied().unwrap_or(0.0)
    }

    pub fn set(&mut self, key: impl Into<String>, weight: f64) {
        self.0.insert(key.into(), weight);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl FromIterator<(String, f64)> for ScoringRules {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Default for ScoringRules {
    /// Half-PPR league scoring with individual defensive players.
    fn default() -> Self {
        const LEAGUE: &[(&str, f64)] = &[
            // Passing
            ("passing_yards", 0.04),
            ("passing_tds", 4.0),
            ("interceptions_thrown", -2.0),
            ("two_point_pass", 2.0),
            // Rushing
            ("rushing_yards", 0.1),
            ("rushing_tds", 6.0),
            ("two_point_rush", 2.0),
            // Receiving
            ("receiving_yards", 0.1),
            ("receptions", 0.5),
            ("receiving_tds", 6.0),
            ("two_point_reception", 2.0),
            // Ball security
            ("fumbles_lost", -2.0),
            // Defense
            ("tackles_solo", 1.0),
            ("tackles_assisted", 0.5),
            ("sacks", 2.0),
            ("interceptions", 2.0),
            ("fumbles_forced", 2.0),
            ("fumbles_recovered", 2.0),
            ("passes_defended", 1.0),
            ("safeties", 2.0),
            ("defensive_tds", 6.0),
            ("blocked_kicks", 2.0),
            // Returns
            ("kick_return_tds", 6.0),
            ("punt_return_tds", 6.0),
        ];
        LEAGUE.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }
}
