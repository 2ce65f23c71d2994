// src/services/fantasy.rs

//! Fantasy point calculation.
//!
//! [`FantasyPointsCalculator`] is pure: stat columns times configured
//! weights, rounded per category. [`FantasyService`] runs it over stored
//! statistics and persists the results.

use crate::error::Result;
use crate::models::{
    Category, FantasyPoints, FieldValue, PointsBreakdown, Record, ScoringRules, StatLine,
    StatSource, TopPerformer, is_defensive_position,
};
use crate::storage::Storage;
use crate::utils::round2;

/// Stat column → scoring key, per category.
const PASSING_RULES: &[(&str, &str)] = &[
    ("passing_yards", "passing_yards"),
    ("passing_tds", "passing_tds"),
    ("interceptions", "interceptions_thrown"),
    ("two_point_conversions", "two_point_pass"),
];

const RUSHING_RULES: &[(&str, &str)] = &[
    ("rushing_yards", "rushing_yards"),
    ("rushing_tds", "rushing_tds"),
    ("two_point_conversions", "two_point_rush"),
    ("fumbles_lost", "fumbles_lost"),
];

const RECEIVING_RULES: &[(&str, &str)] = &[
    ("receiving_yards", "receiving_yards"),
    ("receptions", "receptions"),
    ("receiving_tds", "receiving_tds"),
    ("two_point_conversions", "two_point_reception"),
    ("fumbles_lost", "fumbles_lost"),
];

const DEFENSIVE_RULES: &[(&str, &str)] = &[
    ("tackles_solo", "tackles_solo"),
    ("tackles_assisted", "tackles_assisted"),
    ("sacks", "sacks"),
    ("interceptions", "interceptions"),
    ("fumbles_forced", "fumbles_forced"),
    ("fumbles_recovered", "fumbles_recovered"),
    ("passes_defended", "passes_defended"),
    ("safeties", "safeties"),
    ("defensive_tds", "defensive_tds"),
    ("blocked_kicks", "blocked_kicks"),
];

const SPECIAL_TEAMS_RULES: &[(&str, &str)] = &[
    ("kick_return_tds", "kick_return_tds"),
    ("punt_return_tds", "punt_return_tds"),
];

/// Players need this many scored games to appear on the leaderboard.
pub const MIN_GAMES_FOR_RANKING: i64 = 4;

fn rules_for(category: Category) -> &'static [(&'static str, &'static str)] {
    match category {
        Category::Passing => PASSING_RULES,
        Category::Rushing => RUSHING_RULES,
        Category::Receiving => RECEIVING_RULES,
        Category::Defensive => DEFENSIVE_RULES,
        Category::SpecialTeams => SPECIAL_TEAMS_RULES,
    }
}

/// Points one stat row is worth in its category, rounded to 2 decimals.
///
/// Columns without a rule, and rules without a column, contribute zero.
pub fn category_points(source: &dyn StatSource, category: Category, rules: &ScoringRules) -> f64 {
    let total: f64 = rules_for(category)
        .iter()
        .map(|(column, key)| source.stat(column).unwrap_or(0.0) * rules.weight(key))
        .sum();
    round2(total)
}

#[derive(Debug, Clone, Default)]
pub struct FantasyPointsCalculator {
    rules: ScoringRules,
}

impl FantasyPointsCalculator {
    pub fn new(rules: ScoringRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &ScoringRules {
        &self.rules
    }

    /// Combine per-category rows for one player in one game.
    ///
    /// Defensive rows only score for defensive positions.
    pub fn breakdown<'s, I>(&self, rows: I, position: &str) -> PointsBreakdown
    where
        I: IntoIterator<Item = (Category, &'s dyn StatSource)>,
    {
        let mut points = PointsBreakdown::default();
        for (category, source) in rows {
            if category == Category::Defensive && !is_defensive_position(position) {
                continue;
            }
            points.set(category, category_points(source, category, &self.rules));
        }
        points.total_points = round2(Category::ALL.iter().map(|c| points.get(*c)).sum());
        points
    }

    /// [`FantasyPointsCalculator::breakdown`] over typed stat lines.
    pub fn for_lines(&self, lines: &[StatLine], position: &str) -> PointsBreakdown {
        self.breakdown(
            lines
                .iter()
                .map(|l| (l.category(), l as &dyn StatSource)),
            position,
        )
    }
}

/// Counts from one bulk run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FantasyRunSummary {
    pub pairs: usize,
    pub stored: usize,
    pub zero_totals: usize,
    pub failed: usize,
}

/// Calculator over the stored statistics tables.
pub struct FantasyService<'a> {
    storage: &'a mut dyn Storage,
    calculator: FantasyPointsCalculator,
    batch_size: usize,
}

impl<'a> FantasyService<'a> {
    pub fn new(storage: &'a mut dyn Storage, rules: ScoringRules, batch_size: usize) -> Self {
        Self {
            storage,
            calculator: FantasyPointsCalculator::new(rules),
            batch_size: batch_size.max(1),
        }
    }

    /// Compute the points of one (player, game) pair from storage.
    ///
    /// `None` when the player or game is unknown.
    pub fn calculate_for(&self, player_id: i64, game_id: i64) -> Result<Option<FantasyPoints>> {
        let context = self.storage.query(
            "SELECT p.position, g.season, g.week FROM players p, games g \
             WHERE p.player_id = ?1 AND g.game_id = ?2",
            &[player_id.into(), game_id.into()],
        )?;
        let Some(context) = context.first() else {
            return Ok(None);
        };
        let position = context.str("position").unwrap_or_default().to_string();

        let mut rows: Vec<(Category, Record)> = Vec::new();
        for category in Category::ALL {
            let sql = format!(
                "SELECT * FROM {} WHERE player_id = ?1 AND game_id = ?2",
                category.table()
            );
            let found = self
                .storage
                .query(&sql, &[player_id.into(), game_id.into()])?;
            rows.extend(found.into_iter().next().map(|r| (category, r)));
        }

        let points = self.calculator.breakdown(
            rows.iter().map(|(c, r)| (*c, r as &dyn StatSource)),
            &position,
        );
        Ok(Some(FantasyPoints {
            player_id,
            game_id,
            season: context
                .i64("season")
                .and_then(|s| i32::try_from(s).ok())
                .unwrap_or_default(),
            week: context.i64("week").and_then(|w| u32::try_from(w).ok()),
            position,
            points,
        }))
    }

    /// Score every pair that has statistics but no fantasy row yet.
    pub fn bulk_calculate(&mut self, season: Option<i32>) -> Result<FantasyRunSummary> {
        let pairs = self.pairs(season, true)?;
        log::info!("Calculating fantasy points for {} player-games", pairs.len());
        let mut summary = FantasyRunSummary {
            pairs: pairs.len(),
            ..Default::default()
        };

        for (n, batch) in pairs.chunks(self.batch_size).enumerate() {
            let mut records = Vec::with_capacity(batch.len());
            for (player_id, game_id) in batch {
                match self.calculate_for(*player_id, *game_id) {
                    Ok(Some(fp)) if fp.points.total_points != 0.0 => records.push(fp.to_record()),
                    Ok(_) => summary.zero_totals += 1,
                    Err(e) => {
                        log::warn!("Player {} game {}: {}", player_id, game_id, e);
                        summary.failed += 1;
                    }
                }
            }
            match self.storage.bulk_insert("fantasy_points", &records) {
                Ok(inserted) => summary.stored += inserted,
                Err(e) => {
                    log::error!("Fantasy batch {} failed: {}", n + 1, e);
                    summary.failed += records.len();
                }
            }
            log::debug!("Fantasy batch {} done ({} rows)", n + 1, records.len());
        }
        Ok(summary)
    }

    /// Recompute and replace every pair that has statistics.
    ///
    /// A pair that now scores zero loses its stored row.
    pub fn recalculate(&mut self, season: Option<i32>) -> Result<FantasyRunSummary> {
        let pairs = self.pairs(season, false)?;
        log::info!("Recalculating fantasy points for {} player-games", pairs.len());
        let mut summary = FantasyRunSummary {
            pairs: pairs.len(),
            ..Default::default()
        };

        for (player_id, game_id) in pairs {
            let fp = match self.calculate_for(player_id, game_id) {
                Ok(Some(fp)) if fp.points.total_points != 0.0 => fp,
                Ok(_) => {
                    summary.zero_totals += 1;
                    let key = Record::new()
                        .with("player_id", player_id)
                        .with("game_id", game_id);
                    match self.storage.delete("fantasy_points", &key) {
                        Ok(0) => {}
                        Ok(_) => log::debug!(
                            "Player {} game {} now scores zero, row removed",
                            player_id,
                            game_id
                        ),
                        Err(e) => {
                            log::warn!("Removing points for player {} game {}: {}", player_id, game_id, e);
                            summary.failed += 1;
                        }
                    }
                    continue;
                }
                Err(e) => {
                    log::warn!("Player {} game {}: {}", player_id, game_id, e);
                    summary.failed += 1;
                    continue;
                }
            };
            match self
                .storage
                .upsert("fantasy_points", &fp.to_record(), &["player_id", "game_id"])
            {
                Ok(_) => summary.stored += 1,
                Err(e) => {
                    log::warn!("Storing points for player {} game {}: {}", player_id, game_id, e);
                    summary.failed += 1;
                }
            }
        }
        Ok(summary)
    }

    /// Season leaders among players with enough scored games.
    pub fn top_performers(
        &self,
        position: Option<&str>,
        season: Option<i32>,
        limit: usize,
    ) -> Result<Vec<TopPerformer>> {
        let rows = self.storage.query(
            "SELECT p.name, p.position, fp.season, COUNT(*) AS games_played, \
                    ROUND(SUM(fp.total_points), 2) AS total_fantasy_points, \
                    ROUND(AVG(fp.total_points), 2) AS avg_fantasy_points, \
                    MAX(fp.total_points) AS best_game \
             FROM fantasy_points fp JOIN players p ON p.player_id = fp.player_id \
             WHERE (?1 IS NULL OR p.position = ?1) AND (?2 IS NULL OR fp.season = ?2) \
             GROUP BY fp.player_id, fp.season \
             HAVING COUNT(*) >= ?3 \
             ORDER BY total_fantasy_points DESC \
             LIMIT ?4",
            &[
                position.into(),
                season.into(),
                MIN_GAMES_FOR_RANKING.into(),
                i64::try_from(limit).unwrap_or(i64::MAX).into(),
            ],
        )?;

        Ok(rows
            .iter()
            .map(|r| TopPerformer {
                name: r.str("name").unwrap_or_default().to_string(),
                position: r.str("position").unwrap_or_default().to_string(),
                season: r
                    .i64("season")
                    .and_then(|s| i32::try_from(s).ok())
                    .unwrap_or_default(),
                games_played: r.i64("games_played").unwrap_or_default(),
                total_fantasy_points: r.f64("total_fantasy_points").unwrap_or_default(),
                avg_fantasy_points: r.f64("avg_fantasy_points").unwrap_or_default(),
                best_game: r.f64("best_game").unwrap_or_default(),
            })
            .collect())
    }

    /// (player, game) pairs with at least one stat row.
    fn pairs(&self, season: Option<i32>, missing_only: bool) -> Result<Vec<(i64, i64)>> {
        let union = Category::ALL
            .iter()
            .map(|c| format!("SELECT player_id, game_id, season FROM {}", c.table()))
            .collect::<Vec<_>>()
            .join(" UNION ");
        let missing = if missing_only { "AND fp.fp_id IS NULL" } else { "" };
        let sql = format!(
            "SELECT DISTINCT s.player_id, s.game_id FROM ({union}) s \
             LEFT JOIN fantasy_points fp \
               ON fp.player_id = s.player_id AND fp.game_id = s.game_id \
             WHERE (?1 IS NULL OR s.season = ?1) {missing} \
             ORDER BY s.player_id, s.game_id"
        );
        let rows = self.storage.query(&sql, &[FieldValue::from(season)])?;
        Ok(rows
            .iter()
            .filter_map(|r| Some((r.i64("player_id")?, r.i64("game_id")?)))
            .collect())
    }
}
