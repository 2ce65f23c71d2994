// src/pipeline/summary.rs

//! Per-stage run counters.

use crate::models::Record;
use crate::services::ValidationReport;
use crate::storage::Storage;

/// What one stage did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageSummary {
    pub stage: String,
    pub season: Option<i32>,
    pub extracted: usize,
    pub inserted: usize,
    /// Existing rows refreshed in place
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
    pub errors: usize,
    pub warnings: usize,
}

impl StageSummary {
    pub fn new(stage: &str, season: Option<i32>) -> Self {
        Self {
            stage: stage.to_string(),
            season,
            ..Default::default()
        }
    }

    pub fn add_validation(&mut self, report: &ValidationReport) {
        self.errors += report.errors.len();
        self.warnings += report.warnings.len();
    }

    /// Fold another season's counters into this one.
    pub fn absorb(&mut self, other: &StageSummary) {
        self.extracted += other.extracted;
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.errors += other.errors;
        self.warnings += other.warnings;
    }

    pub fn log(&self) {
        let title = match self.season {
            Some(season) => format!("{} {}", self.stage, season),
            None => self.stage.clone(),
        };
        crate::utils::log::summary(
            &title,
            &[
                ("Extracted", self.extracted.to_string()),
                ("Inserted", self.inserted.to_string()),
                ("Updated", self.updated.to_string()),
                ("Skipped", self.skipped.to_string()),
                ("Failed", self.failed.to_string()),
                ("Validation errors", self.errors.to_string()),
                ("Validation warnings", self.warnings.to_string()),
            ],
        );
    }

    pub fn to_record(&self) -> Record {
        let count = |n: usize| i64::try_from(n).unwrap_or(i64::MAX);
        Record::new()
            .with("stage", self.stage.as_str())
            .with("season", self.season)
            .with("errors", count(self.errors))
            .with("warnings", count(self.warnings))
            .with("inserted", count(self.inserted))
            .with("updated", count(self.updated))
            .with("skipped", count(self.skipped))
            .with("failed", count(self.failed))
    }

    /// Append to the quality log. Failure here never fails the stage.
    pub fn persist(&self, storage: &mut dyn Storage) {
        if let Err(e) = storage.insert("data_quality_log", &self.to_record()) {
            log::warn!("Could not record {} summary: {}", self.stage, e);
        }
    }
}
