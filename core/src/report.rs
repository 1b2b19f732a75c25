use std::collections::BTreeMap;

use serde::Serialize;
use uuid::Uuid;

use crate::testing::{TestVerdict, Verdict};

/// Outcome of one judging attempt, in catalog order.
///
/// `passed` always equals the number of accepted verdicts and never exceeds `total`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JudgeReport {
    submission_id: Uuid,
    verdicts: Vec<TestVerdict>,
    passed: usize,
    total: usize,
    percentage: f64,
    skipped: Vec<String>,
}

impl JudgeReport {
    pub fn new(submission_id: Uuid, verdicts: Vec<TestVerdict>, skipped: Vec<String>) -> Self {
        let total = verdicts.len();
        let passed = verdicts.iter().filter(|v| v.verdict.is_accepted()).count();
        let percentage = if total == 0 {
            0.0
        } else {
            passed as f64 * 100.0 / total as f64
        };
        Self {
            submission_id,
            verdicts,
            passed,
            total,
            percentage,
            skipped,
        }
    }

    pub fn submission_id(&self) -> Uuid {
        self.submission_id
    }

    pub fn verdicts(&self) -> &[TestVerdict] {
        &self.verdicts
    }

    pub fn passed(&self) -> usize {
        self.passed
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// In `[0, 100]`.
    pub fn percentage(&self) -> f64 {
        self.percentage
    }

    pub fn score(&self) -> String {
        format!("{}/{}", self.passed, self.total)
    }

    /// Inputs that had no expected output and were not run.
    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    pub fn all_passed(&self) -> bool {
        self.passed == self.total
    }

    pub fn count_by_verdict(&self) -> BTreeMap<Verdict, usize> {
        self.verdicts.iter().fold(BTreeMap::new(), |mut count, v| {
            *count.entry(v.verdict).or_default() += 1;
            count
        })
    }
}
