use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::learning::{mean_confidence, LearningMetrics, LearningTracker};
use super::types::{DiagnosisResult, SourceType};

/// Session-level statistics over a ranked result set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub total: usize,
    pub mean_confidence: Option<f64>,
    pub max_confidence: Option<f64>,
    pub min_confidence: Option<f64>,
    /// Result count per source type.
    pub by_source: BTreeMap<String, usize>,
}

impl SessionSummary {
    /// Summarize a result set.
    pub fn from_results(results: &[DiagnosisResult]) -> Self {
        let mut by_source = BTreeMap::new();
        for result in results {
            *by_source
                .entry(result.source_type.as_str().to_string())
                .or_insert(0) += 1;
        }

        Self {
            total: results.len(),
            mean_confidence: mean_confidence(results),
            max_confidence: results.iter().map(|r| r.confidence).reduce(f64::max),
            min_confidence: results.iter().map(|r| r.confidence).reduce(f64::min),
            by_source,
        }
    }

    /// Count of results from one source.
    pub fn count(&self, source: SourceType) -> usize {
        self.by_source.get(source.as_str()).copied().unwrap_or(0)
    }
}

/// Outcome of aggregating one session.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregated {
    pub results: Vec<DiagnosisResult>,
    pub summary: SessionSummary,
    /// Metrics after the update, `None` when nothing was recorded.
    pub learning: Option<LearningMetrics>,
}

/// Merges analyzer outputs into one ranked list.
///
/// Contributions are concatenated in the order given, then stably sorted by
/// descending confidence. Overlapping documents from different sources are
/// all kept.
#[derive(Debug, Clone)]
pub struct ResultAggregator {
    tracker: Arc<LearningTracker>,
}

impl ResultAggregator {
    pub fn new(tracker: Arc<LearningTracker>) -> Self {
        Self { tracker }
    }

    /// The tracker updated on every aggregation.
    pub fn tracker(&self) -> &Arc<LearningTracker> {
        &self.tracker
    }

    /// Rank without side effects.
    pub fn rank(contributions: Vec<Vec<DiagnosisResult>>) -> Vec<DiagnosisResult> {
        let mut results: Vec<DiagnosisResult> = contributions.into_iter().flatten().collect();
        results.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        results
    }

    /// Rank, summarize and record the session exactly once.
    pub fn aggregate(&self, contributions: Vec<Vec<DiagnosisResult>>) -> Aggregated {
        let results = Self::rank(contributions);
        let summary = SessionSummary::from_results(&results);
        let learning = self.tracker.record(&results);

        Aggregated {
            results,
            summary,
            learning,
        }
    }
}
