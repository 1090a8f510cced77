use std::collections::VecDeque;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::types::DiagnosisResult;
use crate::config::LearningConfig;

/// Process-wide diagnosis statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningMetrics {
    pub total_cases: u64,
    pub successful_diagnoses: u64,
    /// `successful_diagnoses / total_cases * 100`.
    pub accuracy_rate: f64,
    /// Non-decreasing, capped at 100.
    pub learning_progress: f64,
    /// Most recent session mean confidences, oldest first.
    pub recent_accuracy: VecDeque<f64>,
    /// Learning progress samples, oldest first.
    pub knowledge_growth: VecDeque<f64>,
}

impl Default for LearningMetrics {
    fn default() -> Self {
        Self {
            total_cases: 1247,
            successful_diagnoses: 1089,
            accuracy_rate: 87.3,
            learning_progress: 73.5,
            recent_accuracy: VecDeque::from(vec![82.1, 84.3, 85.7, 86.9, 87.3]),
            knowledge_growth: VecDeque::from(vec![45.0, 52.0, 61.0, 68.0, 73.5]),
        }
    }
}

/// Mean confidence of a result set, `None` when empty.
pub fn mean_confidence(results: &[DiagnosisResult]) -> Option<f64> {
    if results.is_empty() {
        return None;
    }
    Some(results.iter().map(|r| r.confidence).sum::<f64>() / results.len() as f64)
}

fn push_bounded(window: &mut VecDeque<f64>, value: f64, size: usize) {
    window.push_back(value);
    while window.len() > size {
        window.pop_front();
    }
}

/// Rolling statistics updated once per completed session.
///
/// Every update happens under a single write lock, so readers always see
/// either the state before a session or the state after it.
#[derive(Debug)]
pub struct LearningTracker {
    metrics: RwLock<LearningMetrics>,
    config: LearningConfig,
}

impl LearningTracker {
    /// Create a tracker seeded with the default metrics.
    pub fn new(config: LearningConfig) -> Self {
        Self::with_metrics(LearningMetrics::default(), config)
    }

    /// Create a tracker from explicit seed values.
    pub fn with_metrics(metrics: LearningMetrics, config: LearningConfig) -> Self {
        Self {
            metrics: RwLock::new(metrics),
            config,
        }
    }

    /// Fold one session's ranked results into the statistics.
    ///
    /// Returns the updated metrics, or `None` without touching anything
    /// when `results` is empty.
    pub fn record(&self, results: &[DiagnosisResult]) -> Option<LearningMetrics> {
        let mean = mean_confidence(results)?;

        let mut metrics = self
            .metrics
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        metrics.total_cases += 1;
        if mean > self.config.success_threshold {
            metrics.successful_diagnoses += 1;
        }
        metrics.accuracy_rate =
            metrics.successful_diagnoses as f64 / metrics.total_cases as f64 * 100.0;
        push_bounded(&mut metrics.recent_accuracy, mean, self.config.window_size);
        metrics.learning_progress =
            (metrics.learning_progress + self.config.progress_increment).min(100.0);
        let progress = metrics.learning_progress;
        push_bounded(&mut metrics.knowledge_growth, progress, self.config.window_size);

        debug!(
            mean_confidence = mean,
            total_cases = metrics.total_cases,
            accuracy_rate = metrics.accuracy_rate,
            "Learning metrics updated"
        );

        Some(metrics.clone())
    }

    /// Consistent copy of the current metrics.
    pub fn snapshot(&self) -> LearningMetrics {
        self.metrics
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl Default for LearningTracker {
    fn default() -> Self {
        Self::new(LearningConfig::default())
    }
}
