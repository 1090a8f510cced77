use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::aggregator::{ResultAggregator, SessionSummary};
use super::learning::{LearningMetrics, LearningTracker};
use super::types::DiagnosisResult;
use crate::analyzers::{Analyzer, Evidence, TreeAnalyzer};

/// Ranked output of one completed analysis session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisReport {
    pub generation: u64,
    pub results: Vec<DiagnosisResult>,
    pub summary: SessionSummary,
    /// Learning metrics after this session was recorded.
    pub learning: LearningMetrics,
}

/// What happened to an analysis request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalysisOutcome {
    Completed(DiagnosisReport),
    /// A newer analysis started while this one was in flight; its results
    /// were dropped unrecorded.
    Superseded { generation: u64, latest: u64 },
}

impl AnalysisOutcome {
    /// The report, if the session completed.
    pub fn report(&self) -> Option<&DiagnosisReport> {
        match self {
            AnalysisOutcome::Completed(report) => Some(report),
            AnalysisOutcome::Superseded { .. } => None,
        }
    }

    /// Whether a newer analysis started before this one finished.
    pub fn is_superseded(&self) -> bool {
        matches!(self, AnalysisOutcome::Superseded { .. })
    }
}

/// Runs every configured analyzer over one piece of evidence and ranks the
/// combined output.
///
/// Analyzers run concurrently and are joined before aggregation. Each call
/// takes a new generation number; when a later call has started by the time
/// the join finishes, the earlier call reports [`AnalysisOutcome::Superseded`]
/// and does not touch the learning statistics.
pub struct DiagnosisEngine {
    analyzers: Vec<Arc<dyn Analyzer>>,
    aggregator: ResultAggregator,
    generation: AtomicU64,
}

impl DiagnosisEngine {
    /// Create an engine with no analyzers.
    pub fn new(aggregator: ResultAggregator) -> Self {
        Self {
            analyzers: Vec::new(),
            aggregator,
            generation: AtomicU64::new(0),
        }
    }

    /// Append an analyzer. Invocation order breaks confidence ties.
    pub fn with_analyzer(mut self, analyzer: Arc<dyn Analyzer>) -> Self {
        self.analyzers.push(analyzer);
        self
    }

    /// Names of the configured analyzers in invocation order.
    pub fn analyzer_names(&self) -> Vec<&'static str> {
        self.analyzers.iter().map(|a| a.name()).collect()
    }

    /// Most recently issued generation.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn tracker(&self) -> &Arc<LearningTracker> {
        self.aggregator.tracker()
    }

    /// Analyze evidence, optionally including a decision tree session.
    pub async fn analyze(&self, evidence: Evidence, tree: Option<TreeAnalyzer>) -> AnalysisOutcome {
        if evidence.is_empty() && tree.is_none() {
            debug!("No evidence submitted, returning empty report");
            return AnalysisOutcome::Completed(DiagnosisReport {
                generation: self.generation(),
                results: Vec::new(),
                summary: SessionSummary::default(),
                learning: self.tracker().snapshot(),
            });
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let mut analyzers = self.analyzers.clone();
        if let Some(tree) = tree {
            analyzers.push(Arc::new(tree));
        }

        let evidence = Arc::new(evidence);
        let mut join_set = JoinSet::new();
        for (index, analyzer) in analyzers.iter().enumerate() {
            let analyzer = Arc::clone(analyzer);
            let evidence = Arc::clone(&evidence);
            join_set.spawn(async move {
                let outcome = analyzer.analyze(&evidence).await;
                (index, analyzer.name(), outcome)
            });
        }

        let mut contributions: Vec<Vec<DiagnosisResult>> = vec![Vec::new(); analyzers.len()];
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, name, Ok(results))) => {
                    debug!(analyzer = name, results = results.len(), "Analyzer finished");
                    contributions[index] = results;
                }
                Ok((_, name, Err(e))) => {
                    warn!(analyzer = name, error = %e, "Analyzer failed, contributing no results");
                }
                Err(e) => {
                    warn!(error = %e, "Analyzer task aborted, contributing no results");
                }
            }
        }

        let latest = self.generation();
        if latest != generation {
            warn!(generation, latest, "Analysis superseded, discarding results");
            return AnalysisOutcome::Superseded { generation, latest };
        }

        let aggregated = self.aggregator.aggregate(contributions);
        let learning = aggregated
            .learning
            .unwrap_or_else(|| self.tracker().snapshot());

        info!(
            generation,
            results = aggregated.results.len(),
            top_confidence = aggregated.summary.max_confidence,
            "Analysis completed"
        );

        AnalysisOutcome::Completed(DiagnosisReport {
            generation,
            results: aggregated.results,
            summary: aggregated.summary,
            learning,
        })
    }
}
