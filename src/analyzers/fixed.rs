use std::time::Duration;

use async_trait::async_trait;

use super::{Analyzer, Evidence};
use crate::diagnosis::DiagnosisResult;
use crate::error::{AnalyzerError, AnalyzerResult};

/// Deterministic analyzer returning preconfigured output.
///
/// Ignores the evidence. Used for dry runs and tests.
#[derive(Debug, Clone)]
pub struct FixedAnalyzer {
    name: &'static str,
    outcome: Result<Vec<DiagnosisResult>, String>,
    delay: Option<Duration>,
}

impl FixedAnalyzer {
    /// Always return `results`.
    pub fn new(name: &'static str, results: Vec<DiagnosisResult>) -> Self {
        Self {
            name,
            outcome: Ok(results),
            delay: None,
        }
    }

    /// Always fail with [`AnalyzerError::Unavailable`].
    pub fn failing(name: &'static str, message: impl Into<String>) -> Self {
        Self {
            name,
            outcome: Err(message.into()),
            delay: None,
        }
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl Analyzer for FixedAnalyzer {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn analyze(&self, _evidence: &Evidence) -> AnalyzerResult<Vec<DiagnosisResult>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.outcome {
            Ok(results) => Ok(results.clone()),
            Err(message) => Err(AnalyzerError::Unavailable {
                message: message.clone(),
                retries: 0,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnosis::SourceType;
    use crate::knowledge::KnowledgeDocument;

    #[tokio::test]
    async fn test_fixed_results_returned_verbatim() {
        let result = DiagnosisResult::new(
            KnowledgeDocument::new("x", "X", "c", "test"),
            SourceType::DecisionTree,
            92.1,
        );
        let analyzer = FixedAnalyzer::new("fixed", vec![result.clone()]);

        assert_eq!(analyzer.name(), "fixed");
        assert_eq!(analyzer.analyze(&Evidence::default()).await.unwrap(), vec![result]);
    }

    #[tokio::test]
    async fn test_failing_analyzer() {
        let err = FixedAnalyzer::failing("broken", "offline")
            .analyze(&Evidence::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyzerError::Unavailable { ref message, .. } if message == "offline"));
    }
}
