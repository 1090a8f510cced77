use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::{Analyzer, Evidence, MediaArtifact, MediaKind};
use crate::config::RequestConfig;
use crate::diagnosis::{DiagnosisResult, SourceType};
use crate::error::{AnalyzerError, AnalyzerResult};

/// Request body sent to the media analysis service.
#[derive(Debug, Clone, Serialize)]
pub struct MediaAnalysisRequest<'a> {
    pub file_name: &'a str,
    pub mime_type: &'a str,
    pub size_bytes: u64,
}

/// Finding returned by the media analysis service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaFinding {
    pub fault_type: String,
    /// Service confidence (0.0-1.0).
    pub confidence: f64,
    #[serde(default)]
    pub solutions: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub severity: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MediaAnalysisResponse {
    analysis: MediaFinding,
}

/// HTTP client for a media analysis service.
#[derive(Clone)]
pub struct MediaAnalysisClient {
    client: Client,
    base_url: String,
    request_config: RequestConfig,
}

impl MediaAnalysisClient {
    /// Create a client for the service at `base_url`.
    pub fn new(base_url: &str, request_config: RequestConfig) -> AnalyzerResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(request_config.timeout_ms))
            .build()
            .map_err(AnalyzerError::Http)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            request_config,
        })
    }

    /// Analyze one artifact, retrying with exponential backoff.
    pub async fn analyze(
        &self,
        kind: MediaKind,
        artifact: &MediaArtifact,
    ) -> AnalyzerResult<MediaFinding> {
        let url = format!("{}/api/analyze/{}", self.base_url, kind);
        let request = MediaAnalysisRequest {
            file_name: &artifact.name,
            mime_type: &artifact.mime_type,
            size_bytes: artifact.size_bytes,
        };

        let mut last_error = None;
        let mut retries = 0;

        while retries <= self.request_config.max_retries {
            if retries > 0 {
                let delay = backoff_delay(self.request_config.retry_delay_ms, retries);
                warn!(
                    kind = %kind,
                    file = %artifact.name,
                    retry = retries,
                    delay_ms = delay.as_millis(),
                    "Retrying media analysis request"
                );
                tokio::time::sleep(delay).await;
            }

            let start = Instant::now();

            match self.execute_request(&url, &request).await {
                Ok(finding) => {
                    info!(
                        kind = %kind,
                        file = %artifact.name,
                        fault_type = %finding.fault_type,
                        latency_ms = start.elapsed().as_millis(),
                        "Media analysis succeeded"
                    );
                    return Ok(finding);
                }
                Err(e) => {
                    error!(
                        kind = %kind,
                        file = %artifact.name,
                        error = %e,
                        latency_ms = start.elapsed().as_millis(),
                        retry = retries,
                        "Media analysis failed"
                    );
                    last_error = Some(e);
                    retries += 1;
                }
            }
        }

        Err(AnalyzerError::Unavailable {
            message: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "Unknown error".to_string()),
            retries,
        })
    }

    async fn execute_request(
        &self,
        url: &str,
        request: &MediaAnalysisRequest<'_>,
    ) -> AnalyzerResult<MediaFinding> {
        debug!(url = %url, file = %request.file_name, "Calling media analysis service");

        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AnalyzerError::Timeout {
                        timeout_ms: self.request_config.timeout_ms,
                    }
                } else {
                    AnalyzerError::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalyzerError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let parsed: MediaAnalysisResponse =
            response
                .json()
                .await
                .map_err(|e| AnalyzerError::InvalidResponse {
                    message: format!("Failed to parse analysis response: {}", e),
                })?;

        let finding = parsed.analysis;
        if !(0.0..=1.0).contains(&finding.confidence) {
            return Err(AnalyzerError::InvalidResponse {
                message: format!("Confidence out of range: {}", finding.confidence),
            });
        }

        Ok(finding)
    }

    /// Base URL with any trailing slash removed.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Media analyzer backed by a remote classification service.
///
/// Every artifact of its kind is sent to the service one at a time. A single
/// failed artifact fails the whole invocation.
#[derive(Clone)]
pub struct RemoteMediaAnalyzer {
    kind: MediaKind,
    client: MediaAnalysisClient,
}

impl RemoteMediaAnalyzer {
    pub fn new(kind: MediaKind, client: MediaAnalysisClient) -> Self {
        Self { kind, client }
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }
}

#[async_trait]
impl Analyzer for RemoteMediaAnalyzer {
    fn name(&self) -> &'static str {
        self.kind.analyzer_name()
    }

    async fn analyze(&self, evidence: &Evidence) -> AnalyzerResult<Vec<DiagnosisResult>> {
        let mut results = Vec::new();

        for artifact in evidence.artifacts_of(self.kind) {
            let finding = self.client.analyze(self.kind, artifact).await?;

            let mut document = self.kind.finding_document(artifact);
            document.title = format!("{}: {}", finding.fault_type, artifact.name);
            if !finding.description.is_empty() {
                document.content = finding.description.clone();
            }
            if let Some(severity) = &finding.severity {
                document.tags.push(severity.clone());
            }

            results.push(
                DiagnosisResult::new(document, SourceType::ExternalApi, finding.confidence * 100.0)
                    .with_relevance(finding.confidence)
                    .with_keywords([finding.fault_type.clone()])
                    .with_steps(finding.solutions),
            );
        }

        Ok(results)
    }
}

/// Delay before retry number `retry` (1-based): the base delay doubled per
/// previous retry, saturating instead of overflowing.
fn backoff_delay(retry_delay_ms: u64, retry: u32) -> Duration {
    let factor = 2_u64.saturating_pow(retry.saturating_sub(1));
    Duration::from_millis(retry_delay_ms.saturating_mul(factor))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_per_retry() {
        assert_eq!(backoff_delay(100, 1), Duration::from_millis(100));
        assert_eq!(backoff_delay(100, 2), Duration::from_millis(200));
        assert_eq!(backoff_delay(100, 4), Duration::from_millis(800));
    }

    #[test]
    fn test_backoff_saturates_for_large_inputs() {
        assert_eq!(backoff_delay(1000, 65), Duration::from_millis(u64::MAX));
        assert_eq!(backoff_delay(u64::MAX, 2), Duration::from_millis(u64::MAX));
        assert_eq!(backoff_delay(0, 200), Duration::ZERO);
    }
}
