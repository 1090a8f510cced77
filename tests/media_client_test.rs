//! Integration tests for the remote media analyzer
//!
//! Tests HTTP client behavior using wiremock for request/response mocking.

use serde_json::json;
use wiremock::{
    matchers::{body_partial_json, method, path},
    Mock, MockServer, ResponseTemplate,
};

use mcp_fault_diagnosis::analyzers::{
    Analyzer, Evidence, MediaAnalysisClient, MediaArtifact, MediaKind, RemoteMediaAnalyzer,
};
use mcp_fault_diagnosis::config::RequestConfig;
use mcp_fault_diagnosis::diagnosis::SourceType;
use mcp_fault_diagnosis::error::AnalyzerError;

fn create_test_client(base_url: &str, max_retries: u32) -> MediaAnalysisClient {
    let request_config = RequestConfig {
        timeout_ms: 5000,
        max_retries,
        retry_delay_ms: 10,
    };
    MediaAnalysisClient::new(base_url, request_config).expect("Failed to create client")
}

fn image_evidence() -> Evidence {
    Evidence::text("皮带有裂纹")
        .with_artifact(MediaArtifact::new("belt.jpg", "image/jpeg", 20480))
}

fn finding_body(confidence: f64) -> serde_json::Value {
    json!({
        "analysis": {
            "fault_type": "皮带磨损",
            "confidence": confidence,
            "solutions": ["停机检查皮带", "更换皮带", "调整张紧力"],
            "description": "皮带表面出现裂纹和磨损",
            "severity": "medium"
        }
    })
}

#[tokio::test]
async fn test_successful_analysis() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/analyze/image"))
        .and(body_partial_json(json!({"file_name": "belt.jpg", "mime_type": "image/jpeg"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(finding_body(0.87)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let analyzer = RemoteMediaAnalyzer::new(MediaKind::Image, create_test_client(&mock_server.uri(), 0));
    let results = analyzer.analyze(&image_evidence()).await.unwrap();

    assert_eq!(results.len(), 1);
    let result = &results[0];
    assert!((result.confidence - 87.0).abs() < 1e-9);
    assert!((result.relevance_score - 0.87).abs() < 1e-9);
    assert_eq!(result.source_type, SourceType::ExternalApi);
    assert_eq!(result.matched_keywords, vec!["皮带磨损"]);
    assert_eq!(result.solution_steps.len(), 3);
    assert_eq!(result.document.content, "皮带表面出现裂纹和磨损");
    assert!(result.document.tags.contains(&"medium".to_string()));
}

#[tokio::test]
async fn test_other_kinds_are_not_sent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(finding_body(0.5)))
        .expect(0)
        .mount(&mock_server)
        .await;

    let analyzer = RemoteMediaAnalyzer::new(MediaKind::Audio, create_test_client(&mock_server.uri(), 0));
    let results = analyzer.analyze(&image_evidence()).await.unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_api_error_after_retries() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/analyze/image"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .expect(3)
        .mount(&mock_server)
        .await;

    let analyzer = RemoteMediaAnalyzer::new(MediaKind::Image, create_test_client(&mock_server.uri(), 2));
    let err = analyzer.analyze(&image_evidence()).await.unwrap_err();

    match err {
        AnalyzerError::Unavailable { message, retries } => {
            assert_eq!(retries, 3);
            assert!(message.contains("503"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_retry_recovers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/analyze/image"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/analyze/image"))
        .respond_with(ResponseTemplate::new(200).set_body_json(finding_body(0.6)))
        .mount(&mock_server)
        .await;

    let analyzer = RemoteMediaAnalyzer::new(MediaKind::Image, create_test_client(&mock_server.uri(), 1));
    let results = analyzer.analyze(&image_evidence()).await.unwrap();
    assert!((results[0].confidence - 60.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_malformed_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": "ok"})))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server.uri(), 0);
    let err = client
        .analyze(MediaKind::Image, &MediaArtifact::new("a.png", "image/png", 1))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("parse"));
}

#[tokio::test]
async fn test_confidence_out_of_range_rejected() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(finding_body(87.0)))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server.uri(), 0);
    let err = client
        .analyze(MediaKind::Image, &MediaArtifact::new("a.png", "image/png", 1))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("out of range"));
}

#[test]
fn test_trailing_slash_trimmed() {
    let client = create_test_client("http://localhost:9000/", 0);
    assert_eq!(client.base_url(), "http://localhost:9000");
}
