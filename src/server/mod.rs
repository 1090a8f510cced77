//! Server module for MCP protocol handling.
//!
//! This module provides:
//! - MCP server implementation over stdio
//! - Tool call handlers and routing
//! - Shared application state

mod handlers;
mod mcp;

pub use handlers::*;
pub use mcp::*;

use std::sync::Arc;

use tracing::info;

use crate::analyzers::{
    Analyzer, MediaAnalysisClient, MediaKind, RemoteMediaAnalyzer, SimulatedMediaAnalyzer,
    TextAnalyzer,
};
use crate::config::Config;
use crate::diagnosis::{DiagnosisEngine, LearningTracker, ResultAggregator};
use crate::error::AppResult;
use crate::knowledge::Corpus;
use crate::tree::{LoggingObserver, TreeCatalog, TreeSessions};

/// Application state shared across handlers.
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Decision tree every session walks.
    pub catalog: Arc<TreeCatalog>,
    /// Knowledge corpus behind the text analyzer.
    pub corpus: Arc<Corpus>,
    /// Process-wide learning statistics.
    pub tracker: Arc<LearningTracker>,
    /// Analysis entry point.
    pub engine: DiagnosisEngine,
    /// Live decision tree sessions.
    pub tree_sessions: TreeSessions,
}

impl AppState {
    /// Wire analyzers, aggregator and session registry around loaded content.
    pub fn new(config: Config, catalog: TreeCatalog, corpus: Corpus) -> AppResult<Self> {
        config.validate()?;

        let catalog = Arc::new(catalog);
        let corpus = Arc::new(corpus);
        let tracker = Arc::new(LearningTracker::new(config.learning.clone()));

        let mut engine = DiagnosisEngine::new(ResultAggregator::new(Arc::clone(&tracker)))
            .with_analyzer(Arc::new(TextAnalyzer::new(
                Arc::clone(&corpus),
                config.analysis.clone(),
            )));
        for analyzer in media_analyzers(&config)? {
            engine = engine.with_analyzer(analyzer);
        }

        info!(
            nodes = catalog.len(),
            documents = corpus.documents().len(),
            analyzers = ?engine.analyzer_names(),
            "AppState initialized"
        );

        let tree_sessions = TreeSessions::new(Arc::clone(&catalog), Arc::new(LoggingObserver))
            .with_max_sessions(config.sessions.max_sessions);

        Ok(Self {
            config,
            catalog,
            corpus,
            tracker,
            engine,
            tree_sessions,
        })
    }

    /// Load catalog and corpus from the configured paths, or the bundled
    /// defaults when unset.
    pub fn from_config(config: Config) -> AppResult<Self> {
        let (catalog, corpus) = load_content(&config)?;
        Self::new(config, catalog, corpus)
    }
}

/// Load the decision tree and knowledge corpus named by the configuration.
pub fn load_content(config: &Config) -> AppResult<(TreeCatalog, Corpus)> {
    let catalog = match &config.sources.catalog_path {
        Some(path) => TreeCatalog::from_path(path)?,
        None => TreeCatalog::builtin()?,
    };
    let corpus = match &config.sources.corpus_path {
        Some(path) => Corpus::from_path(path)?,
        None => Corpus::builtin()?,
    };
    Ok((catalog, corpus))
}

fn media_analyzers(config: &Config) -> AppResult<Vec<Arc<dyn Analyzer>>> {
    let kinds = [MediaKind::Image, MediaKind::Video, MediaKind::Audio];

    match &config.sources.media_analyzer_url {
        Some(url) => {
            let client = MediaAnalysisClient::new(url, config.request.clone())?;
            info!(url = %client.base_url(), "Using remote media analyzers");
            Ok(kinds
                .into_iter()
                .map(|kind| {
                    Arc::new(RemoteMediaAnalyzer::new(kind, client.clone())) as Arc<dyn Analyzer>
                })
                .collect())
        }
        None => Ok(kinds
            .into_iter()
            .map(|kind| Arc::new(SimulatedMediaAnalyzer::new(kind)) as Arc<dyn Analyzer>)
            .collect()),
    }
}

/// Shared application state handle
pub type SharedState = Arc<AppState>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceConfig;

    #[test]
    fn test_app_state_defaults_to_simulated_media() {
        let state = AppState::from_config(Config::default()).unwrap();

        assert_eq!(
            state.engine.analyzer_names(),
            vec!["text", "media:image", "media:video", "media:audio"]
        );
        assert!(state.catalog.len() > 1);
        assert!(!state.corpus.documents().is_empty());
    }

    #[test]
    fn test_app_state_remote_media() {
        let config = Config {
            sources: SourceConfig {
                media_analyzer_url: Some("http://localhost:9999/".to_string()),
                ..SourceConfig::default()
            },
            ..Config::default()
        };
        let state = AppState::from_config(config).unwrap();
        assert_eq!(state.engine.analyzer_names().len(), 4);
    }

    #[test]
    fn test_missing_catalog_file_fails() {
        let config = Config {
            sources: SourceConfig {
                catalog_path: Some("/nonexistent/catalog.json".into()),
                ..SourceConfig::default()
            },
            ..Config::default()
        };
        assert!(AppState::from_config(config).is_err());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = Config::default();
        config.learning.progress_increment = -5.0;
        assert!(matches!(
            AppState::from_config(config),
            Err(crate::error::AppError::Config { .. })
        ));
    }

    #[tokio::test]
    async fn test_tracker_is_shared_with_engine() {
        let state = AppState::from_config(Config::default()).unwrap();
        assert!(Arc::ptr_eq(&state.tracker, state.engine.tracker()));
    }
}
