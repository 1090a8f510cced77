use std::env;
use std::path::PathBuf;

use crate::error::AppError;

const MAX_RETRIES_LIMIT: u32 = 20;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub sources: SourceConfig,
    pub logging: LoggingConfig,
    pub request: RequestConfig,
    pub analysis: AnalysisConfig,
    pub learning: LearningConfig,
    pub sessions: SessionConfig,
}

/// Where the decision tree and the knowledge corpus come from.
///
/// `None` selects the bundled default content.
#[derive(Debug, Clone, Default)]
pub struct SourceConfig {
    pub catalog_path: Option<PathBuf>,
    pub corpus_path: Option<PathBuf>,
    /// Base URL of a remote media analysis service. Simulated media
    /// analyzers are used when unset.
    pub media_analyzer_url: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// HTTP request configuration
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

/// Keyword scoring parameters for the text analyzer
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    /// Added to a document's relevance for every matched keyword.
    pub relevance_increment: f64,
    /// A document is reported only when relevance is strictly above this.
    pub relevance_threshold: f64,
}

/// Learning tracker parameters
#[derive(Debug, Clone, PartialEq)]
pub struct LearningConfig {
    pub window_size: usize,
    /// Mean confidence (0-100) a session must exceed to count as successful.
    pub success_threshold: f64,
    pub progress_increment: f64,
}

/// Tree session registry limits.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Live sessions kept before the least recently used one is evicted.
    pub max_sessions: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let sources = SourceConfig {
            catalog_path: non_empty_var("DIAGNOSIS_CATALOG_PATH").map(PathBuf::from),
            corpus_path: non_empty_var("DIAGNOSIS_CORPUS_PATH").map(PathBuf::from),
            media_analyzer_url: non_empty_var("MEDIA_ANALYZER_URL"),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        let defaults = RequestConfig::default();
        let request = RequestConfig {
            timeout_ms: parsed_var("REQUEST_TIMEOUT_MS").unwrap_or(defaults.timeout_ms),
            max_retries: parsed_var("MAX_RETRIES").unwrap_or(defaults.max_retries),
            retry_delay_ms: parsed_var("RETRY_DELAY_MS").unwrap_or(defaults.retry_delay_ms),
        };

        let defaults = AnalysisConfig::default();
        let analysis = AnalysisConfig {
            relevance_increment: parsed_var("TEXT_RELEVANCE_INCREMENT")
                .unwrap_or(defaults.relevance_increment),
            relevance_threshold: parsed_var("TEXT_RELEVANCE_THRESHOLD")
                .unwrap_or(defaults.relevance_threshold),
        };

        let defaults = LearningConfig::default();
        let learning = LearningConfig {
            window_size: parsed_var("LEARNING_WINDOW_SIZE").unwrap_or(defaults.window_size),
            success_threshold: parsed_var("LEARNING_SUCCESS_THRESHOLD")
                .unwrap_or(defaults.success_threshold),
            progress_increment: parsed_var("LEARNING_PROGRESS_INCREMENT")
                .unwrap_or(defaults.progress_increment),
        };

        let defaults = SessionConfig::default();
        let sessions = SessionConfig {
            max_sessions: parsed_var("TREE_MAX_SESSIONS").unwrap_or(defaults.max_sessions),
        };

        let config = Config {
            sources,
            logging,
            request,
            analysis,
            learning,
            sessions,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the tunables that scoring, learning and the session registry
    /// rely on.
    pub fn validate(&self) -> Result<(), AppError> {
        let analysis = &self.analysis;
        let learning = &self.learning;

        if self.request.max_retries > MAX_RETRIES_LIMIT {
            return Err(config_error(format!(
                "MAX_RETRIES must be at most {}, got {}",
                MAX_RETRIES_LIMIT, self.request.max_retries
            )));
        }
        if learning.window_size == 0 {
            return Err(config_error("LEARNING_WINDOW_SIZE must be at least 1"));
        }
        if self.sessions.max_sessions == 0 {
            return Err(config_error("TREE_MAX_SESSIONS must be at least 1"));
        }
        if !(analysis.relevance_increment.is_finite() && analysis.relevance_increment > 0.0) {
            return Err(config_error(format!(
                "TEXT_RELEVANCE_INCREMENT must be a positive number, got {}",
                analysis.relevance_increment
            )));
        }
        if !(0.0..=1.0).contains(&analysis.relevance_threshold) {
            return Err(config_error(format!(
                "TEXT_RELEVANCE_THRESHOLD must be within [0, 1], got {}",
                analysis.relevance_threshold
            )));
        }
        if !(0.0..=100.0).contains(&learning.success_threshold) {
            return Err(config_error(format!(
                "LEARNING_SUCCESS_THRESHOLD must be within [0, 100], got {}",
                learning.success_threshold
            )));
        }
        if !(learning.progress_increment.is_finite() && learning.progress_increment > 0.0) {
            return Err(config_error(format!(
                "LEARNING_PROGRESS_INCREMENT must be a positive number, got {}",
                learning.progress_increment
            )));
        }
        Ok(())
    }
}

fn config_error(message: impl Into<String>) -> AppError {
    AppError::Config {
        message: message.into(),
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30000,
            max_retries: 3,
            retry_delay_ms: 1000,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            relevance_increment: 0.15,
            relevance_threshold: 0.3,
        }
    }
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            window_size: 5,
            success_threshold: 70.0,
            progress_increment: 0.1,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { max_sessions: 256 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_nan_and_non_positive_increments() {
        for increment in [f64::NAN, f64::INFINITY, 0.0, -0.15] {
            let mut config = Config::default();
            config.analysis.relevance_increment = increment;
            assert!(config.validate().is_err(), "accepted {increment}");

            let mut config = Config::default();
            config.learning.progress_increment = increment;
            assert!(config.validate().is_err(), "accepted {increment}");
        }
    }

    #[test]
    fn test_validate_checks_threshold_ranges() {
        let mut config = Config::default();
        config.analysis.relevance_threshold = f64::NAN;
        assert!(config.validate().is_err());
        config.analysis.relevance_threshold = 1.5;
        assert!(config.validate().is_err());
        config.analysis.relevance_threshold = 0.0;
        assert!(config.validate().is_ok());

        config.learning.success_threshold = 101.0;
        assert!(config.validate().is_err());
        config.learning.success_threshold = -1.0;
        assert!(config.validate().is_err());
        config.learning.success_threshold = 100.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_bounds_retries() {
        let mut config = Config::default();
        config.request.max_retries = 20;
        assert!(config.validate().is_ok());
        config.request.max_retries = 65;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_session_registry() {
        let mut config = Config::default();
        config.sessions.max_sessions = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_analysis_defaults() {
        let config = AnalysisConfig::default();
        assert!((config.relevance_increment - 0.15).abs() < f64::EPSILON);
        assert!((config.relevance_threshold - 0.3).abs() < f64::EPSILON);
    }

    #[test]
    fn test_learning_defaults() {
        let config = LearningConfig::default();
        assert_eq!(config.window_size, 5);
        assert!((config.success_threshold - 70.0).abs() < f64::EPSILON);
        assert!((config.progress_increment - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn test_default_sources_use_bundled_content() {
        let config = Config::default();
        assert!(config.sources.catalog_path.is_none());
        assert!(config.sources.corpus_path.is_none());
        assert!(config.sources.media_analyzer_url.is_none());
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }
}
