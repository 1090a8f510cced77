use std::path::PathBuf;

use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Corpus error: {0}")]
    Corpus(#[from] CorpusError),

    #[error("Traversal error: {0}")]
    Traversal(#[from] TraversalError),

    #[error("Analyzer error: {0}")]
    Analyzer(#[from] AnalyzerError),

    #[error("MCP protocol error: {0}")]
    Mcp(#[from] McpError),
}

/// Decision tree catalog errors.
///
/// Everything except `NotFound` is raised while the catalog is being built
/// and is fatal before any session starts.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Node not found: {node_id}")]
    NotFound { node_id: String },

    #[error("Integrity violation: {message}")]
    Integrity { message: String },

    #[error("Catalog parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Knowledge corpus errors
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("Corpus parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Failed to read corpus {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Duplicate document id: {id}")]
    DuplicateDocument { id: String },
}

/// Errors raised by a single tree session.
///
/// A failed traversal call leaves the walker untouched.
#[derive(Debug, Error)]
pub enum TraversalError {
    #[error("Option {option_id} does not belong to node {node_id}")]
    InvalidOption { node_id: String, option_id: String },

    #[error("Session already complete, reset before selecting again")]
    SessionComplete,

    #[error("Tree session not found: {session_id}")]
    SessionNotFound { session_id: String },

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Analyzer failures. Converted to an empty contribution at the
/// engine boundary, never propagated past aggregation.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("Analyzer unavailable: {message} (retries: {retries})")]
    Unavailable { message: String, retries: u32 },

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// MCP protocol errors
#[derive(Debug, Error)]
pub enum McpError {
    #[error("Unknown tool: {tool_name}")]
    UnknownTool { tool_name: String },

    #[error("Invalid parameters for {tool_name}: {message}")]
    InvalidParameters { tool_name: String, message: String },

    #[error("Tool execution failed: {message}")]
    ExecutionFailed { message: String },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<AppError> for McpError {
    fn from(err: AppError) -> Self {
        McpError::ExecutionFailed {
            message: err.to_string(),
        }
    }
}

impl From<TraversalError> for McpError {
    fn from(err: TraversalError) -> Self {
        McpError::ExecutionFailed {
            message: err.to_string(),
        }
    }
}

impl From<CatalogError> for McpError {
    fn from(err: CatalogError) -> Self {
        McpError::ExecutionFailed {
            message: err.to_string(),
        }
    }
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Result type alias for corpus loading
pub type CorpusResult<T> = Result<T, CorpusError>;

/// Result type alias for tree traversal
pub type TraversalResult<T> = Result<T, TraversalError>;

/// Result type alias for analyzer invocations
pub type AnalyzerResult<T> = Result<T, AnalyzerError>;

/// Result type alias for MCP operations
pub type McpResult<T> = Result<T, McpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::Config {
            message: "window size must be positive".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Configuration error: window size must be positive"
        );
    }

    #[test]
    fn test_catalog_error_display() {
        let err = CatalogError::NotFound {
            node_id: "bearing_check".to_string(),
        };
        assert_eq!(err.to_string(), "Node not found: bearing_check");

        let err = CatalogError::Integrity {
            message: "option a -> missing".to_string(),
        };
        assert_eq!(err.to_string(), "Integrity violation: option a -> missing");
    }

    #[test]
    fn test_catalog_io_error_keeps_path() {
        let err = CatalogError::Io {
            path: PathBuf::from("/nope/catalog.json"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert!(err.to_string().contains("/nope/catalog.json"));
    }

    #[test]
    fn test_traversal_error_display() {
        let err = TraversalError::InvalidOption {
            node_id: "root".to_string(),
            option_id: "bogus".to_string(),
        };
        assert_eq!(err.to_string(), "Option bogus does not belong to node root");

        let err = TraversalError::SessionNotFound {
            session_id: "sess-1".to_string(),
        };
        assert_eq!(err.to_string(), "Tree session not found: sess-1");
    }

    #[test]
    fn test_analyzer_error_display() {
        let err = AnalyzerError::Unavailable {
            message: "server down".to_string(),
            retries: 3,
        };
        assert_eq!(err.to_string(), "Analyzer unavailable: server down (retries: 3)");

        let err = AnalyzerError::Api {
            status: 503,
            message: "busy".to_string(),
        };
        assert_eq!(err.to_string(), "API error: 503 - busy");

        let err = AnalyzerError::Timeout { timeout_ms: 5000 };
        assert_eq!(err.to_string(), "Request timeout after 5000ms");
    }

    #[test]
    fn test_mcp_error_display() {
        let err = McpError::UnknownTool {
            tool_name: "nonexistent".to_string(),
        };
        assert_eq!(err.to_string(), "Unknown tool: nonexistent");

        let err = McpError::InvalidParameters {
            tool_name: "tree_select".to_string(),
            message: "missing option_id".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid parameters for tree_select: missing option_id"
        );
    }

    #[test]
    fn test_traversal_error_conversion_to_mcp_error() {
        let err: McpError = TraversalError::SessionComplete.into();
        assert!(matches!(err, McpError::ExecutionFailed { .. }));
        assert!(err.to_string().contains("already complete"));
    }

    #[test]
    fn test_catalog_error_conversion_to_app_error() {
        let err: AppError = CatalogError::NotFound {
            node_id: "x".to_string(),
        }
        .into();
        assert!(matches!(err, AppError::Catalog(_)));
    }

    #[test]
    fn test_app_error_conversion_to_mcp_error() {
        let app_err = AppError::Config {
            message: "test error".to_string(),
        };
        let mcp_err: McpError = app_err.into();
        assert!(matches!(mcp_err, McpError::ExecutionFailed { .. }));
        assert!(mcp_err.to_string().contains("Configuration error"));
    }
}
