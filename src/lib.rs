//! # MCP Fault Diagnosis Server
//!
//! A Model Context Protocol (MCP) server wrapping an equipment fault
//! diagnosis engine.
//!
//! ## Features
//!
//! - **Decision trees**: guided question/answer traversal with compounding confidence
//! - **Text analysis**: keyword matching of free-text symptoms against a knowledge corpus
//! - **Media analysis**: image, video and audio findings from simulated or remote analyzers
//! - **Ranking**: concurrent analyzers merged into one confidence-ordered list
//! - **Learning metrics**: rolling accuracy and progress statistics across sessions
//!
//! ## Architecture
//!
//! ```text
//! MCP Client → McpServer → DiagnosisEngine ─┬→ TextAnalyzer  (Corpus)
//!                  │                         ├→ Media analyzers (HTTP or simulated)
//!                  │                         └→ TreeAnalyzer  (TreeWalker)
//!                  └→ TreeSessions → TreeWalker → TreeCatalog
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use mcp_fault_diagnosis::{AppState, Config, McpServer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let state = Arc::new(AppState::from_config(config)?);
//!     McpServer::new(state).run().await?;
//!     Ok(())
//! }
//! ```

/// Analyzer contract and implementations.
pub mod analyzers;
/// Configuration management for the MCP server.
pub mod config;
/// Result types, ranking, learning statistics and the session engine.
pub mod diagnosis;
/// Error types and result aliases for the application.
pub mod error;
/// Knowledge documents and the keyword taxonomy.
pub mod knowledge;
/// MCP server implementation and request handling.
pub mod server;
/// Decision tree catalog, walker and session registry.
pub mod tree;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use server::{AppState, McpServer, SharedState};
