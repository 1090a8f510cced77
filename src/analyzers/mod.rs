//! Analyzer implementations.
//!
//! Every analyzer turns one kind of evidence into zero or more
//! [`DiagnosisResult`]s behind the uniform async [`Analyzer`] contract:
//! - [`TextAnalyzer`]: keyword matching against the knowledge corpus
//! - [`SimulatedMediaAnalyzer`] / [`RemoteMediaAnalyzer`]: image, video and audio
//! - [`TreeAnalyzer`]: reports a decision tree session's position
//! - [`FixedAnalyzer`]: deterministic canned results
//!
//! Analyzers may fail; the engine turns a failure into an empty
//! contribution so one broken analyzer never sinks a session.

mod fixed;
mod media;
mod remote;
mod text;
mod tree;

pub use fixed::*;
pub use media::*;
pub use remote::*;
pub use text::*;
pub use tree::*;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::diagnosis::DiagnosisResult;
use crate::error::AnalyzerResult;

/// Produces diagnosis candidates from evidence.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Analyze the evidence. All-or-nothing: either every result or an error.
    async fn analyze(&self, evidence: &Evidence) -> AnalyzerResult<Vec<DiagnosisResult>>;
}

/// Kind of media an artifact carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
}

impl MediaKind {
    /// Classify by MIME top-level type. Other types are not media evidence.
    pub fn from_mime(mime_type: &str) -> Option<Self> {
        let top = mime_type.split('/').next()?.trim().to_lowercase();
        match top.as_str() {
            "image" => Some(MediaKind::Image),
            "video" => Some(MediaKind::Video),
            "audio" => Some(MediaKind::Audio),
            _ => None,
        }
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Opaque description of an uploaded file. The core never reads its bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaArtifact {
    pub name: String,
    pub mime_type: String,
    #[serde(default)]
    pub size_bytes: u64,
}

impl MediaArtifact {
    /// Create an artifact descriptor.
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            size_bytes,
        }
    }

    /// Media kind, if the MIME type is image, video or audio.
    pub fn kind(&self) -> Option<MediaKind> {
        MediaKind::from_mime(&self.mime_type)
    }
}

/// Everything the user submitted for one session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default)]
    pub artifacts: Vec<MediaArtifact>,
}

impl Evidence {
    /// Evidence consisting of free text only.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            artifacts: Vec::new(),
        }
    }

    /// Add an artifact.
    pub fn with_artifact(mut self, artifact: MediaArtifact) -> Self {
        self.artifacts.push(artifact);
        self
    }

    /// The text, if it has any non-whitespace content.
    pub fn non_blank_text(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.trim().is_empty())
    }

    /// Artifacts of one media kind.
    pub fn artifacts_of(&self, kind: MediaKind) -> impl Iterator<Item = &MediaArtifact> {
        self.artifacts.iter().filter(move |a| a.kind() == Some(kind))
    }

    /// True when there is neither text nor any artifact.
    pub fn is_empty(&self) -> bool {
        self.non_blank_text().is_none() && self.artifacts.is_empty()
    }
}
