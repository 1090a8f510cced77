//! Diagnosis result types shared by analyzers and the aggregator.

use serde::{Deserialize, Serialize};

use crate::knowledge::KnowledgeDocument;

/// Where a diagnosis candidate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// Keyword match against the knowledge corpus.
    KnowledgeBase,
    /// A media analysis service.
    ExternalApi,
    /// Decision tree traversal.
    DecisionTree,
}

impl SourceType {
    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::KnowledgeBase => "knowledge_base",
            SourceType::ExternalApi => "external_api",
            SourceType::DecisionTree => "decision_tree",
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One step of a decision tree trace attached to a result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTraceStep {
    /// Human-readable step label.
    pub step: String,
    /// Step confidence (0-100).
    pub confidence: f64,
}

/// A ranked diagnosis candidate. Immutable once an analyzer emits it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisResult {
    /// Source document or finding descriptor.
    pub document: KnowledgeDocument,
    /// Relevance (0.0-1.0).
    pub relevance_score: f64,
    /// Keywords that matched, unique, in first-match order.
    pub matched_keywords: Vec<String>,
    /// Ordered remediation steps.
    pub solution_steps: Vec<String>,
    /// Documents related to `document`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_documents: Vec<KnowledgeDocument>,
    /// Which kind of analyzer produced this result.
    pub source_type: SourceType,
    /// Confidence (0-100). The ranking key.
    pub confidence: f64,
    /// Step trace, present for decision tree results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_path: Option<Vec<DecisionTraceStep>>,
}

impl DiagnosisResult {
    /// Create a result with no keywords, steps or trace.
    pub fn new(document: KnowledgeDocument, source_type: SourceType, confidence: f64) -> Self {
        Self {
            document,
            relevance_score: (confidence / 100.0).clamp(0.0, 1.0),
            matched_keywords: Vec::new(),
            solution_steps: Vec::new(),
            related_documents: Vec::new(),
            source_type,
            confidence: confidence.clamp(0.0, 100.0),
            decision_path: None,
        }
    }

    /// Set the relevance score (clamped to 0.0-1.0).
    pub fn with_relevance(mut self, relevance: f64) -> Self {
        self.relevance_score = relevance.clamp(0.0, 1.0);
        self
    }

    /// Set matched keywords, dropping repeats but keeping first-seen order.
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for keyword in keywords {
            let keyword = keyword.into();
            if !unique.contains(&keyword) {
                unique.push(keyword);
            }
        }
        self.matched_keywords = unique;
        self
    }

    /// Set remediation steps.
    pub fn with_steps<I, S>(mut self, steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.solution_steps = steps.into_iter().map(Into::into).collect();
        self
    }

    /// Set related documents.
    pub fn with_related(mut self, related: Vec<KnowledgeDocument>) -> Self {
        self.related_documents = related;
        self
    }

    /// Attach a decision trace.
    pub fn with_decision_path(mut self, path: Vec<DecisionTraceStep>) -> Self {
        self.decision_path = Some(path);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn doc() -> KnowledgeDocument {
        KnowledgeDocument::new("d", "Doc", "content", "mechanical")
    }

    #[test]
    fn test_keywords_deduplicated_in_order() {
        let result = DiagnosisResult::new(doc(), SourceType::KnowledgeBase, 45.0)
            .with_keywords(["异响", "磨损", "异响", "润滑"]);
        assert_eq!(result.matched_keywords, vec!["异响", "磨损", "润滑"]);
    }

    #[test]
    fn test_new_clamps_confidence() {
        let result = DiagnosisResult::new(doc(), SourceType::ExternalApi, 140.0);
        assert_eq!(result.confidence, 100.0);
        assert_eq!(result.relevance_score, 1.0);
    }

    #[test]
    fn test_source_type_serialization() {
        let json = serde_json::to_value(SourceType::DecisionTree).unwrap();
        assert_eq!(json, "decision_tree");
        assert_eq!(SourceType::KnowledgeBase.to_string(), "knowledge_base");
    }

    #[test]
    fn test_decision_path_omitted_when_absent() {
        let result = DiagnosisResult::new(doc(), SourceType::KnowledgeBase, 50.0);
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("decision_path").is_none());
        assert!(json.get("related_documents").is_none());
    }
}
