use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{Analyzer, Evidence};
use crate::config::AnalysisConfig;
use crate::diagnosis::{DiagnosisResult, SourceType};
use crate::error::AnalyzerResult;
use crate::knowledge::Corpus;

/// Keyword matcher over the knowledge corpus.
///
/// Relevance grows by a fixed increment for every taxonomy listing found in
/// the text (case-insensitive substring containment, no tokenizing) and is
/// capped at 1.0. A keyword listed under two categories counts twice.
/// Documents are reported only when relevance is strictly above the
/// threshold, so with the default settings two matches are not enough.
#[derive(Debug, Clone)]
pub struct TextAnalyzer {
    corpus: Arc<Corpus>,
    config: AnalysisConfig,
}

/// Raw keyword score for one piece of text.
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordScore {
    /// Accumulated relevance before capping.
    pub raw: f64,
    /// Matched keywords in taxonomy order, repeats included.
    pub matched: Vec<String>,
}

impl KeywordScore {
    /// Relevance capped at 1.0.
    pub fn relevance(&self) -> f64 {
        self.raw.min(1.0)
    }
}

impl TextAnalyzer {
    /// Create a text analyzer over a corpus.
    pub fn new(corpus: Arc<Corpus>, config: AnalysisConfig) -> Self {
        Self { corpus, config }
    }

    /// Score text against the taxonomy.
    pub fn score(&self, text: &str) -> KeywordScore {
        let text_lower = text.to_lowercase();
        let mut raw = 0.0;
        let mut matched = Vec::new();

        for keyword in self.corpus.taxonomy().keywords() {
            if keyword.is_empty() {
                continue;
            }
            if text_lower.contains(&keyword.to_lowercase()) {
                raw += self.config.relevance_increment;
                matched.push(keyword.to_string());
            }
        }

        KeywordScore { raw, matched }
    }
}

#[async_trait]
impl Analyzer for TextAnalyzer {
    fn name(&self) -> &'static str {
        "text"
    }

    async fn analyze(&self, evidence: &Evidence) -> AnalyzerResult<Vec<DiagnosisResult>> {
        let Some(text) = evidence.non_blank_text() else {
            return Ok(Vec::new());
        };

        let score = self.score(text);
        if score.raw <= self.config.relevance_threshold {
            debug!(
                relevance = score.raw,
                threshold = self.config.relevance_threshold,
                matched = score.matched.len(),
                "Text relevance below threshold"
            );
            return Ok(Vec::new());
        }

        let relevance = score.relevance();
        let results: Vec<DiagnosisResult> = self
            .corpus
            .documents()
            .iter()
            .map(|doc| {
                DiagnosisResult::new(doc.clone(), SourceType::KnowledgeBase, relevance * 100.0)
                    .with_relevance(relevance)
                    .with_keywords(score.matched.iter().cloned())
                    .with_steps(doc.remediation_steps())
                    .with_related(self.corpus.related_to(doc))
            })
            .collect();

        debug!(
            relevance = relevance,
            documents = results.len(),
            "Text analysis matched corpus"
        );

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::{KeywordTaxonomy, KnowledgeDocument};
    use pretty_assertions::assert_eq;

    fn analyzer() -> TextAnalyzer {
        let taxonomy = KeywordTaxonomy::default()
            .with_category("mechanical", ["异响", "磨损", "轴承"])
            .with_category("electrical", ["短路", "BMS"])
            .with_category("battery", ["温度"])
            .with_category("safety", ["温度"]);
        let docs = vec![
            KnowledgeDocument::new("a", "轴承维护", "content", "mechanical"),
            KnowledgeDocument::new("b", "电池管理", "content", "battery")
                .with_solution_steps(["断电", "检查"]),
        ];
        let corpus = Corpus::new(taxonomy, docs).unwrap();
        TextAnalyzer::new(Arc::new(corpus), AnalysisConfig::default())
    }

    #[tokio::test]
    async fn test_two_matches_sit_on_threshold_and_are_excluded() {
        let results = analyzer()
            .analyze(&Evidence::text("电机有异响，怀疑轴承问题"))
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_three_matches_are_included() {
        let results = analyzer()
            .analyze(&Evidence::text("异响明显，轴承磨损"))
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        for result in &results {
            assert!((result.confidence - 45.0).abs() < 1e-9);
            assert!((result.relevance_score - 0.45).abs() < 1e-9);
            assert_eq!(result.source_type, SourceType::KnowledgeBase);
            assert_eq!(result.matched_keywords, vec!["异响", "磨损", "轴承"]);
        }
        assert_eq!(results[0].document.id, "a");
        assert_eq!(results[1].solution_steps, vec!["断电", "检查"]);
    }

    #[test]
    fn test_repeated_listing_counts_twice() {
        let score = analyzer().score("温度过高");
        assert_eq!(score.matched, vec!["温度", "温度"]);
        assert!((score.raw - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_matching_ignores_case() {
        let score = analyzer().score("bms reports fault");
        assert_eq!(score.matched, vec!["BMS"]);
    }

    #[test]
    fn test_relevance_is_capped() {
        let score = analyzer().score("异响 磨损 轴承 短路 BMS 温度");
        assert!(score.raw > 1.0);
        assert_eq!(score.relevance(), 1.0);
    }

    #[tokio::test]
    async fn test_blank_text_yields_nothing() {
        let results = analyzer().analyze(&Evidence::text("  ")).await.unwrap();
        assert!(results.is_empty());
        let results = analyzer().analyze(&Evidence::default()).await.unwrap();
        assert!(results.is_empty());
    }
}
