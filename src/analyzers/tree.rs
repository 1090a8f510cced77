use async_trait::async_trait;
use uuid::Uuid;

use super::{Analyzer, Evidence};
use crate::diagnosis::{DecisionTraceStep, DiagnosisResult, SourceType};
use crate::error::AnalyzerResult;
use crate::knowledge::KnowledgeDocument;
use crate::tree::SharedWalker;

/// Reports a decision tree session as a diagnosis candidate.
///
/// Produces a single result once at least one option has been selected,
/// nothing before that. Confidence is the walker's running product scaled to
/// 0-100 and the result carries one trace step per selected option.
#[derive(Clone)]
pub struct TreeAnalyzer {
    walker: SharedWalker,
}

impl TreeAnalyzer {
    pub fn new(walker: SharedWalker) -> Self {
        Self { walker }
    }
}

#[async_trait]
impl Analyzer for TreeAnalyzer {
    fn name(&self) -> &'static str {
        "decision_tree"
    }

    async fn analyze(&self, _evidence: &Evidence) -> AnalyzerResult<Vec<DiagnosisResult>> {
        let walker = self.walker.lock().await;
        if walker.path().is_empty() {
            return Ok(Vec::new());
        }

        let overall = walker.overall_confidence();
        let trace: Vec<DecisionTraceStep> = walker
            .path()
            .iter()
            .map(|entry| DecisionTraceStep {
                step: entry.selected_option.label.clone(),
                confidence: entry.confidence * 100.0,
            })
            .collect();
        let labels: Vec<String> = walker
            .path()
            .iter()
            .map(|entry| entry.selected_option.label.clone())
            .collect();

        let (title, steps, tags) = match walker.solution() {
            Some(solution) => (
                solution.title.clone(),
                solution.steps.clone(),
                vec!["决策树".to_string(), solution.severity.to_string()],
            ),
            None if walker.is_complete() => (
                "决策树诊断未得出方案".to_string(),
                Vec::new(),
                vec!["决策树".to_string()],
            ),
            None => (
                format!("决策树诊断进行中: {}", walker.current_node().question),
                Vec::new(),
                vec!["决策树".to_string()],
            ),
        };

        let document = KnowledgeDocument::new(
            format!("decision-tree-{}", Uuid::new_v4()),
            title,
            "基于决策树路径的诊断分析",
            "智能诊断",
        )
        .with_tags(tags);

        let result = DiagnosisResult::new(document, SourceType::DecisionTree, overall * 100.0)
            .with_relevance(overall)
            .with_keywords(labels)
            .with_steps(steps)
            .with_decision_path(trace);

        Ok(vec![result])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{TreeCatalog, TreeWalker};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    fn shared_walker() -> SharedWalker {
        let catalog = Arc::new(TreeCatalog::builtin().unwrap());
        Arc::new(Mutex::new(TreeWalker::new(catalog)))
    }

    #[tokio::test]
    async fn test_untouched_walker_yields_nothing() {
        let analyzer = TreeAnalyzer::new(shared_walker());
        assert!(analyzer.analyze(&Evidence::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_in_progress_walker() {
        let walker = shared_walker();
        walker.lock().await.select_option("abnormal_sound").unwrap();

        let results = TreeAnalyzer::new(Arc::clone(&walker))
            .analyze(&Evidence::default())
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        let result = &results[0];
        assert_eq!(result.source_type, SourceType::DecisionTree);
        assert!((result.confidence - 90.0).abs() < 1e-9);
        assert!(result.document.title.starts_with("决策树诊断进行中"));
        let trace = result.decision_path.as_ref().unwrap();
        assert_eq!(trace.len(), 1);
        assert!((trace[0].confidence - 90.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_completed_walker_reports_solution() {
        let walker = shared_walker();
        let (solution_title, expected) = {
            let mut w = walker.lock().await;
            w.select_option("abnormal_sound").unwrap();
            let option = w.current_node().options[0].clone();
            w.select_option(&option.id).unwrap();
            while !w.is_complete() {
                let next = w.current_node().options[0].id.clone();
                w.select_option(&next).unwrap();
            }
            (
                w.solution().map(|s| s.title.clone()),
                w.overall_confidence() * 100.0,
            )
        };

        let results = TreeAnalyzer::new(walker)
            .analyze(&Evidence::default())
            .await
            .unwrap();

        let result = &results[0];
        assert_eq!(Some(result.document.title.clone()), solution_title);
        assert!((result.confidence - expected).abs() < 1e-9);
        assert!(!result.solution_steps.is_empty());
    }

    #[tokio::test]
    async fn test_dead_end_walker_reports_no_solution() {
        let catalog = TreeCatalog::from_json_str(
            r#"{
                "root": "start",
                "nodes": [
                    {"id": "start", "question": "症状？", "confidence": 1.0,
                     "options": [
                        {"id": "known", "label": "异响", "value": "异响", "next_node_id": "fix", "confidence": 0.9},
                        {"id": "unsure", "label": "说不清", "value": "无法描述", "confidence": 0.4}
                     ]},
                    {"id": "fix", "question": "轴承损坏", "confidence": 1.0, "is_leaf": true,
                     "solution": {"title": "更换轴承", "steps": ["更换"], "severity": "high", "estimated_time": "2h"}}
                ]
            }"#,
        )
        .unwrap();
        let walker = Arc::new(Mutex::new(TreeWalker::new(Arc::new(catalog))));
        walker.lock().await.select_option("unsure").unwrap();
        assert!(walker.lock().await.is_complete());

        let results = TreeAnalyzer::new(walker)
            .analyze(&Evidence::default())
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        let result = &results[0];
        assert_eq!(result.document.title, "决策树诊断未得出方案");
        assert!(result.solution_steps.is_empty());
        assert_eq!(result.matched_keywords, vec!["说不清"]);
        assert!((result.confidence - 40.0).abs() < 1e-9);
        assert_eq!(result.document.tags, vec!["决策树"]);
    }
}
