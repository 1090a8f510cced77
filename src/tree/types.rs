//! Data types for decision trees and traversal history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity of a diagnosed fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Can be scheduled with routine maintenance.
    Low,
    /// Should be handled soon.
    Medium,
    /// Stop the equipment.
    High,
}

impl Severity {
    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            _ => Err(format!("Unknown severity: {}", s)),
        }
    }
}

/// Remediation attached to a leaf node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    /// Name of the diagnosed fault.
    pub title: String,
    /// Ordered remediation steps.
    pub steps: Vec<String>,
    /// How urgent the fault is.
    pub severity: Severity,
    /// Free-form duration estimate, e.g. "2-4h".
    pub estimated_time: String,
}

/// One answer to a decision node's question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionOption {
    /// Identifier, unique within its node.
    pub id: String,
    /// Short label shown to the user.
    pub label: String,
    /// Longer description of what choosing this option means.
    pub value: String,
    /// Node reached by choosing this option.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_node_id: Option<String>,
    /// Conditional certainty of this branch (0.0-1.0).
    pub confidence: f64,
}

/// A question in the decision tree, or a leaf carrying a solution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionNode {
    /// Unique node identifier.
    pub id: String,
    /// Question asked at this node.
    pub question: String,
    /// Optional guidance for answering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Answers, in display order. Empty for leaves.
    #[serde(default)]
    pub options: Vec<DecisionOption>,
    /// A priori confidence of this node (0.0-1.0).
    pub confidence: f64,
    /// Terminal node flag.
    #[serde(default)]
    pub is_leaf: bool,
    /// Present exactly when `is_leaf` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution: Option<Solution>,
}

impl DecisionNode {
    /// Find one of this node's options by id.
    pub fn find_option(&self, option_id: &str) -> Option<&DecisionOption> {
        self.options.iter().find(|o| o.id == option_id)
    }
}

/// One recorded traversal step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathEntry {
    /// Node the step was taken from.
    pub node_id: String,
    /// Question that was answered.
    pub question: String,
    /// The chosen option.
    pub selected_option: DecisionOption,
    /// Confidence of the chosen option.
    pub confidence: f64,
    /// When the choice was made.
    pub timestamp: DateTime<Utc>,
}

/// Payload handed to the host when a traversal reaches a leaf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionEvent {
    /// Full traversal history.
    pub path: Vec<PathEntry>,
    /// Solution of the leaf reached.
    pub solution: Solution,
    /// Product of all selected option confidences.
    pub confidence: f64,
    /// Always `true`.
    pub completed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_severity_round_trips_through_str() {
        for severity in [Severity::Low, Severity::Medium, Severity::High] {
            assert_eq!(severity.as_str().parse::<Severity>().unwrap(), severity);
        }
        assert!("critical".parse::<Severity>().is_err());
        assert_eq!("HIGH".parse::<Severity>().unwrap(), Severity::High);
    }

    #[test]
    fn test_node_deserializes_with_defaults() {
        let node: DecisionNode = serde_json::from_str(
            r#"{"id":"n","question":"q?","confidence":0.5,
                "options":[{"id":"a","label":"A","value":"a","confidence":0.9}]}"#,
        )
        .unwrap();

        assert!(!node.is_leaf);
        assert!(node.solution.is_none());
        assert!(node.description.is_none());
        assert_eq!(node.options[0].next_node_id, None);
    }

    #[test]
    fn test_find_option() {
        let node = DecisionNode {
            id: "n".to_string(),
            question: "q".to_string(),
            description: None,
            options: vec![DecisionOption {
                id: "a".to_string(),
                label: "A".to_string(),
                value: "a".to_string(),
                next_node_id: None,
                confidence: 0.5,
            }],
            confidence: 1.0,
            is_leaf: false,
            solution: None,
        };

        assert_eq!(node.find_option("a").map(|o| o.label.as_str()), Some("A"));
        assert!(node.find_option("b").is_none());
    }

    #[test]
    fn test_solution_severity_serializes_lowercase() {
        let solution = Solution {
            title: "Bearing fault".to_string(),
            steps: vec!["Stop".to_string()],
            severity: Severity::High,
            estimated_time: "2-4h".to_string(),
        };
        let json = serde_json::to_value(&solution).unwrap();
        assert_eq!(json["severity"], "high");
    }
}
