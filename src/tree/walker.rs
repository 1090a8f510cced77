//! Stateful traversal over a [`TreeCatalog`].
//!
//! A walker is either `Walking` (standing on a question node) or `Complete`
//! (a leaf was reached, or a dead-end option was chosen). Confidence is the
//! running product of every selected option's confidence, so it can only
//! shrink as the path grows.
//!
//! ```text
//! Walking ──select(non-leaf target)──▶ Walking
//! Walking ──select(leaf target)──────▶ Complete (observer notified once)
//! Walking ──select(no target)────────▶ Complete (no solution)
//! Complete ──reset()─────────────────▶ Walking at root
//! ```

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::catalog::TreeCatalog;
use super::types::{CompletionEvent, DecisionNode, PathEntry, Solution};
use crate::error::{TraversalError, TraversalResult};

/// Receives the completion notification when a walker reaches a leaf.
#[cfg_attr(test, mockall::automock)]
pub trait CompletionObserver: Send + Sync {
    /// Called exactly once per traversal that reaches a leaf.
    fn on_complete(&self, event: &CompletionEvent);
}

/// Observer that records completions in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver;

impl CompletionObserver for LoggingObserver {
    fn on_complete(&self, event: &CompletionEvent) {
        info!(
            solution = %event.solution.title,
            severity = %event.solution.severity,
            steps = event.path.len(),
            confidence = event.confidence,
            "Decision tree diagnosis completed"
        );
    }
}

/// Traversal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalkerState {
    /// Waiting for an answer at the current node.
    Walking,
    /// Terminal until reset.
    Complete,
}

/// What a successful `select_option` call did.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StepOutcome {
    /// Moved to another question node.
    Advanced {
        /// The new current node.
        node_id: String,
        /// Running confidence after this step.
        confidence: f64,
    },
    /// Reached a leaf.
    Completed(CompletionEvent),
    /// The option had no target; the session ends without a solution.
    Exhausted {
        /// Running confidence after this step.
        confidence: f64,
    },
}

/// Serializable view of a walker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WalkerSnapshot {
    /// Node the walker stands on.
    pub current_node: DecisionNode,
    /// Traversal history.
    pub path: Vec<PathEntry>,
    /// Running confidence (0.0-1.0).
    pub overall_confidence: f64,
    /// Traversal state.
    pub state: WalkerState,
    /// Solution reached, if any.
    pub solution: Option<Solution>,
}

/// Traversal engine for one diagnosis session.
pub struct TreeWalker {
    catalog: Arc<TreeCatalog>,
    current_node_id: String,
    path: Vec<PathEntry>,
    overall_confidence: f64,
    complete: bool,
    solution: Option<Solution>,
    observer: Option<Arc<dyn CompletionObserver>>,
}

impl TreeWalker {
    /// Create a walker standing on the catalog's root.
    pub fn new(catalog: Arc<TreeCatalog>) -> Self {
        let current_node_id = catalog.root_id().to_string();
        Self {
            catalog,
            current_node_id,
            path: Vec::new(),
            overall_confidence: 1.0,
            complete: false,
            solution: None,
            observer: None,
        }
    }

    /// Attach the completion observer.
    pub fn with_observer(mut self, observer: Arc<dyn CompletionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Identifier of the node the walker stands on.
    pub fn current_node_id(&self) -> &str {
        &self.current_node_id
    }

    /// The node the walker stands on.
    ///
    /// Falls back to the root if the current id does not resolve. Catalog
    /// validation makes that unreachable, so the fallback is logged loudly.
    pub fn current_node(&self) -> &DecisionNode {
        match self.catalog.get_node(&self.current_node_id) {
            Ok(node) => node,
            Err(e) => {
                warn!(
                    node_id = %self.current_node_id,
                    error = %e,
                    "Current node missing from catalog, falling back to root"
                );
                self.catalog.root()
            }
        }
    }

    /// Traversal history, oldest first.
    pub fn path(&self) -> &[PathEntry] {
        &self.path
    }

    /// Product of the selected option confidences.
    pub fn overall_confidence(&self) -> f64 {
        self.overall_confidence
    }

    /// Whether the walker has reached a terminal state.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Current traversal state.
    pub fn state(&self) -> WalkerState {
        if self.complete {
            WalkerState::Complete
        } else {
            WalkerState::Walking
        }
    }

    /// Solution of the leaf reached, if the walk ended on one.
    pub fn solution(&self) -> Option<&Solution> {
        self.solution.as_ref()
    }

    /// Answer the current node's question.
    ///
    /// # Errors
    /// - [`TraversalError::SessionComplete`] if the walker is terminal
    /// - [`TraversalError::InvalidOption`] if `option_id` is not one of the
    ///   current node's options
    ///
    /// A failed call leaves the walker unchanged.
    pub fn select_option(&mut self, option_id: &str) -> TraversalResult<StepOutcome> {
        if self.complete {
            return Err(TraversalError::SessionComplete);
        }

        let node = self.current_node();
        let option = node
            .find_option(option_id)
            .cloned()
            .ok_or_else(|| TraversalError::InvalidOption {
                node_id: node.id.clone(),
                option_id: option_id.to_string(),
            })?;

        // Resolve before mutating so a lookup failure is a no-op.
        let target = match &option.next_node_id {
            Some(next) => Some(self.catalog.get_node(next)?.clone()),
            None => None,
        };

        let entry = PathEntry {
            node_id: node.id.clone(),
            question: node.question.clone(),
            selected_option: option.clone(),
            confidence: option.confidence,
            timestamp: Utc::now(),
        };
        self.path.push(entry);
        self.overall_confidence *= option.confidence;

        debug!(
            option_id = %option.id,
            option_confidence = option.confidence,
            overall_confidence = self.overall_confidence,
            depth = self.path.len(),
            "Tree option selected"
        );

        let Some(target) = target else {
            self.complete = true;
            warn!(
                option_id = %option.id,
                "Selected option has no next node, session ends without a solution"
            );
            return Ok(StepOutcome::Exhausted {
                confidence: self.overall_confidence,
            });
        };

        self.current_node_id = target.id.clone();

        if !target.is_leaf {
            return Ok(StepOutcome::Advanced {
                node_id: target.id,
                confidence: self.overall_confidence,
            });
        }

        self.complete = true;
        let Some(solution) = target.solution else {
            return Ok(StepOutcome::Exhausted {
                confidence: self.overall_confidence,
            });
        };
        self.solution = Some(solution.clone());

        let event = CompletionEvent {
            path: self.path.clone(),
            solution,
            confidence: self.overall_confidence,
            completed: true,
        };
        if let Some(observer) = &self.observer {
            observer.on_complete(&event);
        }

        Ok(StepOutcome::Completed(event))
    }

    /// Return to the root with an empty path and full confidence.
    pub fn reset(&mut self) {
        self.current_node_id = self.catalog.root_id().to_string();
        self.path.clear();
        self.overall_confidence = 1.0;
        self.complete = false;
        self.solution = None;
    }

    /// Capture the walker's state.
    pub fn snapshot(&self) -> WalkerSnapshot {
        WalkerSnapshot {
            current_node: self.current_node().clone(),
            path: self.path.clone(),
            overall_confidence: self.overall_confidence,
            state: self.state(),
            solution: self.solution.clone(),
        }
    }
}

impl std::fmt::Debug for TreeWalker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeWalker")
            .field("current_node_id", &self.current_node_id)
            .field("path_len", &self.path.len())
            .field("overall_confidence", &self.overall_confidence)
            .field("complete", &self.complete)
            .finish()
    }
}
