use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use super::SharedState;
use crate::analyzers::{Evidence, MediaArtifact, TreeAnalyzer};
use crate::error::{McpError, McpResult};

/// Route tool calls to appropriate handlers
pub async fn handle_tool_call(
    state: &SharedState,
    tool_name: &str,
    arguments: Option<Value>,
) -> McpResult<Value> {
    info!(tool = %tool_name, "Routing tool call");

    match tool_name {
        "diagnosis_analyze" => handle_analyze(state, arguments).await,
        "tree_start" => handle_tree_start(state).await,
        "tree_current" => handle_tree_current(state, arguments).await,
        "tree_select" => handle_tree_select(state, arguments).await,
        "tree_reset" => handle_tree_reset(state, arguments).await,
        "tree_path" => handle_tree_path(state, arguments).await,
        "tree_end" => handle_tree_end(state, arguments).await,
        "learning_metrics" => to_value(state.tracker.snapshot()),
        "catalog_node" => handle_catalog_node(state, arguments),
        _ => Err(McpError::UnknownTool {
            tool_name: tool_name.to_string(),
        }),
    }
}

#[derive(Debug, Deserialize)]
struct AnalyzeParams {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    files: Vec<MediaArtifact>,
    #[serde(default)]
    tree_session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SessionParams {
    session_id: String,
}

#[derive(Debug, Deserialize)]
struct SelectParams {
    session_id: String,
    option_id: String,
}

#[derive(Debug, Deserialize)]
struct NodeParams {
    node_id: String,
}

#[derive(Debug, Serialize)]
struct SessionView<T: Serialize> {
    session_id: String,
    #[serde(flatten)]
    body: T,
}

/// Handle diagnosis_analyze: run every analyzer over the evidence.
async fn handle_analyze(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    let params: AnalyzeParams = parse_arguments("diagnosis_analyze", arguments)?;

    let tree = match &params.tree_session_id {
        Some(session_id) => Some(TreeAnalyzer::new(
            state.tree_sessions.get(session_id).await?,
        )),
        None => None,
    };

    let evidence = Evidence {
        text: params.text,
        artifacts: params.files,
    };
    debug!(
        has_text = evidence.non_blank_text().is_some(),
        artifacts = evidence.artifacts.len(),
        with_tree = tree.is_some(),
        "Submitting evidence"
    );

    let outcome = state.engine.analyze(evidence, tree).await;
    to_value(outcome)
}

async fn handle_tree_start(state: &SharedState) -> McpResult<Value> {
    let (session_id, walker) = state.tree_sessions.start().await;
    let snapshot = walker.lock().await.snapshot();
    to_value(SessionView {
        session_id,
        body: snapshot,
    })
}

async fn handle_tree_current(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    let params: SessionParams = parse_arguments("tree_current", arguments)?;
    let walker = state.tree_sessions.get(&params.session_id).await?;
    let walker = walker.lock().await;

    Ok(json!({
        "session_id": params.session_id,
        "current_node": walker.current_node(),
        "path_length": walker.path().len(),
        "overall_confidence": walker.overall_confidence(),
        "complete": walker.is_complete(),
    }))
}

async fn handle_tree_select(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    let params: SelectParams = parse_arguments("tree_select", arguments)?;
    let walker = state.tree_sessions.get(&params.session_id).await?;
    let outcome = walker.lock().await.select_option(&params.option_id)?;
    to_value(SessionView {
        session_id: params.session_id,
        body: outcome,
    })
}

async fn handle_tree_reset(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    let params: SessionParams = parse_arguments("tree_reset", arguments)?;
    let walker = state.tree_sessions.get(&params.session_id).await?;
    let snapshot = {
        let mut walker = walker.lock().await;
        walker.reset();
        walker.snapshot()
    };
    to_value(SessionView {
        session_id: params.session_id,
        body: snapshot,
    })
}

async fn handle_tree_path(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    let params: SessionParams = parse_arguments("tree_path", arguments)?;
    let walker = state.tree_sessions.get(&params.session_id).await?;
    let walker = walker.lock().await;

    Ok(json!({
        "session_id": params.session_id,
        "path": walker.path(),
        "overall_confidence": walker.overall_confidence(),
    }))
}

async fn handle_tree_end(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    let params: SessionParams = parse_arguments("tree_end", arguments)?;
    let ended = state.tree_sessions.end(&params.session_id).await;
    Ok(json!({
        "session_id": params.session_id,
        "ended": ended,
    }))
}

fn handle_catalog_node(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    let params: NodeParams = parse_arguments("catalog_node", arguments)?;
    let node = state.catalog.get_node(&params.node_id)?;
    to_value(node)
}

fn to_value<T: Serialize>(value: T) -> McpResult<Value> {
    serde_json::to_value(value).map_err(McpError::Json)
}

fn parse_arguments<T: serde::de::DeserializeOwned>(
    tool_name: &str,
    arguments: Option<Value>,
) -> McpResult<T> {
    match arguments {
        Some(args) => serde_json::from_value(args).map_err(|e| McpError::InvalidParameters {
            tool_name: tool_name.to_string(),
            message: e.to_string(),
        }),
        None => Err(McpError::InvalidParameters {
            tool_name: tool_name.to_string(),
            message: "Missing arguments".to_string(),
        }),
    }
}
