//! Strict parsing of model responses.
//!
//! The response must be a JSON object with a string `type` and a non-empty
//! `nodes` array of `{id, label}` objects. Anything else is a parse failure.
//! `edges` is the one lenient field: when it is missing or malformed the
//! analysis simply has no edges.

use serde::Deserialize;

use narragraph_core::analysis::{AnalysisEdge, AnalysisNode, DiagramAnalysis, DiagramType};

use crate::error::ExtractionError;

/// Confidence assumed when the response does not state one
pub const DEFAULT_MODEL_CONFIDENCE: f64 = 0.8;

#[derive(Debug, Deserialize)]
struct ModelResponse {
    #[serde(rename = "type")]
    diagram_type: String,
    nodes: Vec<ResponseNode>,
    #[serde(default)]
    edges: serde_json::Value,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    reasoning: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseNode {
    id: String,
    label: String,
}

#[derive(Debug, Deserialize)]
struct ResponseEdge {
    from: String,
    to: String,
    #[serde(default)]
    label: Option<String>,
}

/// Parse raw model output into an analysis.
///
/// Markdown code fences and prose around the JSON object are ignored.
///
/// # Errors
///
/// Returns [`ExtractionError::InvalidResponse`] when no JSON object is found,
/// when `type` or `nodes` is missing or mistyped, or when `nodes` is empty.
pub fn parse_response(raw: &str) -> Result<DiagramAnalysis, ExtractionError> {
    let payload = json_object(raw)
        .ok_or_else(|| ExtractionError::InvalidResponse("no JSON object found".to_string()))?;

    let response: ModelResponse = serde_json::from_str(payload)
        .map_err(|err| ExtractionError::InvalidResponse(err.to_string()))?;

    if response.nodes.is_empty() {
        return Err(ExtractionError::InvalidResponse(
            "node list is empty".to_string(),
        ));
    }

    let nodes = response
        .nodes
        .into_iter()
        .map(|node| AnalysisNode::new(node.id, node.label))
        .collect();

    let edges = serde_json::from_value::<Vec<ResponseEdge>>(response.edges)
        .unwrap_or_default()
        .into_iter()
        .map(|edge| AnalysisEdge {
            from: edge.from,
            to: edge.to,
            label: edge.label,
        })
        .collect();

    Ok(DiagramAnalysis::new(
        DiagramType::from_vocabulary(&response.diagram_type),
        response.confidence.unwrap_or(DEFAULT_MODEL_CONFIDENCE),
        nodes,
        edges,
        response
            .reasoning
            .unwrap_or_else(|| "model-based extraction".to_string()),
    ))
}

/// The outermost `{...}` span, looking inside a code fence when present
fn json_object(raw: &str) -> Option<&str> {
    let body = fenced_block(raw).unwrap_or(raw);
    let start = body.find('{')?;
    let end = body.rfind('}')?;
    (start < end).then(|| &body[start..=end])
}

fn fenced_block(raw: &str) -> Option<&str> {
    let open = raw.find("```")?;
    let after_open = &raw[open + 3..];
    // Skip the language tag on the opening fence line.
    let content_start = after_open.find('\n').map_or(0, |idx| idx + 1);
    let content = &after_open[content_start..];
    let close = content.find("```")?;
    Some(&content[..close])
}
