//! Rule-based structure extraction.
//!
//! This is the extractor that is always available: it needs no model, no
//! network and no configuration. Text is cut into clauses (sentences, further
//! split on `;`), each clause becomes one node, and the diagram type chosen
//! from the cue counts decides how the nodes are wired together.

use log::debug;

use narragraph_core::analysis::{AnalysisEdge, AnalysisNode, DiagramAnalysis, DiagramType};

use crate::{
    cues::{self, CueCounts},
    tokens,
};

/// Confidence attached to every rule-based analysis
pub const RULE_CONFIDENCE: f64 = 0.6;

/// Maximum number of clauses turned into nodes
pub const MAX_CLAUSES: usize = 12;

/// Maximum number of words kept in a node label
pub const MAX_LABEL_WORDS: usize = 6;

/// Maximum number of characters kept in a node label
pub const MAX_LABEL_CHARS: usize = 48;

/// Label used when the text contains nothing to label
const EMPTY_LABEL: &str = "Start";

/// Words that only order the narrative and carry no content of their own
const ORDER_MARKERS: &[&str] = &[
    "first", "firstly", "second", "secondly", "third", "thirdly", "then", "next", "finally",
    "lastly", "afterwards", "subsequently", "also", "so", "and", "but",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClauseRole {
    Plain,
    /// Opens with "if", "when", ...
    Condition,
    /// Opens with "otherwise", "else" or "if not"
    Alternative,
}

#[derive(Debug)]
struct Clause {
    label: String,
    role: ClauseRole,
}

/// Extract a diagram from `text` using keyword rules only.
///
/// Never fails. Text without any usable clause yields a single node.
pub fn extract_rules(text: &str) -> DiagramAnalysis {
    let counts = CueCounts::scan(&tokens::words(text));
    let diagram_type = counts.diagram_type();

    let mut clauses = split_clauses(text, diagram_type == DiagramType::Tree);
    clauses.truncate(MAX_CLAUSES);

    if clauses.is_empty() {
        let trimmed = text.trim();
        let label = if trimmed.is_empty() {
            EMPTY_LABEL.to_string()
        } else {
            trimmed.chars().take(MAX_LABEL_CHARS).collect()
        };
        return DiagramAnalysis::new(
            diagram_type,
            RULE_CONFIDENCE,
            vec![AnalysisNode::new(node_id(0), label)],
            Vec::new(),
            "rule-based: no clauses found",
        );
    }

    let nodes: Vec<AnalysisNode> = clauses
        .iter()
        .enumerate()
        .map(|(idx, clause)| AnalysisNode::new(node_id(idx), clause.label.clone()))
        .collect();

    let edges = match diagram_type {
        DiagramType::Flow => flow_edges(&clauses),
        DiagramType::Timeline => chain_edges(clauses.len(), None),
        DiagramType::Matrix => chain_edges(clauses.len(), Some("versus")),
        DiagramType::Cycle => cycle_edges(clauses.len()),
        DiagramType::Tree => tree_edges(clauses.len()),
    };

    debug!(
        diagram_type:%,
        nodes = nodes.len(),
        edges = edges.len();
        "Rule-based extraction finished",
    );

    let reasoning = format!(
        "rule-based: {} clauses classified as {diagram_type}",
        nodes.len()
    );
    DiagramAnalysis::new(diagram_type, RULE_CONFIDENCE, nodes, edges, reasoning)
}

fn node_id(idx: usize) -> String {
    format!("n{}", idx + 1)
}

fn split_clauses(text: &str, split_lists: bool) -> Vec<Clause> {
    let mut clauses = Vec::new();
    for sentence in tokens::sentences(text) {
        for part in sentence.split(';') {
            match part.split_once(':') {
                Some((head, tail)) if split_lists => {
                    clauses.extend(clause(head));
                    clauses.extend(
                        tail.split(',')
                            .flat_map(|item| item.split(" and "))
                            .filter_map(clause),
                    );
                }
                _ => clauses.extend(clause(part)),
            }
        }
    }
    clauses
}

fn clause(raw: &str) -> Option<Clause> {
    let words: Vec<&str> = raw
        .split_whitespace()
        .map(|token| token.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|token| !token.is_empty())
        .collect();

    let content_start = words
        .iter()
        .position(|word| !ORDER_MARKERS.contains(&word.to_lowercase().as_str()))?;
    let role = role_of(&words[content_start..]);

    let mut content = &words[content_start..];
    while let Some(first) = content.first() {
        let lowered = first.to_lowercase();
        if ORDER_MARKERS.contains(&lowered.as_str()) || cues::is_alternative_opener(&lowered) {
            content = &content[1..];
        } else {
            break;
        }
    }
    if content.is_empty() {
        return None;
    }

    Some(Clause {
        label: label(content),
        role,
    })
}

fn role_of(words: &[&str]) -> ClauseRole {
    let first = words.first().map(|w| w.to_lowercase()).unwrap_or_default();
    let second = words.get(1).map(|w| w.to_lowercase()).unwrap_or_default();

    if cues::is_alternative_opener(&first) || (first == "if" && second == "not") {
        ClauseRole::Alternative
    } else if cues::is_condition_opener(&first) {
        ClauseRole::Condition
    } else {
        ClauseRole::Plain
    }
}

fn label(words: &[&str]) -> String {
    let joined = words[..words.len().min(MAX_LABEL_WORDS)].join(" ");
    let truncated: String = joined.chars().take(MAX_LABEL_CHARS).collect();
    let truncated = truncated.trim_end();

    let mut chars = truncated.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn chain_edges(count: usize, label: Option<&str>) -> Vec<AnalysisEdge> {
    (1..count)
        .map(|idx| {
            let edge = AnalysisEdge::new(node_id(idx - 1), node_id(idx));
            match label {
                Some(label) => edge.with_label(label),
                None => edge,
            }
        })
        .collect()
}

fn cycle_edges(count: usize) -> Vec<AnalysisEdge> {
    let mut edges = chain_edges(count, None);
    if count >= 2 {
        edges.push(AnalysisEdge::new(node_id(count - 1), node_id(0)));
    }
    edges
}

fn tree_edges(count: usize) -> Vec<AnalysisEdge> {
    (1..count)
        .map(|idx| AnalysisEdge::new(node_id(0), node_id(idx)))
        .collect()
}

/// Chain edges, with conditions branching into a "yes" and a "no" edge.
///
/// The "no" edge targets the first alternative clause after the condition;
/// the "yes" edge targets the next clause that is not that alternative. An
/// alternative claimed by a condition is only entered through its "no" edge.
fn flow_edges(clauses: &[Clause]) -> Vec<AnalysisEdge> {
    let count = clauses.len();
    let mut claimed = vec![false; count];
    let mut branches: Vec<Option<(Option<usize>, Option<usize>)>> = vec![None; count];

    for (idx, clause) in clauses.iter().enumerate() {
        if clause.role != ClauseRole::Condition {
            continue;
        }
        let no_target = clauses[idx + 1..]
            .iter()
            .take_while(|later| later.role != ClauseRole::Condition)
            .position(|later| later.role == ClauseRole::Alternative)
            .map(|offset| idx + 1 + offset);
        let yes_target = match no_target {
            Some(no) if no == idx + 1 => Some(no + 1),
            _ => Some(idx + 1),
        }
        .filter(|&target| target < count);

        if let Some(no) = no_target {
            claimed[no] = true;
        }
        branches[idx] = Some((yes_target, no_target));
    }

    let mut edges = Vec::new();
    for idx in 0..count {
        match branches[idx] {
            Some((yes, no)) => {
                if let Some(yes) = yes {
                    edges.push(AnalysisEdge::new(node_id(idx), node_id(yes)).with_label("yes"));
                }
                if let Some(no) = no {
                    edges.push(AnalysisEdge::new(node_id(idx), node_id(no)).with_label("no"));
                }
            }
            None if idx + 1 < count && !claimed[idx + 1] => {
                edges.push(AnalysisEdge::new(node_id(idx), node_id(idx + 1)));
            }
            None => {}
        }
    }
    edges
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn labels(analysis: &DiagramAnalysis) -> Vec<&str> {
        analysis.nodes().iter().map(|n| n.label.as_str()).collect()
    }

    fn edge_pairs(analysis: &DiagramAnalysis) -> Vec<(&str, &str, Option<&str>)> {
        analysis
            .edges()
            .iter()
            .map(|e| (e.from.as_str(), e.to.as_str(), e.label.as_deref()))
            .collect()
    }

    #[test]
    fn test_sequential_flow() {
        let analysis =
            extract_rules("First, collect user input. Then, validate it. Finally, store the result.");

        assert_eq!(analysis.diagram_type(), DiagramType::Flow);
        assert_eq!(analysis.confidence(), RULE_CONFIDENCE);
        assert_eq!(
            labels(&analysis),
            vec!["Collect user input", "Validate it", "Store the result"]
        );
        assert_eq!(
            edge_pairs(&analysis),
            vec![("n1", "n2", None), ("n2", "n3", None)]
        );
    }

    #[test]
    fn test_condition_branches() {
        let analysis = extract_rules(
            "If the input is valid, save it. Otherwise, show an error. Then finish.",
        );

        assert_eq!(analysis.diagram_type(), DiagramType::Flow);
        assert_eq!(labels(&analysis)[1], "Show an error");
        assert_eq!(
            edge_pairs(&analysis),
            vec![
                ("n1", "n3", Some("yes")),
                ("n1", "n2", Some("no")),
                ("n2", "n3", None),
            ]
        );
    }

    #[test]
    fn test_cycle_closes_loop() {
        let analysis = extract_rules(
            "Water evaporates. It condenses into clouds. Rain falls. The cycle repeats.",
        );

        assert_eq!(analysis.diagram_type(), DiagramType::Cycle);
        assert_eq!(analysis.nodes().len(), 4);
        assert_eq!(analysis.edges().len(), 4);
        assert_eq!(edge_pairs(&analysis)[3], ("n4", "n1", None));
    }

    #[test]
    fn test_tree_splits_lists() {
        let analysis = extract_rules("A vehicle consists of parts: engine, wheels and seats.");

        assert_eq!(analysis.diagram_type(), DiagramType::Tree);
        assert_eq!(
            labels(&analysis),
            vec!["A vehicle consists of parts", "Engine", "Wheels", "Seats"]
        );
        assert!(analysis.edges().iter().all(|e| e.from == "n1"));
        assert_eq!(analysis.edges().len(), 3);
    }

    #[test]
    fn test_matrix_edges_are_labeled() {
        let analysis = extract_rules("Cats are independent. Dogs are loyal versus cats.");

        assert_eq!(analysis.diagram_type(), DiagramType::Matrix);
        assert_eq!(edge_pairs(&analysis), vec![("n1", "n2", Some("versus"))]);
    }

    #[test]
    fn test_empty_text_yields_single_node() {
        let analysis = extract_rules("   ");

        assert_eq!(labels(&analysis), vec![EMPTY_LABEL]);
        assert!(analysis.edges().is_empty());
        assert_eq!(analysis.nodes()[0].id, "n1");
    }

    #[test]
    fn test_labels_are_truncated() {
        let analysis = extract_rules(
            "Then the extraordinarily comprehensive documentation describes every single detail.",
        );
        let label = labels(&analysis)[0];

        assert!(label.split_whitespace().count() <= MAX_LABEL_WORDS);
        assert!(label.chars().count() <= MAX_LABEL_CHARS);
        assert!(label.starts_with("The extraordinarily"));
    }

    #[test]
    fn test_clause_cap() {
        let text: String = (1..=20).map(|i| format!("Step {i} happens. ")).collect();
        let analysis = extract_rules(&text);

        assert_eq!(analysis.nodes().len(), MAX_CLAUSES);
        assert_eq!(analysis.nodes()[11].id, "n12");
    }

    proptest! {
        #[test]
        fn edges_always_resolve(text in "[A-Za-z ,.;:]{0,400}") {
            let analysis = extract_rules(&text);
            let ids = analysis.node_ids();

            prop_assert!(!analysis.nodes().is_empty());
            prop_assert!(analysis.nodes().len() <= MAX_CLAUSES);
            prop_assert_eq!(ids.len(), analysis.nodes().len());
            for edge in analysis.edges() {
                prop_assert!(ids.contains(edge.from.as_str()));
                prop_assert!(ids.contains(edge.to.as_str()));
            }
        }
    }
}
