//! Integration tests for the public text-analysis API

use narragraph_core::{
    analysis::DiagramType,
    fingerprint::{DiagramHint, StructurePattern},
};
use narragraph_text::{
    ComplexityClassifier, ComplexityLevel, Language, LanguageDetector, RULE_CONFIDENCE,
    extract_rules, fingerprint,
};

const FLOW_TEXT: &str = "First, collect user input. Then, validate it. Finally, store the result.";

#[test]
fn test_flow_text_end_to_end() {
    let report = ComplexityClassifier::new().classify(FLOW_TEXT);
    // short sentences, but every word is distinct
    assert_eq!(report.level, ComplexityLevel::Medium);

    let guess = LanguageDetector::default().detect(FLOW_TEXT);
    assert_eq!(guess.language, Language::En);

    let fp = fingerprint(FLOW_TEXT, 10);
    assert_eq!(fp.structure_pattern(), StructurePattern::Sequential);
    assert_eq!(fp.diagram_hint(), DiagramHint::Flow);

    let analysis = extract_rules(FLOW_TEXT);
    assert_eq!(analysis.diagram_type(), DiagramType::Flow);
    assert_eq!(analysis.nodes().len(), 3);
    assert_eq!(analysis.edges().len(), 2);
    assert_eq!(analysis.confidence(), RULE_CONFIDENCE);
}

#[test]
fn test_formatting_does_not_change_fingerprint() {
    let a = fingerprint(FLOW_TEXT, 10);
    let b = fingerprint(
        "first   collect USER input -- then validate it; finally store the result",
        10,
    );
    assert_eq!(a, b);
}

#[test]
fn test_extraction_is_deterministic() {
    assert_eq!(extract_rules(FLOW_TEXT), extract_rules(FLOW_TEXT));
}
