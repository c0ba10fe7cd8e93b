use std::sync::Arc;

use proptest::prelude::*;

use narragraph::{
    CacheStatus, CancellationToken, DegradeReason, ExtractionError, ModelCapability, ModelError,
    ModelRequest, Pipeline, Segment,
    analysis::{AnalysisEdge, AnalysisNode, DiagramAnalysis, DiagramType, MAX_CONFIDENCE, MIN_CONFIDENCE},
    cache::{ManualClock, SemanticCache},
    config::AppConfig,
    layout::LayoutEngine,
};

const FLOW_TEXT: &str = "First, collect user input. Then, validate it. Finally, store the result.";
/// Same clause structure as `FLOW_TEXT`; "compile" is as long as "collect"
const SIMILAR_TEXT: &str = "First, compile user input. Then, validate it. Finally, store the result.";

/// Model that always answers with the same result
struct FixedModel(Result<String, ModelError>);

impl ModelCapability for FixedModel {
    fn name(&self) -> &str {
        "fixed"
    }

    fn complete(&self, _: &ModelRequest) -> Result<String, ModelError> {
        self.0.clone()
    }
}

fn pipeline_with(model: Option<Arc<dyn ModelCapability>>) -> Pipeline {
    let mut config = AppConfig::default();
    config.extractor.enabled = model.is_some();
    config.extractor.max_retries = 0;
    config.extractor.timeout_ms = 2_000;
    let cache = Arc::new(SemanticCache::new(
        config.cache.clone(),
        Arc::new(ManualClock::default()),
    ));
    Pipeline::new(config, cache, model).expect("valid configuration")
}

fn pipeline() -> Pipeline {
    pipeline_with(None)
}

#[test]
fn test_example_flow() {
    let pipeline = pipeline();
    let outcome = pipeline.process_segment(&Segment::new(FLOW_TEXT, 0, 6_000), &CancellationToken::new());

    let analysis = &outcome.analysis.value().analysis;
    assert_eq!(analysis.diagram_type(), DiagramType::Flow);
    assert_eq!(analysis.nodes().len(), 3);
    assert_eq!(analysis.edges().len(), 2);
    assert!(!outcome.is_degraded());
    assert_eq!(outcome.cache, CacheStatus::Miss);
    assert_eq!((outcome.start_ms, outcome.end_ms), (0, 6_000));

    let layout = outcome.layout.value();
    assert!(layout.is_well_formed());
    assert_eq!(layout.node_count(), 3);

    // a chain is drawn top to bottom
    let ys: Vec<f32> = layout.nodes.iter().map(|node| node.y).collect();
    assert!(ys.windows(2).all(|pair| pair[0] < pair[1]), "{ys:?}");
}

#[test]
fn test_repeated_segment_hits_cache() {
    let pipeline = pipeline();
    let segment = Segment::new(FLOW_TEXT, 0, 6_000);
    let cancel = CancellationToken::new();

    let first = pipeline.process_segment(&segment, &cancel);
    let second = pipeline.process_segment(&segment, &cancel);

    assert_eq!(second.cache, CacheStatus::ExactHit);
    assert_eq!(second.layout.value(), first.layout.value());
    assert_eq!(pipeline.cache().stats().entries, 1);
}

#[test]
fn test_similar_segment_reuses_geometry() {
    let pipeline = pipeline();
    let cancel = CancellationToken::new();

    let original = pipeline.process_segment(&Segment::new(FLOW_TEXT, 0, 6_000), &cancel);
    let similar = pipeline.process_segment(&Segment::new(SIMILAR_TEXT, 6_000, 12_000), &cancel);

    match similar.cache {
        CacheStatus::FuzzyHit(score) => assert!(score >= 0.7, "score {score}"),
        other => panic!("expected a fuzzy hit, got {other:?}"),
    }

    let reused = similar.layout.value();
    let fresh = original.layout.value();
    for (a, b) in reused.nodes.iter().zip(&fresh.nodes) {
        assert_eq!((a.x, a.y), (b.x, b.y));
    }
    // labels come from the new segment
    let labels: Vec<&str> = similar
        .analysis
        .value()
        .analysis
        .nodes()
        .iter()
        .map(|node| node.label.as_str())
        .collect();
    let reused_labels: Vec<&str> = reused.nodes.iter().map(|node| node.label.as_str()).collect();
    assert_eq!(reused_labels, labels);
    assert_eq!(reused.edges, fresh.edges);
}

#[test]
fn test_similar_segment_with_wider_label_is_laid_out_again() {
    let pipeline = pipeline();
    let cancel = CancellationToken::new();

    let original = pipeline.process_segment(&Segment::new(FLOW_TEXT, 0, 6_000), &cancel);
    let text = "First, collect all user input. Then, validate it. Finally, store the result.";
    let wider = pipeline.process_segment(&Segment::new(text, 6_000, 12_000), &cancel);

    assert_eq!(wider.cache, CacheStatus::Miss);
    let first = &wider.layout.value().nodes[0];
    assert!(first.width > original.layout.value().nodes[0].width);
    for edge in &wider.layout.value().edges {
        let points = edge.points.as_ref().expect("hierarchical routes");
        let source = wider.layout.value().node(&edge.source).expect("source").bounds();
        let start = points[0];
        assert!(start.x() >= source.min_x() && start.x() <= source.max_x());
        assert!((start.y() - source.max_y()).abs() < 0.01);
    }

    let stats = pipeline.cache().stats();
    assert_eq!((stats.hits, stats.misses), (0, 2));
}

#[test]
fn test_dangling_model_edge_is_dropped() {
    let response = r#"{
        "type": "flow",
        "nodes": [{"id": "a", "label": "Receive order"}, {"id": "b", "label": "Ship order"}],
        "edges": [{"from": "a", "to": "b"}, {"from": "b", "to": "c"}],
        "confidence": 0.9
    }"#;
    let pipeline = pipeline_with(Some(Arc::new(FixedModel(Ok(response.to_string())))));
    let outcome = pipeline.process_segment(
        &Segment::new("We receive the order and ship it.", 0, 3_000),
        &CancellationToken::new(),
    );

    assert!(!outcome.analysis.is_degraded());
    let validated = outcome.analysis.value();
    assert_eq!(validated.report.dropped_edges, 1);
    assert_eq!(validated.analysis.edges().len(), 1);
    assert_eq!(outcome.layout.value().edge_count(), 1);
    assert!(!outcome.layout.is_degraded());
}

#[test]
fn test_model_failure_degrades_to_rules() {
    let failing = FixedModel(Err(ModelError::RequestFailed("connection refused".to_string())));
    let pipeline = pipeline_with(Some(Arc::new(failing)));
    let segment = Segment::new(FLOW_TEXT, 0, 6_000);
    let cancel = CancellationToken::new();

    let outcome = pipeline.process_segment(&segment, &cancel);
    assert_eq!(
        outcome.analysis.reason(),
        Some(&DegradeReason::Extraction(ExtractionError::Model(
            ModelError::RequestFailed("connection refused".to_string())
        )))
    );
    assert_eq!(outcome.analysis.value().analysis.nodes().len(), 3);
    assert!(outcome.layout.value().is_well_formed());

    // degraded results are not cached
    assert!(pipeline.cache().is_empty());
    let again = pipeline.process_segment(&segment, &cancel);
    assert_eq!(again.cache, CacheStatus::Miss);
}

#[test]
fn test_invalid_model_response_degrades() {
    let pipeline = pipeline_with(Some(Arc::new(FixedModel(Ok("I cannot help with that.".to_string())))));
    let outcome = pipeline.process_segment(&Segment::new(FLOW_TEXT, 0, 1), &CancellationToken::new());

    assert!(matches!(
        outcome.analysis.reason(),
        Some(DegradeReason::Extraction(ExtractionError::InvalidResponse(_)))
    ));
}

#[test]
fn test_cancelled_document_still_completes() {
    let pipeline = pipeline_with(Some(Arc::new(FixedModel(Ok("{}".to_string())))));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let segments = vec![Segment::new(FLOW_TEXT, 0, 1_000), Segment::new("", 1_000, 2_000)];
    let outcomes = pipeline.process_document(&segments, &cancel);

    assert_eq!(outcomes.len(), 2);
    for outcome in &outcomes {
        assert_eq!(
            outcome.analysis.reason(),
            Some(&DegradeReason::Extraction(ExtractionError::Cancelled))
        );
        assert!(outcome.layout.value().node_count() >= 1);
    }
}

#[test]
fn test_document_outcomes_follow_input_order() {
    let pipeline = pipeline();
    let texts = [
        FLOW_TEXT,
        "The company has three departments: sales, engineering and support.",
        "In 1990 the lab opened. In 2000 it moved. In 2010 it closed.",
        "Plan the work, do the work, check the results, and repeat the cycle.",
        "Cats versus dogs: cats are independent, while dogs are social.",
    ];
    let segments: Vec<Segment> = texts
        .iter()
        .enumerate()
        .map(|(idx, text)| Segment::new(*text, idx as u64 * 1_000, idx as u64 * 1_000 + 999))
        .collect();

    let outcomes = pipeline.process_document(&segments, &CancellationToken::new());

    assert_eq!(outcomes.len(), texts.len());
    for (outcome, segment) in outcomes.iter().zip(&segments) {
        assert_eq!(outcome.start_ms, segment.start_ms);
        assert!(outcome.layout.value().is_well_formed());
    }
}

fn arb_analysis() -> impl Strategy<Value = DiagramAnalysis> {
    (
        prop::sample::select(DiagramType::ALL.to_vec()),
        1usize..14,
        prop::collection::vec((0usize..16, 0usize..16), 0..24),
        prop::collection::vec("[a-z]{1,12}( [a-z]{1,12}){0,6}", 14),
    )
        .prop_map(|(diagram_type, count, edges, labels)| {
            DiagramAnalysis::new(
                diagram_type,
                0.8,
                (0..count)
                    .map(|idx| AnalysisNode::new(format!("n{idx}"), labels[idx].clone()))
                    .collect(),
                edges
                    .iter()
                    .map(|(from, to)| AnalysisEdge::new(format!("n{from}"), format!("n{to}")))
                    .collect(),
                "generated",
            )
        })
}

proptest! {
    #[test]
    fn layouts_never_overlap(analysis in arb_analysis()) {
        let engine = LayoutEngine::standard().expect("standard registry");
        let stage = engine.layout(&analysis, &Default::default()).expect("non-empty graph");
        let layout = stage.value();

        prop_assert!(
            !matches!(stage.reason(), Some(DegradeReason::LayoutAlgorithm(_))),
            "fell back to the grid: {:?}",
            stage.reason()
        );
        prop_assert!(layout.find_overlap().is_none());
        prop_assert!(layout.is_well_formed());
        prop_assert_eq!(layout.node_count(), analysis.nodes().len());
    }

    #[test]
    fn confidence_stays_in_bounds(text in "[A-Za-z ,.;:]{0,200}") {
        let outcome = pipeline().process_segment(&Segment::new(text, 0, 0), &CancellationToken::new());
        let confidence = outcome.analysis.value().analysis.confidence();

        prop_assert!((MIN_CONFIDENCE..=MAX_CONFIDENCE).contains(&confidence));
        prop_assert!(outcome.layout.value().is_well_formed());
    }
}
