//! CLI logic for the Narragraph tool.
//!
//! Reads a transcript, runs every segment through the pipeline and writes
//! one JSON record per segment.

pub mod error_adapter;

mod args;
mod config;

pub use args::Args;

use std::{
    fs,
    io::{self, Write},
    sync::Arc,
};

use log::{info, warn};
use serde::Serialize;

use narragraph::{
    CacheStatus, CancellationToken, ModelCapability, NarragraphError, Pipeline, Segment,
    SegmentOutcome,
    analysis::DiagramType,
    cache::SemanticCache,
    config::ExtractorConfig,
    extract::ExtractTier,
    model::HttpModelCapability,
};

/// Assumed narration speed for plain-text input
pub const MS_PER_WORD: u64 = 400;

/// One line of output, describing a processed segment
#[derive(Debug, Serialize)]
pub struct SegmentRecord<'a> {
    pub start_ms: u64,
    pub end_ms: u64,
    pub diagram_type: DiagramType,
    pub confidence: f64,
    pub degraded: bool,
    pub degrade_reason: Option<String>,
    pub cache: CacheStatus,
    pub layout: &'a narragraph::LayoutData,
}

impl<'a> From<&'a SegmentOutcome> for SegmentRecord<'a> {
    fn from(outcome: &'a SegmentOutcome) -> Self {
        let analysis = &outcome.analysis.value().analysis;
        let degrade_reason = outcome
            .analysis
            .reason()
            .or_else(|| outcome.layout.reason())
            .map(|reason| reason.to_string());

        Self {
            start_ms: outcome.start_ms,
            end_ms: outcome.end_ms,
            diagram_type: analysis.diagram_type(),
            confidence: analysis.confidence(),
            degraded: outcome.is_degraded(),
            degrade_reason,
            cache: outcome.cache,
            layout: outcome.layout.value(),
        }
    }
}

/// Run the Narragraph CLI application
///
/// # Errors
///
/// Returns `NarragraphError` for:
/// - File I/O errors
/// - Configuration loading or validation errors
/// - Malformed JSON segment input
pub fn run(args: &Args) -> Result<(), NarragraphError> {
    info!(
        input_path = args.input,
        output_path = args.output,
        rules_only = args.rules_only;
        "Processing transcript"
    );

    let app_config = config::load_config(args.config.as_ref())?;
    let source = fs::read_to_string(&args.input)?;
    let segments = parse_segments(&source)?;

    let model = if args.rules_only {
        None
    } else {
        build_model(&app_config.extractor)
    };
    let tier = if args.rules_only {
        ExtractTier::RulesOnly
    } else {
        ExtractTier::Auto
    };

    let cache = Arc::new(SemanticCache::with_system_clock(app_config.cache.clone()));
    let pipeline = Pipeline::new(app_config, cache, model)?.with_tier(tier);

    let outcomes = pipeline.process_document(&segments, &CancellationToken::new());
    let degraded = outcomes.iter().filter(|outcome| outcome.is_degraded()).count();
    let rendered = render_outcomes(&outcomes)?;

    if args.output == "-" {
        let mut stdout = io::stdout().lock();
        stdout.write_all(rendered.as_bytes())?;
        stdout.write_all(b"\n")?;
    } else {
        fs::write(&args.output, rendered)?;
    }

    let stats = pipeline.cache().stats();
    info!(
        output_file = args.output,
        segments = outcomes.len(),
        degraded,
        cache_hits = stats.hits,
        cache_fuzzy_hits = stats.fuzzy_hits;
        "Layouts exported successfully"
    );

    Ok(())
}

/// Split input into timed segments.
///
/// Input whose first non-blank character is `[` is read as a JSON array of
/// segments. Anything else is plain text: each blank-line separated
/// paragraph becomes one segment, timed by its word count.
///
/// # Errors
///
/// Returns [`NarragraphError::Serialization`] for malformed JSON input.
pub fn parse_segments(source: &str) -> Result<Vec<Segment>, NarragraphError> {
    if source.trim_start().starts_with('[') {
        return Ok(serde_json::from_str(source)?);
    }

    let mut segments = Vec::new();
    let mut clock = 0;
    let mut paragraph: Vec<&str> = Vec::new();
    for line in source.lines().chain(std::iter::once("")) {
        if !line.trim().is_empty() {
            paragraph.push(line.trim());
            continue;
        }
        if paragraph.is_empty() {
            continue;
        }

        let text = paragraph.join(" ");
        let words = text.split_whitespace().count() as u64;
        let end = clock + words * MS_PER_WORD;
        segments.push(Segment::new(text, clock, end));
        clock = end;
        paragraph.clear();
    }

    Ok(segments)
}

/// Render outcomes as a pretty-printed JSON array
///
/// # Errors
///
/// Returns [`NarragraphError::Serialization`] if a record cannot be encoded.
pub fn render_outcomes(outcomes: &[SegmentOutcome]) -> Result<String, NarragraphError> {
    let records: Vec<SegmentRecord<'_>> = outcomes.iter().map(SegmentRecord::from).collect();
    Ok(serde_json::to_string_pretty(&records)?)
}

fn build_model(config: &ExtractorConfig) -> Option<Arc<dyn ModelCapability>> {
    if !config.enabled {
        return None;
    }

    match HttpModelCapability::from_config(config) {
        Ok(model) => Some(Arc::new(model)),
        Err(err) => {
            warn!(err:%; "External model unavailable, using rule-based extraction");
            None
        }
    }
}
