//! Segment and document processing.
//!
//! A [`Pipeline`] owns one instance of every stage and shares a
//! [`SemanticCache`] with whoever constructed it. Each segment goes through
//! the stages strictly in order:
//!
//! 1. exact cache check (stored analysis and layout)
//! 2. structure extraction
//! 3. relationship validation
//! 4. geometry cache lookup, exact or fuzzy
//! 5. layout
//! 6. cache store
//!
//! No stage can abort a segment and no segment can abort a document: every
//! failure is recovered and reported as a [`DegradeReason`].

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
    time::Instant,
};

use log::{debug, info, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use narragraph_core::{analysis::DiagramAnalysis, layout::LayoutData};

use crate::{
    cache::{CacheLookup, SemanticCache},
    config::{AppConfig, LayoutConfig},
    error::ConfigError,
    extract::{ExtractOptions, ExtractTier, StructureExtractor},
    layout::{LayoutEngine, LayoutGraph},
    model::{CancellationToken, ModelCapability},
    stage::{DegradeReason, Stage},
    validate::{RelationshipValidator, ValidatedAnalysis},
};

/// Largest size difference at which a cached node box still counts as the same
const SIZE_TOLERANCE: f32 = 0.01;

/// A timed piece of transcribed narration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub text: String,
    #[serde(default, alias = "startMs")]
    pub start_ms: u64,
    #[serde(default, alias = "endMs")]
    pub end_ms: u64,
}

impl Segment {
    pub fn new(text: impl Into<String>, start_ms: u64, end_ms: u64) -> Self {
        Self {
            text: text.into(),
            start_ms,
            end_ms,
        }
    }
}

/// Where the segment's layout came from
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheStatus {
    /// Computed by the layout engine
    #[default]
    Miss,
    ExactHit,
    /// Adopted from a similar entry with this similarity score
    FuzzyHit(f64),
}

/// Result of processing one segment
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentOutcome {
    pub start_ms: u64,
    pub end_ms: u64,
    pub analysis: Stage<ValidatedAnalysis>,
    pub layout: Stage<LayoutData>,
    pub cache: CacheStatus,
    pub elapsed_ms: u64,
}

impl SegmentOutcome {
    /// Whether any stage fell back
    pub fn is_degraded(&self) -> bool {
        self.analysis.is_degraded() || self.layout.is_degraded()
    }
}

pub struct Pipeline {
    config: AppConfig,
    cache: Arc<SemanticCache>,
    extractor: StructureExtractor,
    validator: RelationshipValidator,
    engine: LayoutEngine,
    tier: ExtractTier,
}

impl Pipeline {
    /// Validate the configuration and build every stage.
    ///
    /// # Errors
    /// Returns [`ConfigError`] for out-of-range settings or an invalid
    /// strategy registry.
    pub fn new(
        config: AppConfig,
        cache: Arc<SemanticCache>,
        model: Option<Arc<dyn ModelCapability>>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let engine = LayoutEngine::standard()?;
        debug!(
            strategies:? = engine.registry(),
            model = model.as_ref().map(|model| model.name().to_string()),
            max_parallel = config.pipeline.max_parallel;
            "Pipeline ready",
        );

        Ok(Self {
            extractor: StructureExtractor::new(config.extractor.clone(), model),
            validator: RelationshipValidator::new(config.validator.clone()),
            engine,
            cache,
            config,
            tier: ExtractTier::default(),
        })
    }

    /// Restrict which extraction tiers segments may use
    pub fn with_tier(mut self, tier: ExtractTier) -> Self {
        self.tier = tier;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<SemanticCache> {
        &self.cache
    }

    pub fn process_segment(&self, segment: &Segment, cancel: &CancellationToken) -> SegmentOutcome {
        let started = Instant::now();
        let fingerprint = self.cache.fingerprint(&segment.text);
        let mut corrupted = false;

        let exact = self.cache.exact_candidate(&fingerprint);
        corrupted |= exact.corrupted;
        if exact.hit && exact.analysis.is_some() {
            self.cache.confirm_hit(&exact);
        }
        if let CacheLookup {
            hit: true,
            layout: Some(layout),
            analysis: Some(analysis),
            ..
        } = exact
        {
            debug!(hash = fingerprint.semantic_hash(); "Reusing cached analysis and layout");
            // The stored analysis is already calibrated; only the report is recomputed.
            let report = self.validator.validate(&analysis).report;
            return SegmentOutcome {
                start_ms: segment.start_ms,
                end_ms: segment.end_ms,
                analysis: Stage::Ok(ValidatedAnalysis { analysis, report }),
                layout: Stage::Ok(layout),
                cache: CacheStatus::ExactHit,
                elapsed_ms: elapsed_ms(started),
            };
        }

        let options = ExtractOptions::from_config(&self.config.extractor)
            .with_tier(self.tier)
            .with_cancel(cancel.clone());
        let analysis = self
            .extractor
            .extract(&segment.text, &options)
            .map(|analysis| self.validator.validate(&analysis));
        let validated = analysis.value();

        let candidate = self.cache.candidate(&fingerprint);
        corrupted |= candidate.corrupted;
        let adopted = candidate.layout.as_ref().and_then(|layout| {
            rebind(
                layout,
                candidate.analysis.as_ref(),
                &validated.analysis,
                &self.config.layout,
            )
        });

        let (layout, cache) = match adopted {
            Some(layout) => {
                self.cache.confirm_hit(&candidate);
                let status = if candidate.exact {
                    CacheStatus::ExactHit
                } else {
                    CacheStatus::FuzzyHit(candidate.similarity.score)
                };
                (Stage::Ok(layout), status)
            }
            None => {
                self.cache.record_miss();
                let compute_started = Instant::now();
                let layout = self.compute_layout(&validated.analysis);
                if !analysis.is_degraded() && !layout.is_degraded() {
                    self.cache.store_with_analysis(
                        &fingerprint,
                        &validated.analysis,
                        layout.value(),
                        validated.analysis.confidence(),
                        elapsed_ms(compute_started),
                        &segment.text,
                    );
                }
                (layout, CacheStatus::Miss)
            }
        };

        let layout = match layout {
            Stage::Ok(layout) if corrupted => Stage::Degraded(layout, DegradeReason::CacheCorruption),
            other => other,
        };

        SegmentOutcome {
            start_ms: segment.start_ms,
            end_ms: segment.end_ms,
            analysis,
            layout,
            cache,
            elapsed_ms: elapsed_ms(started),
        }
    }

    fn compute_layout(&self, analysis: &DiagramAnalysis) -> Stage<LayoutData> {
        match self.engine.layout(analysis, &self.config.layout) {
            Ok(stage) => stage,
            Err(err) => {
                warn!(err:%; "Layout failed, emitting an empty layout");
                Stage::Degraded(LayoutData::default(), DegradeReason::LayoutAlgorithm(err.to_string()))
            }
        }
    }

    /// Process every segment, at most `max_parallel` at a time.
    ///
    /// Outcomes are returned in input order.
    pub fn process_document(
        &self,
        segments: &[Segment],
        cancel: &CancellationToken,
    ) -> Vec<SegmentOutcome> {
        let workers = self.config.pipeline.max_parallel.clamp(1, segments.len().max(1));
        info!(segments = segments.len(), workers; "Processing document");

        let next = AtomicUsize::new(0);
        let results: Mutex<Vec<Option<SegmentOutcome>>> = Mutex::new(vec![None; segments.len()]);

        thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| {
                    loop {
                        let idx = next.fetch_add(1, Ordering::Relaxed);
                        let Some(segment) = segments.get(idx) else {
                            break;
                        };
                        let outcome = self.process_segment(segment, cancel);
                        info!(
                            segment = idx,
                            cache:? = outcome.cache,
                            degraded = outcome.is_degraded(),
                            elapsed_ms = outcome.elapsed_ms;
                            "Segment processed",
                        );
                        results.lock()[idx] = Some(outcome);
                    }
                });
            }
        });

        results
            .into_inner()
            .into_iter()
            .zip(segments)
            .map(|(outcome, segment)| {
                outcome.unwrap_or_else(|| self.process_segment(segment, cancel))
            })
            .collect()
    }
}

/// Reuse cached geometry for `analysis` when laying it out would give the same boxes.
///
/// The diagram types must agree, every node must measure the same, and edge
/// `i` must join the same node positions in both graphs. Ids, labels and
/// edge endpoints are then taken from `analysis`; routes and kinds carry over.
fn rebind(
    layout: &LayoutData,
    cached: Option<&DiagramAnalysis>,
    analysis: &DiagramAnalysis,
    config: &LayoutConfig,
) -> Option<LayoutData> {
    if cached.map(DiagramAnalysis::diagram_type) != Some(analysis.diagram_type()) {
        debug!(diagram_type:% = analysis.diagram_type(); "Cached geometry has another diagram type");
        return None;
    }

    let (graph, cleanup) = LayoutGraph::from_analysis(analysis, config);
    if !cleanup.is_clean()
        || graph.len() != layout.node_count()
        || graph.edges().len() != layout.edge_count()
    {
        debug!(
            cached_nodes = layout.node_count(),
            nodes = graph.len(),
            cached_edges = layout.edge_count(),
            edges = graph.edges().len();
            "Cached geometry does not fit the analysis",
        );
        return None;
    }

    let same_boxes = graph.nodes().iter().zip(&layout.nodes).all(|(node, cached)| {
        (node.size.width() - cached.width).abs() <= SIZE_TOLERANCE
            && (node.size.height() - cached.height).abs() <= SIZE_TOLERANCE
    });
    let position: HashMap<&str, usize> = layout
        .nodes
        .iter()
        .enumerate()
        .map(|(idx, node)| (node.id.as_str(), idx))
        .collect();
    let same_edges = graph.edges().iter().zip(&layout.edges).all(|(edge, cached)| {
        position.get(cached.source.as_str()) == Some(&edge.source)
            && position.get(cached.target.as_str()) == Some(&edge.target)
    });
    if !same_boxes || !same_edges {
        debug!(same_boxes, same_edges; "Cached geometry has another shape");
        return None;
    }

    let mut rebound = layout.clone();
    for (node, source) in rebound.nodes.iter_mut().zip(graph.nodes()) {
        node.id.clone_from(&source.id);
        node.label.clone_from(&source.label);
    }
    for (edge, source) in rebound.edges.iter_mut().zip(graph.edges()) {
        edge.source.clone_from(&graph.nodes()[source.source].id);
        edge.target.clone_from(&graph.nodes()[source.target].id);
    }
    rebound.is_well_formed().then_some(rebound)
}

fn elapsed_ms(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}
