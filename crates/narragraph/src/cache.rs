//! Semantic cache of analyses and layouts.
//!
//! Entries are keyed by the semantic hash of a [`ContentFingerprint`]. A
//! lookup first tries an exact hash match and then scans every entry for the
//! most similar fingerprint. A fuzzy hit hands back the cached layout with its
//! labels rewritten to the new text's key terms.
//!
//! [`SemanticCache::candidate`] finds the same match without touching usage
//! or counters. A caller that may still reject the geometry settles it later
//! with [`SemanticCache::confirm_hit`] or [`SemanticCache::record_miss`].
//!
//! All state sits behind one [`RwLock`]: scans take the read lock, stores,
//! evictions and usage bumps take the write lock. Callers only ever receive
//! clones, so nothing they do can reach the stored entries.

use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};

use indexmap::IndexMap;
use log::{debug, info, trace, warn};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;

use narragraph_core::{
    analysis::DiagramAnalysis, fingerprint::ContentFingerprint, layout::LayoutData,
};

use crate::config::CacheConfig;

/// Characters of source text kept with each entry
pub const PREVIEW_CHARS: usize = 100;

/// Floor applied to entry age when ranking for eviction
const MIN_EVICTION_AGE: Duration = Duration::from_secs(60 * 60);

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Source of the current time, injectable for tests
pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
}

/// Wall-clock time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<SystemTime>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(SystemTime::UNIX_EPOCH)
    }
}

impl ManualClock {
    pub fn new(start: SystemTime) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> SystemTime {
        *self.now.lock()
    }
}

/// One stored result
#[derive(Debug, Clone)]
pub struct CachedLayoutEntry {
    pub fingerprint: ContentFingerprint,
    pub layout: LayoutData,
    /// Validated analysis the layout was computed from, when known
    pub analysis: Option<DiagramAnalysis>,
    pub quality_score: f64,
    /// Number of stores plus hits; starts at 1
    pub usage_count: u64,
    pub created_at: SystemTime,
    pub last_used_at: SystemTime,
    pub compute_cost_ms: u64,
    pub node_count: usize,
    pub edge_count: usize,
    pub text_preview: String,
}

/// How close the best candidate came
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Similarity {
    /// 1.0 for exact hits, 0.0 when the cache is empty
    pub score: f64,
    /// Semantic hash of the best candidate
    pub matched_hash: Option<String>,
}

/// Result of a cache lookup
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheLookup {
    pub layout: Option<LayoutData>,
    /// Analysis stored with the matched entry, if any
    pub analysis: Option<DiagramAnalysis>,
    pub similarity: Similarity,
    pub hit: bool,
    pub exact: bool,
    /// The matched entry was malformed and has been removed
    pub corrupted: bool,
}

impl CacheLookup {
    fn miss(similarity: Similarity) -> Self {
        Self {
            similarity,
            ..Default::default()
        }
    }
}

/// Counters since construction (or the last [`SemanticCache::clear`])
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub fuzzy_hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub corrupt: u64,
}

#[derive(Default)]
struct CacheState {
    entries: IndexMap<String, CachedLayoutEntry>,
    stats: CacheStats,
}

/// Weighted similarity of two fingerprints, in `[0, 1]`.
///
/// `0.4 × key-term overlap + 0.3 × same structure pattern +
/// 0.2 × (1 − |Δ complexity|) + 0.1 × same diagram hint`
pub fn similarity(a: &ContentFingerprint, b: &ContentFingerprint) -> f64 {
    let pattern = if a.structure_pattern() == b.structure_pattern() {
        1.0
    } else {
        0.0
    };
    let hint = if a.diagram_hint() == b.diagram_hint() {
        1.0
    } else {
        0.0
    };
    let complexity = 1.0 - (a.complexity() - b.complexity()).abs();

    0.4 * a.key_term_overlap(b) + 0.3 * pattern + 0.2 * complexity + 0.1 * hint
}

/// Process-lifetime cache of analyses and layouts
pub struct SemanticCache {
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    state: RwLock<CacheState>,
}

impl SemanticCache {
    pub fn new(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            state: RwLock::new(CacheState::default()),
        }
    }

    /// Cache on the wall clock
    pub fn with_system_clock(config: CacheConfig) -> Self {
        Self::new(config, Arc::new(SystemClock))
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Fingerprint `text` with this cache's key-term limit
    pub fn fingerprint(&self, text: &str) -> ContentFingerprint {
        narragraph_text::fingerprint(text, self.config.key_terms)
    }

    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Exact lookup, returning the stored analysis along with the layout
    pub fn lookup_exact(&self, fingerprint: &ContentFingerprint) -> CacheLookup {
        let candidate = self.exact_candidate(fingerprint);
        self.settle(candidate)
    }

    /// Exact lookup first, then the most similar entry above the threshold.
    ///
    /// Fuzzy hits return the cached layout with node labels rewritten from
    /// the cached key terms to those of `fingerprint`.
    pub fn lookup(&self, fingerprint: &ContentFingerprint) -> CacheLookup {
        let mut candidate = self.candidate(fingerprint);
        if candidate.hit && !candidate.exact {
            let cached_terms = candidate.similarity.matched_hash.as_deref().and_then(|hash| {
                self.state
                    .read()
                    .entries
                    .get(hash)
                    .map(|entry| entry.fingerprint.key_terms().iter().cloned().collect::<Vec<_>>())
            });
            let new_terms: Vec<String> = fingerprint.key_terms().iter().cloned().collect();
            if let (Some(layout), Some(cached_terms)) = (candidate.layout.as_mut(), cached_terms) {
                adapt_labels(layout, &cached_terms, &new_terms);
            }
        }
        self.settle(candidate)
    }

    /// The entry stored under the same semantic hash, if any.
    ///
    /// Neither usage nor counters change; settle the result with
    /// [`confirm_hit`](Self::confirm_hit) or [`record_miss`](Self::record_miss).
    pub fn exact_candidate(&self, fingerprint: &ContentFingerprint) -> CacheLookup {
        let hash = fingerprint.semantic_hash();
        let found = {
            let state = self.state.read();
            state
                .entries
                .get(hash)
                .map(|entry| (entry.layout.clone(), entry.analysis.clone()))
        };

        match found {
            Some((layout, analysis)) => self.verify(hash, 1.0, layout, analysis, true),
            None => CacheLookup::miss(Similarity::default()),
        }
    }

    /// Exact match, or else the most similar entry at or above
    /// `similarity_threshold`.
    ///
    /// Like [`exact_candidate`](Self::exact_candidate) this leaves usage and
    /// counters alone. Labels are returned as stored.
    pub fn candidate(&self, fingerprint: &ContentFingerprint) -> CacheLookup {
        let exact = self.exact_candidate(fingerprint);
        if exact.hit || exact.corrupted {
            return exact;
        }

        let best = {
            let state = self.state.read();
            let mut best: Option<(f64, &CachedLayoutEntry)> = None;
            for entry in state.entries.values() {
                let score = similarity(fingerprint, &entry.fingerprint);
                if best.is_none_or(|(best_score, _)| score > best_score) {
                    best = Some((score, entry));
                }
            }
            best.map(|(score, entry)| {
                (
                    score,
                    entry.fingerprint.semantic_hash().to_string(),
                    entry.layout.clone(),
                    entry.analysis.clone(),
                )
            })
        };

        let Some((score, matched, layout, analysis)) = best else {
            return CacheLookup::miss(Similarity::default());
        };

        if score < self.config.similarity_threshold {
            trace!(score, threshold = self.config.similarity_threshold; "Best candidate below threshold");
            return CacheLookup::miss(Similarity {
                score,
                matched_hash: Some(matched),
            });
        }

        self.verify(&matched, score, layout, analysis, false)
    }

    /// Count `lookup` as a hit and bump the matched entry's usage.
    ///
    /// Does nothing for lookups that did not hit.
    pub fn confirm_hit(&self, lookup: &CacheLookup) {
        let Some(hash) = lookup.similarity.matched_hash.as_deref().filter(|_| lookup.hit) else {
            return;
        };

        let now = self.clock.now();
        let mut state = self.state.write();
        if let Some(entry) = state.entries.get_mut(hash) {
            entry.usage_count += 1;
            entry.last_used_at = now;
        }
        state.stats.hits += 1;
        if !lookup.exact {
            state.stats.fuzzy_hits += 1;
        }
        debug!(hash, score = lookup.similarity.score, exact = lookup.exact; "Cache hit");
    }

    pub fn record_miss(&self) {
        self.state.write().stats.misses += 1;
    }

    fn settle(&self, lookup: CacheLookup) -> CacheLookup {
        if lookup.hit {
            self.confirm_hit(&lookup);
        } else {
            self.record_miss();
        }
        lookup
    }

    /// Turn a cloned entry into a candidate, removing it if malformed
    fn verify(
        &self,
        hash: &str,
        score: f64,
        layout: LayoutData,
        analysis: Option<DiagramAnalysis>,
        exact: bool,
    ) -> CacheLookup {
        let similarity = Similarity {
            score,
            matched_hash: Some(hash.to_string()),
        };

        if !layout.is_well_formed() {
            warn!(hash; "Discarding corrupt cache entry");
            let mut state = self.state.write();
            // A concurrent store may have replaced the entry since it was cloned.
            if state
                .entries
                .get(hash)
                .is_some_and(|entry| !entry.layout.is_well_formed())
            {
                state.entries.shift_remove(hash);
            }
            state.stats.corrupt += 1;
            return CacheLookup {
                corrupted: true,
                ..CacheLookup::miss(similarity)
            };
        }

        CacheLookup {
            layout: Some(layout),
            analysis,
            similarity,
            hit: true,
            exact,
            corrupted: false,
        }
    }

    /// Store a layout, replacing any entry with the same semantic hash
    pub fn store(
        &self,
        fingerprint: &ContentFingerprint,
        layout: &LayoutData,
        quality_score: f64,
        compute_cost_ms: u64,
        text: &str,
    ) {
        self.insert(fingerprint, layout, None, quality_score, compute_cost_ms, text);
    }

    /// Store a layout together with the analysis it was computed from
    pub fn store_with_analysis(
        &self,
        fingerprint: &ContentFingerprint,
        analysis: &DiagramAnalysis,
        layout: &LayoutData,
        quality_score: f64,
        compute_cost_ms: u64,
        text: &str,
    ) {
        self.insert(
            fingerprint,
            layout,
            Some(analysis.clone()),
            quality_score,
            compute_cost_ms,
            text,
        );
    }

    fn insert(
        &self,
        fingerprint: &ContentFingerprint,
        layout: &LayoutData,
        analysis: Option<DiagramAnalysis>,
        quality_score: f64,
        compute_cost_ms: u64,
        text: &str,
    ) {
        if !layout.is_well_formed() {
            warn!(hash = fingerprint.semantic_hash(); "Refusing to cache a malformed layout");
            return;
        }

        let now = self.clock.now();
        let entry = CachedLayoutEntry {
            fingerprint: fingerprint.clone(),
            layout: layout.clone(),
            analysis,
            quality_score,
            usage_count: 1,
            created_at: now,
            last_used_at: now,
            compute_cost_ms,
            node_count: layout.node_count(),
            edge_count: layout.edge_count(),
            text_preview: text.chars().take(PREVIEW_CHARS).collect(),
        };

        let mut state = self.state.write();
        state
            .entries
            .insert(fingerprint.semantic_hash().to_string(), entry);
        trace!(hash = fingerprint.semantic_hash(), entries = state.entries.len(); "Stored cache entry");

        if state.entries.len() > self.config.capacity {
            let removed = evict_locked(&mut state, self.config.capacity, now);
            info!(removed, entries = state.entries.len(); "Evicted cache entries");
        }
    }

    /// Evict the least valuable quarter of the entries when over capacity.
    ///
    /// Returns the number of entries removed.
    pub fn evict(&self) -> usize {
        let now = self.clock.now();
        let mut state = self.state.write();
        if state.entries.len() <= self.config.capacity {
            return 0;
        }
        evict_locked(&mut state, self.config.capacity, now)
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.read();
        CacheStats {
            entries: state.entries.len(),
            ..state.stats
        }
    }

    /// Remove every entry and reset the counters
    pub fn clear(&self) {
        let mut state = self.state.write();
        state.entries.clear();
        state.stats = CacheStats::default();
    }

    /// Clone of a stored entry
    pub fn entry(&self, fingerprint: &ContentFingerprint) -> Option<CachedLayoutEntry> {
        self.state
            .read()
            .entries
            .get(fingerprint.semantic_hash())
            .cloned()
    }
}

/// Remove the entries with the lowest `usage_count / age_days`.
///
/// At least a quarter of the entries go, and enough to get back to capacity.
fn evict_locked(state: &mut CacheState, capacity: usize, now: SystemTime) -> usize {
    let len = state.entries.len();
    let count = (len / 4).max(len.saturating_sub(capacity)).max(1);

    let mut ranked: Vec<(f64, String)> = state
        .entries
        .iter()
        .map(|(hash, entry)| (retention(entry, now), hash.clone()))
        .collect();
    // Stable sort: among equal scores the oldest insertion goes first.
    ranked.sort_by(|a, b| a.0.total_cmp(&b.0));

    for (_, hash) in ranked.into_iter().take(count) {
        state.entries.shift_remove(&hash);
    }
    state.stats.evictions += count as u64;
    count
}

fn retention(entry: &CachedLayoutEntry, now: SystemTime) -> f64 {
    let age = now
        .duration_since(entry.created_at)
        .unwrap_or_default()
        .max(MIN_EVICTION_AGE);
    entry.usage_count as f64 / (age.as_secs_f64() / SECONDS_PER_DAY)
}

/// Replace words equal to the cached key term at rank `i` by the new key term at rank `i`
fn adapt_labels(layout: &mut LayoutData, cached_terms: &[String], new_terms: &[String]) {
    for node in &mut layout.nodes {
        let adapted: Vec<String> = node
            .label
            .split_whitespace()
            .map(|word| adapt_word(word, cached_terms, new_terms))
            .collect();
        node.label = adapted.join(" ");
    }
}

fn adapt_word(word: &str, cached_terms: &[String], new_terms: &[String]) -> String {
    let core = word.trim_matches(|c: char| !c.is_alphanumeric());
    let lowered = core.to_lowercase();
    let replacement = cached_terms
        .iter()
        .position(|term| *term == lowered)
        .and_then(|rank| new_terms.get(rank));

    match replacement {
        Some(term) if !core.is_empty() && *term != lowered => {
            let capitalized = core.chars().next().is_some_and(char::is_uppercase);
            let term = if capitalized {
                let mut chars = term.chars();
                chars
                    .next()
                    .map(|first| first.to_uppercase().chain(chars).collect())
                    .unwrap_or_default()
            } else {
                term.clone()
            };
            word.replacen(core, &term, 1)
        }
        _ => word.to_string(),
    }
}
