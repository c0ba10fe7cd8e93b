//! Structure extraction: text to [`DiagramAnalysis`].
//!
//! Two tiers are available. The rule-based tier
//! ([`narragraph_text::extract_rules`]) always succeeds. The model-backed tier
//! runs when a [`ModelCapability`] is configured and enabled; any failure
//! there falls back to the rule-based tier and is reported as a
//! [`DegradeReason::Extraction`]. Extraction never returns an error.

use std::{
    sync::{Arc, mpsc},
    thread,
    time::{Duration, Instant},
};

use log::{debug, info, warn};

use narragraph_core::analysis::DiagramAnalysis;
use narragraph_text::{ComplexityClassifier, Language, LanguageDetector, extract_rules};

use crate::{
    config::ExtractorConfig,
    error::ExtractionError,
    model::{
        CancellationToken, ModelCapability, ModelError, ModelRequest, prompts,
        response::parse_response,
    },
    stage::{DegradeReason, Stage},
};

/// Longest uninterrupted wait; cancellation is noticed within this interval
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Which extraction tiers a call may use
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ExtractTier {
    /// Model first when enabled, rules as fallback
    #[default]
    Auto,
    RulesOnly,
    /// Model even when disabled in the configuration; rules only as fallback
    ModelOnly,
}

/// Per-call extraction options
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Upper bound for one model call
    pub timeout: Duration,
    /// Overrides language detection when set
    pub preferred_language: Option<Language>,
    pub tier: ExtractTier,
    pub cancel: CancellationToken,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self::from_config(&ExtractorConfig::default())
    }
}

impl ExtractOptions {
    pub fn from_config(config: &ExtractorConfig) -> Self {
        Self {
            timeout: Duration::from_millis(config.timeout_ms),
            preferred_language: None,
            tier: ExtractTier::Auto,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_tier(mut self, tier: ExtractTier) -> Self {
        self.tier = tier;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Two-tier structure extractor
pub struct StructureExtractor {
    config: ExtractorConfig,
    model: Option<Arc<dyn ModelCapability>>,
    classifier: ComplexityClassifier,
    detector: LanguageDetector,
}

impl StructureExtractor {
    pub fn new(config: ExtractorConfig, model: Option<Arc<dyn ModelCapability>>) -> Self {
        let classifier = ComplexityClassifier::new().with_medium_tier(config.medium_tier);
        let detector = LanguageDetector::new(config.fallback_language, config.language_floor);
        Self {
            config,
            model,
            classifier,
            detector,
        }
    }

    /// Extract a diagram analysis from `text`.
    ///
    /// Returns [`Stage::Degraded`] when the model-backed tier was requested
    /// but the rule-based tier had to answer instead.
    pub fn extract(&self, text: &str, options: &ExtractOptions) -> Stage<DiagramAnalysis> {
        let model = match (options.tier, &self.model) {
            (ExtractTier::RulesOnly, _) => None,
            (ExtractTier::Auto, Some(model)) if self.config.enabled => Some(model),
            (ExtractTier::Auto, _) => None,
            (ExtractTier::ModelOnly, Some(model)) => Some(model),
            (ExtractTier::ModelOnly, None) => {
                warn!("Model-only extraction requested without a model capability");
                return Stage::Degraded(
                    extract_rules(text),
                    DegradeReason::Extraction(ExtractionError::NotConfigured),
                );
            }
        };

        let Some(model) = model else {
            debug!("Using rule-based extraction");
            return Stage::Ok(extract_rules(text));
        };

        match self.extract_with_model(text, options, Arc::clone(model)) {
            Ok(analysis) => Stage::Ok(analysis),
            Err(err) => {
                warn!(model = model.name(), err:%; "Model extraction failed, using rules");
                Stage::Degraded(extract_rules(text), DegradeReason::Extraction(err))
            }
        }
    }

    fn extract_with_model(
        &self,
        text: &str,
        options: &ExtractOptions,
        model: Arc<dyn ModelCapability>,
    ) -> Result<DiagramAnalysis, ExtractionError> {
        let language = options
            .preferred_language
            .unwrap_or_else(|| self.detector.detect(text).language);
        let complexity = self.classifier.classify(text);

        info!(
            model = model.name(),
            language = language.code(),
            score = complexity.score;
            "Extracting with model",
        );

        let request = ModelRequest {
            prompt: prompts::prompt_for(language),
            context: text.to_string(),
            timeout_ms: duration_ms(options.timeout),
            tier: complexity.recommended_tier,
        };

        let raw = self
            .call_with_retries(model, &request, options)
            .map_err(|err| match err {
                ModelError::Cancelled => ExtractionError::Cancelled,
                other => ExtractionError::Model(other),
            })?;

        parse_response(&raw)
    }

    fn call_with_retries(
        &self,
        model: Arc<dyn ModelCapability>,
        request: &ModelRequest,
        options: &ExtractOptions,
    ) -> Result<String, ModelError> {
        let mut attempt = 0;
        loop {
            if options.cancel.is_cancelled() {
                return Err(ModelError::Cancelled);
            }

            let err = match call_once(Arc::clone(&model), request, options) {
                Ok(raw) => return Ok(raw),
                Err(err) => err,
            };

            if !err.is_transient() || attempt >= self.config.max_retries {
                return Err(err);
            }
            attempt += 1;

            let mut backoff = self.config.retry_backoff_ms * u64::from(attempt);
            if let ModelError::RateLimited { retry_after_ms } = &err {
                backoff = backoff.max(*retry_after_ms);
            }
            debug!(attempt, backoff_ms = backoff, err:%; "Retrying model call");
            sleep_unless_cancelled(Duration::from_millis(backoff), &options.cancel)?;
        }
    }
}

/// Run one model call on a worker thread under the timeout.
///
/// The worker is abandoned, not joined, when the call times out or is
/// cancelled; its eventual result is discarded.
fn call_once(
    model: Arc<dyn ModelCapability>,
    request: &ModelRequest,
    options: &ExtractOptions,
) -> Result<String, ModelError> {
    let (sender, receiver) = mpsc::channel();
    let request = request.clone();
    thread::spawn(move || {
        let _ = sender.send(model.complete(&request));
    });

    let deadline = Instant::now() + options.timeout;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(ModelError::Timeout(duration_ms(options.timeout)));
        }
        match receiver.recv_timeout(remaining.min(POLL_INTERVAL)) {
            Ok(result) => return result,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                if options.cancel.is_cancelled() {
                    return Err(ModelError::Cancelled);
                }
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                return Err(ModelError::RequestFailed(
                    "model worker exited without a response".to_string(),
                ));
            }
        }
    }
}

fn sleep_unless_cancelled(duration: Duration, cancel: &CancellationToken) -> Result<(), ModelError> {
    let deadline = Instant::now() + duration;
    loop {
        if cancel.is_cancelled() {
            return Err(ModelError::Cancelled);
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Ok(());
        }
        thread::sleep(remaining.min(POLL_INTERVAL));
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
