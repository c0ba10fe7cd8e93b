//! Deterministic text analysis for Narragraph.
//!
//! Everything in this crate is pure: the same input text always yields the
//! same output, with no I/O and no external services.
//!
//! - [`complexity`] scores how demanding a text is and recommends a model tier
//! - [`language`] guesses the dominant language from function words and scripts
//! - [`cues`] counts the keyword cues that signal a diagram structure
//! - [`fingerprint`] derives [`ContentFingerprint`]s used as cache keys
//! - [`rules`] is the always-available rule-based structure extractor
//!
//! [`ContentFingerprint`]: narragraph_core::fingerprint::ContentFingerprint

pub mod complexity;
pub mod cues;
pub mod fingerprint;
pub mod language;
pub mod rules;
pub mod tokens;

pub use complexity::{ComplexityClassifier, ComplexityLevel, ComplexityReport, ModelTier};
pub use fingerprint::fingerprint;
pub use language::{Language, LanguageDetector, LanguageGuess};
pub use rules::{RULE_CONFIDENCE, extract_rules};
