//! Dominant-language detection.
//!
//! Alphabetic languages are scored by the share of tokens that are
//! closed-class function words ("the", "und", "que", ...). Languages with a
//! distinctive script are scored by the share of characters from their
//! Unicode blocks. The best score wins; when it falls below the configured
//! floor the detector answers with its fallback language instead.

use std::{
    fmt::{self, Display},
    str::FromStr,
};

use log::trace;
use serde::{Deserialize, Serialize};

use crate::tokens;

/// Number of characters inspected; longer texts are truncated
pub const SAMPLE_CHARS: usize = 500;

/// Default confidence floor below which the fallback language is used
pub const DEFAULT_FLOOR: f64 = 0.15;

/// Languages with localized prompt templates (ISO 639-1 codes)
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Es,
    Fr,
    De,
    Pt,
    It,
    Zh,
    Ja,
    Ko,
    Ru,
    Ar,
}

impl Language {
    /// ISO 639-1 code
    pub fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Es => "es",
            Self::Fr => "fr",
            Self::De => "de",
            Self::Pt => "pt",
            Self::It => "it",
            Self::Zh => "zh",
            Self::Ja => "ja",
            Self::Ko => "ko",
            Self::Ru => "ru",
            Self::Ar => "ar",
        }
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" => Ok(Self::En),
            "es" => Ok(Self::Es),
            "fr" => Ok(Self::Fr),
            "de" => Ok(Self::De),
            "pt" => Ok(Self::Pt),
            "it" => Ok(Self::It),
            "zh" => Ok(Self::Zh),
            "ja" => Ok(Self::Ja),
            "ko" => Ok(Self::Ko),
            "ru" => Ok(Self::Ru),
            "ar" => Ok(Self::Ar),
            other => Err(format!("unsupported language code: {other}")),
        }
    }
}

impl Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

const FUNCTION_WORDS: &[(Language, &[&str])] = &[
    (
        Language::En,
        &[
            "the", "and", "of", "to", "is", "it", "that", "then", "this", "with", "for", "are",
            "was", "be", "on", "in", "a", "an", "if", "or",
        ],
    ),
    (
        Language::Es,
        &[
            "el", "la", "los", "las", "y", "que", "del", "se", "por", "con", "para", "una", "es",
            "lo", "luego", "pero", "como", "si",
        ],
    ),
    (
        Language::Fr,
        &[
            "le", "les", "et", "des", "du", "est", "une", "que", "qui", "dans", "pour", "avec",
            "ensuite", "puis", "sur", "au", "aux", "ce",
        ],
    ),
    (
        Language::De,
        &[
            "der", "die", "das", "und", "ist", "nicht", "ein", "eine", "mit", "den", "dem", "zu",
            "dann", "auf", "für", "sich", "wenn", "auch",
        ],
    ),
    (
        Language::Pt,
        &[
            "o", "os", "as", "e", "do", "da", "dos", "das", "não", "uma", "em", "com", "para",
            "depois", "então", "que", "é", "se",
        ],
    ),
    (
        Language::It,
        &[
            "il", "gli", "della", "di", "che", "è", "non", "sono", "una", "per", "con", "poi",
            "quindi", "nel", "alla", "delle", "lo", "anche",
        ],
    ),
];

/// Best guess for a text
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LanguageGuess {
    pub language: Language,
    pub confidence: f64,
    /// True when the guess fell below the floor and the fallback was used
    pub fallback_used: bool,
}

/// Configurable language detector
#[derive(Debug, Clone, Copy)]
pub struct LanguageDetector {
    fallback: Language,
    floor: f64,
}

impl Default for LanguageDetector {
    fn default() -> Self {
        Self::new(Language::En, DEFAULT_FLOOR)
    }
}

impl LanguageDetector {
    pub fn new(fallback: Language, floor: f64) -> Self {
        Self { fallback, floor }
    }

    /// Detect the dominant language of `text`.
    ///
    /// Never fails: low-confidence and empty inputs yield the fallback language.
    pub fn detect(&self, text: &str) -> LanguageGuess {
        let sample: String = text.chars().take(SAMPLE_CHARS).collect();

        let (language, confidence) = script_score(&sample)
            .into_iter()
            .chain(function_word_scores(&sample))
            .fold((self.fallback, 0.0), |best, candidate| {
                if candidate.1 > best.1 { candidate } else { best }
            });

        trace!(language = language.code(), confidence = confidence; "Language scores computed");

        if confidence < self.floor {
            return LanguageGuess {
                language: self.fallback,
                confidence,
                fallback_used: true,
            };
        }

        LanguageGuess {
            language,
            confidence,
            fallback_used: false,
        }
    }
}

fn function_word_scores(sample: &str) -> Vec<(Language, f64)> {
    let words = tokens::words(sample);
    if words.is_empty() {
        return Vec::new();
    }

    FUNCTION_WORDS
        .iter()
        .map(|(language, function_words)| {
            let hits = words
                .iter()
                .filter(|word| function_words.contains(&word.as_str()))
                .count();
            (*language, hits as f64 / words.len() as f64)
        })
        .collect()
}

/// Share of characters belonging to one distinctive script, if any
fn script_score(sample: &str) -> Option<(Language, f64)> {
    let mut total = 0usize;
    let mut kana = 0usize;
    let mut han = 0usize;
    let mut hangul = 0usize;
    let mut cyrillic = 0usize;
    let mut arabic = 0usize;

    for c in sample.chars().filter(|c| !c.is_whitespace()) {
        total += 1;
        match c as u32 {
            0x3040..=0x30FF => kana += 1,
            0x4E00..=0x9FFF | 0x3400..=0x4DBF => han += 1,
            0xAC00..=0xD7AF | 0x1100..=0x11FF => hangul += 1,
            0x0400..=0x04FF => cyrillic += 1,
            0x0600..=0x06FF => arabic += 1,
            _ => {}
        }
    }

    if total == 0 {
        return None;
    }

    let share = |count: usize| count as f64 / total as f64;
    // Japanese mixes kanji with kana; pure Han text is Chinese.
    let candidates = [
        (Language::Ja, if kana > 0 { share(kana + han) } else { 0.0 }),
        (Language::Zh, if kana == 0 { share(han) } else { 0.0 }),
        (Language::Ko, share(hangul)),
        (Language::Ru, share(cyrillic)),
        (Language::Ar, share(arabic)),
    ];

    candidates
        .into_iter()
        .filter(|(_, score)| *score > 0.0)
        .max_by(|a, b| a.1.total_cmp(&b.1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(text: &str) -> LanguageGuess {
        LanguageDetector::default().detect(text)
    }

    #[test]
    fn test_detects_english() {
        let guess = detect("First, collect user input. Then, validate it. Finally, store the result.");
        assert_eq!(guess.language, Language::En);
        assert!(!guess.fallback_used);
    }

    #[test]
    fn test_detects_spanish() {
        let guess = detect("Primero, el usuario introduce los datos y luego el sistema los valida.");
        assert_eq!(guess.language, Language::Es);
    }

    #[test]
    fn test_detects_german() {
        let guess = detect("Zuerst wird die Eingabe geprüft und dann ist der Vorgang mit dem Speichern fertig.");
        assert_eq!(guess.language, Language::De);
    }

    #[test]
    fn test_detects_scripts() {
        assert_eq!(detect("首先收集用户输入然后验证").language, Language::Zh);
        assert_eq!(detect("まずユーザー入力を収集します").language, Language::Ja);
        assert_eq!(detect("먼저 사용자 입력을 수집합니다").language, Language::Ko);
        assert_eq!(detect("Сначала соберите данные пользователя").language, Language::Ru);
    }

    #[test]
    fn test_low_confidence_uses_fallback() {
        let detector = LanguageDetector::new(Language::Fr, 0.15);
        let guess = detector.detect("xyzzy plugh qwerty");
        assert_eq!(guess.language, Language::Fr);
        assert!(guess.fallback_used);

        let empty = detector.detect("");
        assert_eq!(empty.language, Language::Fr);
        assert_eq!(empty.confidence, 0.0);
    }

    #[test]
    fn test_language_codes_round_trip() {
        for code in ["en", "es", "fr", "de", "pt", "it", "zh", "ja", "ko", "ru", "ar"] {
            let language: Language = code.parse().expect("known code");
            assert_eq!(language.code(), code);
        }
        assert!("xx".parse::<Language>().is_err());
    }
}
