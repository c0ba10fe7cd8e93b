//! Tokenization helpers shared by the analyzers.
//!
//! Word and sentence boundaries follow Unicode text segmentation (UAX #29),
//! so punctuation, apostrophes and non-Latin scripts are handled uniformly.

use unicode_segmentation::UnicodeSegmentation;

/// English closed-class words ignored when picking key terms.
const STOPWORDS: &[&str] = &[
    "a", "about", "after", "again", "all", "also", "am", "an", "and", "any", "are", "as", "at",
    "be", "because", "been", "before", "being", "both", "but", "by", "can", "could", "did", "do",
    "does", "doing", "down", "during", "each", "else", "few", "finally", "first", "for", "from",
    "further", "had", "has", "have", "having", "he", "her", "here", "hers", "him", "his", "how",
    "i", "if", "in", "into", "is", "it", "its", "itself", "just", "last", "lastly", "may", "me",
    "might", "more", "most", "must", "my", "next", "no", "nor", "not", "now", "of", "off", "on",
    "once", "only", "or", "other", "otherwise", "our", "ours", "out", "over", "own", "same",
    "second", "she", "should", "so", "some", "such", "than", "that", "the", "their", "theirs",
    "them", "then", "there", "these", "they", "third", "this", "those", "through", "to", "too",
    "under", "until", "up", "very", "was", "we", "were", "what", "when", "where", "which",
    "while", "who", "whom", "why", "will", "with", "would", "you", "your", "yours",
];

/// Lowercased words of `text`, punctuation removed
pub fn words(text: &str) -> Vec<String> {
    text.unicode_words().map(str::to_lowercase).collect()
}

/// Trimmed, non-empty sentences of `text`
pub fn sentences(text: &str) -> Vec<&str> {
    text.unicode_sentences()
        .map(str::trim)
        .filter(|sentence| !sentence.is_empty())
        .collect()
}

/// Canonical form of `text`: lowercase words joined by single spaces.
///
/// Texts that differ only in casing, punctuation or whitespace normalize to
/// the same string.
pub fn normalize(text: &str) -> String {
    words(text).join(" ")
}

/// Returns true for words that carry no topical meaning
pub fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(&word)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_words_are_lowercased_without_punctuation() {
        assert_eq!(
            words("First, collect USER input!"),
            vec!["first", "collect", "user", "input"]
        );
    }

    #[test]
    fn test_sentences_split_on_terminators() {
        let text = "First, collect user input. Then, validate it. Finally, store the result.";
        assert_eq!(
            sentences(text),
            vec![
                "First, collect user input.",
                "Then, validate it.",
                "Finally, store the result."
            ]
        );
    }

    #[test]
    fn test_normalize_ignores_formatting() {
        assert_eq!(normalize("Hello,   World."), normalize("hello world"));
    }

    #[test]
    fn test_stopwords() {
        assert!(is_stopword("the"));
        assert!(is_stopword("then"));
        assert!(!is_stopword("validate"));
    }
}
