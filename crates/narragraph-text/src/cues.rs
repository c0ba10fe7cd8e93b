//! Keyword cues that signal a diagram structure.
//!
//! Cues are single words or short phrases matched on whole-word boundaries
//! against the normalized text. [`CueCounts`] tallies each family once per
//! occurrence; the fingerprint and the rule-based extractor both derive their
//! decisions from the same counts.

use narragraph_core::{
    analysis::DiagramType,
    fingerprint::{DiagramHint, StructurePattern},
};

const SEQUENTIAL: &[&str] = &[
    "first", "firstly", "second", "secondly", "third", "then", "next", "after that",
    "afterwards", "finally", "lastly", "step", "before", "subsequently", "followed by",
];

const CONDITIONAL: &[&str] = &[
    "if", "unless", "otherwise", "else", "in case", "depending on", "whether", "only when",
];

const COMPARISON: &[&str] = &[
    "versus", "vs", "compared to", "compared with", "whereas", "unlike", "in contrast",
    "on the other hand", "similarly", "pros", "cons", "better than", "worse than",
];

const PROCESS: &[&str] = &[
    "process", "workflow", "pipeline", "stage", "phase", "procedure", "input", "output",
    "produces", "transforms",
];

const HIERARCHICAL: &[&str] = &[
    "consists of", "composed of", "contains", "includes", "is made up of", "types of",
    "kinds of", "category", "categories", "subcategory", "parent", "child", "children",
    "branch", "branches", "divided into", "belongs to",
];

const TIMELINE: &[&str] = &[
    "century", "decade", "era", "in the year", "timeline", "history", "historically",
    "later that year", "by the time",
];

const CYCLE: &[&str] = &[
    "cycle", "cycles", "repeat", "repeats", "repeated", "loop", "loops", "again",
    "back to", "recurring", "iterate", "iterates", "circular",
];

/// Number of cue occurrences per structure family
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CueCounts {
    pub sequential: usize,
    pub conditional: usize,
    pub comparison: usize,
    pub process: usize,
    pub hierarchical: usize,
    pub timeline: usize,
    pub cycle: usize,
}

impl CueCounts {
    /// Count cues in already-lowercased words
    pub fn scan(words: &[String]) -> Self {
        // Padding with spaces lets phrases match on word boundaries only.
        let haystack = format!(" {} ", words.join(" "));
        let count = |cues: &[&str]| -> usize {
            cues.iter()
                .map(|cue| haystack.matches(&format!(" {cue} ")).count())
                .sum()
        };

        let years = words.iter().filter(|word| is_year(word)).count();

        Self {
            sequential: count(SEQUENTIAL),
            conditional: count(CONDITIONAL),
            comparison: count(COMPARISON),
            process: count(PROCESS),
            hierarchical: count(HIERARCHICAL),
            timeline: count(TIMELINE) + years,
            cycle: count(CYCLE),
        }
    }

    /// Dominant rhetorical pattern; ties resolve in declaration order
    pub fn structure_pattern(&self) -> StructurePattern {
        let ranked = [
            (StructurePattern::Sequential, self.sequential),
            (StructurePattern::Conditional, self.conditional),
            (StructurePattern::Comparison, self.comparison),
            (StructurePattern::Process, self.process),
            (StructurePattern::Hierarchical, self.hierarchical),
        ];
        first_max(&ranked).unwrap_or(StructurePattern::General)
    }

    /// Diagram family suggested by the cues
    pub fn diagram_hint(&self) -> DiagramHint {
        let pattern = self.structure_pattern();
        let strongest_structural = [
            self.sequential,
            self.conditional,
            self.comparison,
            self.process,
            self.hierarchical,
        ]
        .into_iter()
        .max()
        .unwrap_or(0);

        if self.timeline > 0 && self.timeline >= strongest_structural {
            return DiagramHint::Timeline;
        }

        match pattern {
            StructurePattern::Sequential
            | StructurePattern::Conditional
            | StructurePattern::Process => DiagramHint::Flow,
            StructurePattern::Comparison => DiagramHint::Matrix,
            StructurePattern::Hierarchical => DiagramHint::Tree,
            StructurePattern::General => DiagramHint::General,
        }
    }

    /// Diagram type chosen by the rule-based extractor.
    ///
    /// Cycle cues weigh double since a loop back is a strong, rare signal.
    /// With no cues at all the text is treated as a flow.
    pub fn diagram_type(&self) -> DiagramType {
        let ranked = [
            (
                DiagramType::Flow,
                self.sequential + self.conditional + self.process,
            ),
            (DiagramType::Tree, self.hierarchical),
            (DiagramType::Matrix, self.comparison),
            (DiagramType::Timeline, self.timeline),
            (DiagramType::Cycle, self.cycle * 2),
        ];
        first_max(&ranked).unwrap_or(DiagramType::Flow)
    }
}

/// First entry holding the maximum non-zero count
fn first_max<T: Copy>(ranked: &[(T, usize)]) -> Option<T> {
    let mut best: Option<(T, usize)> = None;
    for &(value, count) in ranked {
        if count > 0 && best.is_none_or(|(_, best_count)| count > best_count) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value)
}

fn is_year(word: &str) -> bool {
    word.len() == 4
        && word.chars().all(|c| c.is_ascii_digit())
        && (word.starts_with('1') || word.starts_with("20"))
}

/// True if `word` opens a conditional clause
pub fn is_condition_opener(word: &str) -> bool {
    matches!(word, "if" | "when" | "unless" | "whether")
}

/// True if `word` opens the alternative branch of a condition
pub fn is_alternative_opener(word: &str) -> bool {
    matches!(word, "otherwise" | "else")
}
