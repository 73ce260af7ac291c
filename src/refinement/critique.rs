//! Semantic Critique Scorer
//!
//! Turns free-text critique into a five-dimension [`SemanticScore`]. Each
//! dimension owns phrase-level positive and negative matchers; a positive
//! phrase preceded by a nearby negator ("not clear", "lacks thorough ...")
//! counts against the dimension instead of for it. A small set of approval
//! and hedge phrases applies to every dimension.
//!
//! Scoring is a pure function of the normalized text.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::constants::critique::{
    CONFIDENCE_LENGTH_SATURATION, CONFIDENCE_SIGNAL_SATURATION, CONFIDENCE_SIGNAL_SHARE,
    NEGATION_WINDOW_WORDS, NEGATIVE_DECREMENT, NEUTRAL_SCORE, POSITIVE_INCREMENT, weights,
};
use crate::types::normalize_text;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    TechnicalAccuracy,
    Completeness,
    Clarity,
    Structure,
    Usefulness,
}

impl Dimension {
    pub const ALL: [Dimension; 5] = [
        Dimension::TechnicalAccuracy,
        Dimension::Completeness,
        Dimension::Clarity,
        Dimension::Structure,
        Dimension::Usefulness,
    ];

    pub fn weight(&self) -> f64 {
        match self {
            Dimension::TechnicalAccuracy => weights::TECHNICAL_ACCURACY,
            Dimension::Completeness => weights::COMPLETENESS,
            Dimension::Clarity => weights::CLARITY,
            Dimension::Structure => weights::STRUCTURE,
            Dimension::Usefulness => weights::USEFULNESS,
        }
    }

    fn index(&self) -> usize {
        match self {
            Dimension::TechnicalAccuracy => 0,
            Dimension::Completeness => 1,
            Dimension::Clarity => 2,
            Dimension::Structure => 3,
            Dimension::Usefulness => 4,
        }
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dimension::TechnicalAccuracy => write!(f, "technical_accuracy"),
            Dimension::Completeness => write!(f, "completeness"),
            Dimension::Clarity => write!(f, "clarity"),
            Dimension::Structure => write!(f, "structure"),
            Dimension::Usefulness => write!(f, "usefulness"),
        }
    }
}

/// Multi-dimensional quality score derived from critique text
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SemanticScore {
    pub technical_accuracy: f64,
    pub completeness: f64,
    pub clarity: f64,
    pub structure: f64,
    pub usefulness: f64,
    /// Weighted combination of the five dimensions, in [0, 1]
    pub overall: f64,
    /// How decisive the critique was, in [0, 1]
    pub confidence: f64,
}

impl SemanticScore {
    pub fn dimension(&self, dimension: Dimension) -> f64 {
        match dimension {
            Dimension::TechnicalAccuracy => self.technical_accuracy,
            Dimension::Completeness => self.completeness,
            Dimension::Clarity => self.clarity,
            Dimension::Structure => self.structure,
            Dimension::Usefulness => self.usefulness,
        }
    }

    fn from_dimensions(scores: [f64; 5], confidence: f64) -> Self {
        let overall = Dimension::ALL
            .iter()
            .map(|d| scores[d.index()] * d.weight())
            .sum::<f64>()
            .clamp(0.0, 1.0);
        Self {
            technical_accuracy: scores[0],
            completeness: scores[1],
            clarity: scores[2],
            structure: scores[3],
            usefulness: scores[4],
            overall,
            confidence,
        }
    }
}

// =============================================================================
// Pattern Catalog
// =============================================================================

struct DimensionRules {
    dimension: Dimension,
    positive: Vec<Regex>,
    negative: Vec<Regex>,
}

fn compile(raw: &[&str]) -> Vec<Regex> {
    raw.iter()
        .filter_map(|pattern| {
            Regex::new(pattern)
                .map_err(|e| warn!(pattern, error = %e, "Invalid critique pattern"))
                .ok()
        })
        .collect()
}

static DIMENSION_RULES: LazyLock<Vec<DimensionRules>> = LazyLock::new(|| {
    vec![
        DimensionRules {
            dimension: Dimension::TechnicalAccuracy,
            positive: compile(&[
                r"\b(?:sophisticated|enterprise[- ]grade|well[- ]architected)\b",
                r"\b(?:technically )?(?:accurate|correct|precise)\b",
                r"\bseparation of concerns\b",
                r"\b(?:solid principles|dependency injection|design patterns?)\b",
                r"\b(?:well[- ]implemented|sound engineering|loose coupling|proper abstractions?)\b",
                r"\bproper(?:ly)? (?:separat\w+|layer\w*|abstract\w*|structured)\b",
            ]),
            negative: compile(&[
                r"\b(?:inaccurate|incorrect|wrong|erroneous|outdated|misleading)\b",
                r"\b(?:poor|bad|flawed) (?:implementation|architecture|design)\b",
                r"\b(?:tight coupling|high complexity|unmaintainable)\b",
                r"\b(?:does not|doesn't) (?:match|reflect) the code\b",
            ]),
        },
        DimensionRules {
            dimension: Dimension::Completeness,
            positive: compile(&[
                r"\bcomprehensive(?:ly)?\b",
                r"\bcovers (?:all|every|each)\b",
                r"\b(?:complete coverage|fully documented|thorough(?:ly)?)\b",
                r"\b(?:all (?:the )?necessary information|sufficient detail)\b",
                r"\bincludes (?:all|everything)\b",
            ]),
            negative: compile(&[
                r"\b(?:incomplete|missing|omitted|omits|lacks|lacking)\b",
                r"\b(?:insufficient|too brief|too short|superficial)\b",
                r"\bneeds? more (?:detail|details|examples|information|depth)\b",
                r"\bnot (?:enough|sufficient)\b",
            ]),
        },
        DimensionRules {
            dimension: Dimension::Clarity,
            positive: compile(&[
                r"\b(?:clear|clearly written|easy to (?:understand|follow|read))\b",
                r"\b(?:concise|well[- ]written|readable|accessible|intuitive)\b",
                r"\bto the point\b",
            ]),
            negative: compile(&[
                r"\b(?:unclear|confusing|ambiguous|vague)\b",
                r"\bhard to (?:understand|follow|read)\b",
                r"\b(?:poorly written|verbose|too (?:complex|technical)|unnecessarily complicated)\b",
            ]),
        },
        DimensionRules {
            dimension: Dimension::Structure,
            positive: compile(&[
                r"\b(?:well[- ]structured|well[- ]organized)\b",
                r"\blogical(?:ly)? (?:flow|order|organized|structure)\b",
                r"\b(?:good|clean|consistent|proper) (?:organization|formatting|structure|layout)\b",
                r"\bclear (?:sections|headings|boundaries|hierarchy)\b",
            ]),
            negative: compile(&[
                r"\b(?:poor|bad|confusing|inconsistent) (?:structure|organization|formatting|layout|flow)\b",
                r"\b(?:disorganized|poorly organized|unstructured|hard to navigate)\b",
            ]),
        },
        DimensionRules {
            dimension: Dimension::Usefulness,
            positive: compile(&[
                r"\b(?:helpful|useful|practical|actionable|valuable)\b",
                r"\bprovides? (?:\w+ )?guidance\b",
                r"\b(?:developers will benefit|real value|usage examples|good examples)\b",
            ]),
            negative: compile(&[
                r"\b(?:unhelpful|useless|impractical)\b",
                r"\b(?:purely theoretical|theoretical only)\b",
                r"\b(?:does not|doesn't|fails to) (?:help|address)\b",
                r"\bno (?:usage )?examples\b",
            ]),
        },
    ]
});

/// Phrases of overall approval; count for every dimension
static APPROVAL: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"\b(?:excellent|outstanding|exceptional|exemplary)\b",
        r"\brequires no changes\b",
        r"\bno changes (?:are )?(?:needed|required)\b",
        r"\bhigh[- ]quality\b",
    ])
});

/// Hedged criticism; counts against every dimension
static HEDGES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"\bcould be (?:better|improved|clearer|expanded)\b",
        r"\b(?:needs|requires) (?:improvement|more work|revision)\b",
        r"\broom for improvement\b",
        r"\bshould (?:be )?(?:expanded|improved|clarified|revised)\b",
    ])
});

const NEGATORS: &[&str] = &[
    "not", "no", "never", "lacks", "lacking", "without", "hardly", "barely", "nor", "neither",
    "cannot",
];

// =============================================================================
// Scorer
// =============================================================================

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    positive: usize,
    negative: usize,
}

impl Tally {
    fn score(&self) -> f64 {
        (NEUTRAL_SCORE + self.positive as f64 * POSITIVE_INCREMENT
            - self.negative as f64 * NEGATIVE_DECREMENT)
            .clamp(0.0, 1.0)
    }
}

/// Stateless scorer over the built-in pattern catalog
#[derive(Debug, Default, Clone, Copy)]
pub struct CritiqueScorer;

impl CritiqueScorer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(&self, critique: &str) -> SemanticScore {
        let text = normalize_text(critique);
        if text.is_empty() {
            return SemanticScore::from_dimensions([NEUTRAL_SCORE; 5], 0.0);
        }

        let mut signals = 0usize;

        let (approvals, disapprovals) = count_polarity(&text, &APPROVAL);
        let hedges = count_all(&text, &HEDGES);
        signals += approvals + disapprovals + hedges;

        let mut scores = [NEUTRAL_SCORE; 5];
        for rules in DIMENSION_RULES.iter() {
            let (positive, negated) = count_polarity(&text, &rules.positive);
            let negative = count_all(&text, &rules.negative);
            signals += positive + negated + negative;

            let tally = Tally {
                positive: positive + approvals,
                negative: negated + negative + disapprovals + hedges,
            };
            scores[rules.dimension.index()] = tally.score();
        }

        SemanticScore::from_dimensions(scores, confidence(signals, text.split(' ').count()))
    }
}

/// Score critique text with the default scorer
pub fn analyze(critique: &str) -> SemanticScore {
    CritiqueScorer.analyze(critique)
}

/// Matches split into (plain, negated)
fn count_polarity(text: &str, patterns: &[Regex]) -> (usize, usize) {
    patterns
        .iter()
        .flat_map(|p| p.find_iter(text))
        .fold((0, 0), |(plain, negated), m| {
            if is_negated(&text[..m.start()]) {
                (plain, negated + 1)
            } else {
                (plain + 1, negated)
            }
        })
}

fn count_all(text: &str, patterns: &[Regex]) -> usize {
    patterns.iter().map(|p| p.find_iter(text).count()).sum()
}

/// A negator among the last few words before a match, within the same clause
fn is_negated(preceding: &str) -> bool {
    for word in preceding
        .split_whitespace()
        .rev()
        .take(NEGATION_WINDOW_WORDS)
    {
        if word.ends_with(['.', ',', ';', ':', '!', '?']) {
            return false;
        }
        let word = word.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'');
        if NEGATORS.contains(&word) || word.ends_with("n't") {
            return true;
        }
    }
    false
}

fn confidence(signals: usize, words: usize) -> f64 {
    let signal_part = (signals as f64 / CONFIDENCE_SIGNAL_SATURATION).min(1.0);
    let length_part = (words as f64 / CONFIDENCE_LENGTH_SATURATION).min(1.0);
    (CONFIDENCE_SIGNAL_SHARE * signal_part + (1.0 - CONFIDENCE_SIGNAL_SHARE) * length_part)
        .clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const ACCURACY_PHRASES: &[&str] = &[
        "sophisticated design",
        "sound engineering",
        "solid principles",
        "loose coupling",
        "well implemented",
        "technically accurate",
        "separation of concerns",
    ];

    #[test]
    fn test_weights_sum_to_one() {
        let total: f64 = Dimension::ALL.iter().map(|d| d.weight()).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_praise_for_architecture() {
        let score = analyze(
            "excellent, sophisticated architecture with proper separation of concerns and SOLID principles",
        );
        assert!(score.technical_accuracy >= 0.7, "{:?}", score);
        assert!(score.overall >= 0.6, "{:?}", score);
    }

    #[test]
    fn test_approval_reply_scores_high() {
        let score = analyze("The documentation is excellent and requires no changes.");
        for dimension in Dimension::ALL {
            assert!(score.dimension(dimension) > NEUTRAL_SCORE);
        }
        assert!(score.confidence > 0.3);
    }

    #[test]
    fn test_full_approval_clears_default_gate() {
        use crate::ai::prompt::APPROVAL_EXAMPLE;
        use crate::refinement::state::QualityGate;
        use crate::types::IssueCounts;

        let score = analyze(APPROVAL_EXAMPLE);
        assert!(score.overall > 0.95, "{score:?}");
        assert!((score.confidence - 1.0).abs() < 1e-9, "{score:?}");

        let gate = QualityGate::default();
        assert!(gate.passes(gate.combined_score(&score, &IssueCounts::default())));
    }

    #[test]
    fn test_negation_flips_polarity() {
        let positive = analyze("The explanations are clear.");
        let negated = analyze("The explanations are not clear.");
        assert!(positive.clarity > NEUTRAL_SCORE);
        assert!(negated.clarity < NEUTRAL_SCORE);
    }

    #[test]
    fn test_negation_stops_at_clause_boundary() {
        let score = analyze("Not bad. Clear and concise.");
        assert!(score.clarity > NEUTRAL_SCORE);
    }

    #[test]
    fn test_hedges_reduce_every_dimension() {
        let score = analyze("It could be better and needs improvement.");
        for dimension in Dimension::ALL {
            assert!(score.dimension(dimension) < NEUTRAL_SCORE);
        }
    }

    #[test]
    fn test_negative_critique() {
        let score = analyze(
            "1. The setup section is incomplete and missing install steps.\n\
             2. The architecture description is misleading and confusing.\n\
             3. Poor structure overall; hard to navigate.",
        );
        assert!(score.completeness < NEUTRAL_SCORE);
        assert!(score.technical_accuracy < NEUTRAL_SCORE);
        assert!(score.clarity < NEUTRAL_SCORE);
        assert!(score.structure < NEUTRAL_SCORE);
        assert!(score.overall < 0.5);
    }

    #[test]
    fn test_mixed_signals_sum_then_clamp() {
        let score = analyze("Clear, but confusing in places.");
        let expected = NEUTRAL_SCORE + POSITIVE_INCREMENT - NEGATIVE_DECREMENT;
        assert!((score.clarity - expected).abs() < 1e-9);
    }

    #[test]
    fn test_empty_and_neutral_text() {
        let empty = analyze("   ");
        assert_eq!(empty.confidence, 0.0);
        assert!((empty.overall - NEUTRAL_SCORE).abs() < 1e-9);

        let neutral = analyze("ok");
        assert!(neutral.confidence < 0.1);
    }

    #[test]
    fn test_keywords_inside_words_do_not_match() {
        // "unclear" is negative only; the bare "clear" matcher must not fire inside it
        let score = analyze("unclear");
        let expected = NEUTRAL_SCORE - NEGATIVE_DECREMENT;
        assert!((score.clarity - expected).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn prop_positive_matches_are_monotonic(count in 0usize..ACCURACY_PHRASES.len()) {
            let text = |n: usize| ACCURACY_PHRASES[..n].join(". ");
            let fewer = analyze(&text(count));
            let more = analyze(&text(count + 1));
            prop_assert!(more.technical_accuracy >= fewer.technical_accuracy);
            prop_assert!(more.technical_accuracy <= 1.0);
        }

        #[test]
        fn prop_normalization_is_deterministic(
            words in prop::collection::vec("[a-zA-Z]{1,10}", 0..30),
            separators in prop::collection::vec(prop::sample::select(vec![" ", "  ", "\n", "\t "]), 30),
        ) {
            let compact = words.join(" ");
            let spaced: String = words
                .iter()
                .zip(separators.iter().cycle())
                .map(|(w, s)| format!("{}{}", w.to_uppercase(), s))
                .collect();
            prop_assert_eq!(analyze(&compact), analyze(&spaced));
        }

        #[test]
        fn prop_scores_stay_in_range(text in ".{0,200}") {
            let score = analyze(&text);
            for dimension in Dimension::ALL {
                let value = score.dimension(dimension);
                prop_assert!((0.0..=1.0).contains(&value));
            }
            prop_assert!((0.0..=1.0).contains(&score.overall));
            prop_assert!((0.0..=1.0).contains(&score.confidence));
        }
    }
}
