// THEORY:
// The text classifier turns a free-form symptom description into a label by
// keyword matching. It is deliberately simple and fully deterministic: no model,
// no I/O, no failure mode.
//
// The rules are a priority-ordered table rather than a chain of conditionals, so
// the tie-break order is data that can be inspected and tested. Evaluation is
// short-circuit: the first rule that matches decides the label and nothing else
// is considered. Text matching no rule falls through to `Generic`.

use crate::core_modules::prediction::prediction::{GENERIC_LABEL, Prediction, Score};

pub const FALLBACK_SCORE: Score = 0.6;

/// How a rule's keywords must appear in the lower-cased text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeywordMatch {
    /// At least one keyword is present.
    Any(&'static [&'static str]),
    /// Every keyword is present.
    All(&'static [&'static str]),
}

impl KeywordMatch {
    pub fn matches(&self, text: &str) -> bool {
        match self {
            KeywordMatch::Any(words) => words.iter().any(|w| text.contains(w)),
            KeywordMatch::All(words) => words.iter().all(|w| text.contains(w)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeywordRule {
    pub keywords: KeywordMatch,
    pub label: &'static str,
    pub score: Score,
}

/// Rules in priority order.
pub static KEYWORD_RULES: [KeywordRule; 4] = [
    KeywordRule {
        keywords: KeywordMatch::Any(&["powdery", "white dust"]),
        label: "Powdery_Mildew",
        score: 0.85,
    },
    // Both keywords must appear.
    KeywordRule {
        keywords: KeywordMatch::All(&["yellow", "vein"]),
        label: "Nitrogen_Deficiency",
        score: 0.8,
    },
    KeywordRule {
        keywords: KeywordMatch::Any(&["holes", "chew", "eaten"]),
        label: "Pest_Damage",
        score: 0.75,
    },
    KeywordRule {
        keywords: KeywordMatch::Any(&["spots", "specks"]),
        label: "Leaf_Spot",
        score: 0.7,
    },
];

/// Returns the first rule matching `description`, if any.
pub fn matching_rule(description: &str) -> Option<&'static KeywordRule> {
    let text = description.to_lowercase();
    KEYWORD_RULES.iter().find(|rule| rule.keywords.matches(&text))
}

pub fn classify(description: &str) -> Prediction {
    match matching_rule(description) {
        Some(rule) => Prediction::new(rule.label, rule.score),
        None => Prediction::new(GENERIC_LABEL, FALLBACK_SCORE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label_and_score(text: &str) -> (String, f64) {
        let p = classify(text);
        (p.label, p.score)
    }

    #[test]
    fn powdery_wins_over_every_other_keyword() {
        for text in [
            "Powdery coating",
            "POWDERY leaves with yellow veins, holes and spots",
            "spots and specks, also powdery",
            "some white dust on chewed leaves",
        ] {
            assert_eq!(label_and_score(text), ("Powdery_Mildew".into(), 0.85), "{text}");
        }
    }

    #[test]
    fn nitrogen_needs_both_yellow_and_vein() {
        assert_eq!(
            label_and_score("yellow leaves with veins showing"),
            ("Nitrogen_Deficiency".into(), 0.8)
        );
        assert_eq!(label_and_score("yellow leaves"), ("Generic".into(), 0.6));
        assert_eq!(label_and_score("green veins"), ("Generic".into(), 0.6));
    }

    #[test]
    fn pest_damage_keywords() {
        for text in ["Leaves have holes", "something chewed it", "half eaten"] {
            assert_eq!(label_and_score(text), ("Pest_Damage".into(), 0.75), "{text}");
        }
    }

    #[test]
    fn pest_damage_beats_leaf_spot() {
        assert_eq!(label_and_score("holes and spots"), ("Pest_Damage".into(), 0.75));
    }

    #[test]
    fn leaf_spot_keywords() {
        assert_eq!(label_and_score("brown Spots everywhere"), ("Leaf_Spot".into(), 0.7));
        assert_eq!(label_and_score("tiny specks"), ("Leaf_Spot".into(), 0.7));
    }

    #[test]
    fn empty_and_nonsense_fall_through_to_generic() {
        assert_eq!(label_and_score(""), ("Generic".into(), 0.6));
        assert_eq!(label_and_score("qwerty 12345 ??"), ("Generic".into(), 0.6));
        assert!(matching_rule("").is_none());
    }

    #[test]
    fn rule_order_is_fixed() {
        let labels: Vec<_> = KEYWORD_RULES.iter().map(|r| r.label).collect();
        assert_eq!(
            labels,
            ["Powdery_Mildew", "Nitrogen_Deficiency", "Pest_Damage", "Leaf_Spot"]
        );
    }
}
