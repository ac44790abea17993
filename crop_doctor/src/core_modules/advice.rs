// THEORY:
// The advice resolver is the display-side view of the knowledge base. It turns a
// label into the `{title, steps}` pair the response needs. It inherits totality
// from `KnowledgeBase::lookup`: every string resolves, unknown ones to Generic.

use crate::core_modules::knowledge_base::KnowledgeBase;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Advice {
    pub title: String,
    pub steps: Vec<String>,
}

pub fn resolve(knowledge_base: &KnowledgeBase, label: &str) -> Advice {
    let entry = knowledge_base.lookup(label);
    Advice {
        title: entry.friendly_title.clone(),
        steps: entry.steps.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_label() {
        let advice = resolve(&KnowledgeBase::builtin(), "Tomato___Late_blight");
        assert_eq!(advice.title, "Tomato Late Blight");
        assert_eq!(advice.steps[0], "Immediately remove and destroy infected plants.");
    }

    #[test]
    fn unknown_labels_get_generic_advice() {
        let kb = KnowledgeBase::builtin();
        let generic = resolve(&kb, "Generic");
        for label in ["", "Issue", "grape___black_measles", "generic"] {
            assert_eq!(resolve(&kb, label), generic, "{label}");
        }
        assert_eq!(generic.title, "Issue detected");
    }

    #[test]
    fn resolving_twice_is_identical() {
        let kb = KnowledgeBase::builtin();
        let first = serde_json::to_vec(&resolve(&kb, "Pest_Damage")).unwrap();
        let second = serde_json::to_vec(&resolve(&kb, "Pest_Damage")).unwrap();
        assert_eq!(first, second);
    }
}
