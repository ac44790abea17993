// THEORY:
// After a diagnosis the user is offered a fixed menu of follow-up actions. This
// module owns both halves of that feature:
//
// 1.  **Catalog**: The static, ordered list of `ActionDescriptor`s returned with
//     every successful diagnosis.
// 2.  **Dispatcher**: Maps an action id plus its context to one of four fixed
//     response shapes. Each call is independent; nothing is remembered between
//     calls, and `set_reminder` in particular schedules nothing.
//
// Action ids are parsed into `ActionKind` up front, so an unknown id is rejected
// before any work is done.

use crate::core_modules::advice;
use crate::core_modules::knowledge_base::KnowledgeBase;
use crate::error::{DoctorError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const DEFAULT_CROP: &str = "Crop";
pub const DEFAULT_DISEASE: &str = "Issue";

pub const STORE_QUERY: &str = "agriculture input store pesticide fertilizer near me";
pub const MAPS_SEARCH_URL: &str = "https://www.google.com/maps/search/";

const PREVENTIVE_SCHEDULE: [&str; 4] = [
    "Week 1: Prune for airflow; remove debris.",
    "Week 2: Apply preventive spray if high humidity; mulch to reduce splash.",
    "Week 3: Scout twice weekly; water early morning at soil line.",
    "Week 4: Rotate with a different mode-of-action or switch to organic spray.",
];

const REMINDER_MESSAGE: &str =
    "We will remind you in 7 days to rescout your crop. (Demo only; no notifications)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActionDescriptor {
    pub id: &'static str,
    pub label: &'static str,
}

pub static ACTION_CATALOG: [ActionDescriptor; 4] = [
    ActionDescriptor {
        id: "treatment_steps",
        label: "Show treatment steps",
    },
    ActionDescriptor {
        id: "preventive_schedule",
        label: "Preventive care schedule",
    },
    ActionDescriptor {
        id: "find_store",
        label: "Find nearby agri store",
    },
    ActionDescriptor {
        id: "set_reminder",
        label: "Set follow-up reminder (demo)",
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    TreatmentSteps,
    PreventiveSchedule,
    FindStore,
    SetReminder,
}

impl FromStr for ActionKind {
    type Err = DoctorError;

    fn from_str(id: &str) -> Result<Self> {
        match id {
            "treatment_steps" => Ok(ActionKind::TreatmentSteps),
            "preventive_schedule" => Ok(ActionKind::PreventiveSchedule),
            "find_store" => Ok(ActionKind::FindStore),
            "set_reminder" => Ok(ActionKind::SetReminder),
            other => Err(DoctorError::UnknownAction(other.to_string())),
        }
    }
}

/// What the caller knows when it asks for an action.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ActionContext {
    pub crop: Option<String>,
    pub disease: Option<String>,
}

impl ActionContext {
    pub fn crop(&self) -> &str {
        self.crop.as_deref().unwrap_or(DEFAULT_CROP)
    }

    pub fn disease(&self) -> &str {
        self.disease.as_deref().unwrap_or(DEFAULT_DISEASE)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionResult {
    TreatmentSteps { title: String, steps: Vec<String> },
    PreventiveSchedule { title: String, schedule: Vec<String> },
    FindStore { title: String, maps_url: String },
    SetReminder { title: String, message: String },
}

pub fn maps_search_url(query: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
    format!("{MAPS_SEARCH_URL}{encoded}")
}

pub fn dispatch(knowledge_base: &KnowledgeBase, action_id: &str, context: &ActionContext) -> Result<ActionResult> {
    let kind: ActionKind = action_id.parse()?;
    let result = match kind {
        ActionKind::TreatmentSteps => {
            let advice = advice::resolve(knowledge_base, context.disease());
            ActionResult::TreatmentSteps {
                title: format!("Treatment for {}", advice.title),
                steps: advice.steps,
            }
        }
        ActionKind::PreventiveSchedule => ActionResult::PreventiveSchedule {
            title: format!("Preventive schedule for {}", context.crop()),
            schedule: PREVENTIVE_SCHEDULE.iter().map(|s| s.to_string()).collect(),
        },
        ActionKind::FindStore => ActionResult::FindStore {
            title: "Nearby Agri Stores".to_string(),
            maps_url: maps_search_url(STORE_QUERY),
        },
        ActionKind::SetReminder => ActionResult::SetReminder {
            title: "Reminder scheduled (demo)".to_string(),
            message: REMINDER_MESSAGE.to_string(),
        },
    };
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(crop: Option<&str>, disease: Option<&str>) -> ActionContext {
        ActionContext {
            crop: crop.map(str::to_string),
            disease: disease.map(str::to_string),
        }
    }

    #[test]
    fn catalog_is_fixed_and_ordered() {
        let ids: Vec<_> = ACTION_CATALOG.iter().map(|a| a.id).collect();
        assert_eq!(ids, ["treatment_steps", "preventive_schedule", "find_store", "set_reminder"]);
        for descriptor in &ACTION_CATALOG {
            assert!(descriptor.id.parse::<ActionKind>().is_ok());
        }
    }

    #[test]
    fn treatment_steps_for_apple_scab() {
        let kb = KnowledgeBase::builtin();
        let result = dispatch(&kb, "treatment_steps", &context(None, Some("Apple___Apple_scab"))).unwrap();
        assert_eq!(
            result,
            ActionResult::TreatmentSteps {
                title: "Treatment for Apple Scab".into(),
                steps: vec![
                    "Remove and destroy fallen leaves to reduce spores.".into(),
                    "Apply a fungicide containing captan or sulfur at early season if permitted.".into(),
                    "Improve airflow by pruning to keep foliage dry.".into(),
                ],
            }
        );
    }

    #[test]
    fn treatment_steps_without_disease_uses_generic() {
        let kb = KnowledgeBase::builtin();
        match dispatch(&kb, "treatment_steps", &ActionContext::default()).unwrap() {
            ActionResult::TreatmentSteps { title, steps } => {
                assert_eq!(title, "Treatment for Issue detected");
                assert_eq!(steps, kb.generic().steps);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn preventive_schedule_interpolates_crop_in_title_only() {
        let kb = KnowledgeBase::builtin();
        match dispatch(&kb, "preventive_schedule", &context(Some("Tomato"), None)).unwrap() {
            ActionResult::PreventiveSchedule { title, schedule } => {
                assert_eq!(title, "Preventive schedule for Tomato");
                assert_eq!(schedule.len(), 4);
                assert!(schedule.iter().all(|s| !s.contains("Tomato")));
                assert!(schedule[0].starts_with("Week 1:"));
            }
            other => panic!("unexpected {other:?}"),
        }
        match dispatch(&kb, "preventive_schedule", &ActionContext::default()).unwrap() {
            ActionResult::PreventiveSchedule { title, .. } => {
                assert_eq!(title, "Preventive schedule for Crop")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn find_store_url_only_has_plus_for_spaces() {
        let kb = KnowledgeBase::builtin();
        let ActionResult::FindStore { maps_url, .. } =
            dispatch(&kb, "find_store", &ActionContext::default()).unwrap()
        else {
            panic!("expected find_store");
        };
        assert_eq!(
            maps_url,
            "https://www.google.com/maps/search/agriculture+input+store+pesticide+fertilizer+near+me"
        );
        let prefix_len = MAPS_SEARCH_URL.len();
        assert!(!maps_url[..prefix_len].contains('+'));
        assert_eq!(maps_url.matches('+').count(), STORE_QUERY.matches(' ').count());
    }

    #[test]
    fn maps_url_escapes_reserved_characters() {
        assert_eq!(
            maps_search_url("seeds & feed+more"),
            "https://www.google.com/maps/search/seeds+%26+feed%2Bmore"
        );
    }

    #[test]
    fn set_reminder_is_a_static_acknowledgment() {
        let kb = KnowledgeBase::builtin();
        let a = dispatch(&kb, "set_reminder", &context(Some("Maize"), Some("Leaf_Spot"))).unwrap();
        let b = dispatch(&kb, "set_reminder", &ActionContext::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn unknown_action_is_an_error() {
        let kb = KnowledgeBase::builtin();
        for id in ["nope", "", "TREATMENT_STEPS"] {
            let err = dispatch(&kb, id, &ActionContext::default()).unwrap_err();
            assert!(matches!(err, DoctorError::UnknownAction(_)), "{id}");
        }
    }

    #[test]
    fn results_serialize_with_a_type_tag() {
        let kb = KnowledgeBase::builtin();
        let result = dispatch(&kb, "find_store", &ActionContext::default()).unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["type"], "find_store");
        assert_eq!(json["title"], "Nearby Agri Stores");
    }
}
