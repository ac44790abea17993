// THEORY:
// The `KnowledgeBase` is the only "persisted state" of the engine: a fixed table
// mapping a canonical disease label to a friendly title and an ordered list of
// remediation steps. It is built once at start-up and is read-only afterwards,
// so it can be shared across threads behind an `Arc` without any locking.
//
// Key architectural principles:
// 1.  **Total Lookup**: `lookup` never fails. Any label that is not a key resolves
//     to the `Generic` entry. There is no "not found" path for callers to handle.
// 2.  **Guaranteed Fallback**: Because lookup relies on the `Generic` entry, a table
//     without one is rejected at construction time rather than at request time.
// 3.  **Externalizable**: The built-in table can be replaced by a JSON file of the
//     same shape, without changing anything downstream.

use crate::core_modules::prediction::prediction::GENERIC_LABEL;
use crate::error::{DoctorError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Advice for a single label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    #[serde(rename = "friendly")]
    pub friendly_title: String,
    #[serde(rename = "advice")]
    pub steps: Vec<String>,
}

impl KnowledgeEntry {
    fn from_static(friendly_title: &str, steps: &[&str]) -> Self {
        Self {
            friendly_title: friendly_title.to_string(),
            steps: steps.iter().map(|s| s.to_string()).collect(),
        }
    }
}

const BUILTIN_ENTRIES: [(&str, &str, [&str; 3]); 9] = [
    (
        "Apple___Apple_scab",
        "Apple Scab",
        [
            "Remove and destroy fallen leaves to reduce spores.",
            "Apply a fungicide containing captan or sulfur at early season if permitted.",
            "Improve airflow by pruning to keep foliage dry.",
        ],
    ),
    (
        "Apple___Black_rot",
        "Apple Black Rot",
        [
            "Prune out cankers during dormancy and destroy infected material.",
            "Avoid overhead irrigation; keep fruit dry.",
            "Use labeled fungicides (e.g., myclobutanil) if local guidance allows.",
        ],
    ),
    (
        "Tomato___Early_blight",
        "Tomato Early Blight",
        [
            "Remove lower leaves touching soil; mulch to prevent splash.",
            "Spray mancozeb or chlorothalonil per label; rotate with copper for resistance management.",
            "Follow a 7\u{2013}10 day spray interval during humid periods.",
        ],
    ),
    (
        "Tomato___Late_blight",
        "Tomato Late Blight",
        [
            "Immediately remove and destroy infected plants.",
            "Protect nearby plants with labeled fungicides (e.g., chlorothalonil).",
            "Avoid working plants when wet; sanitize tools.",
        ],
    ),
    (
        "Powdery_Mildew",
        "Powdery Mildew (suspected)",
        [
            "Increase spacing and airflow; avoid overhead watering.",
            "Use potassium bicarbonate, sulfur, or neem oil as labeled.",
            "Rotate crops to break pathogen cycle.",
        ],
    ),
    (
        "Nitrogen_Deficiency",
        "Nitrogen Deficiency (suspected)",
        [
            "Apply a balanced N fertilizer (e.g., urea 46-0-0) at recommended rates.",
            "Incorporate compost or green manure to improve soil health.",
            "Split applications to avoid leaching.",
        ],
    ),
    (
        "Leaf_Spot",
        "Leaf Spot (general)",
        [
            "Remove infected leaves and debris; sanitize tools.",
            "Use copper-based fungicides as labeled if disease pressure is high.",
            "Water at soil level, not from above.",
        ],
    ),
    (
        "Pest_Damage",
        "Chewing/Pest Damage (suspected)",
        [
            "Scout at dawn/dusk for caterpillars or beetles; hand-pick where possible.",
            "Apply Bacillus thuringiensis (Bt) for caterpillars or spinosad per label.",
            "Use sticky traps and encourage beneficial insects.",
        ],
    ),
    (
        GENERIC_LABEL,
        "Issue detected",
        [
            "Isolate affected plants to limit spread.",
            "Improve irrigation timing (morning), and ensure good airflow.",
            "Consider sending a sample to an extension lab for confirmation.",
        ],
    ),
];

/// A read-only label → advice table with a guaranteed `Generic` fallback.
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    entries: HashMap<String, KnowledgeEntry>,
}

impl KnowledgeBase {
    /// Builds a knowledge base from arbitrary entries.
    /// Fails if the `Generic` fallback is missing.
    pub fn from_entries(entries: HashMap<String, KnowledgeEntry>) -> Result<Self> {
        if !entries.contains_key(GENERIC_LABEL) {
            return Err(DoctorError::KnowledgeBase(format!(
                "missing required '{GENERIC_LABEL}' entry"
            )));
        }
        Ok(Self { entries })
    }

    /// The table shipped with the engine.
    pub fn builtin() -> Self {
        let entries = BUILTIN_ENTRIES
            .iter()
            .map(|(label, title, steps)| (label.to_string(), KnowledgeEntry::from_static(title, steps)))
            .collect();
        Self { entries }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let entries: HashMap<String, KnowledgeEntry> = serde_json::from_str(json)?;
        Self::from_entries(entries)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Total lookup: unknown labels resolve to the `Generic` entry.
    pub fn lookup(&self, label: &str) -> &KnowledgeEntry {
        self.entries
            .get(label)
            .unwrap_or_else(|| self.generic())
    }

    pub fn generic(&self) -> &KnowledgeEntry {
        // Presence is checked by every constructor.
        &self.entries[GENERIC_LABEL]
    }

    pub fn contains(&self, label: &str) -> bool {
        self.entries.contains_key(label)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        Self::builtin()
    }
}
