// THEORY:
// Engine configuration is read from the environment exactly once, at start-up,
// into plain structs. Nothing downstream touches `std::env`. Parsing goes
// through a lookup closure so the rules can be exercised without mutating the
// real process environment.

use std::path::PathBuf;

pub const DEMO_MODE_VAR: &str = "DEMO_MODE";
pub const MODEL_PATH_VAR: &str = "CROP_DOCTOR_MODEL";
pub const LABELS_PATH_VAR: &str = "CROP_DOCTOR_LABELS";
pub const INPUT_SIZE_VAR: &str = "CROP_DOCTOR_INPUT_SIZE";
pub const KNOWLEDGE_BASE_VAR: &str = "CROP_DOCTOR_KNOWLEDGE_BASE";

pub const DEFAULT_INPUT_SIZE: u32 = 224;

/// Where to find the backing image model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    /// Path to an ONNX image-classification model.
    pub model_path: PathBuf,
    /// Newline-separated class labels, one per model output.
    pub labels_path: Option<PathBuf>,
    /// Edge length of the square input the model expects.
    pub input_size: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DoctorConfig {
    /// Skip model loading entirely and use the stub classifier.
    pub demo_mode: bool,
    pub model: Option<ModelConfig>,
    /// JSON file replacing the built-in knowledge base.
    pub knowledge_base_path: Option<PathBuf>,
}

impl DoctorConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let demo_mode = lookup(DEMO_MODE_VAR).as_deref() == Some("1");
        let model = non_empty(MODEL_PATH_VAR).map(|path| ModelConfig {
            model_path: PathBuf::from(path),
            labels_path: non_empty(LABELS_PATH_VAR).map(PathBuf::from),
            input_size: non_empty(INPUT_SIZE_VAR)
                .and_then(|v| v.parse::<u32>().ok())
                .filter(|size| *size > 0)
                .unwrap_or(DEFAULT_INPUT_SIZE),
        });

        Self {
            demo_mode,
            model,
            knowledge_base_path: non_empty(KNOWLEDGE_BASE_VAR).map(PathBuf::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> DoctorConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        DoctorConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn empty_environment_gives_defaults() {
        assert_eq!(config_from(&[]), DoctorConfig::default());
    }

    #[test]
    fn demo_mode_only_on_exact_one() {
        assert!(config_from(&[(DEMO_MODE_VAR, "1")]).demo_mode);
        assert!(!config_from(&[(DEMO_MODE_VAR, "0")]).demo_mode);
        assert!(!config_from(&[(DEMO_MODE_VAR, "yes")]).demo_mode);
        assert!(!config_from(&[(DEMO_MODE_VAR, " 1")]).demo_mode);
    }

    #[test]
    fn model_settings_are_grouped() {
        let config = config_from(&[
            (MODEL_PATH_VAR, "/models/plant.onnx"),
            (LABELS_PATH_VAR, "/models/labels.txt"),
            (INPUT_SIZE_VAR, "256"),
        ]);
        let model = config.model.expect("model configured");
        assert_eq!(model.model_path, PathBuf::from("/models/plant.onnx"));
        assert_eq!(model.labels_path, Some(PathBuf::from("/models/labels.txt")));
        assert_eq!(model.input_size, 256);
    }

    #[test]
    fn bad_input_size_falls_back_to_default() {
        for size in ["abc", "0", "-3"] {
            let config = config_from(&[(MODEL_PATH_VAR, "m.onnx"), (INPUT_SIZE_VAR, size)]);
            assert_eq!(config.model.unwrap().input_size, DEFAULT_INPUT_SIZE);
        }
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = config_from(&[(MODEL_PATH_VAR, "  "), (KNOWLEDGE_BASE_VAR, "")]);
        assert!(config.model.is_none());
        assert!(config.knowledge_base_path.is_none());
    }
}
