// THEORY:
// Every failure the engine can report lives in one enum. The variants split into
// two families: request problems the caller must fix (`InputMissing`,
// `UnknownAction`) and processing problems the engine degrades around
// (`ImageDecode`, `Inference`, `ModelUnavailable`). The remaining variants only
// occur while the engine is being assembled at start-up.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DoctorError {
    #[error("Provide an image or description.")]
    InputMissing,

    #[error("Image parse error: {0}")]
    ImageDecode(String),

    #[error("Image model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Image model inference failed: {0}")]
    Inference(String),

    #[error("Unknown action")]
    UnknownAction(String),

    #[error("Knowledge base error: {0}")]
    KnowledgeBase(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DoctorError {
    /// True for errors caused by a malformed or unsupported request.
    pub fn is_client_error(&self) -> bool {
        matches!(self, DoctorError::InputMissing | DoctorError::UnknownAction(_))
    }
}

pub type Result<T> = std::result::Result<T, DoctorError>;
