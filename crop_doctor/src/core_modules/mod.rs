pub mod actions;
pub mod advice;
pub mod image_classifier;
pub mod knowledge_base;
pub mod prediction;
pub mod text_classifier;
