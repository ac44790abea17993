// THEORY:
// This file is the entry point for the `crop_doctor` library crate. It exposes
// `DiagnosisPipeline` and its associated data structures (`Submission`,
// `DiagnosisReport`, `ActionResult`, etc.) as the high-level interface of the
// engine. Front ends (the HTTP server and the command-line tester) only parse
// request fields, call into the pipeline, and serialize what comes back.
//
// The pieces that carry decision logic live in `core_modules`: the knowledge
// base, the two classifiers, the advice resolver, and the action catalog and
// dispatcher.

pub mod config;
pub mod core_modules;
pub mod error;
pub mod pipeline;

pub use config::DoctorConfig;
pub use core_modules::actions::{ActionContext, ActionResult};
pub use error::{DoctorError, Result};
pub use pipeline::{DiagnosisInput, DiagnosisPipeline, DiagnosisReport, Submission};
