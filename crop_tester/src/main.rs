use anyhow::Context;
use clap::Parser;
use crop_doctor::{ActionContext, DiagnosisPipeline, DoctorConfig, Submission};
use std::path::PathBuf;

/// Runs the crop doctor pipeline on a local image or description and prints
/// the same JSON documents the HTTP server would return.
#[derive(Parser, Debug)]
#[command(name = "crop_tester", version, about)]
struct Args {
    /// Leaf photo to classify. Takes precedence over --description.
    #[arg(short, long)]
    image: Option<PathBuf>,

    /// Free-text symptom description.
    #[arg(short, long)]
    description: Option<String>,

    /// Crop name echoed back in the report.
    #[arg(short, long)]
    crop: Option<String>,

    /// Follow-up action to run against the diagnosed label.
    #[arg(short, long)]
    action: Option<String>,
}

fn main() -> anyhow::Result<()> {
    // --- 1. Logging & Argument Parsing ---
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .init();
    let args = Args::parse();

    // --- 2. Pipeline Initialization ---
    let pipeline = DiagnosisPipeline::from_config(&DoctorConfig::from_env())?;
    tracing::info!(classifier = %pipeline.classifier().describe(), "pipeline ready");

    // --- 3. Diagnosis ---
    let image_bytes = match &args.image {
        Some(path) => Some(std::fs::read(path).with_context(|| format!("reading {}", path.display()))?),
        None => None,
    };
    let submission = Submission {
        crop: args.crop,
        description: args.description,
        image_bytes,
    };
    let report = pipeline.report(&submission)?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    // --- 4. Optional Follow-up Action ---
    if let Some(action_id) = args.action {
        let context = ActionContext {
            crop: Some(report.crop.clone()),
            disease: Some(report.prediction.label.clone()),
        };
        let result = pipeline.dispatch_action(&action_id, &context)?;
        let mut doc = serde_json::to_value(&result)?;
        if let Some(map) = doc.as_object_mut() {
            map.insert("ok".to_string(), true.into());
        }
        println!("{}", serde_json::to_string_pretty(&doc)?);
    }

    Ok(())
}
