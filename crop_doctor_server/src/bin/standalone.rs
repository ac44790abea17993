use std::sync::Arc;

use crop_doctor::{DiagnosisPipeline, DoctorConfig};
use crop_doctor_server::{ServerConfig, start_server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,crop_doctor=debug,crop_doctor_server=debug".into()),
        )
        .init();

    // The model is loaded here, once, before the first request is accepted.
    let pipeline = Arc::new(DiagnosisPipeline::from_config(&DoctorConfig::from_env())?);
    let cfg = ServerConfig::from_env();

    let handle = start_server(pipeline, cfg).await?;
    // Park forever
    handle.await.ok();
    Ok(())
}
