// CRM Sync - Local Development Probe
//
// Loads configuration, builds the backend, and reads the ticket pipelines and
// deal stages back from the configured CRM to confirm the wiring end to end.

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crmsync_common::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.rust_log)),
        )
        .pretty()
        .init();

    info!(provider = %config.crm_provider, "Starting CRM Sync local probe");

    let backend = crmsync_app::Backend::from_config(&config).map_err(|e| {
        error!("Failed to create backend: {}", e);
        e
    })?;

    let pipelines = backend
        .list_pipeline_tickets()
        .await
        .map_err(|body| anyhow::anyhow!("Listing ticket pipelines failed: {}", body.error))?;
    for pipeline in &pipelines {
        info!(
            id = %pipeline.id,
            label = %pipeline.label,
            stages = pipeline.stages.len(),
            "Ticket pipeline"
        );
    }

    let deal_pipelines = backend
        .list_deal_stages()
        .await
        .map_err(|body| anyhow::anyhow!("Listing deal stages failed: {}", body.error))?;
    println!("{}", serde_json::to_string_pretty(&deal_pipelines)?);

    info!("Probe complete");
    Ok(())
}
