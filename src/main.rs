use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use log::LevelFilter;
use modelsync_backend::{SimulatedBackend, catalog::default_catalog};
use modelsync_frontend::ModelSelector;

const LOG_LEVEL_VARIABLE: &str = "MODELSYNC_LOG";
const DEMO_MODEL: &str = "base";
const ARCHIVE_MODEL: &str = "parakeet-tdt-0.6b-v3";

fn log_level() -> LevelFilter {
    std::env::var(LOG_LEVEL_VARIABLE)
        .ok()
        .and_then(|level| LevelFilter::from_str(&level).ok())
        .unwrap_or(LevelFilter::Info)
}

/// Drives the selector through a typical session: pick a downloaded model,
/// install another one and let it take over once extracted.
async fn run_session() -> anyhow::Result<()> {
    let mut config = modelsync_backend::config::load_config()
        .await
        .context("failed to load config")?;

    let backend = Arc::new(SimulatedBackend::new(
        default_catalog(),
        config.selected_model.clone(),
    ));
    backend.mark_downloaded(&[DEMO_MODEL, "small"]).await;

    let hub = backend.events();
    let selector = ModelSelector::builder(backend.clone())
        .config(config.selector.clone())
        .on_error(|message| log::error!("Model activation failed: {message}"))
        .start(&hub);

    let mut snapshots = selector.subscribe();
    let printer = tokio::spawn(async move {
        let mut last_text = String::new();
        while snapshots.changed().await.is_ok() {
            let snapshot = snapshots.borrow_and_update().clone();
            if snapshot.display_text != last_text {
                println!("[{:?}] {}", snapshot.status, snapshot.display_text);
                for download in &snapshot.downloads {
                    println!("    {}: {}", download.model_id, download.summary);
                }
                last_text = snapshot.display_text;
            }
        }
    });

    selector
        .select_model(DEMO_MODEL)
        .await
        .context("model selector stopped early")?;
    tokio::time::sleep(Duration::from_secs(1)).await;

    if let Err(error) = backend.download_model(ARCHIVE_MODEL).await {
        log::error!("Failed to install {ARCHIVE_MODEL}: {error}");
    }
    tokio::time::sleep(Duration::from_millis(config.selector.auto_activation_delay_ms) * 3).await;

    let snapshot = selector.snapshot();
    config.selected_model = snapshot.current_model_id.clone();
    modelsync_backend::config::save_config(&config)
        .await
        .context("failed to save config")?;

    selector.stop().await;
    printer.await.context("snapshot printer failed")?;
    log::info!(
        "Session ended with {:?} on {}",
        snapshot.current_model_id,
        snapshot.display_text
    );
    Ok(())
}

fn main() -> anyhow::Result<()> {
    simple_logger::SimpleLogger::new()
        .with_level(log_level())
        .with_colors(true)
        .with_threads(true)
        .with_local_timestamps()
        .init()
        .context("failed to build logger instance")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;
    runtime.block_on(run_session())
}
