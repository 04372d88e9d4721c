use log::{info, warn};
use rapport_core::db::open_db;
use rapport_core::{init_logging, AppConfig, LogEcho, LogSettings};
use rapport_http::{router, AppState};
use std::net::SocketAddr;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env();
    let fallback_log_dir = std::env::current_dir()?.join("logs");
    init_logging(&LogSettings::from_config(
        &config,
        &fallback_log_dir,
        LogEcho::Stderr,
    )?)?;

    // Fail fast on an unreadable database or a newer schema.
    let db_path = config.db_path.clone();
    tokio::task::spawn_blocking(move || open_db(db_path).map(drop)).await??;

    let state = AppState::from_config(&config)?;
    let addr: SocketAddr = config.bind.parse()?;
    let app = router(state.clone());

    info!(
        "event=http_listen module=http status=ok addr={} db_path={} llm_providers={}",
        addr,
        state.db_path().display(),
        state.extract_chain().len()
    );
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("event=http_shutdown module=http status=ok");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        warn!("event=http_shutdown module=http status=error reason=signal_handler");
    }
}
