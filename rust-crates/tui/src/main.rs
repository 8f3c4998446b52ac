use boss_battle::{
    client,
    config::Cli,
};
use clap::Parser;
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use std::{
    path::Path,
    sync::OnceLock,
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

// stdout belongs to the TUI, so logs go to a daily file
fn init_tracing(log_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(log_dir)
        .wrap_err_with(|| format!("creating log dir {} failed", log_dir.display()))?;
    let appender = tracing_appender::rolling::daily(log_dir, "boss-battle.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let _ = LOG_GUARD.set(guard);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init();
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let config = Cli::parse().into_config()?;
    sessions::ensure_structure(&config.session_dir).map_err(|e| eyre!("{e:#}"))?;
    init_tracing(&config.log_dir)?;
    tracing::info!(
        network = %config.network.env(),
        contract = ?config.contract,
        "starting boss-battle client"
    );
    client::run_app(config).await
}
