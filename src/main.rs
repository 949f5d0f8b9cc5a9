//! Process Warden - Main Entry Point
//!
//! Headless service mode: chạy scan loop và expose command surface qua
//! `api` cho UI host. Durable state duy nhất là suppression log.

mod api;
mod logic;
pub mod constants;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting Process Warden v{}...", constants::APP_VERSION);

    // Load durable suppression state first; active entries survive restarts
    if let Err(e) = api::commands::init() {
        log::warn!("Suppression manager init: {}", e);
    } else {
        let active = api::commands::list_active_suppressions()
            .map(|entries| entries.len())
            .unwrap_or(0);
        log::info!("Suppression log loaded ({} active entries)", active);
    }

    match logic::collector::start().await {
        Ok(_) => log::info!("Scan loop running"),
        Err(e) => log::error!("Collector start failed: {}", e),
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Signal handling failed: {}", e);
    }

    log::info!("Shutting down...");
    let _ = logic::collector::stop().await;
}
