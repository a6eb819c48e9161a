use std::env;

use dotenvy::dotenv;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

mod config;
mod driver;
mod telemetry;
mod wallets;

use crate::driver::CycleDriver;

fn env_filter() -> EnvFilter {
    EnvFilter::new(env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
}

/// Console logging, plus a daily file under `LOG_DIR` when it is set.
/// The returned guard must outlive the program for file logs to flush.
fn init_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    match env::var("LOG_DIR").ok().filter(|d| !d.trim().is_empty()) {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "pharos-bot.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(env_filter())
                .with(fmt::layer())
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(env_filter()).init();
            None
        }
    }
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    let _log_guard = init_logging();

    info!("🚀 Pharos Testnet Bot Bootstrapping...");

    let config = match config::BotConfig::new() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("❌ CRITICAL: Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        "✅ Config Loaded & Validated: RPC={}, Chain={}, MaxPools={}",
        config.rpc_url, config.chain_id, config.max_pools_per_cycle
    );

    if let Some(dir) = &config.log_dir {
        info!("📝 File logs written to {}", dir);
    }

    let keys = match wallets::load_private_keys(&config.private_keys_file, config.max_wallets) {
        Ok(keys) => keys,
        Err(e) => {
            error!("❌ CRITICAL: {:#}", e);
            std::process::exit(1);
        }
    };
    info!("🔑 Loaded {} wallet(s) from {}", keys.len(), config.private_keys_file);

    if let Err(e) = testnet_core::telemetry::init_metrics() {
        warn!("⚠️ Metrics registration failed: {}", e);
    }
    if let Some(port) = config.metrics_port {
        tokio::spawn(async move {
            if let Err(e) = telemetry::serve_metrics(port).await {
                error!("❌ Metrics server stopped: {}", e);
            }
        });
    }

    let driver = match CycleDriver::new(config, keys) {
        Ok(d) => d,
        Err(e) => {
            error!("❌ CRITICAL: {:#}", e);
            std::process::exit(1);
        }
    };

    tokio::select! {
        _ = driver.run() => {
            info!("🎉 All cycles complete");
        }
        res = tokio::signal::ctrl_c() => {
            match res {
                Ok(()) => info!("🛑 Shutdown signal received (Ctrl+C). Cleaning up..."),
                Err(e) => error!("❌ Failed to listen for Ctrl+C: {}", e),
            }
        }
    }
}
