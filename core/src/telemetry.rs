use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // Driver
    pub static ref CYCLES_TOTAL: IntCounter = IntCounter::new(
        "cycles_total",
        "Completed automation cycles"
    ).unwrap();

    pub static ref WALLETS_PROCESSED: IntCounter = IntCounter::new(
        "wallets_processed_total",
        "Wallets run through the feature sequence"
    ).unwrap();

    // Liquidity
    pub static ref POOLS_ATTEMPTED: IntCounter = IntCounter::new(
        "pools_attempted_total",
        "Pool mint attempts"
    ).unwrap();

    pub static ref POOLS_SUCCEEDED: IntCounter = IntCounter::new(
        "pools_succeeded_total",
        "Pool mints confirmed on chain"
    ).unwrap();

    pub static ref POOLS_FAILED: IntCounter = IntCounter::new(
        "pools_failed_total",
        "Pool mints that failed or were skipped"
    ).unwrap();

    pub static ref CONFIRMATION_RETRIES: IntCounter = IntCounter::new(
        "confirmation_retries_total",
        "Receipt waits retried after a timeout"
    ).unwrap();

    pub static ref REMEDIATION_EXHAUSTED: IntCounter = IntCounter::new(
        "remediation_exhausted_total",
        "Wallets left without usable pools after remediation"
    ).unwrap();

    // Remediation and auxiliary features
    pub static ref WRAPS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("wraps_total", "Native wraps by outcome"),
        &["outcome"]
    ).unwrap();

    pub static ref SWAPS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("swaps_total", "Router swaps by outcome"),
        &["outcome"]
    ).unwrap();

    pub static ref TRANSFERS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("transfers_total", "Native transfers by outcome"),
        &["outcome"]
    ).unwrap();

    pub static ref BALANCE_QUERY_ERRORS: IntCounterVec = IntCounterVec::new(
        Opts::new("balance_query_errors_total", "Balance reads that exhausted retries"),
        &["token"]
    ).unwrap();
}

/// Registers every metric with `REGISTRY`. Call once at startup.
pub fn init_metrics() -> prometheus::Result<()> {
    REGISTRY.register(Box::new(CYCLES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(WALLETS_PROCESSED.clone()))?;
    REGISTRY.register(Box::new(POOLS_ATTEMPTED.clone()))?;
    REGISTRY.register(Box::new(POOLS_SUCCEEDED.clone()))?;
    REGISTRY.register(Box::new(POOLS_FAILED.clone()))?;
    REGISTRY.register(Box::new(CONFIRMATION_RETRIES.clone()))?;
    REGISTRY.register(Box::new(REMEDIATION_EXHAUSTED.clone()))?;
    REGISTRY.register(Box::new(WRAPS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(SWAPS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(TRANSFERS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(BALANCE_QUERY_ERRORS.clone()))?;
    Ok(())
}

/// Text exposition of the registry, for the `/metrics` endpoint.
pub fn gather_text() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        return format!("# metrics encoding failed: {}\n", e);
    }
    String::from_utf8(buffer).unwrap_or_default()
}

pub fn outcome_label(success: bool) -> &'static str {
    if success { "success" } else { "failure" }
}
