use once_cell::sync::Lazy;
use prometheus::{register_histogram, register_int_counter, Encoder, Histogram, IntCounter, TextEncoder};

// Prometheus metrics (default registry)
pub static TRANSACTIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "app_catalog_store_transactions_total",
        "Total read-modify-write transactions started"
    )
    .expect("register transactions_total")
});

pub static COMMITS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "app_catalog_store_commits_total",
        "Total transactions that persisted a new document"
    )
    .expect("register commits_total")
});

pub static WRITE_ERRORS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "app_catalog_store_write_errors_total",
        "Total failed document saves"
    )
    .expect("register write_errors_total")
});

pub static LOCK_TIMEOUTS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "app_catalog_store_lock_timeouts_total",
        "Total transactions rejected because the collection lock was not acquired in time"
    )
    .expect("register lock_timeouts_total")
});

pub static LOCK_WAIT_SECONDS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "app_catalog_store_lock_wait_seconds",
        "Time spent waiting for a collection lock",
        vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]
    )
    .expect("register lock_wait_seconds")
});

/// Render every registered metric in the Prometheus text format.
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    // Touch the statics so they appear even before the first transaction.
    Lazy::force(&TRANSACTIONS_TOTAL);
    Lazy::force(&COMMITS_TOTAL);
    Lazy::force(&WRITE_ERRORS_TOTAL);
    Lazy::force(&LOCK_TIMEOUTS_TOTAL);
    Lazy::force(&LOCK_WAIT_SECONDS);

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_store_metrics() {
        let text = encode_metrics().unwrap();
        assert!(text.contains("app_catalog_store_transactions_total"));
        assert!(text.contains("app_catalog_store_lock_wait_seconds"));
    }
}
