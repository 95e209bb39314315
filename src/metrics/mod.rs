use lazy_static::lazy_static;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("Failed to encode metrics: {0}")]
    Encode(#[from] prometheus::Error),
    #[error("Metrics output is not valid UTF-8")]
    Utf8,
}

lazy_static! {
    /// Registry backing the /metrics endpoint.
    pub static ref REGISTRY: Registry = Registry::new();

    pub static ref PO_CREATIONS: IntCounter = register_counter(
        "silo_purchase_order_creations_total",
        "Total number of purchase orders created"
    );
    pub static ref PO_RECEIPTS: IntCounter = register_counter(
        "silo_purchase_order_receipts_total",
        "Total number of purchase order receipts posted"
    );
    pub static ref TRANSFERS_CREATED: IntCounter = register_counter(
        "silo_transfers_created_total",
        "Total number of inventory transfers created"
    );
    pub static ref PRODUCTION_RUNS: IntCounter = register_counter(
        "silo_production_runs_total",
        "Total number of composite production runs"
    );
    pub static ref STOCK_TRANSACTIONS: IntCounterVec = register_counter_vec(
        "silo_stock_transactions_total",
        "Stock ledger rows written, labeled by transaction type",
        &["transaction_type"]
    );
    pub static ref EVENTS_PROCESSED: IntCounterVec = register_counter_vec(
        "silo_events_processed_total",
        "Domain events drained from the in-process channel",
        &["event"]
    );
    pub static ref HTTP_REQUEST_DURATION: HistogramVec = register_histogram_vec(
        "silo_http_request_duration_seconds",
        "HTTP request latency by method",
        &["method"]
    );
}

fn register_counter(name: &str, help: &str) -> IntCounter {
    let counter = IntCounter::with_opts(Opts::new(name, help)).expect("metric can be created");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("metric can be registered");
    counter
}

fn register_counter_vec(name: &str, help: &str, labels: &[&str]) -> IntCounterVec {
    let counter =
        IntCounterVec::new(Opts::new(name, help), labels).expect("metric can be created");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("metric can be registered");
    counter
}

fn register_histogram_vec(name: &str, help: &str, labels: &[&str]) -> HistogramVec {
    let histogram =
        HistogramVec::new(HistogramOpts::new(name, help), labels).expect("metric can be created");
    REGISTRY
        .register(Box::new(histogram.clone()))
        .expect("metric can be registered");
    histogram
}

/// Prometheus text exposition for GET /metrics.
pub async fn metrics_handler() -> Result<String, MetricsError> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&REGISTRY.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|_| MetricsError::Utf8)
}

/// JSON summary of counter values for dashboards that do not scrape.
pub async fn metrics_json_handler() -> Result<serde_json::Value, MetricsError> {
    let mut counters = serde_json::Map::new();
    for family in REGISTRY.gather() {
        let total: f64 = family
            .get_metric()
            .iter()
            .map(|m| {
                if m.has_counter() {
                    m.get_counter().get_value()
                } else {
                    0.0
                }
            })
            .sum();
        counters.insert(family.get_name().to_string(), json!(total));
    }
    Ok(json!({ "counters": counters }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn exposition_includes_registered_counters() {
        PO_CREATIONS.inc();
        let text = metrics_handler().await.expect("encode should succeed");
        assert!(text.contains("silo_purchase_order_creations_total"));
    }

    #[tokio::test]
    async fn json_summary_sums_labeled_counters() {
        STOCK_TRANSACTIONS.with_label_values(&["po_receive"]).inc();
        STOCK_TRANSACTIONS.with_label_values(&["transfer_out"]).inc();
        let value = metrics_json_handler().await.expect("encode should succeed");
        let total = value["counters"]["silo_stock_transactions_total"]
            .as_f64()
            .unwrap();
        assert!(total >= 2.0);
    }
}
