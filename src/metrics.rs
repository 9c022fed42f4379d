//! Metrics for query editing and rendering
//!
//! Prometheus counters recording part lookups, edits, renders and errors.
//! Counters register in the default prometheus registry on first use.

use lazy_static::lazy_static;
use prometheus::{register_counter_vec, CounterVec, Encoder, TextEncoder};

lazy_static! {
    /// Total render calls by outcome
    pub static ref RENDERS_TOTAL: CounterVec = register_counter_vec!(
        "heroic_query_renders_total",
        "Total request renders",
        &["status"]
    ).unwrap();

    /// Total structural edits by operation
    pub static ref EDITS_TOTAL: CounterVec = register_counter_vec!(
        "heroic_query_edits_total",
        "Total query model edits by operation",
        &["operation"]
    ).unwrap();

    /// Total registry lookups by outcome
    pub static ref PART_LOOKUPS_TOTAL: CounterVec = register_counter_vec!(
        "heroic_query_part_lookups_total",
        "Total part definition lookups",
        &["status"]
    ).unwrap();

    /// Total errors by type
    pub static ref ERRORS_TOTAL: CounterVec = register_counter_vec!(
        "heroic_query_errors_total",
        "Total errors by type and operation",
        &["error_type", "operation"]
    ).unwrap();
}

/// Initialize metrics system
///
/// Touches every counter so they appear in scrapes before first use.
pub fn init() {
    RENDERS_TOTAL.with_label_values(&["success"]);
    RENDERS_TOTAL.with_label_values(&["error"]);
    PART_LOOKUPS_TOTAL.with_label_values(&["found"]);
    PART_LOOKUPS_TOTAL.with_label_values(&["missing"]);
    lazy_static::initialize(&EDITS_TOTAL);
    lazy_static::initialize(&ERRORS_TOTAL);

    tracing::info!("Metrics system initialized");
}

/// Get metrics in Prometheus text format
pub fn gather_metrics() -> Result<String, String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = vec![];

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| format!("Failed to encode metrics: {}", e))?;

    String::from_utf8(buffer).map_err(|e| format!("Metrics contain invalid UTF-8: {}", e))
}

/// Record a render call
#[inline]
pub fn record_render(success: bool) {
    let status = if success { "success" } else { "error" };
    RENDERS_TOTAL.with_label_values(&[status]).inc();
}

/// Record a structural edit
#[inline]
pub fn record_edit(operation: &str) {
    EDITS_TOTAL.with_label_values(&[operation]).inc();
}

/// Record a registry lookup
#[inline]
pub fn record_part_lookup(found: bool) {
    let status = if found { "found" } else { "missing" };
    PART_LOOKUPS_TOTAL.with_label_values(&[status]).inc();
}

/// Record an error
#[inline]
pub fn record_error(error_type: &str, operation: &str) {
    ERRORS_TOTAL
        .with_label_values(&[error_type, operation])
        .inc();
}
