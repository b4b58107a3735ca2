
mod server;

use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};

pub use server::start_metrics_server;

// ============================================================================
// Metrics Module - Prometheus metrics for observability
// ============================================================================
//
// Provides metrics for:
// - Outbox delivery (published / failed messages, dispatch latency)
// - Outbox processor batches by outcome
// - Wallet optimistic lock conflicts per backend
// - Retry attempts and outcomes
//
// Everything is registered on one registry and scraped via /metrics
// ============================================================================

/// Prometheus collectors for the wallet and the outbox
pub struct Metrics {
    registry: Registry,

    // Outbox Metrics
    pub outbox_messages_published: IntCounterVec,
    pub outbox_messages_failed: IntCounterVec,
    pub outbox_dispatch_duration: HistogramVec,
    pub outbox_batches: IntCounterVec,

    // Wallet Metrics
    pub wallet_update_conflicts: IntCounterVec,

    // Retry Metrics
    pub retry_attempts_total: IntCounterVec,
    pub retry_success: IntCounterVec,
    pub retry_failure: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        // Outbox Metrics
        let outbox_messages_published = IntCounterVec::new(
            Opts::new("outbox_messages_published_total", "Total outbox messages dispatched and marked processed"),
            &["message_type"],
        )?;
        registry.register(Box::new(outbox_messages_published.clone()))?;

        let outbox_messages_failed = IntCounterVec::new(
            Opts::new("outbox_messages_failed_total", "Total outbox messages that failed delivery"),
            &["message_type", "reason"],
        )?;
        registry.register(Box::new(outbox_messages_failed.clone()))?;

        let outbox_dispatch_duration = HistogramVec::new(
            HistogramOpts::new("outbox_dispatch_duration_seconds", "Outbox message dispatch duration")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["message_type"],
        )?;
        registry.register(Box::new(outbox_dispatch_duration.clone()))?;

        let outbox_batches = IntCounterVec::new(
            Opts::new("outbox_batches_total", "Outbox processor polls by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(outbox_batches.clone()))?;

        // Wallet Metrics
        let wallet_update_conflicts = IntCounterVec::new(
            Opts::new("wallet_update_conflicts_total", "Wallet updates rejected by a version check"),
            &["backend"],
        )?;
        registry.register(Box::new(wallet_update_conflicts.clone()))?;

        // Retry Metrics
        let retry_attempts_total = IntCounterVec::new(
            Opts::new("retry_attempts_total", "Attempts made by retried wallet operations"),
            &["operation", "attempt"],
        )?;
        registry.register(Box::new(retry_attempts_total.clone()))?;

        let retry_success = IntCounterVec::new(
            Opts::new("retry_success_total", "Retried operations that eventually succeeded"),
            &["operation"],
        )?;
        registry.register(Box::new(retry_success.clone()))?;

        let retry_failure = IntCounterVec::new(
            Opts::new("retry_failure_total", "Retried operations that still failed"),
            &["operation"],
        )?;
        registry.register(Box::new(retry_failure.clone()))?;

        Ok(Self {
            registry,
            outbox_messages_published,
            outbox_messages_failed,
            outbox_dispatch_duration,
            outbox_batches,
            wallet_update_conflicts,
            retry_attempts_total,
            retry_success,
            retry_failure,
        })
    }

    /// Registry served on /metrics
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Helper to record an outbox message delivery attempt
    pub fn record_outbox_message(&self, message_type: &str, duration_secs: f64, success: bool) {
        if success {
            self.outbox_messages_published.with_label_values(&[message_type]).inc();
        } else {
            self.outbox_messages_failed.with_label_values(&[message_type, "dispatch_error"]).inc();
        }
        self.outbox_dispatch_duration.with_label_values(&[message_type]).observe(duration_secs);
    }

    /// Helper to record a message that never reached a handler
    pub fn record_outbox_failure(&self, message_type: &str, reason: &str) {
        self.outbox_messages_failed.with_label_values(&[message_type, reason]).inc();
    }

    pub fn record_batch(&self, outcome: &str) {
        self.outbox_batches.with_label_values(&[outcome]).inc();
    }

    pub fn record_wallet_conflict(&self, backend: &str) {
        self.wallet_update_conflicts.with_label_values(&[backend]).inc();
    }

    /// Count one attempt of a retried operation
    pub fn record_retry_attempt(&self, operation: &str, attempt: u32) {
        self.retry_attempts_total.with_label_values(&[operation, &attempt.to_string()]).inc();
    }

    /// Count how a retried operation ended
    pub fn record_retry_outcome(&self, operation: &str, success: bool) {
        if success {
            self.retry_success.with_label_values(&[operation]).inc();
        } else {
            self.retry_failure.with_label_values(&[operation]).inc();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter_value(metrics: &Metrics, name: &str) -> Option<f64> {
        let gathered = metrics.registry().gather();
        let family = gathered.iter().find(|m| m.name() == name)?;
        family.metric.first().and_then(|m| m.counter.value)
    }

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        metrics.record_batch("empty");
        assert!(!metrics.registry().gather().is_empty());
    }

    #[test]
    fn test_record_outbox_message() {
        let metrics = Metrics::new().unwrap();
        metrics.record_outbox_message("library.ItemRented", 0.05, true);

        assert_eq!(counter_value(&metrics, "outbox_messages_published_total"), Some(1.0));
        assert_eq!(counter_value(&metrics, "outbox_messages_failed_total"), None);
    }

    #[test]
    fn test_record_outbox_failure() {
        let metrics = Metrics::new().unwrap();
        metrics.record_outbox_message("library.ItemRented", 0.01, false);
        metrics.record_outbox_failure("library.Unknown", "unknown_type");

        let gathered = metrics.registry().gather();
        let failed = gathered
            .iter()
            .find(|m| m.name() == "outbox_messages_failed_total")
            .unwrap();
        assert_eq!(failed.metric.len(), 2);
    }

    #[test]
    fn test_record_retry() {
        let metrics = Metrics::new().unwrap();
        metrics.record_retry_attempt("wallet_deposit", 1);
        metrics.record_retry_attempt("wallet_deposit", 2);
        metrics.record_retry_outcome("wallet_deposit", true);

        let gathered = metrics.registry().gather();
        let attempts = gathered.iter().find(|m| m.name() == "retry_attempts_total").unwrap();
        assert_eq!(attempts.metric.len(), 2);
    }

    #[test]
    fn test_record_wallet_conflict() {
        let metrics = Metrics::new().unwrap();
        metrics.record_wallet_conflict("memory");
        metrics.record_wallet_conflict("memory");

        assert_eq!(counter_value(&metrics, "wallet_update_conflicts_total"), Some(2.0));
    }
}
