mod server;

use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGaugeVec, Opts, Registry};

pub use server::start_metrics_server;

// ============================================================================
// Metrics Module - Prometheus metrics for the order lifecycle service
// ============================================================================
//
// Covers:
// - Order creation and status transitions (accepted and rejected)
// - Optimistic concurrency conflicts
// - Collaborator calls (catalog, feedback): outcome and latency
// - Retry attempts and circuit breaker state per collaborator
//
// Scraped via /metrics on the metrics port.
// ============================================================================

/// Outcome label for collaborator calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    Success,
    NotFound,
    Error,
    Timeout,
    CircuitOpen,
}

impl CallOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallOutcome::Success => "success",
            CallOutcome::NotFound => "not_found",
            CallOutcome::Error => "error",
            CallOutcome::Timeout => "timeout",
            CallOutcome::CircuitOpen => "circuit_open",
        }
    }
}

pub struct Metrics {
    registry: Registry,

    // Order Metrics
    pub orders_created: IntCounter,
    pub order_transitions: IntCounterVec,
    pub order_transition_rejections: IntCounterVec,
    pub order_conflicts: IntCounter,

    // Collaborator Metrics
    pub collaborator_requests: IntCounterVec,
    pub collaborator_request_duration: HistogramVec,

    // Retry Metrics
    pub retry_attempts_total: IntCounterVec,

    // Circuit Breaker Metrics
    pub circuit_breaker_state: IntGaugeVec,
    pub circuit_breaker_transitions: IntCounterVec,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let orders_created = IntCounter::new("orders_created_total", "Total orders created")?;
        registry.register(Box::new(orders_created.clone()))?;

        let order_transitions = IntCounterVec::new(
            Opts::new("order_transitions_total", "Accepted order status transitions"),
            &["from", "to"],
        )?;
        registry.register(Box::new(order_transitions.clone()))?;

        let order_transition_rejections = IntCounterVec::new(
            Opts::new(
                "order_transition_rejections_total",
                "Order status transitions rejected by the lifecycle rules",
            ),
            &["from", "to"],
        )?;
        registry.register(Box::new(order_transition_rejections.clone()))?;

        let order_conflicts = IntCounter::new(
            "order_conflicts_total",
            "Updates lost to a concurrent modification of the same order",
        )?;
        registry.register(Box::new(order_conflicts.clone()))?;

        let collaborator_requests = IntCounterVec::new(
            Opts::new("collaborator_requests_total", "Requests sent to remote collaborators"),
            &["collaborator", "outcome"],
        )?;
        registry.register(Box::new(collaborator_requests.clone()))?;

        let collaborator_request_duration = HistogramVec::new(
            HistogramOpts::new(
                "collaborator_request_duration_seconds",
                "Collaborator request latency, retries included",
            )
            .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
            &["collaborator"],
        )?;
        registry.register(Box::new(collaborator_request_duration.clone()))?;

        let retry_attempts_total = IntCounterVec::new(
            Opts::new("retry_attempts_total", "Total retry attempts"),
            &["operation"],
        )?;
        registry.register(Box::new(retry_attempts_total.clone()))?;

        let circuit_breaker_state = IntGaugeVec::new(
            Opts::new(
                "circuit_breaker_state",
                "Circuit breaker state (0=Closed, 1=Open, 2=HalfOpen)",
            ),
            &["collaborator"],
        )?;
        registry.register(Box::new(circuit_breaker_state.clone()))?;

        let circuit_breaker_transitions = IntCounterVec::new(
            Opts::new("circuit_breaker_transitions_total", "Circuit breaker state transitions"),
            &["collaborator", "from_state", "to_state"],
        )?;
        registry.register(Box::new(circuit_breaker_transitions.clone()))?;

        Ok(Self {
            registry,
            orders_created,
            order_transitions,
            order_transition_rejections,
            order_conflicts,
            collaborator_requests,
            collaborator_request_duration,
            retry_attempts_total,
            circuit_breaker_state,
            circuit_breaker_transitions,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_order_created(&self) {
        self.orders_created.inc();
    }

    pub fn record_transition(&self, from: &str, to: &str) {
        self.order_transitions.with_label_values(&[from, to]).inc();
    }

    pub fn record_transition_rejected(&self, from: &str, to: &str) {
        self.order_transition_rejections.with_label_values(&[from, to]).inc();
    }

    pub fn record_conflict(&self) {
        self.order_conflicts.inc();
    }

    /// Helper to record one logical collaborator call (all attempts)
    pub fn record_collaborator_call(&self, collaborator: &str, outcome: CallOutcome, duration_secs: f64) {
        self.collaborator_requests
            .with_label_values(&[collaborator, outcome.as_str()])
            .inc();
        self.collaborator_request_duration
            .with_label_values(&[collaborator])
            .observe(duration_secs);
    }

    /// Helper to record a retry (attempt > 1)
    pub fn record_retry_attempt(&self, operation: &str) {
        self.retry_attempts_total.with_label_values(&[operation]).inc();
    }

    pub fn update_circuit_breaker_state(&self, collaborator: &str, state: i64) {
        self.circuit_breaker_state.with_label_values(&[collaborator]).set(state);
    }

    pub fn record_circuit_breaker_transition(&self, collaborator: &str, from_state: &str, to_state: &str) {
        self.circuit_breaker_transitions
            .with_label_values(&[collaborator, from_state, to_state])
            .inc();
    }
}
