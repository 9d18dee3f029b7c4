use std::time::Instant;

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

use crate::error::AppError;

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub order_transitions_total: IntCounterVec,
    pub order_transition_latency_seconds: HistogramVec,
    pub event_subscribers: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let order_transitions_total = IntCounterVec::new(
            Opts::new(
                "order_transitions_total",
                "Order lifecycle operations by outcome",
            ),
            &["operation", "outcome"],
        )
        .expect("valid order_transitions_total metric");

        let order_transition_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "order_transition_latency_seconds",
                "Latency of order lifecycle operations in seconds",
            ),
            &["operation"],
        )
        .expect("valid order_transition_latency_seconds metric");

        let event_subscribers = IntGauge::new(
            "order_event_subscribers",
            "Currently connected order event feed clients",
        )
        .expect("valid order_event_subscribers metric");

        registry
            .register(Box::new(order_transitions_total.clone()))
            .expect("register order_transitions_total");
        registry
            .register(Box::new(order_transition_latency_seconds.clone()))
            .expect("register order_transition_latency_seconds");
        registry
            .register(Box::new(event_subscribers.clone()))
            .expect("register order_event_subscribers");

        Self {
            registry,
            order_transitions_total,
            order_transition_latency_seconds,
            event_subscribers,
        }
    }

    /// Records one lifecycle operation that started at `started`.
    pub fn observe<T>(&self, operation: &str, started: Instant, result: &Result<T, AppError>) {
        let outcome = match result {
            Ok(_) => "success",
            Err(AppError::Validation(_)) => "invalid",
            Err(AppError::Unauthorized(_)) => "unauthorized",
            Err(AppError::Forbidden(_)) => "forbidden",
            Err(AppError::NotFound(_)) => "not_found",
            Err(AppError::Conflict(_)) => "conflict",
            Err(AppError::Internal(_)) => "error",
        };

        self.order_transitions_total
            .with_label_values(&[operation, outcome])
            .inc();
        self.order_transition_latency_seconds
            .with_label_values(&[operation])
            .observe(started.elapsed().as_secs_f64());
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
