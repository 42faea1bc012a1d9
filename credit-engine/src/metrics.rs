//! Metrics collection for observability
//!
//! Prometheus metrics for the credit engine. Each engine owns its own
//! registry, so several engines (or tests) can coexist in one process.
//!
//! # Metrics
//!
//! - `credit_scores_total` - Scores calculated successfully
//! - `credit_score_failures_total` - Scoring calls that returned an error
//! - `credit_limits_applied_total` - Credit limits written back
//! - `credit_score_duration_seconds` - Histogram of scoring latencies
//! - `credit_risk_category_total` - Scores by risk category

use crate::types::RiskCategory;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Scores calculated
    pub scores_total: IntCounter,

    /// Failed scoring calls
    pub score_failures_total: IntCounter,

    /// Limits applied
    pub limits_applied_total: IntCounter,

    /// Scoring latency
    pub score_duration: Histogram,

    /// Scores per risk category
    pub risk_category_total: IntCounterVec,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let scores_total =
            IntCounter::new("credit_scores_total", "Credit scores calculated successfully")?;
        registry.register(Box::new(scores_total.clone()))?;

        let score_failures_total = IntCounter::new(
            "credit_score_failures_total",
            "Credit scoring calls that returned an error",
        )?;
        registry.register(Box::new(score_failures_total.clone()))?;

        let limits_applied_total =
            IntCounter::new("credit_limits_applied_total", "Credit limits written back")?;
        registry.register(Box::new(limits_applied_total.clone()))?;

        let score_duration = Histogram::with_opts(
            HistogramOpts::new(
                "credit_score_duration_seconds",
                "Histogram of credit scoring latencies",
            )
            .buckets(vec![0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 5.0]),
        )?;
        registry.register(Box::new(score_duration.clone()))?;

        let risk_category_total = IntCounterVec::new(
            Opts::new("credit_risk_category_total", "Credit scores by risk category"),
            &["category"],
        )?;
        registry.register(Box::new(risk_category_total.clone()))?;

        Ok(Self {
            scores_total,
            score_failures_total,
            limits_applied_total,
            score_duration,
            risk_category_total,
            registry,
        })
    }

    /// Record a successful score
    pub fn record_score(&self, category: RiskCategory, elapsed_secs: f64) {
        self.scores_total.inc();
        self.score_duration.observe(elapsed_secs);
        self.risk_category_total
            .with_label_values(&[category.as_str()])
            .inc();
    }

    /// Record a failed scoring call
    pub fn record_failure(&self) {
        self.score_failures_total.inc();
    }

    /// Record an applied limit
    pub fn record_limit_applied(&self) {
        self.limits_applied_total.inc();
    }

    /// Prometheus text exposition of every metric
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            tracing::error!("Failed to encode metrics: {}", e);
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("scores_total", &self.scores_total.get())
            .field("score_failures_total", &self.score_failures_total.get())
            .field("limits_applied_total", &self.limits_applied_total.get())
            .finish()
    }
}
