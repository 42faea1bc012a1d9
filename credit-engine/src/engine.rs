//! Credit scoring engine
//!
//! Ties the data source, the scorer and the limit policy together.
//!
//! # Flow
//!
//! ```text
//! calculate_credit_score(id)
//!        │
//!        ├── fetch_customer ─┐
//!        ├── fetch_orders ───┼── try_join! (each under query timeout)
//!        └── fetch_invoices ─┘
//!                 │
//!                 ▼
//!         CustomerHistory::new  ──►  score_history  ──►  CreditScoreResult
//! ```
//!
//! Bulk scoring runs the same flow per active customer on a `JoinSet`,
//! bounded by a semaphore of `bulk.max_concurrency` permits.

use crate::history::CustomerHistory;
use crate::limits::validate_limit;
use crate::metrics::Metrics;
use crate::scoring::score_history;
use crate::store::CreditDataSource;
use crate::types::{BulkScoreReport, CreditScoreResult, ScoringFailure};
use crate::{Config, Error, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Stateless credit scoring engine over a data source
pub struct CreditScoringEngine<S> {
    source: Arc<S>,
    config: Arc<Config>,
    metrics: Metrics,
}

impl<S> Clone for CreditScoringEngine<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            config: Arc::clone(&self.config),
            metrics: self.metrics.clone(),
        }
    }
}

impl<S> std::fmt::Debug for CreditScoringEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreditScoringEngine")
            .field("service_name", &self.config.service_name)
            .field("metrics", &self.metrics)
            .finish()
    }
}

impl<S> CreditScoringEngine<S>
where
    S: CreditDataSource + 'static,
{
    /// Create new engine; the configuration is validated first
    pub fn new(source: Arc<S>, config: Config) -> Result<Self> {
        config.validate()?;
        let metrics = Metrics::new()?;

        Ok(Self {
            source,
            config: Arc::new(config),
            metrics,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Engine metrics
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Underlying data source
    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    /// Score a customer as of now
    pub async fn calculate_credit_score(&self, customer_id: Uuid) -> Result<CreditScoreResult> {
        self.calculate_credit_score_at(customer_id, Utc::now()).await
    }

    /// Score a customer as of `now`
    ///
    /// Fails with [`Error::NotFound`] for an unknown customer and
    /// [`Error::DataAccess`] when any read fails or times out. No partial
    /// result is returned.
    #[instrument(skip(self, now), fields(service = %self.config.service_name))]
    pub async fn calculate_credit_score_at(
        &self,
        customer_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<CreditScoreResult> {
        let started = Instant::now();

        let outcome = self
            .load_history(customer_id)
            .await
            .map(|history| score_history(&history, now, &self.config));

        match &outcome {
            Ok(result) => {
                self.metrics
                    .record_score(result.risk_category, started.elapsed().as_secs_f64());
                info!(
                    %customer_id,
                    total_score = result.total_score.value(),
                    category = %result.risk_category,
                    recommended_limit = %result.recommended_limit,
                    "Credit score ready"
                );
            }
            Err(e) => {
                self.metrics.record_failure();
                warn!(%customer_id, "Credit scoring failed: {}", e);
            }
        }

        outcome
    }

    /// Write `new_limit` to the customer's credit limit
    ///
    /// Separate from scoring and never triggered by it. Applying the same
    /// value twice leaves the record unchanged.
    #[instrument(skip(self))]
    pub async fn apply_recommended_limit(
        &self,
        customer_id: Uuid,
        new_limit: Decimal,
    ) -> Result<()> {
        validate_limit(new_limit)?;

        with_timeout(
            "update_customer_credit_limit",
            self.config.bulk.query_timeout(),
            self.source.update_customer_credit_limit(customer_id, new_limit),
        )
        .await?;

        self.metrics.record_limit_applied();
        info!(%customer_id, %new_limit, "Credit limit applied");
        Ok(())
    }

    /// Score every active customer
    pub async fn get_all_customer_scores(&self) -> Result<BulkScoreReport> {
        self.get_all_customer_scores_with_cancel(CancellationToken::new())
            .await
    }

    /// Score every active customer until `cancel` fires
    ///
    /// Per-customer failures are recorded in the report and never abort the
    /// batch. Once cancelled, no further customers are started; customers
    /// already in flight run to completion.
    #[instrument(skip_all, fields(max_concurrency = self.config.bulk.max_concurrency))]
    pub async fn get_all_customer_scores_with_cancel(
        &self,
        cancel: CancellationToken,
    ) -> Result<BulkScoreReport> {
        let started_at = Utc::now();

        let customers = with_timeout(
            "fetch_active_customers",
            self.config.bulk.query_timeout(),
            self.source.fetch_active_customers(),
        )
        .await?;

        info!(customers = customers.len(), "Bulk credit scoring started");

        let semaphore = Arc::new(Semaphore::new(self.config.bulk.max_concurrency));
        let mut join_set = JoinSet::new();
        let mut started = Vec::with_capacity(customers.len());
        let mut not_started = Vec::new();
        let mut pending = customers.into_iter().enumerate();

        while let Some((index, customer)) = pending.next() {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                permit = Arc::clone(&semaphore).acquire_owned() => permit.ok(),
            };

            let Some(permit) = permit else {
                not_started.push(customer.id);
                not_started.extend(pending.by_ref().map(|(_, customer)| customer.id));
                break;
            };

            started.push(customer.id);
            let engine = self.clone();
            join_set.spawn(async move {
                let outcome = engine.calculate_credit_score_at(customer.id, started_at).await;
                drop(permit);
                (index, outcome)
            });
        }

        // Slot per started customer; a task that panics leaves its slot empty
        let mut outcomes: Vec<Option<Result<CreditScoreResult>>> =
            started.iter().map(|_| None).collect();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, outcome)) => outcomes[index] = Some(outcome),
                Err(e) => error!("Scoring task did not complete: {}", e),
            }
        }

        let mut scores = Vec::new();
        let mut failures = Vec::new();
        for (customer_id, outcome) in started.into_iter().zip(outcomes) {
            match outcome {
                Some(Ok(result)) => scores.push(result),
                Some(Err(e)) => failures.push(ScoringFailure {
                    customer_id,
                    transient: e.is_transient(),
                    error: e.to_string(),
                }),
                None => {
                    self.metrics.record_failure();
                    failures.push(ScoringFailure {
                        customer_id,
                        transient: false,
                        error: "scoring task did not complete".to_string(),
                    });
                }
            }
        }

        let report = BulkScoreReport {
            scores,
            failures,
            not_started,
            cancelled: cancel.is_cancelled(),
            started_at,
            completed_at: Utc::now(),
        };

        info!(
            scored = report.scores.len(),
            failed = report.failures.len(),
            not_started = report.not_started.len(),
            cancelled = report.cancelled,
            "Bulk credit scoring finished"
        );

        Ok(report)
    }

    async fn load_history(&self, customer_id: Uuid) -> Result<CustomerHistory> {
        let timeout = self.config.bulk.query_timeout();

        let (customer, orders, invoices) = tokio::try_join!(
            with_timeout("fetch_customer", timeout, self.source.fetch_customer(customer_id)),
            with_timeout("fetch_orders", timeout, self.source.fetch_orders(customer_id)),
            with_timeout("fetch_invoices", timeout, self.source.fetch_invoices(customer_id)),
        )?;

        let customer = customer.ok_or(Error::NotFound(customer_id))?;
        Ok(CustomerHistory::new(customer, orders, invoices))
    }
}

/// Run a store call under a timeout; expiry is a data access failure
async fn with_timeout<T, F>(operation: &'static str, limit: Duration, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(Error::DataAccess(format!(
            "{} timed out after {}ms",
            operation,
            limit.as_millis()
        ))),
    }
}
