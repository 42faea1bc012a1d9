//! Credit scoring
//!
//! Four independent sub-calculators feed a single aggregation step:
//!
//! | component         | max | metric                      |
//! |-------------------|-----|-----------------------------|
//! | payment history   | 40  | average days to pay         |
//! | order volume      | 30  | order value, last 6 months  |
//! | relationship age  | 20  | whole months active         |
//! | default history   | 10  | overdue invoice count       |
//!
//! Customers with no order or invoice history are scored on an explicit
//! branch: only relationship age and default history contribute and the
//! category is [`RiskCategory::Unknown`].

use crate::config::{
    Config, DefaultHistoryConfig, OrderVolumeConfig, PaymentHistoryConfig, RelationshipAgeConfig,
    RiskThresholds,
};
use crate::history::{lookback_cutoff, months_between, CustomerHistory};
use crate::limits::recommend_limit;
use crate::types::{
    CreditScore, CreditScoreResult, DefaultHistoryScore, OrderVolumeScore, PaymentHistoryScore,
    RelationshipAgeScore, RiskCategory, ScoreBreakdown, DEFAULT_HISTORY_MAX, ORDER_VOLUME_MAX,
    PAYMENT_HISTORY_MAX, RELATIONSHIP_AGE_MAX,
};
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::debug;

/// Payment history points for an average days-to-pay
pub fn payment_history_points(
    avg_days_to_pay: Option<Decimal>,
    config: &PaymentHistoryConfig,
) -> u8 {
    let points = match avg_days_to_pay {
        Some(days) => config.table.lookup(days),
        None => config.no_paid_invoices_points,
    };
    points.min(PAYMENT_HISTORY_MAX)
}

/// Order volume points for non-cancelled order value in the window
pub fn order_volume_points(total: Decimal, config: &OrderVolumeConfig) -> u8 {
    config.table.lookup(total).min(ORDER_VOLUME_MAX)
}

/// Relationship age points for whole months active
pub fn relationship_age_points(months_active: u32, config: &RelationshipAgeConfig) -> u8 {
    config
        .table
        .lookup(Decimal::from(months_active))
        .min(RELATIONSHIP_AGE_MAX)
}

/// Default history points after overdue penalties
pub fn default_history_points(overdue_count: u32, config: &DefaultHistoryConfig) -> u8 {
    let penalty = overdue_count.saturating_mul(u32::from(config.penalty_per_overdue));
    u32::from(config.starting_points)
        .saturating_sub(penalty)
        .min(u32::from(DEFAULT_HISTORY_MAX)) as u8
}

/// Category for a score; the no-history branch never reaches here
pub fn categorize(score: CreditScore, thresholds: &RiskThresholds) -> RiskCategory {
    match score.value() {
        s if s >= thresholds.low_min_score => RiskCategory::Low,
        s if s >= thresholds.medium_min_score => RiskCategory::Medium,
        _ => RiskCategory::High,
    }
}

/// Score a normalized history as of `now`; performs no I/O
pub fn score_history(
    history: &CustomerHistory,
    now: DateTime<Utc>,
    config: &Config,
) -> CreditScoreResult {
    let scoring = &config.scoring;
    let customer = history.customer();
    let today = now.date_naive();
    let has_history = history.has_history();

    let months_active = months_between(customer.created_at, now);
    let relationship_age = RelationshipAgeScore {
        score: relationship_age_points(months_active, &scoring.relationship_age),
        max: RELATIONSHIP_AGE_MAX,
        months_active,
    };

    let overdue_count =
        history.overdue_count(today, scoring.default_history.derive_overdue_from_due_date);
    let default_history = DefaultHistoryScore {
        score: default_history_points(overdue_count, &scoring.default_history),
        max: DEFAULT_HISTORY_MAX,
        overdue_count,
    };

    let (payment_history, order_volume) = if has_history {
        // The reported average is the one that is scored
        let avg_days = history.average_days_to_pay().map(|days| {
            days.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        });
        let payment_history = PaymentHistoryScore {
            score: payment_history_points(avg_days, &scoring.payment_history),
            max: PAYMENT_HISTORY_MAX,
            avg_days_to_pay: avg_days,
            paid_invoice_count: history.days_to_pay().len(),
        };

        let cutoff = lookback_cutoff(today, scoring.order_volume.lookback_months);
        let (total, order_count) = history.order_volume_since(cutoff, today);
        let order_volume = OrderVolumeScore {
            score: order_volume_points(total, &scoring.order_volume),
            max: ORDER_VOLUME_MAX,
            total_last_6_months: total,
            order_count,
        };

        (payment_history, order_volume)
    } else {
        (
            PaymentHistoryScore {
                score: 0,
                max: PAYMENT_HISTORY_MAX,
                avg_days_to_pay: None,
                paid_invoice_count: 0,
            },
            OrderVolumeScore {
                score: 0,
                max: ORDER_VOLUME_MAX,
                total_last_6_months: Decimal::ZERO,
                order_count: 0,
            },
        )
    };

    let breakdown = ScoreBreakdown {
        payment_history,
        order_volume,
        relationship_age,
        default_history,
    };

    // Component maxima sum to exactly 100
    let total_score = CreditScore::new(breakdown.sum().min(100) as u8);
    let risk_category = if has_history {
        categorize(total_score, &scoring.risk)
    } else {
        RiskCategory::Unknown
    };

    let recommended_limit = recommend_limit(
        risk_category,
        breakdown.order_volume.total_last_6_months,
        &config.limits,
    );

    debug!(
        customer_id = %customer.id,
        total_score = total_score.value(),
        category = %risk_category,
        %recommended_limit,
        "Credit score calculated"
    );

    CreditScoreResult {
        customer_id: customer.id,
        total_score,
        risk_category,
        recommended_limit,
        current_limit: customer.credit_limit,
        breakdown,
        last_calculated: now,
    }
}
