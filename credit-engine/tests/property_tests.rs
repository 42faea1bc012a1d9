//! Property-based tests for scoring invariants
//!
//! - Bounds: every sub-score stays within its maximum and the total is
//!   their sum, capped at 100
//! - Monotonicity: faster payment, more volume and a longer relationship
//!   never lower a score; more overdue invoices never raise it
//! - Limits: recommendations are never negative and zero without volume
//! - No history: only relationship age and default history contribute

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use credit_engine::{
    config::LimitPolicy,
    history::CustomerHistory,
    limits::recommend_limit,
    scoring::{
        default_history_points, order_volume_points, payment_history_points,
        relationship_age_points, score_history,
    },
    Config, CustomerRecord, CustomerStatus, InvoiceRecord, InvoiceStatus, OrderRecord,
    OrderStatus, RiskCategory, DEFAULT_HISTORY_MAX, ORDER_VOLUME_MAX, PAYMENT_HISTORY_MAX,
    RELATIONSHIP_AGE_MAX,
};
use proptest::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap()
}

fn today() -> NaiveDate {
    now().date_naive()
}

/// Strategy for generating non-negative amounts
fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..100_000_000_00i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy for generating order statuses
fn order_status_strategy() -> impl Strategy<Value = OrderStatus> {
    prop_oneof![
        Just(OrderStatus::Draft),
        Just(OrderStatus::Confirmed),
        Just(OrderStatus::Processing),
        Just(OrderStatus::Shipped),
        Just(OrderStatus::Delivered),
        Just(OrderStatus::Cancelled),
    ]
}

/// Strategy for generating risk categories
fn category_strategy() -> impl Strategy<Value = RiskCategory> {
    prop_oneof![
        Just(RiskCategory::Low),
        Just(RiskCategory::Medium),
        Just(RiskCategory::High),
        Just(RiskCategory::Unknown),
    ]
}

/// Strategy for generating orders over the last ~3 years
fn order_strategy() -> impl Strategy<Value = (Decimal, i64, OrderStatus)> {
    (amount_strategy(), 0i64..1_000, order_status_strategy())
}

/// Strategy for generating invoices: issue age, days to pay, overdue flag
fn invoice_strategy() -> impl Strategy<Value = (i64, Option<i64>, bool)> {
    (0i64..1_000, proptest::option::of(0i64..200), any::<bool>())
}

fn customer(months_ago: u32) -> CustomerRecord {
    CustomerRecord {
        id: Uuid::new_v4(),
        name: "Property Customer".to_string(),
        credit_limit: Decimal::new(10_000, 0),
        created_at: now() - Duration::days(i64::from(months_ago) * 31),
        status: CustomerStatus::Active,
    }
}

fn build_history(
    customer: CustomerRecord,
    orders: Vec<(Decimal, i64, OrderStatus)>,
    invoices: Vec<(i64, Option<i64>, bool)>,
) -> CustomerHistory {
    let customer_id = customer.id;

    let orders = orders
        .into_iter()
        .map(|(total_amount, days_ago, status)| OrderRecord {
            id: Uuid::new_v4(),
            customer_id,
            total_amount,
            order_date: today() - Duration::days(days_ago),
            status,
        })
        .collect();

    let invoices = invoices
        .into_iter()
        .map(|(days_ago, days_to_pay, overdue)| {
            let invoice_date = today() - Duration::days(days_ago);
            let paid_date = days_to_pay.map(|days| invoice_date + Duration::days(days));
            let status = match (paid_date, overdue) {
                (Some(_), _) => InvoiceStatus::Paid,
                (None, true) => InvoiceStatus::Overdue,
                (None, false) => InvoiceStatus::Unpaid,
            };
            InvoiceRecord {
                id: Uuid::new_v4(),
                customer_id,
                invoice_date,
                due_date: invoice_date + Duration::days(30),
                paid_date,
                amount: Decimal::new(1_000, 0),
                balance_amount: if paid_date.is_some() {
                    Decimal::ZERO
                } else {
                    Decimal::new(1_000, 0)
                },
                status,
            }
        })
        .collect();

    CustomerHistory::new(customer, orders, invoices)
}

proptest! {
    /// Property: sub-scores within bounds, total is their capped sum
    #[test]
    fn prop_score_bounds(
        months in 0u32..120,
        orders in prop::collection::vec(order_strategy(), 0..20),
        invoices in prop::collection::vec(invoice_strategy(), 0..20),
    ) {
        let config = Config::default();
        let history = build_history(customer(months), orders, invoices);
        let result = score_history(&history, now(), &config);
        let breakdown = &result.breakdown;

        prop_assert!(breakdown.payment_history.score <= PAYMENT_HISTORY_MAX);
        prop_assert!(breakdown.order_volume.score <= ORDER_VOLUME_MAX);
        prop_assert!(breakdown.relationship_age.score <= RELATIONSHIP_AGE_MAX);
        prop_assert!(breakdown.default_history.score <= DEFAULT_HISTORY_MAX);

        let sum = breakdown.sum().min(100);
        prop_assert_eq!(u16::from(result.total_score.value()), sum);
        prop_assert!(result.recommended_limit >= Decimal::ZERO);
    }

    /// Property: identical inputs score identically
    #[test]
    fn prop_scoring_deterministic(
        months in 0u32..120,
        orders in prop::collection::vec(order_strategy(), 0..10),
        invoices in prop::collection::vec(invoice_strategy(), 0..10),
    ) {
        let config = Config::default();
        let history = build_history(customer(months), orders, invoices);

        let first = score_history(&history, now(), &config);
        let second = score_history(&history, now(), &config);
        prop_assert_eq!(first, second);
    }

    /// Property: paying faster never lowers payment history points
    #[test]
    fn prop_payment_history_monotonic(a in 0i64..10_000, b in 0i64..10_000) {
        let config = Config::default();
        let (fast, slow) = (a.min(b), a.max(b));
        let table = &config.scoring.payment_history;

        let fast_points = payment_history_points(Some(Decimal::new(fast, 2)), table);
        let slow_points = payment_history_points(Some(Decimal::new(slow, 2)), table);
        prop_assert!(fast_points >= slow_points);
    }

    /// Property: more volume never lowers order volume points
    #[test]
    fn prop_order_volume_monotonic(a in amount_strategy(), b in amount_strategy()) {
        let config = Config::default();
        let (low, high) = (a.min(b), a.max(b));
        let table = &config.scoring.order_volume;

        prop_assert!(order_volume_points(high, table) >= order_volume_points(low, table));
    }

    /// Property: a longer relationship never lowers age points
    #[test]
    fn prop_relationship_age_monotonic(a in 0u32..600, b in 0u32..600) {
        let config = Config::default();
        let (young, old) = (a.min(b), a.max(b));
        let table = &config.scoring.relationship_age;

        prop_assert!(relationship_age_points(old, table) >= relationship_age_points(young, table));
    }

    /// Property: more overdue invoices never raise default history points
    #[test]
    fn prop_default_history_monotonic(a in 0u32..1_000, b in 0u32..1_000) {
        let config = Config::default();
        let (few, many) = (a.min(b), a.max(b));
        let policy = &config.scoring.default_history;

        prop_assert!(default_history_points(many, policy) <= default_history_points(few, policy));
    }

    /// Property: limits are never negative and zero without volume
    #[test]
    fn prop_limit_non_negative(
        category in category_strategy(),
        volume in amount_strategy(),
        floor in 0i64..10_000,
    ) {
        let policy = LimitPolicy {
            floor: Decimal::new(floor, 0),
            ..LimitPolicy::default()
        };

        prop_assert!(recommend_limit(category, volume, &policy) >= Decimal::ZERO);
        prop_assert_eq!(recommend_limit(category, Decimal::ZERO, &policy), Decimal::ZERO);
    }

    /// Property: without history only age and default history count
    #[test]
    fn prop_no_history_unknown(
        months in 0u32..120,
        cancelled in prop::collection::vec(amount_strategy(), 0..5),
    ) {
        let config = Config::default();
        let orders = cancelled
            .into_iter()
            .map(|amount| (amount, 10, OrderStatus::Cancelled))
            .collect();
        let history = build_history(customer(months), orders, Vec::new());
        let result = score_history(&history, now(), &config);
        let breakdown = &result.breakdown;

        prop_assert_eq!(result.risk_category, RiskCategory::Unknown);
        prop_assert_eq!(breakdown.payment_history.score, 0);
        prop_assert_eq!(breakdown.order_volume.score, 0);
        prop_assert_eq!(
            u16::from(result.total_score.value()),
            u16::from(breakdown.relationship_age.score) + u16::from(breakdown.default_history.score)
        );
        prop_assert_eq!(result.recommended_limit, Decimal::ZERO);
    }
}
