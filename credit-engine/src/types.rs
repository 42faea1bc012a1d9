//! Core types for the credit engine

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum points for the payment history component
pub const PAYMENT_HISTORY_MAX: u8 = 40;
/// Maximum points for the order volume component
pub const ORDER_VOLUME_MAX: u8 = 30;
/// Maximum points for the relationship age component
pub const RELATIONSHIP_AGE_MAX: u8 = 20;
/// Maximum points for the default history component
pub const DEFAULT_HISTORY_MAX: u8 = 10;

/// Order lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Not yet confirmed
    Draft,
    /// Confirmed by the customer
    Confirmed,
    /// In production
    Processing,
    /// Dispatched
    Shipped,
    /// Received by the customer
    Delivered,
    /// Cancelled; never counted towards volume
    Cancelled,
}

/// Invoice settlement status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// Fully paid
    Paid,
    /// Nothing paid yet
    Unpaid,
    /// Partially paid
    Partial,
    /// Past due with outstanding balance
    Overdue,
}

/// Customer account status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomerStatus {
    /// Trading normally
    Active,
    /// Dormant
    Inactive,
    /// Blocked from new orders
    Blocked,
}

/// Sales order snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    /// Order ID
    pub id: Uuid,
    /// Owning customer
    pub customer_id: Uuid,
    /// Order total
    pub total_amount: Decimal,
    /// Date the order was placed
    pub order_date: NaiveDate,
    /// Lifecycle status
    pub status: OrderStatus,
}

impl OrderRecord {
    /// Cancelled orders are excluded from every volume calculation
    pub fn is_cancelled(&self) -> bool {
        self.status == OrderStatus::Cancelled
    }
}

/// Invoice snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceRecord {
    /// Invoice ID
    pub id: Uuid,
    /// Owning customer
    pub customer_id: Uuid,
    /// Issue date
    pub invoice_date: NaiveDate,
    /// Payment due date
    pub due_date: NaiveDate,
    /// Date the invoice was settled, if any
    #[serde(default)]
    pub paid_date: Option<NaiveDate>,
    /// Invoiced amount
    pub amount: Decimal,
    /// Amount still outstanding
    pub balance_amount: Decimal,
    /// Settlement status
    pub status: InvoiceStatus,
}

impl InvoiceRecord {
    /// Days between issue and payment, clamped to zero
    pub fn days_to_pay(&self) -> Option<i64> {
        self.paid_date
            .map(|paid| (paid - self.invoice_date).num_days().max(0))
    }

    /// Past due with an outstanding balance as of `as_of`
    pub fn is_past_due(&self, as_of: NaiveDate) -> bool {
        matches!(self.status, InvoiceStatus::Unpaid | InvoiceStatus::Partial)
            && self.balance_amount > Decimal::ZERO
            && self.due_date < as_of
    }
}

/// Customer snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRecord {
    /// Customer ID
    pub id: Uuid,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Current credit limit
    pub credit_limit: Decimal,
    /// Account creation time
    pub created_at: DateTime<Utc>,
    /// Account status
    pub status: CustomerStatus,
}

impl CustomerRecord {
    /// Only active customers take part in bulk scoring
    pub fn is_active(&self) -> bool {
        self.status == CustomerStatus::Active
    }
}

/// Composite credit score (0-100)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub struct CreditScore(u8);

impl CreditScore {
    /// Create new credit score, clamped to 0-100
    pub fn new(score: u8) -> Self {
        Self(score.min(100))
    }

    /// Get raw score
    pub fn value(&self) -> u8 {
        self.0
    }
}

impl From<u8> for CreditScore {
    fn from(score: u8) -> Self {
        Self::new(score)
    }
}

impl From<CreditScore> for u8 {
    fn from(score: CreditScore) -> Self {
        score.0
    }
}

impl std::fmt::Display for CreditScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Coarse risk classification derived from the credit score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskCategory {
    /// Score at or above the low-risk threshold
    Low,
    /// Score at or above the medium-risk threshold
    Medium,
    /// Score below the medium-risk threshold
    High,
    /// No order or invoice history to judge
    Unknown,
}

impl RiskCategory {
    /// Stable label used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskCategory::Low => "low",
            RiskCategory::Medium => "medium",
            RiskCategory::High => "high",
            RiskCategory::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment history component (max 40)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentHistoryScore {
    /// Points awarded
    pub score: u8,
    /// Component maximum
    pub max: u8,
    /// Mean days from issue to payment, rounded to 2 dp; this value is scored
    pub avg_days_to_pay: Option<Decimal>,
    /// Invoices with a paid date
    pub paid_invoice_count: usize,
}

/// Order volume component (max 30)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderVolumeScore {
    /// Points awarded
    pub score: u8,
    /// Component maximum
    pub max: u8,
    /// Non-cancelled order value inside the lookback window
    pub total_last_6_months: Decimal,
    /// Non-cancelled orders inside the lookback window
    pub order_count: usize,
}

/// Relationship age component (max 20)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipAgeScore {
    /// Points awarded
    pub score: u8,
    /// Component maximum
    pub max: u8,
    /// Whole months since the customer was created
    pub months_active: u32,
}

/// Default history component (max 10)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultHistoryScore {
    /// Points awarded
    pub score: u8,
    /// Component maximum
    pub max: u8,
    /// Overdue invoices counted against the customer
    pub overdue_count: u32,
}

/// Per-component breakdown of a credit score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// Payment history
    pub payment_history: PaymentHistoryScore,
    /// Order volume
    pub order_volume: OrderVolumeScore,
    /// Relationship age
    pub relationship_age: RelationshipAgeScore,
    /// Default history
    pub default_history: DefaultHistoryScore,
}

impl ScoreBreakdown {
    /// Sum of the four component scores
    pub fn sum(&self) -> u16 {
        u16::from(self.payment_history.score)
            + u16::from(self.order_volume.score)
            + u16::from(self.relationship_age.score)
            + u16::from(self.default_history.score)
    }
}

/// Credit scoring result (never persisted by the engine)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditScoreResult {
    /// Customer ID
    pub customer_id: Uuid,

    /// Composite score
    pub total_score: CreditScore,

    /// Risk category
    pub risk_category: RiskCategory,

    /// Suggested credit ceiling
    pub recommended_limit: Decimal,

    /// Credit limit at the time of scoring
    pub current_limit: Decimal,

    /// Component breakdown
    pub breakdown: ScoreBreakdown,

    /// Calculation timestamp
    pub last_calculated: DateTime<Utc>,
}

impl CreditScoreResult {
    /// Recommended minus current limit
    pub fn limit_change(&self) -> Decimal {
        self.recommended_limit - self.current_limit
    }

    /// False when the customer was scored on the no-history branch
    pub fn has_history(&self) -> bool {
        self.risk_category != RiskCategory::Unknown
    }
}

/// Customer that could not be scored in a bulk run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringFailure {
    /// Customer ID
    pub customer_id: Uuid,

    /// Error message
    pub error: String,

    /// Whether a retry may succeed
    pub transient: bool,
}

/// Outcome of scoring every active customer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkScoreReport {
    /// Successful scores, in customer listing order
    pub scores: Vec<CreditScoreResult>,

    /// Customers whose scoring failed
    pub failures: Vec<ScoringFailure>,

    /// Customers skipped after cancellation
    pub not_started: Vec<Uuid>,

    /// Cancellation was requested during the run
    pub cancelled: bool,

    /// Run start, also the `now` every score was computed against
    pub started_at: DateTime<Utc>,

    /// Run end
    pub completed_at: DateTime<Utc>,
}

impl BulkScoreReport {
    /// Aggregate the scores into a portfolio view
    pub fn summary(&self) -> PortfolioSummary {
        let mut summary = PortfolioSummary {
            scored: self.scores.len(),
            failed: self.failures.len(),
            not_started: self.not_started.len(),
            ..PortfolioSummary::default()
        };

        for score in &self.scores {
            match score.risk_category {
                RiskCategory::Low => summary.low += 1,
                RiskCategory::Medium => summary.medium += 1,
                RiskCategory::High => summary.high += 1,
                RiskCategory::Unknown => summary.unknown += 1,
            }
            summary.total_current_limit += score.current_limit;
            summary.total_recommended_limit += score.recommended_limit;
        }

        summary
    }
}

/// Portfolio totals over a bulk run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    /// Customers scored
    pub scored: usize,
    /// Customers that failed
    pub failed: usize,
    /// Customers skipped after cancellation
    pub not_started: usize,
    /// Low risk customers
    pub low: usize,
    /// Medium risk customers
    pub medium: usize,
    /// High risk customers
    pub high: usize,
    /// Customers without history
    pub unknown: usize,
    /// Sum of current limits
    pub total_current_limit: Decimal,
    /// Sum of recommended limits
    pub total_recommended_limit: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn invoice(invoice_date: NaiveDate, paid: Option<NaiveDate>) -> InvoiceRecord {
        InvoiceRecord {
            id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            invoice_date,
            due_date: invoice_date + chrono::Duration::days(30),
            paid_date: paid,
            amount: dec!(1000),
            balance_amount: if paid.is_some() { dec!(0) } else { dec!(1000) },
            status: if paid.is_some() {
                InvoiceStatus::Paid
            } else {
                InvoiceStatus::Unpaid
            },
        }
    }

    #[test]
    fn test_credit_score_clamped() {
        assert_eq!(CreditScore::new(250).value(), 100);
        assert_eq!(CreditScore::new(73).value(), 73);
    }

    #[test]
    fn test_credit_score_deserialize_clamped() {
        let score: CreditScore = serde_json::from_str("250").unwrap();
        assert_eq!(score.value(), 100);
        assert_eq!(serde_json::to_string(&CreditScore::new(73)).unwrap(), "73");
    }

    #[test]
    fn test_days_to_pay() {
        let issued = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let paid = invoice(issued, Some(NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()));
        assert_eq!(paid.days_to_pay(), Some(9));

        let backdated = invoice(issued, Some(NaiveDate::from_ymd_opt(2024, 2, 25).unwrap()));
        assert_eq!(backdated.days_to_pay(), Some(0));

        assert_eq!(invoice(issued, None).days_to_pay(), None);
    }

    #[test]
    fn test_past_due() {
        let issued = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let open = invoice(issued, None);
        assert!(!open.is_past_due(NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()));
        assert!(open.is_past_due(NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()));
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&RiskCategory::Unknown).unwrap();
        assert_eq!(json, "\"unknown\"");
        let status: OrderStatus = serde_json::from_str("\"cancelled\"").unwrap();
        assert_eq!(status, OrderStatus::Cancelled);
    }
}
