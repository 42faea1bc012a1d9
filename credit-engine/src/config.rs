//! Configuration for the credit engine

use crate::tables::{Breakpoint, Comparison, ThresholdTable};
use crate::types::{
    DEFAULT_HISTORY_MAX, ORDER_VOLUME_MAX, PAYMENT_HISTORY_MAX, RELATIONSHIP_AGE_MAX,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Credit engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Sub-score tables and risk thresholds
    pub scoring: ScoringConfig,

    /// Recommended limit policy
    pub limits: LimitPolicy,

    /// Bulk scoring and query settings
    pub bulk: BulkConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "credit-engine".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            scoring: ScoringConfig::default(),
            limits: LimitPolicy::default(),
            bulk: BulkConfig::default(),
        }
    }
}

/// Scoring configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Payment history (0-40)
    pub payment_history: PaymentHistoryConfig,

    /// Order volume (0-30)
    pub order_volume: OrderVolumeConfig,

    /// Relationship age (0-20)
    pub relationship_age: RelationshipAgeConfig,

    /// Default history (0-10)
    pub default_history: DefaultHistoryConfig,

    /// Score to category thresholds
    pub risk: RiskThresholds,
}

/// Payment history table, keyed on average days to pay
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentHistoryConfig {
    /// Average days to pay -> points
    pub table: ThresholdTable,

    /// Neutral points when no invoice has been paid yet
    pub no_paid_invoices_points: u8,
}

impl Default for PaymentHistoryConfig {
    fn default() -> Self {
        Self {
            table: ThresholdTable::new(
                Comparison::AtMost,
                vec![
                    Breakpoint::new(7, 40),
                    Breakpoint::new(15, 32),
                    Breakpoint::new(30, 24),
                    Breakpoint::new(45, 12),
                ],
                4,
            ),
            no_paid_invoices_points: 20,
        }
    }
}

/// Order volume table, keyed on non-cancelled order value
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderVolumeConfig {
    /// Order value in the lookback window -> points
    pub table: ThresholdTable,

    /// Lookback window in calendar months
    pub lookback_months: u32,
}

impl Default for OrderVolumeConfig {
    fn default() -> Self {
        Self {
            table: ThresholdTable::new(
                Comparison::AtLeast,
                vec![
                    Breakpoint::new(500_000, 30),
                    Breakpoint::new(200_000, 24),
                    Breakpoint::new(100_000, 18),
                    Breakpoint::new(50_000, 12),
                    Breakpoint::new(10_000, 6),
                ],
                0,
            ),
            lookback_months: 6,
        }
    }
}

/// Relationship age table, keyed on whole months active
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationshipAgeConfig {
    /// Months active -> points
    pub table: ThresholdTable,
}

impl Default for RelationshipAgeConfig {
    fn default() -> Self {
        Self {
            table: ThresholdTable::new(
                Comparison::AtLeast,
                vec![
                    Breakpoint::new(24, 20),
                    Breakpoint::new(12, 15),
                    Breakpoint::new(6, 10),
                    Breakpoint::new(3, 5),
                ],
                2,
            ),
        }
    }
}

/// Default history penalty
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultHistoryConfig {
    /// Points before penalties
    pub starting_points: u8,

    /// Points removed per overdue invoice
    pub penalty_per_overdue: u8,

    /// Also count unpaid/partial invoices past their due date
    pub derive_overdue_from_due_date: bool,
}

impl Default for DefaultHistoryConfig {
    fn default() -> Self {
        Self {
            starting_points: DEFAULT_HISTORY_MAX,
            penalty_per_overdue: 3,
            derive_overdue_from_due_date: false,
        }
    }
}

/// Score thresholds for risk categories
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskThresholds {
    /// Minimum score for low risk
    pub low_min_score: u8,

    /// Minimum score for medium risk
    pub medium_min_score: u8,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            low_min_score: 80,
            medium_min_score: 50,
        }
    }
}

/// Recommended limit policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitPolicy {
    /// Share of 6-month volume offered to low-risk customers
    pub low_fraction: Decimal,

    /// Share offered to medium-risk customers
    pub medium_fraction: Decimal,

    /// Share offered to high-risk customers
    pub high_fraction: Decimal,

    /// Currency increment recommendations are rounded to
    pub rounding_increment: Decimal,

    /// Lowest recommendation for customers with volume
    pub floor: Decimal,

    /// Optional hard ceiling
    pub ceiling: Option<Decimal>,
}

impl Default for LimitPolicy {
    fn default() -> Self {
        Self {
            low_fraction: Decimal::new(40, 2),
            medium_fraction: Decimal::new(25, 2),
            high_fraction: Decimal::new(10, 2),
            rounding_increment: Decimal::from(1_000),
            floor: Decimal::ZERO,
            ceiling: None,
        }
    }
}

/// Bulk scoring configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BulkConfig {
    /// Customers scored concurrently
    pub max_concurrency: usize,

    /// Per-query timeout (milliseconds)
    pub query_timeout_ms: u64,
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 8,
            query_timeout_ms: 5_000,
        }
    }
}

impl BulkConfig {
    /// Per-query timeout
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(value) = std::env::var("CREDIT_ENGINE_MAX_CONCURRENCY") {
            config.bulk.max_concurrency = value.parse().map_err(|_| {
                crate::Error::Config(format!(
                    "CREDIT_ENGINE_MAX_CONCURRENCY: invalid value {value}"
                ))
            })?;
        }

        if let Ok(value) = std::env::var("CREDIT_ENGINE_QUERY_TIMEOUT_MS") {
            config.bulk.query_timeout_ms = value.parse().map_err(|_| {
                crate::Error::Config(format!(
                    "CREDIT_ENGINE_QUERY_TIMEOUT_MS: invalid value {value}"
                ))
            })?;
        }

        if let Ok(value) = std::env::var("CREDIT_ENGINE_ROUNDING_INCREMENT") {
            config.limits.rounding_increment = value.parse().map_err(|_| {
                crate::Error::Config(format!(
                    "CREDIT_ENGINE_ROUNDING_INCREMENT: invalid value {value}"
                ))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check tables, thresholds, fractions and bulk settings
    pub fn validate(&self) -> crate::Result<()> {
        let scoring = &self.scoring;

        scoring
            .payment_history
            .table
            .validate("payment_history", PAYMENT_HISTORY_MAX)?;
        if scoring.payment_history.no_paid_invoices_points > PAYMENT_HISTORY_MAX {
            return Err(crate::Error::Config(format!(
                "payment_history: neutral points {} exceed maximum {}",
                scoring.payment_history.no_paid_invoices_points, PAYMENT_HISTORY_MAX
            )));
        }

        scoring
            .order_volume
            .table
            .validate("order_volume", ORDER_VOLUME_MAX)?;
        if scoring.order_volume.lookback_months == 0 {
            return Err(crate::Error::Config(
                "order_volume: lookback_months must be at least 1".to_string(),
            ));
        }

        scoring
            .relationship_age
            .table
            .validate("relationship_age", RELATIONSHIP_AGE_MAX)?;

        if scoring.default_history.starting_points > DEFAULT_HISTORY_MAX {
            return Err(crate::Error::Config(format!(
                "default_history: starting points {} exceed maximum {}",
                scoring.default_history.starting_points, DEFAULT_HISTORY_MAX
            )));
        }

        if scoring.risk.low_min_score > 100
            || scoring.risk.medium_min_score > scoring.risk.low_min_score
        {
            return Err(crate::Error::Config(format!(
                "risk: thresholds must satisfy medium ({}) <= low ({}) <= 100",
                scoring.risk.medium_min_score, scoring.risk.low_min_score
            )));
        }

        let limits = &self.limits;
        for (name, fraction) in [
            ("low_fraction", limits.low_fraction),
            ("medium_fraction", limits.medium_fraction),
            ("high_fraction", limits.high_fraction),
        ] {
            if fraction < Decimal::ZERO || fraction > Decimal::ONE {
                return Err(crate::Error::Config(format!(
                    "limits: {name} must be within 0..=1, got {fraction}"
                )));
            }
        }

        if limits.rounding_increment <= Decimal::ZERO {
            return Err(crate::Error::Config(format!(
                "limits: rounding_increment must be positive, got {}",
                limits.rounding_increment
            )));
        }

        if limits.floor < Decimal::ZERO {
            return Err(crate::Error::Config(format!(
                "limits: floor must not be negative, got {}",
                limits.floor
            )));
        }

        if let Some(ceiling) = limits.ceiling {
            if ceiling < limits.floor {
                return Err(crate::Error::Config(format!(
                    "limits: ceiling {ceiling} is below floor {}",
                    limits.floor
                )));
            }
        }

        if self.bulk.max_concurrency == 0 {
            return Err(crate::Error::Config(
                "bulk: max_concurrency must be at least 1".to_string(),
            ));
        }

        if self.bulk.query_timeout_ms == 0 {
            return Err(crate::Error::Config(
                "bulk: query_timeout_ms must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.service_name, "credit-engine");
        assert_eq!(config.bulk.max_concurrency, 8);
        assert_eq!(config.scoring.order_volume.lookback_months, 6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file_partial_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[bulk]
max_concurrency = 2

[limits]
medium_fraction = "0.30"
rounding_increment = 500

[scoring.default_history]
starting_points = 10
penalty_per_overdue = 5
derive_overdue_from_due_date = true
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.bulk.max_concurrency, 2);
        assert_eq!(config.bulk.query_timeout_ms, 5_000);
        assert_eq!(config.limits.medium_fraction, Decimal::new(30, 2));
        assert_eq!(config.limits.rounding_increment, Decimal::from(500));
        assert_eq!(config.scoring.default_history.penalty_per_overdue, 5);
        assert!(config.scoring.default_history.derive_overdue_from_due_date);
        assert_eq!(config.scoring.payment_history.no_paid_invoices_points, 20);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.bulk.max_concurrency = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.limits.high_fraction = Decimal::new(15, 1);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.scoring.risk.medium_min_score = 90;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.scoring.relationship_age.table.fallback = 25;
        assert!(config.validate().is_err());
    }
}
