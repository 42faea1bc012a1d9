//! Ordered threshold tables
//!
//! Every breakpoint policy in the scorer is expressed as a [`ThresholdTable`]
//! so it can be tuned from configuration without touching aggregation code.
//!
//! A table is scanned in order and the first breakpoint whose bound matches
//! the value wins; if none match, the fallback applies. [`ThresholdTable::validate`]
//! enforces ordering so that every accepted table is monotonic.

use crate::{Error, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How a value is compared against a breakpoint bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    /// Matches when `value <= bound`; bounds ascend
    AtMost,
    /// Matches when `value >= bound`; bounds descend
    AtLeast,
}

impl Comparison {
    fn matches(self, value: Decimal, bound: Decimal) -> bool {
        match self {
            Comparison::AtMost => value <= bound,
            Comparison::AtLeast => value >= bound,
        }
    }
}

/// Single row of a threshold table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakpoint {
    /// Bound compared against the metric
    pub bound: Decimal,
    /// Points awarded on match
    pub points: u8,
}

impl Breakpoint {
    /// Convenience constructor for integer bounds
    pub fn new(bound: i64, points: u8) -> Self {
        Self {
            bound: Decimal::from(bound),
            points,
        }
    }
}

/// Ordered breakpoint table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdTable {
    /// Comparison direction
    pub comparison: Comparison,

    /// Breakpoints, scanned in order
    pub breakpoints: Vec<Breakpoint>,

    /// Points when no breakpoint matches
    pub fallback: u8,
}

impl ThresholdTable {
    /// Create a table from rows
    pub fn new(comparison: Comparison, breakpoints: Vec<Breakpoint>, fallback: u8) -> Self {
        Self {
            comparison,
            breakpoints,
            fallback,
        }
    }

    /// Points for `value`
    pub fn lookup(&self, value: Decimal) -> u8 {
        self.breakpoints
            .iter()
            .find(|bp| self.comparison.matches(value, bp.bound))
            .map(|bp| bp.points)
            .unwrap_or(self.fallback)
    }

    /// Reject tables that are empty, exceed `max`, or are not monotonic
    pub fn validate(&self, name: &str, max: u8) -> Result<()> {
        if self.breakpoints.is_empty() {
            return Err(Error::Config(format!("{name}: table has no breakpoints")));
        }

        if self.fallback > max {
            return Err(Error::Config(format!(
                "{name}: fallback {} exceeds maximum {max}",
                self.fallback
            )));
        }

        for bp in &self.breakpoints {
            if bp.points > max {
                return Err(Error::Config(format!(
                    "{name}: breakpoint {} awards {} points, maximum is {max}",
                    bp.bound, bp.points
                )));
            }
        }

        for pair in self.breakpoints.windows(2) {
            let (prev, next) = (pair[0], pair[1]);

            let ordered = match self.comparison {
                Comparison::AtMost => prev.bound < next.bound,
                Comparison::AtLeast => prev.bound > next.bound,
            };
            if !ordered {
                return Err(Error::Config(format!(
                    "{name}: bounds must be strictly {} ({} then {})",
                    match self.comparison {
                        Comparison::AtMost => "ascending",
                        Comparison::AtLeast => "descending",
                    },
                    prev.bound,
                    next.bound
                )));
            }

            if next.points > prev.points {
                return Err(Error::Config(format!(
                    "{name}: points must not increase along the table ({} then {})",
                    prev.points, next.points
                )));
            }
        }

        if let Some(last) = self.breakpoints.last() {
            if self.fallback > last.points {
                return Err(Error::Config(format!(
                    "{name}: fallback {} exceeds last breakpoint points {}",
                    self.fallback, last.points
                )));
            }
        }

        Ok(())
    }
}
