//! Credit Engine
//!
//! Customer credit scoring for the ERP order-to-cash flow.
//!
//! A customer's order, invoice and account history is turned into a 0-100
//! credit score, a risk category and a recommended credit limit. Scoring is
//! read-only; applying a recommended limit is a separate, explicit call.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod limits;
pub mod metrics;
pub mod scoring;
pub mod store;
pub mod tables;
pub mod types;

pub use config::Config;
pub use engine::CreditScoringEngine;
pub use error::{Error, Result};
pub use history::CustomerHistory;
pub use metrics::Metrics;
pub use store::{CreditDataSource, InMemoryDataSource, Snapshot};
pub use types::*;
