//! Customer history normalization
//!
//! Turns the raw order, invoice and customer snapshots returned by a
//! [`CreditDataSource`](crate::store::CreditDataSource) into the facts the
//! sub-calculators consume.

use crate::types::{CustomerRecord, InvoiceRecord, InvoiceStatus, OrderRecord};
use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::warn;

/// Normalized view of one customer's financial history
#[derive(Debug, Clone)]
pub struct CustomerHistory {
    customer: CustomerRecord,
    orders: Vec<OrderRecord>,
    invoices: Vec<InvoiceRecord>,
}

impl CustomerHistory {
    /// Build a history, dropping records that belong to other customers
    pub fn new(
        customer: CustomerRecord,
        orders: Vec<OrderRecord>,
        invoices: Vec<InvoiceRecord>,
    ) -> Self {
        let customer_id = customer.id;

        let order_count = orders.len();
        let orders: Vec<OrderRecord> = orders
            .into_iter()
            .filter(|order| order.customer_id == customer_id)
            .collect();
        if orders.len() != order_count {
            warn!(
                %customer_id,
                dropped = order_count - orders.len(),
                "Dropped orders belonging to another customer"
            );
        }

        let invoice_count = invoices.len();
        let invoices: Vec<InvoiceRecord> = invoices
            .into_iter()
            .filter(|invoice| invoice.customer_id == customer_id)
            .collect();
        if invoices.len() != invoice_count {
            warn!(
                %customer_id,
                dropped = invoice_count - invoices.len(),
                "Dropped invoices belonging to another customer"
            );
        }

        Self {
            customer,
            orders,
            invoices,
        }
    }

    /// Customer snapshot
    pub fn customer(&self) -> &CustomerRecord {
        &self.customer
    }

    /// All orders, cancelled included
    pub fn orders(&self) -> &[OrderRecord] {
        &self.orders
    }

    /// All invoices
    pub fn invoices(&self) -> &[InvoiceRecord] {
        &self.invoices
    }

    /// Orders that count towards volume
    pub fn active_orders(&self) -> impl Iterator<Item = &OrderRecord> {
        self.orders.iter().filter(|order| !order.is_cancelled())
    }

    /// Non-cancelled order value and count with `cutoff <= order_date <= as_of`
    pub fn order_volume_since(&self, cutoff: NaiveDate, as_of: NaiveDate) -> (Decimal, usize) {
        self.active_orders()
            .filter(|order| order.order_date >= cutoff && order.order_date <= as_of)
            .fold((Decimal::ZERO, 0), |(total, count), order| {
                (total + order.total_amount, count + 1)
            })
    }

    /// Days from issue to payment for every paid invoice
    pub fn days_to_pay(&self) -> Vec<i64> {
        self.invoices
            .iter()
            .filter_map(InvoiceRecord::days_to_pay)
            .collect()
    }

    /// Mean days to pay, `None` when nothing has been paid
    pub fn average_days_to_pay(&self) -> Option<Decimal> {
        let days = self.days_to_pay();
        if days.is_empty() {
            return None;
        }

        let total: i64 = days.iter().sum();
        Some(Decimal::from(total) / Decimal::from(days.len() as u64))
    }

    /// Invoices counted as overdue as of `as_of`
    pub fn overdue_count(&self, as_of: NaiveDate, derive_from_due_date: bool) -> u32 {
        self.invoices
            .iter()
            .filter(|invoice| {
                invoice.status == InvoiceStatus::Overdue
                    || (derive_from_due_date && invoice.is_past_due(as_of))
            })
            .count() as u32
    }

    /// Whether there is anything to judge the customer on
    pub fn has_history(&self) -> bool {
        self.active_orders().next().is_some() || !self.invoices.is_empty()
    }
}

/// Whole calendar months from `from` to `to`, floored and never negative
pub fn months_between(from: DateTime<Utc>, to: DateTime<Utc>) -> u32 {
    if to <= from {
        return 0;
    }

    let (start, end) = (from.date_naive(), to.date_naive());
    let mut months = (end.year() - start.year()) * 12 + end.month() as i32 - start.month() as i32;

    if end.day() < start.day() || (end.day() == start.day() && to.time() < from.time()) {
        months -= 1;
    }

    months.max(0) as u32
}

/// First day of the lookback window ending at `as_of`
pub fn lookback_cutoff(as_of: NaiveDate, months: u32) -> NaiveDate {
    as_of
        .checked_sub_months(Months::new(months))
        .unwrap_or(NaiveDate::MIN)
}
