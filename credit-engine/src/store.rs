//! Data access for the credit engine
//!
//! The engine never talks to a database directly. It reads and writes through
//! [`CreditDataSource`], which the hosting application implements on top of
//! its own store. [`InMemoryDataSource`] backs the CLI and the test suite.

use crate::types::{CustomerRecord, InvoiceRecord, OrderRecord};
use crate::{Error, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// External store consumed by the engine
#[async_trait]
pub trait CreditDataSource: Send + Sync {
    /// All orders placed by a customer
    async fn fetch_orders(&self, customer_id: Uuid) -> Result<Vec<OrderRecord>>;

    /// All invoices raised against a customer
    async fn fetch_invoices(&self, customer_id: Uuid) -> Result<Vec<InvoiceRecord>>;

    /// Customer record, `None` when the id is unknown
    async fn fetch_customer(&self, customer_id: Uuid) -> Result<Option<CustomerRecord>>;

    /// Every customer in `active` status
    async fn fetch_active_customers(&self) -> Result<Vec<CustomerRecord>>;

    /// Overwrite a customer's credit limit
    async fn update_customer_credit_limit(&self, customer_id: Uuid, new_limit: Decimal)
        -> Result<()>;
}

/// Serializable store contents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// Customers
    #[serde(default)]
    pub customers: Vec<CustomerRecord>,
    /// Orders
    #[serde(default)]
    pub orders: Vec<OrderRecord>,
    /// Invoices
    #[serde(default)]
    pub invoices: Vec<InvoiceRecord>,
}

/// In-memory store with optional latency and failure injection
#[derive(Debug, Default)]
pub struct InMemoryDataSource {
    customers: RwLock<HashMap<Uuid, CustomerRecord>>,
    orders: RwLock<HashMap<Uuid, Vec<OrderRecord>>>,
    invoices: RwLock<HashMap<Uuid, Vec<InvoiceRecord>>>,
    failing_reads: RwLock<HashSet<Uuid>>,
    failing_writes: RwLock<HashSet<Uuid>>,
    latency: Option<Duration>,
}

impl InMemoryDataSource {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store populated from a snapshot
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let customers = snapshot
            .customers
            .into_iter()
            .map(|customer| (customer.id, customer))
            .collect();

        let mut orders: HashMap<Uuid, Vec<OrderRecord>> = HashMap::new();
        for order in snapshot.orders {
            orders.entry(order.customer_id).or_default().push(order);
        }

        let mut invoices: HashMap<Uuid, Vec<InvoiceRecord>> = HashMap::new();
        for invoice in snapshot.invoices {
            invoices.entry(invoice.customer_id).or_default().push(invoice);
        }

        Self {
            customers: RwLock::new(customers),
            orders: RwLock::new(orders),
            invoices: RwLock::new(invoices),
            failing_reads: RwLock::new(HashSet::new()),
            failing_writes: RwLock::new(HashSet::new()),
            latency: None,
        }
    }

    /// Load a JSON snapshot file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let snapshot: Snapshot = serde_json::from_str(&content)?;
        info!(
            path = %path.display(),
            customers = snapshot.customers.len(),
            orders = snapshot.orders.len(),
            invoices = snapshot.invoices.len(),
            "Snapshot loaded"
        );
        Ok(Self::from_snapshot(snapshot))
    }

    /// Write the current contents as a JSON snapshot file
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let snapshot = self.snapshot().await;
        let content = serde_json::to_string_pretty(&snapshot)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    /// Current contents, ordered by id for stable output
    pub async fn snapshot(&self) -> Snapshot {
        let mut customers: Vec<CustomerRecord> =
            self.customers.read().await.values().cloned().collect();
        customers.sort_by_key(|customer| customer.id);

        let mut orders: Vec<OrderRecord> =
            self.orders.read().await.values().flatten().cloned().collect();
        orders.sort_by_key(|order| order.id);

        let mut invoices: Vec<InvoiceRecord> =
            self.invoices.read().await.values().flatten().cloned().collect();
        invoices.sort_by_key(|invoice| invoice.id);

        Snapshot {
            customers,
            orders,
            invoices,
        }
    }

    /// Delay every call by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Insert or replace a customer
    pub async fn insert_customer(&self, customer: CustomerRecord) {
        self.customers.write().await.insert(customer.id, customer);
    }

    /// Add an order
    pub async fn insert_order(&self, order: OrderRecord) {
        self.orders
            .write()
            .await
            .entry(order.customer_id)
            .or_default()
            .push(order);
    }

    /// Add an invoice
    pub async fn insert_invoice(&self, invoice: InvoiceRecord) {
        self.invoices
            .write()
            .await
            .entry(invoice.customer_id)
            .or_default()
            .push(invoice);
    }

    /// Make every order/invoice read for `customer_id` fail
    pub async fn inject_read_failure(&self, customer_id: Uuid) {
        warn!(%customer_id, "Injecting read failure");
        self.failing_reads.write().await.insert(customer_id);
    }

    /// Undo [`inject_read_failure`](Self::inject_read_failure)
    pub async fn clear_read_failure(&self, customer_id: Uuid) {
        self.failing_reads.write().await.remove(&customer_id);
    }

    /// Make every credit limit update for `customer_id` fail
    pub async fn inject_write_failure(&self, customer_id: Uuid) {
        warn!(%customer_id, "Injecting write failure");
        self.failing_writes.write().await.insert(customer_id);
    }

    /// Undo [`inject_write_failure`](Self::inject_write_failure)
    pub async fn clear_write_failure(&self, customer_id: Uuid) {
        self.failing_writes.write().await.remove(&customer_id);
    }

    async fn simulate(
        &self,
        operation: &str,
        failing: &RwLock<HashSet<Uuid>>,
        customer_id: Option<Uuid>,
    ) -> Result<()> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if let Some(customer_id) = customer_id {
            if failing.read().await.contains(&customer_id) {
                return Err(Error::DataAccess(format!(
                    "simulated {} failure for customer {}",
                    operation, customer_id
                )));
            }
        }

        Ok(())
    }
}

#[async_trait]
impl CreditDataSource for InMemoryDataSource {
    async fn fetch_orders(&self, customer_id: Uuid) -> Result<Vec<OrderRecord>> {
        self.simulate("read", &self.failing_reads, Some(customer_id)).await?;
        Ok(self
            .orders
            .read()
            .await
            .get(&customer_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_invoices(&self, customer_id: Uuid) -> Result<Vec<InvoiceRecord>> {
        self.simulate("read", &self.failing_reads, Some(customer_id)).await?;
        Ok(self
            .invoices
            .read()
            .await
            .get(&customer_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_customer(&self, customer_id: Uuid) -> Result<Option<CustomerRecord>> {
        self.simulate("read", &self.failing_reads, None).await?;
        Ok(self.customers.read().await.get(&customer_id).cloned())
    }

    async fn fetch_active_customers(&self) -> Result<Vec<CustomerRecord>> {
        self.simulate("read", &self.failing_reads, None).await?;
        let mut customers: Vec<CustomerRecord> = self
            .customers
            .read()
            .await
            .values()
            .filter(|customer| customer.is_active())
            .cloned()
            .collect();
        customers.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(customers)
    }

    async fn update_customer_credit_limit(
        &self,
        customer_id: Uuid,
        new_limit: Decimal,
    ) -> Result<()> {
        self.simulate("write", &self.failing_writes, Some(customer_id)).await?;
        let mut customers = self.customers.write().await;
        let customer = customers
            .get_mut(&customer_id)
            .ok_or(Error::NotFound(customer_id))?;

        debug!(
            %customer_id,
            previous = %customer.credit_limit,
            %new_limit,
            "Credit limit updated"
        );
        customer.credit_limit = new_limit;
        Ok(())
    }
}
