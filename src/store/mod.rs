//! Ledger persistence boundary
//!
//! The interpreter never owns products or transactions. It reads a product
//! by id + owner, writes stock quantities (last write wins), and appends
//! transaction and task records.

pub mod http;

use crate::error::InterpreterError;
use crate::models::{DateRange, NewTask, NewTransaction, Product, StoredTask, StoredTransaction};
use crate::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

pub use http::HttpLedgerStore;

/// Trait for the external persistence service
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn create_transaction(&self, transaction: NewTransaction) -> Result<StoredTransaction>;

    async fn get_product(&self, user_id: Uuid, product_id: Uuid) -> Result<Option<Product>>;

    /// Overwrite the stock quantity; returns the updated product
    async fn update_stock(&self, user_id: Uuid, product_id: Uuid, new_quantity: i64) -> Result<Product>;

    async fn create_task(&self, task: NewTask) -> Result<StoredTask>;

    /// Transactions dated inside `range` (read-only, for analytics)
    async fn list_transactions(&self, user_id: Uuid, range: &DateRange) -> Result<Vec<StoredTransaction>>;
}

/// In-memory ledger for development and tests
pub struct InMemoryLedgerStore {
    products: Arc<RwLock<HashMap<(Uuid, Uuid), Product>>>,
    transactions: Arc<RwLock<Vec<StoredTransaction>>>,
    tasks: Arc<RwLock<Vec<StoredTask>>>,
    /// Remaining successful transaction writes before failures start
    write_budget: Arc<AtomicUsize>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self {
            products: Arc::new(RwLock::new(HashMap::new())),
            transactions: Arc::new(RwLock::new(Vec::new())),
            tasks: Arc::new(RwLock::new(Vec::new())),
            write_budget: Arc::new(AtomicUsize::new(usize::MAX)),
        }
    }

    pub async fn seed_product(&self, user_id: Uuid, product: Product) {
        let mut products = self.products.write().await;
        products.insert((user_id, product.id), product);
    }

    /// Catalog snapshot for a user, sorted by name
    pub async fn products_for(&self, user_id: Uuid) -> Vec<Product> {
        let products = self.products.read().await;
        let mut owned: Vec<Product> = products
            .iter()
            .filter(|((owner, _), _)| *owner == user_id)
            .map(|(_, p)| p.clone())
            .collect();
        owned.sort_by(|a, b| a.name.cmp(&b.name));
        owned
    }

    pub async fn transactions_for(&self, user_id: Uuid) -> Vec<StoredTransaction> {
        let transactions = self.transactions.read().await;
        transactions
            .iter()
            .filter(|t| t.record.user_id == user_id)
            .cloned()
            .collect()
    }

    pub async fn tasks_for(&self, user_id: Uuid) -> Vec<StoredTask> {
        let tasks = self.tasks.read().await;
        tasks.iter().filter(|t| t.task.user_id == user_id).cloned().collect()
    }

    /// Make every transaction write after the next `n` fail
    pub fn fail_transactions_after(&self, n: usize) {
        self.write_budget.store(n, Ordering::SeqCst);
    }
}

impl Default for InMemoryLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn create_transaction(&self, transaction: NewTransaction) -> Result<StoredTransaction> {
        let allowed = self
            .write_budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if !allowed {
            return Err(InterpreterError::StoreError(
                "ledger unavailable".to_string(),
            ));
        }

        let stored = StoredTransaction {
            id: Uuid::new_v4(),
            record: transaction,
            created_at: Utc::now(),
        };

        let mut transactions = self.transactions.write().await;
        transactions.push(stored.clone());
        Ok(stored)
    }

    async fn get_product(&self, user_id: Uuid, product_id: Uuid) -> Result<Option<Product>> {
        let products = self.products.read().await;
        Ok(products.get(&(user_id, product_id)).cloned())
    }

    async fn update_stock(&self, user_id: Uuid, product_id: Uuid, new_quantity: i64) -> Result<Product> {
        let mut products = self.products.write().await;
        let product = products
            .get_mut(&(user_id, product_id))
            .ok_or_else(|| InterpreterError::ProductNotFound(product_id.to_string()))?;

        product.stock_quantity = new_quantity;
        product.updated_at = Some(Utc::now());
        Ok(product.clone())
    }

    async fn create_task(&self, task: NewTask) -> Result<StoredTask> {
        let stored = StoredTask {
            id: Uuid::new_v4(),
            task,
            completed: false,
            created_at: Utc::now(),
        };

        let mut tasks = self.tasks.write().await;
        tasks.push(stored.clone());
        Ok(stored)
    }

    async fn list_transactions(&self, user_id: Uuid, range: &DateRange) -> Result<Vec<StoredTransaction>> {
        let transactions = self.transactions.read().await;
        Ok(transactions
            .iter()
            .filter(|t| t.record.user_id == user_id && range.contains(t.record.date))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransactionKind;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    #[tokio::test]
    async fn test_products_are_scoped_by_owner() {
        let store = InMemoryLedgerStore::new();
        let owner = Uuid::new_v4();
        let product = Product::new("Colar", 50.0, 10);
        let product_id = product.id;
        store.seed_product(owner, product).await;

        assert!(store.get_product(owner, product_id).await.unwrap().is_some());
        assert!(store.get_product(Uuid::new_v4(), product_id).await.unwrap().is_none());

        let updated = store.update_stock(owner, product_id, 7).await.unwrap();
        assert_eq!(updated.stock_quantity, 7);
        assert!(store.update_stock(Uuid::new_v4(), product_id, 1).await.is_err());
    }

    #[tokio::test]
    async fn test_list_transactions_by_range() {
        let store = InMemoryLedgerStore::new();
        let user = Uuid::new_v4();
        for d in [1, 10, 20] {
            let tx = NewTransaction::new(user, TransactionKind::Income, 10.0, day(d), "Venda", "vendas");
            store.create_transaction(tx).await.unwrap();
        }

        let range = DateRange {
            start: day(5),
            end: day(20),
            label: "teste".to_string(),
        };
        let found = store.list_transactions(user, &range).await.unwrap();
        assert_eq!(found.len(), 2);
    }

    #[tokio::test]
    async fn test_write_budget_injects_failures() {
        let store = InMemoryLedgerStore::new();
        let user = Uuid::new_v4();
        store.fail_transactions_after(1);

        let tx = NewTransaction::new(user, TransactionKind::Expense, 10.0, day(1), "x", "outros");
        assert!(store.create_transaction(tx.clone()).await.is_ok());
        assert!(store.create_transaction(tx).await.is_err());
        assert_eq!(store.transactions_for(user).await.len(), 1);
    }
}
