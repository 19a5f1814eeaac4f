//! HTTP-backed ledger store
//!
//! Talks JSON to the bookkeeping backend. Paths:
//! `POST /transactions`, `GET /transactions`, `GET|PATCH /products/{id}`,
//! `POST /tasks`. Every request is scoped by `user_id`.

use super::LedgerStore;
use crate::error::InterpreterError;
use crate::models::{DateRange, NewTask, NewTransaction, Product, StoredTask, StoredTransaction};
use crate::Result;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

#[derive(Clone)]
pub struct HttpLedgerStore {
    client: Client,
    base_url: String,
}

impl HttpLedgerStore {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, path: &str, request: RequestBuilder) -> Result<Option<T>> {
        let response = request
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| {
                InterpreterError::StoreError(format!("Ledger request failed for {}: {}", path, e))
            })?;

        let status = response.status();
        debug!(path, %status, "ledger response");

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let body = response
            .json::<Value>()
            .await
            .map_err(|e| InterpreterError::StoreError(format!("Invalid JSON response: {}", e)))?;

        if !status.is_success() {
            return Err(InterpreterError::StoreError(format!(
                "Ledger returned {} for {}: {}",
                status, path, body
            )));
        }

        Ok(Some(serde_json::from_value(body)?))
    }

    async fn post_json<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T> {
        let request = self.client.post(self.url(path)).json(body);
        self.send(path, request)
            .await?
            .ok_or_else(|| InterpreterError::StoreError(format!("{} not found", path)))
    }

    async fn patch_json<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<Option<T>> {
        let request = self.client.patch(self.url(path)).json(body);
        self.send(path, request).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<Option<T>> {
        let request = self.client.get(self.url(path)).query(query);
        self.send(path, request).await
    }
}

#[async_trait]
impl LedgerStore for HttpLedgerStore {
    async fn create_transaction(&self, transaction: NewTransaction) -> Result<StoredTransaction> {
        let body = serde_json::to_value(&transaction)?;
        self.post_json("/transactions", &body).await
    }

    async fn get_product(&self, user_id: Uuid, product_id: Uuid) -> Result<Option<Product>> {
        let path = format!("/products/{}", product_id);
        self.get_json(&path, &[("user_id", user_id.to_string())]).await
    }

    async fn update_stock(&self, user_id: Uuid, product_id: Uuid, new_quantity: i64) -> Result<Product> {
        let path = format!("/products/{}", product_id);
        let body = json!({
            "user_id": user_id,
            "stock_quantity": new_quantity,
        });

        self.patch_json(&path, &body)
            .await?
            .ok_or_else(|| InterpreterError::ProductNotFound(product_id.to_string()))
    }

    async fn create_task(&self, task: NewTask) -> Result<StoredTask> {
        let body = serde_json::to_value(&task)?;
        self.post_json("/tasks", &body).await
    }

    async fn list_transactions(&self, user_id: Uuid, range: &DateRange) -> Result<Vec<StoredTransaction>> {
        let query = [
            ("user_id", user_id.to_string()),
            ("start", range.start.to_string()),
            ("end", range.end.to_string()),
        ];
        Ok(self
            .get_json("/transactions", &query)
            .await?
            .unwrap_or_default())
    }
}
