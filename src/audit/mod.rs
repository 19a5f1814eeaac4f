//! Confirmation integrity and execution log
//!
//! Proposals are signed when they are built and verified when they come
//! back. Every executed confirmation is recorded so the same payload cannot
//! run twice.

use crate::error::InterpreterError;
use crate::models::{ConfirmationData, PendingAction};
use crate::Result;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Signs and verifies [`ConfirmationData`] envelopes
#[derive(Clone)]
pub struct ConfirmationSigner {
    secret: Vec<u8>,
}

impl ConfirmationSigner {
    /// Uses a random per-process secret when none is configured
    pub fn new(secret: Option<&str>) -> Self {
        let secret = match secret {
            Some(s) if !s.is_empty() => s.as_bytes().to_vec(),
            _ => Uuid::new_v4().as_bytes().to_vec(),
        };
        Self { secret }
    }

    /// Build a signed envelope for a freshly proposed action
    pub fn seal(&self, user_id: Uuid, action: PendingAction, now: DateTime<Utc>) -> ConfirmationData {
        let confirmation_id = Uuid::new_v4();
        let fingerprint = self.fingerprint(confirmation_id, user_id, now, &action);
        ConfirmationData {
            confirmation_id,
            user_id,
            created_at: now,
            action,
            fingerprint,
        }
    }

    pub fn fingerprint(
        &self,
        confirmation_id: Uuid,
        user_id: Uuid,
        created_at: DateTime<Utc>,
        action: &PendingAction,
    ) -> String {
        compute_fingerprint(&self.secret, &(confirmation_id, user_id, created_at, action))
    }

    /// Fails when the payload was altered or belongs to another user
    pub fn verify(&self, data: &ConfirmationData, user_id: Uuid) -> Result<()> {
        if data.user_id != user_id {
            return Err(InterpreterError::ConfirmationTampered(format!(
                "confirmation {} belongs to another user",
                data.confirmation_id
            )));
        }

        let expected = self.fingerprint(data.confirmation_id, data.user_id, data.created_at, &data.action);
        if expected != data.fingerprint {
            return Err(InterpreterError::ConfirmationTampered(format!(
                "fingerprint mismatch for {}",
                data.confirmation_id
            )));
        }
        Ok(())
    }
}

/// SHA-256 of `secret` followed by the JSON of `value`, hex encoded.
/// JSON is streamed into the hasher without an intermediate String.
pub fn compute_fingerprint<T: Serialize>(secret: &[u8], value: &T) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret);

    if serde_json::to_writer(&mut HashWriter(&mut hasher), value).is_err() {
        return String::new();
    }

    hex::encode(hasher.finalize())
}

/// Adapter to allow writing into Sha256 via std::io::Write
struct HashWriter<'a, H: Digest>(&'a mut H);

impl<'a, H: Digest> Write for HashWriter<'a, H> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecutionRecord {
    pub confirmation_id: Uuid,
    pub user_id: Uuid,
    pub action_kind: &'static str,
    /// When the proposal was sealed; drives eviction
    pub proposed_at: DateTime<Utc>,
    pub executed_at: DateTime<Utc>,
    pub outcome: Option<String>,
}

/// Confirmations that have started executing, keyed by id.
///
/// Confirmations older than the TTL are refused outright, so their records
/// are dropped on the next claim and the map stays bounded by the TTL window.
pub struct ExecutionLog {
    records: Arc<RwLock<HashMap<Uuid, ExecutionRecord>>>,
    ttl: Duration,
}

impl ExecutionLog {
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
            ttl: Duration::seconds(ttl_secs.max(1)),
        }
    }

    fn is_expired(&self, proposed_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now - proposed_at > self.ttl
    }

    /// Reserve a confirmation for execution. Fails with `ConfirmationExpired`
    /// past the TTL and with `ConfirmationReplayed` on a second claim.
    pub async fn claim(&self, data: &ConfirmationData, now: DateTime<Utc>) -> Result<()> {
        if self.is_expired(data.created_at, now) {
            return Err(InterpreterError::ConfirmationExpired(
                data.confirmation_id.to_string(),
            ));
        }

        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, record| !self.is_expired(record.proposed_at, now));
        if records.len() < before {
            debug!(evicted = before - records.len(), "Dropped expired execution records");
        }

        if records.contains_key(&data.confirmation_id) {
            return Err(InterpreterError::ConfirmationReplayed(
                data.confirmation_id.to_string(),
            ));
        }

        records.insert(
            data.confirmation_id,
            ExecutionRecord {
                confirmation_id: data.confirmation_id,
                user_id: data.user_id,
                action_kind: data.action.kind(),
                proposed_at: data.created_at,
                executed_at: now,
                outcome: None,
            },
        );
        Ok(())
    }

    /// Give a claim back when nothing was written, so the user may retry
    pub async fn release(&self, confirmation_id: Uuid) {
        let mut records = self.records.write().await;
        records.remove(&confirmation_id);
    }

    pub async fn finish(&self, confirmation_id: Uuid, outcome: &str) {
        let mut records = self.records.write().await;
        if let Some(record) = records.get_mut(&confirmation_id) {
            record.outcome = Some(outcome.to_string());
            debug!(
                confirmation_id = %record.confirmation_id,
                user_id = %record.user_id,
                action = record.action_kind,
                outcome,
                "Execution recorded"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RestockAction;

    fn restock(quantity: u32) -> PendingAction {
        PendingAction::Restock(RestockAction {
            product_id: Uuid::nil(),
            product_name: "Colar".to_string(),
            quantity,
        })
    }

    #[test]
    fn test_sealed_confirmation_verifies() {
        let signer = ConfirmationSigner::new(Some("segredo"));
        let user = Uuid::new_v4();
        let data = signer.seal(user, restock(5), Utc::now());

        assert!(signer.verify(&data, user).is_ok());
        assert!(matches!(
            signer.verify(&data, Uuid::new_v4()),
            Err(InterpreterError::ConfirmationTampered(_))
        ));
    }

    #[test]
    fn test_altered_action_is_rejected() {
        let signer = ConfirmationSigner::new(None);
        let user = Uuid::new_v4();
        let mut data = signer.seal(user, restock(5), Utc::now());
        data.action = restock(500);

        assert!(signer.verify(&data, user).is_err());
    }

    #[test]
    fn test_fingerprint_depends_on_secret() {
        let a = compute_fingerprint(b"a", &restock(1));
        let b = compute_fingerprint(b"b", &restock(1));
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_second_claim_is_replay() {
        let signer = ConfirmationSigner::new(None);
        let log = ExecutionLog::new(3600);
        let user = Uuid::new_v4();
        let data = signer.seal(user, restock(1), Utc::now());

        log.claim(&data, Utc::now()).await.unwrap();
        assert!(matches!(
            log.claim(&data, Utc::now()).await,
            Err(InterpreterError::ConfirmationReplayed(_))
        ));

        log.release(data.confirmation_id).await;
        assert!(log.claim(&data, Utc::now()).await.is_ok());
        log.finish(data.confirmation_id, "ok").await;

        let records = log.records.read().await;
        assert_eq!(records[&data.confirmation_id].outcome.as_deref(), Some("ok"));
    }

    #[tokio::test]
    async fn test_aged_records_are_evicted_and_refused() {
        let signer = ConfirmationSigner::new(None);
        let log = ExecutionLog::new(3600);
        let user = Uuid::new_v4();
        let start = Utc::now();

        let old = signer.seal(user, restock(1), start);
        log.claim(&old, start).await.unwrap();

        let later = start + Duration::hours(2);
        let fresh = signer.seal(user, restock(2), later);
        log.claim(&fresh, later).await.unwrap();

        {
            let records = log.records.read().await;
            assert_eq!(records.len(), 1);
            assert!(records.contains_key(&fresh.confirmation_id));
        }

        // the evicted one cannot come back: it is past the TTL
        assert!(matches!(
            log.claim(&old, later).await,
            Err(InterpreterError::ConfirmationExpired(_))
        ));
        assert!(matches!(
            log.claim(&fresh, later).await,
            Err(InterpreterError::ConfirmationReplayed(_))
        ));
    }

    #[test]
    fn test_created_at_is_signed() {
        let signer = ConfirmationSigner::new(Some("segredo"));
        let user = Uuid::new_v4();
        let mut data = signer.seal(user, restock(1), Utc::now());
        data.created_at = data.created_at + Duration::days(3);

        assert!(signer.verify(&data, user).is_err());
    }
}
