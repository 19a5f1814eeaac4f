//! Conversation Context
//!
//! Per-session dialogue state: at most one pending context, plus a short
//! history of recent ones. The session is an explicit value owned by the
//! caller and passed into every turn.

pub mod store;

use crate::models::{ConfirmationData, Entities, Intent, ParsedCommand, Product};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use uuid::Uuid;

pub use store::{build_session_store, InMemorySessionStore, PostgresSessionStore, SessionStore};

pub const DEFAULT_HISTORY_LIMIT: usize = 5;

/// What the assistant is waiting for
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PendingState {
    /// Offered to list the catalog; waiting for yes/no
    ListProducts,
    /// Several products matched; waiting for a 1-based choice
    SelectProduct {
        candidates: Vec<Product>,
        command: ParsedCommand,
    },
    /// A financial command lacked its amount
    AskAmount {
        intent: Intent,
        raw_text: String,
        entities: Entities,
    },
    /// A command lacked its subject (product, purchase, reminder). The reply
    /// is read as if it followed `lead`: "repor" + "o anel de prata".
    AskDetail { intent: Intent, lead: String },
    /// Stock entry for a known product lacked its quantity
    AskQuantity {
        command: ParsedCommand,
        product: Product,
    },
    /// A proposal is out; "sim" executes it
    ConfirmAction { confirmation: ConfirmationData },
    /// Card sale: asked whether the processor charged a fee
    FeeQuestion {
        command: ParsedCommand,
        product: Product,
    },
    /// Card sale: asked for the fee percentage
    FeeAmount {
        command: ParsedCommand,
        product: Product,
    },
}

impl PendingState {
    pub fn kind(&self) -> &'static str {
        match self {
            PendingState::ListProducts => "list_products",
            PendingState::SelectProduct { .. } => "select_product",
            PendingState::AskAmount { .. } => "ask_amount",
            PendingState::AskDetail { .. } => "ask_detail",
            PendingState::AskQuantity { .. } => "ask_quantity",
            PendingState::ConfirmAction { .. } => "confirm_action",
            PendingState::FeeQuestion { .. } => "fee_question",
            PendingState::FeeAmount { .. } => "fee_amount",
        }
    }

    /// States a numeric reply can complete
    pub fn accepts_number(&self) -> bool {
        matches!(
            self,
            PendingState::SelectProduct { .. }
                | PendingState::AskAmount { .. }
                | PendingState::AskQuantity { .. }
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationContext {
    pub id: Uuid,
    pub state: PendingState,
    pub created_at: DateTime<Utc>,
}

impl ConversationContext {
    pub fn new(state: PendingState, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            state,
            created_at,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>, ttl_secs: i64) -> bool {
        now - self.created_at > Duration::seconds(ttl_secs)
    }
}

/// How a handler wants the session changed after its turn
#[derive(Debug, Clone, PartialEq)]
pub enum ContextUpdate {
    Keep,
    Set(PendingState),
    Clear,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub user_id: Uuid,
    active: Option<ConversationContext>,
    history: VecDeque<ConversationContext>,
    history_limit: usize,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: Uuid) -> Self {
        Self::with_history_limit(user_id, DEFAULT_HISTORY_LIMIT)
    }

    pub fn with_history_limit(user_id: Uuid, history_limit: usize) -> Self {
        Self {
            user_id,
            active: None,
            history: VecDeque::with_capacity(history_limit),
            history_limit: history_limit.max(1),
            updated_at: Utc::now(),
        }
    }

    /// Active context unless it outlived the TTL
    pub fn active(&self, now: DateTime<Utc>, ttl_secs: i64) -> Option<&ConversationContext> {
        self.active.as_ref().filter(|c| !c.is_expired(now, ttl_secs))
    }

    pub fn has_active(&self, now: DateTime<Utc>, ttl_secs: i64) -> bool {
        self.active(now, ttl_secs).is_some()
    }

    /// Replace the active context; the previous one stays in history
    pub fn set(&mut self, state: PendingState, now: DateTime<Utc>) {
        let context = ConversationContext::new(state, now);
        self.history.push_back(context.clone());
        while self.history.len() > self.history_limit {
            self.history.pop_front();
        }
        self.active = Some(context);
        self.updated_at = now;
    }

    /// Drop the active context after it was answered or cancelled. It is
    /// removed from history too so it cannot be recovered later.
    pub fn clear(&mut self) {
        if let Some(context) = self.active.take() {
            self.history.retain(|c| c.id != context.id);
        }
        self.updated_at = Utc::now();
    }

    /// Step away from the active context without resolving it; it stays in
    /// history so a later reply can still complete it
    pub fn suspend(&mut self) {
        self.active = None;
    }

    /// Forget a specific context (used after a recovered context resolves)
    pub fn forget(&mut self, id: Uuid) {
        self.history.retain(|c| c.id != id);
        if self.active.as_ref().map(|c| c.id == id).unwrap_or(false) {
            self.active = None;
        }
    }

    /// Drop every context holding this confirmation; used when it was
    /// executed through the confirm entry point instead of a "sim" reply
    pub fn settle_confirmation(&mut self, confirmation_id: Uuid) {
        let settled: Vec<Uuid> = self
            .active
            .iter()
            .chain(self.history.iter())
            .filter(|c| match &c.state {
                PendingState::ConfirmAction { confirmation } => {
                    confirmation.confirmation_id == confirmation_id
                }
                _ => false,
            })
            .map(|c| c.id)
            .collect();

        for id in settled {
            self.forget(id);
        }
    }

    /// Most recent non-expired history entry that a numeric reply could
    /// complete, when the active slot holds something else
    pub fn recoverable(&self, now: DateTime<Utc>, ttl_secs: i64) -> Option<&ConversationContext> {
        let active_id = self.active.as_ref().map(|c| c.id);
        self.history
            .iter()
            .rev()
            .filter(|c| Some(c.id) != active_id)
            .find(|c| c.state.accepts_number() && !c.is_expired(now, ttl_secs))
    }

    pub fn history(&self) -> impl DoubleEndedIterator<Item = &ConversationContext> {
        self.history.iter()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn apply(&mut self, update: ContextUpdate, now: DateTime<Utc>) {
        match update {
            ContextUpdate::Keep => {}
            ContextUpdate::Set(state) => self.set(state, now),
            ContextUpdate::Clear => self.clear(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ask_amount() -> PendingState {
        PendingState::AskAmount {
            intent: Intent::RegisterExpense,
            raw_text: "paguei a luz".to_string(),
            entities: Entities::default(),
        }
    }

    #[test]
    fn test_single_active_and_bounded_history() {
        let mut session = Session::new(Uuid::new_v4());
        let now = Utc::now();

        for _ in 0..7 {
            session.set(PendingState::ListProducts, now);
        }
        assert_eq!(session.history_len(), DEFAULT_HISTORY_LIMIT);
        assert_eq!(session.active(now, 600).map(|c| c.state.kind()), Some("list_products"));
    }

    #[test]
    fn test_expired_context_is_ignored() {
        let mut session = Session::new(Uuid::new_v4());
        let then = Utc::now() - Duration::seconds(700);
        session.set(ask_amount(), then);

        assert!(session.active(Utc::now(), 600).is_none());
        assert!(session.recoverable(Utc::now(), 600).is_none());
    }

    #[test]
    fn test_overwritten_context_is_recoverable() {
        let mut session = Session::new(Uuid::new_v4());
        let now = Utc::now();
        session.set(ask_amount(), now);
        session.set(PendingState::ListProducts, now);

        let recovered = session.recoverable(now, 600).unwrap();
        assert_eq!(recovered.state.kind(), "ask_amount");

        let id = recovered.id;
        session.forget(id);
        assert!(session.recoverable(now, 600).is_none());
        assert!(session.active(now, 600).is_some());
    }

    #[test]
    fn test_clear_removes_from_history() {
        let mut session = Session::new(Uuid::new_v4());
        let now = Utc::now();
        session.set(ask_amount(), now);
        session.clear();

        assert!(session.active(now, 600).is_none());
        assert!(session.recoverable(now, 600).is_none());
    }

    #[test]
    fn test_session_roundtrips_through_json() {
        let mut session = Session::new(Uuid::new_v4());
        session.set(ask_amount(), Utc::now());

        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["active"]["state"]["type"], "ask_amount");
        let restored: Session = serde_json::from_value(json).unwrap();
        assert_eq!(restored.history_len(), 1);
    }
}
