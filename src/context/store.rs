//! Session persistence between turns
//!
//! The interpreter itself never stores sessions; outer surfaces (the HTTP
//! adapter) load one before a turn and save it afterwards.

use super::Session;
use crate::error::InterpreterError;
use crate::Result;
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{OnceCell, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the user's session, or a fresh one
    async fn load(&self, user_id: Uuid) -> Result<Session>;

    async fn save(&self, session: &Session) -> Result<()>;
}

/// In-memory store (dev / tests)
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, Session>>>,
    history_limit: usize,
}

impl InMemorySessionStore {
    pub fn new(history_limit: usize) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            history_limit,
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new(super::DEFAULT_HISTORY_LIMIT)
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, user_id: Uuid) -> Result<Session> {
        {
            let locked = self.sessions.read().await;
            if let Some(session) = locked.get(&user_id) {
                return Ok(session.clone());
            }
        }

        Ok(Session::with_history_limit(user_id, self.history_limit))
    }

    async fn save(&self, session: &Session) -> Result<()> {
        let mut locked = self.sessions.write().await;
        locked.insert(session.user_id, session.clone());
        Ok(())
    }
}

/// Postgres store: one JSONB document per user
pub struct PostgresSessionStore {
    pool: PgPool,
    schema_ready: Arc<OnceCell<()>>,
    history_limit: usize,
}

impl PostgresSessionStore {
    pub fn new(pool: PgPool, history_limit: usize) -> Self {
        Self {
            pool,
            schema_ready: Arc::new(OnceCell::new()),
            history_limit,
        }
    }

    async fn ensure_schema(&self) -> Result<()> {
        self.schema_ready
            .get_or_try_init(|| async {
                sqlx::query(
                    r#"
                    CREATE TABLE IF NOT EXISTS interpreter_sessions (
                      user_id UUID PRIMARY KEY,
                      state JSONB NOT NULL,
                      updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                    );
                    "#,
                )
                .execute(&self.pool)
                .await?;

                Ok::<(), sqlx::Error>(())
            })
            .await
            .map_err(|e| {
                InterpreterError::SessionError(format!(
                    "Failed to initialize session schema: {}",
                    e
                ))
            })?;

        Ok(())
    }
}

#[async_trait]
impl SessionStore for PostgresSessionStore {
    async fn load(&self, user_id: Uuid) -> Result<Session> {
        self.ensure_schema().await?;

        let row = sqlx::query("SELECT state FROM interpreter_sessions WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                InterpreterError::SessionError(format!("Failed to load session: {}", e))
            })?;

        let Some(row) = row else {
            return Ok(Session::with_history_limit(user_id, self.history_limit));
        };

        let state: serde_json::Value = row.try_get("state")?;
        match serde_json::from_value::<Session>(state) {
            Ok(session) => Ok(session),
            Err(error) => {
                // Stored shape from an older build; start over
                warn!(%user_id, %error, "Discarding unreadable session");
                Ok(Session::with_history_limit(user_id, self.history_limit))
            }
        }
    }

    async fn save(&self, session: &Session) -> Result<()> {
        self.ensure_schema().await?;

        let state = serde_json::to_value(session)?;
        sqlx::query(
            r#"
            INSERT INTO interpreter_sessions (user_id, state, updated_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO UPDATE
              SET state = EXCLUDED.state, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(session.user_id)
        .bind(state)
        .bind(session.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| InterpreterError::SessionError(format!("Failed to save session: {}", e)))?;

        Ok(())
    }
}

/// Postgres when a database URL is configured, in-memory otherwise
pub fn build_session_store(database_url: Option<&str>, history_limit: usize) -> Arc<dyn SessionStore> {
    if let Some(url) = database_url {
        match sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect_lazy(url)
        {
            Ok(pool) => {
                info!("Session store backend: postgres");
                return Arc::new(PostgresSessionStore::new(pool, history_limit));
            }
            Err(error) => {
                warn!(
                    "Failed to initialize postgres session store, falling back to in-memory: {}",
                    error
                );
            }
        }
    }

    info!("Session store backend: in-memory");
    Arc::new(InMemorySessionStore::new(history_limit))
}
