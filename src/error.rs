//! Error types for the command interpreter

use thiserror::Error;

/// Result type alias for interpreter operations
pub type Result<T> = std::result::Result<T, InterpreterError>;

#[derive(Error, Debug)]
pub enum InterpreterError {

    // =============================
    // Core Pipeline Errors
    // =============================

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Handler error: {0}")]
    HandlerError(String),

    #[error("Handler not found for intent: {0}")]
    HandlerNotFound(String),

    #[error("Execution error: {0}")]
    ExecutionError(String),

    #[error("Estoque insuficiente para {product}: disponível {available}, solicitado {requested}")]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Confirmation integrity check failed: {0}")]
    ConfirmationTampered(String),

    #[error("Confirmation already executed: {0}")]
    ConfirmationReplayed(String),

    #[error("Confirmation expired: {0}")]
    ConfirmationExpired(String),

    #[error("Ledger store error: {0}")]
    StoreError(String),

    #[error("Session store error: {0}")]
    SessionError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("UUID parse error: {0}")]
    UuidError(#[from] uuid::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
