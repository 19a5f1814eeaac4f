//! Bookkeeping Command Interpreter
//!
//! Turns short Portuguese chat messages from a small-business owner into
//! structured bookkeeping commands:
//! - Sales, expenses and income, paid now, scheduled, in installments or recurring
//! - Stock entries, stock and catalog queries
//! - Period reports and reminders
//!
//! Nothing is written to the ledger until the user confirms a signed proposal.
//!
//! TURN LOOP:
//! UTTERANCE → PENDING CONTEXT? → CLASSIFY → EXTRACT → VALIDATE → HANDLE → RESPOND
//! CONFIRM → VERIFY → EXECUTE
#![recursion_limit = "256"]

pub mod api;
pub mod audit;
pub mod classifier;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod execution;
pub mod extraction;
pub mod handlers;
pub mod matcher;
pub mod models;
pub mod patterns;
pub mod store;
pub mod validation;

pub use error::{InterpreterError, Result};

// Re-export common types
pub use classifier::IntentClassifier;
pub use context::Session;
pub use dispatcher::Interpreter;
pub use models::*;
