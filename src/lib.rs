//! Credit Chat Library
//!
//! A console messaging demo where a company client logs in with a Brazilian
//! taxpayer document (CPF or CNPJ) and pays per message from a credit wallet.
//!
//! # Features
//! - CPF/CNPJ check-digit validation and input masking
//! - Mock login persisted in a small JSON key-value file
//! - Conversation list with search and unread counters
//! - Billed messages (normal and urgent) on prepaid or postpaid plans
//! - Simulated delivery, typing indicator and automatic replies
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `ChatSession` is the central actor owning all session state
//! - The console task turns input lines into `SessionCommand`s and renders
//!   the `SessionEvent`s it gets back
//! - Delivery and reply timers are spawned tasks posting commands to the
//!   same channel, so no locks are needed
//!
//! # Example
//! ```ignore
//! use tokio::io::{stdin, stdout, BufReader};
//! use tokio::sync::mpsc;
//! use credit_chat::{run_console, ChatSession, Config, MemoryKeyValueStore, Stores};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::from_env();
//!     let (event_tx, event_rx) = mpsc::channel(config.channel_buffer);
//!     let stores = Stores::seeded(Box::new(MemoryKeyValueStore::new()));
//!     let (cmd_tx, session) = ChatSession::new(config, stores, event_tx);
//!
//!     tokio::spawn(session.run());
//!     run_console(BufReader::new(stdin()), &mut stdout(), cmd_tx, event_rx)
//!         .await
//!         .unwrap();
//! }
//! ```

pub mod account;
pub mod auth;
pub mod billing;
pub mod config;
pub mod console;
pub mod conversation;
pub mod document;
pub mod error;
pub mod fixtures;
pub mod message;
pub mod session;
pub mod store;
pub mod types;

// Re-export main types for convenience
pub use auth::{AuthService, FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
pub use billing::{Credits, PlanType, Wallet};
pub use config::Config;
pub use console::run_console;
pub use conversation::Conversation;
pub use document::{
    format_document, validate_cnpj, validate_cpf, validate_document, Document, DocumentKind,
};
pub use error::AppError;
pub use message::{ErrorCode, Message, MessagePriority, MessageStatus, SessionEvent};
pub use session::{ChatSession, SessionCommand, Stores};
pub use types::{ConversationId, MessageId, ParticipantId};
