//! Error types for the chat session
//!
//! Defines application-level errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

use crate::billing::Credits;
use crate::document::DocumentKind;

/// Application-level errors
///
/// Covers both fatal errors (storage, internal channels) and
/// business errors (reported back to the console as an error event).
#[derive(Debug, Error)]
pub enum AppError {
    /// JSON serialization/deserialization error
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Channel send error (internal channel broken)
    #[error("Channel send error")]
    ChannelSend,

    /// Document failed check-digit validation
    #[error("Invalid {0}")]
    InvalidDocument(DocumentKind),

    /// Command needs a logged-in account
    #[error("Not logged in")]
    NotLoggedIn,

    /// Command needs an open conversation
    #[error("No conversation open")]
    NoConversationOpen,

    /// Conversation not found with the given id
    #[error("Conversation not found: {0}")]
    ConversationNotFound(String),

    /// A conversation with this id or recipient already exists
    #[error("Conversation already exists: {0}")]
    ConversationExists(String),

    /// Message not found in the conversation
    #[error("Message not found: {0}")]
    MessageNotFound(String),

    /// No directory user with the given id
    #[error("Unknown user: {0}")]
    UnknownUser(String),

    /// Message content is blank
    #[error("Message is empty")]
    EmptyMessage,

    /// Prepaid balance does not cover the message cost
    #[error("Insufficient balance: message costs {required}, balance is {available}")]
    InsufficientBalance { required: Credits, available: Credits },

    /// Console input could not be parsed
    #[error("Invalid command: {0}")]
    InvalidCommand(String),
}
