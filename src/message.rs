//! Chat messages and session events
//!
//! `Message` is the stored chat message. `SessionEvent` is everything the
//! session reports back to its front end, as a Serde tagged enum so it can
//! also be dumped as JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::billing::{Credits, LedgerEntry};
use crate::conversation::Conversation;
use crate::document::DocumentKind;
use crate::error::AppError;
use crate::store::User;
use crate::types::{ConversationId, MessageId, ParticipantId};

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderKind {
    /// The logged-in client account
    Client,
    /// A directory user on the other end of a conversation
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentBy {
    pub id: ParticipantId,
    #[serde(rename = "type")]
    pub kind: SenderKind,
}

/// Delivery state of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Queued,
    Processing,
    Sent,
    Delivered,
    Read,
    Failed,
}

impl std::fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            MessageStatus::Queued => "queued",
            MessageStatus::Processing => "processing",
            MessageStatus::Sent => "sent",
            MessageStatus::Delivered => "delivered",
            MessageStatus::Read => "read",
            MessageStatus::Failed => "failed",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessagePriority {
    #[default]
    Normal,
    /// Urgent message, billed at a higher rate
    High,
}

/// A chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub content: String,
    pub sent_by: SentBy,
    pub timestamp: DateTime<Utc>,
    pub priority: MessagePriority,
    pub status: MessageStatus,
}

impl Message {
    /// New outgoing message from the client, status `Sent`
    pub fn outgoing(
        conversation_id: ConversationId,
        client_id: ParticipantId,
        content: String,
        priority: MessagePriority,
    ) -> Self {
        Self {
            id: MessageId::new(),
            conversation_id,
            content,
            sent_by: SentBy {
                id: client_id,
                kind: SenderKind::Client,
            },
            timestamp: Utc::now(),
            priority,
            status: MessageStatus::Sent,
        }
    }

    /// Simulated answer from the recipient: "Automatic reply: N", N in 1..=10
    pub fn auto_reply(conversation_id: ConversationId, recipient_id: ParticipantId) -> Self {
        use rand::Rng;
        let n: u32 = rand::thread_rng().gen_range(1..=10);
        Self {
            id: MessageId::new(),
            conversation_id,
            content: format!("Automatic reply: {}", n),
            sent_by: SentBy {
                id: recipient_id,
                kind: SenderKind::User,
            },
            timestamp: Utc::now(),
            priority: MessagePriority::Normal,
            status: MessageStatus::Sent,
        }
    }

    pub fn is_from_client(&self) -> bool {
        self.sent_by.kind == SenderKind::Client
    }

    /// Case-insensitive substring match on the content
    pub fn matches(&self, term: &str) -> bool {
        self.content.to_lowercase().contains(&term.to_lowercase())
    }
}

/// Session → front end event
///
/// All events the session emits. Uses tagged enum with snake_case naming.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Login accepted
    LoggedIn {
        client_name: String,
        document_kind: DocumentKind,
        document: String,
        balance: Credits,
    },
    /// Session ended
    LoggedOut,
    /// Live input mask result
    DocumentFormatted { kind: DocumentKind, formatted: String },
    /// Conversation list, optionally filtered
    Conversations { conversations: Vec<Conversation> },
    /// Users without a conversation yet
    AvailableUsers { users: Vec<User> },
    /// New conversation created and opened
    ConversationStarted { conversation: Conversation },
    /// Conversation opened with its full history
    ConversationOpened {
        conversation: Conversation,
        messages: Vec<Message>,
    },
    /// Open conversation closed
    ConversationClosed,
    /// Outgoing message accepted and billed
    MessageSent { message: Message, balance: Credits },
    /// Incoming message
    MessageReceived { message: Message },
    /// Delivery state changed
    MessageStatusChanged {
        conversation_id: ConversationId,
        message_id: MessageId,
        status: MessageStatus,
    },
    /// Recipient is typing
    PartnerTyping { conversation_id: ConversationId },
    /// Recipient stopped typing
    PartnerStopTyping { conversation_id: ConversationId },
    /// Message search within the open conversation
    SearchResults {
        conversation_id: ConversationId,
        term: String,
        messages: Vec<Message>,
    },
    /// Balance and ledger, newest first
    BalanceHistory {
        balance: Credits,
        entries: Vec<LedgerEntry>,
    },
    /// Error occurred
    Error { code: ErrorCode, message: String },
}

/// Error codes for SessionEvent::Error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidDocument,
    NotLoggedIn,
    NoConversationOpen,
    ConversationNotFound,
    ConversationExists,
    MessageNotFound,
    UnknownUser,
    EmptyMessage,
    InsufficientBalance,
    InvalidCommand,
    Internal,
}

/// Convert AppError to SessionEvent for front end notification
impl From<AppError> for SessionEvent {
    fn from(err: AppError) -> Self {
        let code = match &err {
            AppError::InvalidDocument(_) => ErrorCode::InvalidDocument,
            AppError::NotLoggedIn => ErrorCode::NotLoggedIn,
            AppError::NoConversationOpen => ErrorCode::NoConversationOpen,
            AppError::ConversationNotFound(_) => ErrorCode::ConversationNotFound,
            AppError::ConversationExists(_) => ErrorCode::ConversationExists,
            AppError::MessageNotFound(_) => ErrorCode::MessageNotFound,
            AppError::UnknownUser(_) => ErrorCode::UnknownUser,
            AppError::EmptyMessage => ErrorCode::EmptyMessage,
            AppError::InsufficientBalance { .. } => ErrorCode::InsufficientBalance,
            AppError::InvalidCommand(_) => ErrorCode::InvalidCommand,
            AppError::Json(_) | AppError::Io(_) | AppError::ChannelSend => ErrorCode::Internal,
        };
        SessionEvent::Error {
            code,
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outgoing_message() {
        let msg = Message::outgoing(
            ConversationId::from_string("1"),
            ParticipantId::new("1"),
            "Hello".to_string(),
            MessagePriority::High,
        );
        assert!(msg.is_from_client());
        assert_eq!(msg.status, MessageStatus::Sent);
        assert_eq!(msg.priority, MessagePriority::High);
    }

    #[test]
    fn test_auto_reply_content() {
        for _ in 0..50 {
            let msg =
                Message::auto_reply(ConversationId::from_string("1"), ParticipantId::new("101"));
            assert!(!msg.is_from_client());
            let n: u32 = msg
                .content
                .strip_prefix("Automatic reply: ")
                .unwrap()
                .parse()
                .unwrap();
            assert!((1..=10).contains(&n));
        }
    }

    #[test]
    fn test_message_matches_case_insensitive() {
        let msg = Message::outgoing(
            ConversationId::from_string("1"),
            ParticipantId::new("1"),
            "Boa tarde, gostaria de saber".to_string(),
            MessagePriority::Normal,
        );
        assert!(msg.matches("GOSTARIA"));
        assert!(!msg.matches("preço"));
    }

    #[test]
    fn test_message_serialize() {
        let msg = Message::outgoing(
            ConversationId::from_string("2"),
            ParticipantId::new("1"),
            "Hi".to_string(),
            MessagePriority::Normal,
        );
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"conversation_id\":\"2\""));
        assert!(json.contains("\"type\":\"client\""));
        assert!(json.contains("\"status\":\"sent\""));
    }

    #[test]
    fn test_error_event_serialize() {
        let event: SessionEvent = AppError::InvalidDocument(DocumentKind::Cpf).into();
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"error\""));
        assert!(json.contains("\"code\":\"invalid_document\""));
        assert!(json.contains("Invalid CPF"));
    }
}
