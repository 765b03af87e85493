//! Conversation struct definition
//!
//! A 1:1 conversation between the client account and one directory user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::message::Message;
use crate::types::{ConversationId, ParticipantId};

/// Conversation summary as shown in the list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub recipient_id: ParticipantId,
    pub recipient_name: String,
    pub last_message_content: String,
    pub last_message_time: DateTime<Utc>,
    pub unread_count: u32,
}

impl Conversation {
    /// Start a new, empty conversation with a recipient
    pub fn start(id: ConversationId, recipient_id: ParticipantId, recipient_name: String) -> Self {
        Self {
            id,
            recipient_id,
            recipient_name,
            last_message_content: "New conversation started".to_string(),
            last_message_time: Utc::now(),
            unread_count: 0,
        }
    }

    /// Record a message as the latest in this conversation
    pub fn touch(&mut self, message: &Message) {
        self.last_message_content = message.content.clone();
        self.last_message_time = message.timestamp;
    }

    pub fn mark_read(&mut self) {
        self.unread_count = 0;
    }

    pub fn add_unread(&mut self) {
        self.unread_count += 1;
    }

    /// Case-insensitive match on the recipient name
    pub fn recipient_matches(&self, term: &str) -> bool {
        self.recipient_name.to_lowercase().contains(&term.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessagePriority;

    fn conversation() -> Conversation {
        Conversation::start(
            ConversationId::from_string("1"),
            ParticipantId::new("101"),
            "Maria Oliveira".to_string(),
        )
    }

    #[test]
    fn test_conversation_start() {
        let conv = conversation();
        assert_eq!(conv.last_message_content, "New conversation started");
        assert_eq!(conv.unread_count, 0);
    }

    #[test]
    fn test_conversation_touch() {
        let mut conv = conversation();
        let msg = Message::outgoing(
            conv.id.clone(),
            ParticipantId::new("1"),
            "Olá".to_string(),
            MessagePriority::Normal,
        );
        conv.touch(&msg);
        assert_eq!(conv.last_message_content, "Olá");
        assert_eq!(conv.last_message_time, msg.timestamp);
    }

    #[test]
    fn test_conversation_unread() {
        let mut conv = conversation();
        conv.add_unread();
        conv.add_unread();
        assert_eq!(conv.unread_count, 2);
        conv.mark_read();
        assert_eq!(conv.unread_count, 0);
    }

    #[test]
    fn test_recipient_matches() {
        let conv = conversation();
        assert!(conv.recipient_matches("maria"));
        assert!(conv.recipient_matches("OLIV"));
        assert!(!conv.recipient_matches("carlos"));
    }
}
