//! Conversation and message storage
//!
//! Trait-based stores injected into the session, so the session never
//! mutates global data and tests can hand it whatever state they need.
//! The in-memory implementations are what the demo runs on.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::conversation::Conversation;
use crate::error::AppError;
use crate::message::{Message, MessageStatus};
use crate::types::{ConversationId, MessageId, ParticipantId};

/// Storage for conversation summaries
pub trait ConversationStore: Send + Sync {
    /// All conversations in creation order
    fn list(&self) -> Vec<Conversation>;

    /// Look up a conversation by id
    fn get(&self, id: &ConversationId) -> Option<Conversation>;

    /// Insert a new conversation; fails if the id is taken
    fn create(&mut self, conversation: Conversation) -> Result<(), AppError>;

    /// Replace an existing conversation
    fn update(&mut self, conversation: Conversation) -> Result<(), AppError>;
}

/// Storage for the messages of each conversation
pub trait MessageStore: Send + Sync {
    /// Messages of a conversation in chronological order
    fn list(&self, conversation_id: &ConversationId) -> Vec<Message>;

    /// Append a message to its conversation
    fn append(&mut self, message: Message);

    /// Change the status of a stored message, returning the updated copy
    fn update_status(
        &mut self,
        conversation_id: &ConversationId,
        message_id: MessageId,
        status: MessageStatus,
    ) -> Result<Message, AppError>;
}

/// In-memory conversation store
#[derive(Debug, Default)]
pub struct InMemoryConversationStore {
    conversations: Vec<Conversation>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_conversations(conversations: Vec<Conversation>) -> Self {
        Self { conversations }
    }
}

impl ConversationStore for InMemoryConversationStore {
    fn list(&self) -> Vec<Conversation> {
        self.conversations.clone()
    }

    fn get(&self, id: &ConversationId) -> Option<Conversation> {
        self.conversations.iter().find(|c| &c.id == id).cloned()
    }

    fn create(&mut self, conversation: Conversation) -> Result<(), AppError> {
        if self.conversations.iter().any(|c| c.id == conversation.id) {
            return Err(AppError::ConversationExists(conversation.id.to_string()));
        }
        self.conversations.push(conversation);
        Ok(())
    }

    fn update(&mut self, conversation: Conversation) -> Result<(), AppError> {
        let slot = self
            .conversations
            .iter_mut()
            .find(|c| c.id == conversation.id)
            .ok_or_else(|| AppError::ConversationNotFound(conversation.id.to_string()))?;
        *slot = conversation;
        Ok(())
    }
}

/// In-memory message store keyed by conversation
#[derive(Debug, Default)]
pub struct InMemoryMessageStore {
    messages: HashMap<ConversationId, Vec<Message>>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_messages(messages: Vec<Message>) -> Self {
        let mut store = Self::new();
        for message in messages {
            store.append(message);
        }
        store
    }
}

impl MessageStore for InMemoryMessageStore {
    fn list(&self, conversation_id: &ConversationId) -> Vec<Message> {
        self.messages
            .get(conversation_id)
            .cloned()
            .unwrap_or_default()
    }

    fn append(&mut self, message: Message) {
        self.messages
            .entry(message.conversation_id.clone())
            .or_default()
            .push(message);
    }

    fn update_status(
        &mut self,
        conversation_id: &ConversationId,
        message_id: MessageId,
        status: MessageStatus,
    ) -> Result<Message, AppError> {
        let message = self
            .messages
            .get_mut(conversation_id)
            .and_then(|msgs| msgs.iter_mut().find(|m| m.id == message_id))
            .ok_or_else(|| AppError::MessageNotFound(message_id.to_string()))?;
        message.status = status;
        Ok(message.clone())
    }
}

/// A person the client can talk to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: ParticipantId,
    pub name: String,
}

/// Read-only list of known users
#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
    users: Vec<User>,
}

impl UserDirectory {
    pub fn new(users: Vec<User>) -> Self {
        Self { users }
    }

    pub fn list(&self) -> &[User] {
        &self.users
    }

    pub fn find(&self, id: &ParticipantId) -> Option<&User> {
        self.users.iter().find(|u| &u.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessagePriority;

    fn conversation(id: &str, name: &str) -> Conversation {
        Conversation::start(
            ConversationId::from_string(id),
            ParticipantId::new("101"),
            name.to_string(),
        )
    }

    fn message(conv: &str, content: &str) -> Message {
        Message::outgoing(
            ConversationId::from_string(conv),
            ParticipantId::new("1"),
            content.to_string(),
            MessagePriority::Normal,
        )
    }

    #[test]
    fn test_conversation_create_and_get() {
        let mut store = InMemoryConversationStore::new();
        store.create(conversation("1", "Maria")).unwrap();
        store.create(conversation("2", "Carlos")).unwrap();

        let ids: Vec<String> = store.list().into_iter().map(|c| c.id.0).collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert_eq!(
            store.get(&ConversationId::from_string("2")).unwrap().recipient_name,
            "Carlos"
        );
        assert!(store.get(&ConversationId::from_string("9")).is_none());
    }

    #[test]
    fn test_conversation_duplicate_id() {
        let mut store = InMemoryConversationStore::new();
        store.create(conversation("1", "Maria")).unwrap();
        let err = store.create(conversation("1", "Other")).unwrap_err();
        assert!(matches!(err, AppError::ConversationExists(_)));
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn test_conversation_update() {
        let mut store = InMemoryConversationStore::new();
        store.create(conversation("1", "Maria")).unwrap();

        let mut conv = store.get(&ConversationId::from_string("1")).unwrap();
        conv.add_unread();
        store.update(conv).unwrap();
        assert_eq!(
            store.get(&ConversationId::from_string("1")).unwrap().unread_count,
            1
        );

        let err = store.update(conversation("7", "Nobody")).unwrap_err();
        assert!(matches!(err, AppError::ConversationNotFound(_)));
    }

    #[test]
    fn test_message_append_and_list() {
        let mut store = InMemoryMessageStore::new();
        store.append(message("1", "first"));
        store.append(message("1", "second"));
        store.append(message("2", "other"));

        let contents: Vec<String> = store
            .list(&ConversationId::from_string("1"))
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, vec!["first", "second"]);
        assert!(store.list(&ConversationId::from_string("3")).is_empty());
    }

    #[test]
    fn test_message_update_status() {
        let msg = message("1", "hello");
        let id = msg.id;
        let mut store = InMemoryMessageStore::with_messages(vec![msg]);
        let conv = ConversationId::from_string("1");

        let updated = store
            .update_status(&conv, id, MessageStatus::Delivered)
            .unwrap();
        assert_eq!(updated.status, MessageStatus::Delivered);
        assert_eq!(store.list(&conv)[0].status, MessageStatus::Delivered);

        let err = store
            .update_status(&conv, MessageId::new(), MessageStatus::Read)
            .unwrap_err();
        assert!(matches!(err, AppError::MessageNotFound(_)));
    }

    #[test]
    fn test_user_directory() {
        let dir = UserDirectory::new(vec![User {
            id: ParticipantId::new("101"),
            name: "Maria Oliveira".to_string(),
        }]);
        assert_eq!(dir.list().len(), 1);
        assert!(dir.find(&ParticipantId::new("101")).is_some());
        assert!(dir.find(&ParticipantId::new("999")).is_none());
    }
}
