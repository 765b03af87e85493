//! Seed data for the demo
//!
//! Five directory users, three conversations and their opening messages.

use chrono::{DateTime, TimeZone, Utc};

use crate::conversation::Conversation;
use crate::message::{Message, MessagePriority, MessageStatus, SenderKind, SentBy};
use crate::store::{InMemoryConversationStore, InMemoryMessageStore, User, UserDirectory};
use crate::types::{ConversationId, MessageId, ParticipantId};

/// Participant id of the demo client account
pub const CLIENT_ID: &str = "1";

/// Display name of the demo client account
pub const CLIENT_NAME: &str = "Empresa ABC";

fn at(year: i32, month: u32, day: u32, hour: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, min, 0)
        .single()
        .unwrap_or_default()
}

pub fn users() -> UserDirectory {
    let users = [
        ("101", "Maria Oliveira"),
        ("102", "Carlos Pereira"),
        ("103", "Ana Costa"),
        ("104", "João Silva"),
        ("105", "Lucia Santos"),
    ]
    .into_iter()
    .map(|(id, name)| User {
        id: ParticipantId::new(id),
        name: name.to_string(),
    })
    .collect();

    UserDirectory::new(users)
}

pub fn conversations() -> InMemoryConversationStore {
    let seed = [
        ("1", "101", "Maria Oliveira", "Olá, como vai?", at(2025, 4, 17, 9, 30), 0),
        ("2", "102", "Carlos Pereira", "Poderia me ajudar com...", at(2025, 4, 16, 15, 45), 2),
        ("3", "103", "Ana Costa", "Boa tarde, gostaria de...", at(2025, 4, 14, 14, 20), 0),
    ];

    let conversations = seed
        .into_iter()
        .map(|(id, recipient, name, last, time, unread)| Conversation {
            id: ConversationId::from_string(id),
            recipient_id: ParticipantId::new(recipient),
            recipient_name: name.to_string(),
            last_message_content: last.to_string(),
            last_message_time: time,
            unread_count: unread,
        })
        .collect();

    InMemoryConversationStore::with_conversations(conversations)
}

pub fn messages() -> InMemoryMessageStore {
    let seed = [
        (
            "1",
            "101",
            SenderKind::User,
            "Olá, como vai?",
            at(2025, 4, 17, 9, 30),
            MessageStatus::Read,
        ),
        (
            "1",
            CLIENT_ID,
            SenderKind::Client,
            "Tudo bem!",
            at(2025, 4, 17, 9, 32),
            MessageStatus::Delivered,
        ),
        (
            "2",
            "102",
            SenderKind::User,
            "Poderia me ajudar com uma dúvida?",
            at(2025, 4, 16, 15, 45),
            MessageStatus::Read,
        ),
        (
            "3",
            "103",
            SenderKind::User,
            "Boa tarde, gostaria de saber sobre os preços",
            at(2025, 4, 14, 14, 20),
            MessageStatus::Read,
        ),
    ];

    let messages = seed
        .into_iter()
        .map(|(conv, sender, kind, content, time, status)| Message {
            id: MessageId::new(),
            conversation_id: ConversationId::from_string(conv),
            content: content.to_string(),
            sent_by: SentBy {
                id: ParticipantId::new(sender),
                kind,
            },
            timestamp: time,
            priority: MessagePriority::Normal,
            status,
        })
        .collect();

    InMemoryMessageStore::with_messages(messages)
}
