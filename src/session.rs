//! ChatSession actor implementation
//!
//! The central actor that owns all session state: stores, login, wallet and
//! the currently open conversation. Front ends talk to it through an mpsc
//! command channel and receive `SessionEvent`s back.

use std::collections::HashSet;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::account::Account;
use crate::auth::{AuthService, KeyValueStore};
use crate::config::Config;
use crate::conversation::Conversation;
use crate::document::{format_document, Document, DocumentKind};
use crate::error::AppError;
use crate::fixtures;
use crate::message::{Message, MessagePriority, MessageStatus, SessionEvent};
use crate::store::{ConversationStore, MessageStore, UserDirectory};
use crate::types::{ConversationId, MessageId, ParticipantId};

/// Commands sent from front ends (and timers) to the ChatSession actor
#[derive(Debug)]
pub enum SessionCommand {
    /// Log in with a CPF or CNPJ
    Login { document: String, kind: DocumentKind },
    /// End the session and forget the login flag
    Logout,
    /// Apply the document mask to partial input
    FormatDocument { raw: String, kind: DocumentKind },
    /// List conversations, optionally filtered
    ListConversations { search: Option<String> },
    /// List users without a conversation
    AvailableUsers,
    /// Create and open a conversation with a directory user
    StartConversation { user_id: ParticipantId },
    /// Open a conversation and mark it read
    OpenConversation { conversation_id: ConversationId },
    /// Close the open conversation
    CloseConversation,
    /// Send a message to the open conversation
    SendMessage {
        content: String,
        priority: MessagePriority,
    },
    /// Search messages of the open conversation
    SearchMessages { term: String },
    /// Show balance and ledger
    BalanceHistory,
    /// Timer: outgoing message reached the recipient
    MarkDelivered {
        login: u64,
        conversation_id: ConversationId,
        message_id: MessageId,
    },
    /// Timer: recipient answers a message
    AutoReply {
        login: u64,
        conversation_id: ConversationId,
        message_id: MessageId,
    },
}

/// Storage handed to a session
pub struct Stores {
    pub conversations: Box<dyn ConversationStore>,
    pub messages: Box<dyn MessageStore>,
    pub users: UserDirectory,
    /// Holds the login flag
    pub login: Box<dyn KeyValueStore>,
}

impl Stores {
    /// Demo seed data with the given login flag storage
    pub fn seeded(login: Box<dyn KeyValueStore>) -> Self {
        Self {
            conversations: Box::new(fixtures::conversations()),
            messages: Box::new(fixtures::messages()),
            users: fixtures::users(),
            login,
        }
    }
}

/// The main ChatSession actor
pub struct ChatSession {
    config: Config,
    conversations: Box<dyn ConversationStore>,
    messages: Box<dyn MessageStore>,
    users: UserDirectory,
    auth: AuthService,
    /// Logged-in account (None before login)
    account: Option<Account>,
    /// Conversation currently shown
    open_conversation: Option<ConversationId>,
    /// Bumped on every login and logout; timers from an older login are dropped
    login_generation: u64,
    /// Command receiver channel
    receiver: mpsc::Receiver<SessionCommand>,
    /// Handle for timers to post back; weak so it does not keep the loop alive
    timers: mpsc::WeakSender<SessionCommand>,
    /// Session → front end events
    events: mpsc::Sender<SessionEvent>,
}

impl ChatSession {
    /// Create a session and the command sender that drives it
    pub fn new(
        config: Config,
        stores: Stores,
        events: mpsc::Sender<SessionEvent>,
    ) -> (mpsc::Sender<SessionCommand>, Self) {
        let (cmd_tx, cmd_rx) = mpsc::channel(config.channel_buffer);

        let session = Self {
            config,
            conversations: stores.conversations,
            messages: stores.messages,
            users: stores.users,
            auth: AuthService::new(stores.login),
            account: None,
            open_conversation: None,
            login_generation: 0,
            receiver: cmd_rx,
            timers: cmd_tx.downgrade(),
            events,
        };

        (cmd_tx, session)
    }

    /// Run the ChatSession event loop
    ///
    /// Restores a persisted login first, then processes commands until
    /// every command sender is dropped.
    pub async fn run(mut self) {
        info!("ChatSession started");

        self.restore_login().await;

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd).await;
        }

        info!("ChatSession shutting down");
    }

    /// Process a single command, reporting business errors as events
    async fn handle_command(&mut self, cmd: SessionCommand) {
        let result = match cmd {
            SessionCommand::Login { document, kind } => self.handle_login(&document, kind).await,
            SessionCommand::Logout => self.handle_logout().await,
            SessionCommand::FormatDocument { raw, kind } => {
                let formatted = format_document(&raw, kind);
                self.emit(SessionEvent::DocumentFormatted { kind, formatted }).await;
                Ok(())
            }
            SessionCommand::ListConversations { search } => {
                self.handle_list_conversations(search.as_deref()).await
            }
            SessionCommand::AvailableUsers => self.handle_available_users().await,
            SessionCommand::StartConversation { user_id } => {
                self.handle_start_conversation(user_id).await
            }
            SessionCommand::OpenConversation { conversation_id } => {
                self.handle_open_conversation(conversation_id).await
            }
            SessionCommand::CloseConversation => self.handle_close_conversation().await,
            SessionCommand::SendMessage { content, priority } => {
                self.handle_send_message(&content, priority).await
            }
            SessionCommand::SearchMessages { term } => self.handle_search_messages(&term).await,
            SessionCommand::BalanceHistory => self.handle_balance_history().await,
            SessionCommand::MarkDelivered {
                login,
                conversation_id,
                message_id,
            } => {
                if !self.timer_is_current(login) {
                    return;
                }
                self.handle_mark_delivered(conversation_id, message_id).await
            }
            SessionCommand::AutoReply {
                login,
                conversation_id,
                message_id,
            } => {
                if !self.timer_is_current(login) {
                    return;
                }
                self.handle_auto_reply(conversation_id, message_id).await
            }
        };

        if let Err(e) = result {
            warn!("Command failed: {}", e);
            self.emit(e.into()).await;
        }
    }

    async fn restore_login(&mut self) {
        match self.auth.restore() {
            Ok(Some(document)) => self.start_account(document).await,
            Ok(None) => debug!("No stored login"),
            Err(e) => warn!("Failed to read stored login: {}", e),
        }
    }

    async fn start_account(&mut self, document: Document) {
        let account = Account::demo(document, &self.config);
        info!(
            "Session for {} ({}), {} plan, balance {}",
            account.name,
            account.document,
            account.plan(),
            account.balance()
        );

        let event = SessionEvent::LoggedIn {
            client_name: account.name.clone(),
            document_kind: account.document.kind(),
            document: account.document.formatted(),
            balance: account.balance(),
        };

        self.account = Some(account);
        self.open_conversation = None;
        self.login_generation += 1;
        self.emit(event).await;
    }

    /// Handle login; a failed login keeps any existing session
    async fn handle_login(&mut self, raw: &str, kind: DocumentKind) -> Result<(), AppError> {
        let document = self.auth.login(raw, kind)?;
        self.start_account(document).await;
        Ok(())
    }

    async fn handle_logout(&mut self) -> Result<(), AppError> {
        self.require_account()?;
        self.auth.logout()?;

        self.account = None;
        self.open_conversation = None;
        self.login_generation += 1;
        info!("Logged out");

        self.emit(SessionEvent::LoggedOut).await;
        Ok(())
    }

    /// Filter by recipient name or any message content
    async fn handle_list_conversations(&mut self, search: Option<&str>) -> Result<(), AppError> {
        self.require_account()?;

        let term = search.map(str::trim).unwrap_or_default();
        let conversations: Vec<Conversation> = if term.is_empty() {
            self.conversations.list()
        } else {
            self.conversations
                .list()
                .into_iter()
                .filter(|c| {
                    c.recipient_matches(term)
                        || self.messages.list(&c.id).iter().any(|m| m.matches(term))
                })
                .collect()
        };

        self.emit(SessionEvent::Conversations { conversations }).await;
        Ok(())
    }

    async fn handle_available_users(&mut self) -> Result<(), AppError> {
        self.require_account()?;

        let taken: HashSet<ParticipantId> = self
            .conversations
            .list()
            .into_iter()
            .map(|c| c.recipient_id)
            .collect();
        let users = self
            .users
            .list()
            .iter()
            .filter(|u| !taken.contains(&u.id))
            .cloned()
            .collect();

        self.emit(SessionEvent::AvailableUsers { users }).await;
        Ok(())
    }

    async fn handle_start_conversation(&mut self, user_id: ParticipantId) -> Result<(), AppError> {
        self.require_account()?;

        let user = self
            .users
            .find(&user_id)
            .cloned()
            .ok_or_else(|| AppError::UnknownUser(user_id.to_string()))?;

        if self
            .conversations
            .list()
            .iter()
            .any(|c| c.recipient_id == user.id)
        {
            return Err(AppError::ConversationExists(user.name));
        }

        // Generate unique conversation id
        let id = loop {
            let id = ConversationId::generate();
            if self.conversations.get(&id).is_none() {
                break id;
            }
        };

        let conversation = Conversation::start(id.clone(), user.id, user.name);
        self.conversations.create(conversation.clone())?;
        self.open_conversation = Some(id.clone());

        info!(
            "Started conversation {} with {}",
            id, conversation.recipient_name
        );

        self.emit(SessionEvent::ConversationStarted { conversation })
            .await;
        Ok(())
    }

    async fn handle_open_conversation(&mut self, id: ConversationId) -> Result<(), AppError> {
        self.require_account()?;

        let mut conversation = self
            .conversations
            .get(&id)
            .ok_or_else(|| AppError::ConversationNotFound(id.to_string()))?;
        conversation.mark_read();
        self.conversations.update(conversation.clone())?;

        let messages = self.messages.list(&id);
        self.open_conversation = Some(id);
        debug!(
            "Opened conversation {} ({} messages)",
            conversation.id,
            messages.len()
        );

        self.emit(SessionEvent::ConversationOpened {
            conversation,
            messages,
        })
        .await;
        Ok(())
    }

    async fn handle_close_conversation(&mut self) -> Result<(), AppError> {
        self.require_account()?;
        self.open_conversation = None;
        self.emit(SessionEvent::ConversationClosed).await;
        Ok(())
    }

    /// Bill, store and schedule delivery of an outgoing message
    async fn handle_send_message(
        &mut self,
        content: &str,
        priority: MessagePriority,
    ) -> Result<(), AppError> {
        self.require_account()?;
        let conversation_id = self.require_open_conversation()?;

        let mut conversation = self
            .conversations
            .get(&conversation_id)
            .ok_or_else(|| AppError::ConversationNotFound(conversation_id.to_string()))?;

        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::EmptyMessage);
        }

        let account = self.account.as_mut().ok_or(AppError::NotLoggedIn)?;
        let entry = account
            .wallet
            .charge(priority, &conversation.recipient_name)?;
        let message = Message::outgoing(
            conversation_id.clone(),
            account.id.clone(),
            content.to_string(),
            priority,
        );

        self.messages.append(message.clone());
        conversation.touch(&message);
        self.conversations.update(conversation)?;

        info!(
            "Sent {:?} message {} in conversation {}, balance {}",
            priority, message.id, conversation_id, entry.balance
        );

        self.schedule(
            self.config.delivery_delay,
            SessionCommand::MarkDelivered {
                login: self.login_generation,
                conversation_id,
                message_id: message.id,
            },
        );

        self.emit(SessionEvent::MessageSent {
            message,
            balance: entry.balance,
        })
        .await;
        Ok(())
    }

    async fn handle_mark_delivered(
        &mut self,
        conversation_id: ConversationId,
        message_id: MessageId,
    ) -> Result<(), AppError> {
        let message =
            self.messages
                .update_status(&conversation_id, message_id, MessageStatus::Delivered)?;
        debug!("Message {} delivered", message.id);

        self.emit(SessionEvent::MessageStatusChanged {
            conversation_id: conversation_id.clone(),
            message_id,
            status: message.status,
        })
        .await;

        // Recipient starts typing the automatic reply
        self.emit(SessionEvent::PartnerTyping {
            conversation_id: conversation_id.clone(),
        })
        .await;

        self.schedule(
            self.config.reply_delay,
            SessionCommand::AutoReply {
                login: self.login_generation,
                conversation_id,
                message_id,
            },
        );
        Ok(())
    }

    /// Deliver the recipient's answer and mark the original message read
    async fn handle_auto_reply(
        &mut self,
        conversation_id: ConversationId,
        message_id: MessageId,
    ) -> Result<(), AppError> {
        let mut conversation = self
            .conversations
            .get(&conversation_id)
            .ok_or_else(|| AppError::ConversationNotFound(conversation_id.to_string()))?;

        let reply = Message::auto_reply(conversation_id.clone(), conversation.recipient_id.clone());
        self.messages.append(reply.clone());

        conversation.touch(&reply);
        if self.open_conversation.as_ref() != Some(&conversation_id) {
            conversation.add_unread();
        }
        self.conversations.update(conversation)?;

        let original =
            self.messages
                .update_status(&conversation_id, message_id, MessageStatus::Read)?;
        debug!(
            "Auto reply in conversation {}: {}",
            conversation_id, reply.content
        );

        self.emit(SessionEvent::PartnerStopTyping {
            conversation_id: conversation_id.clone(),
        })
        .await;
        self.emit(SessionEvent::MessageReceived { message: reply })
            .await;
        self.emit(SessionEvent::MessageStatusChanged {
            conversation_id,
            message_id,
            status: original.status,
        })
        .await;
        Ok(())
    }

    /// Blank term returns the whole conversation
    async fn handle_search_messages(&mut self, term: &str) -> Result<(), AppError> {
        self.require_account()?;
        let conversation_id = self.require_open_conversation()?;

        let term = term.trim();
        let messages = self
            .messages
            .list(&conversation_id)
            .into_iter()
            .filter(|m| term.is_empty() || m.matches(term))
            .collect();

        self.emit(SessionEvent::SearchResults {
            conversation_id,
            term: term.to_string(),
            messages,
        })
        .await;
        Ok(())
    }

    async fn handle_balance_history(&mut self) -> Result<(), AppError> {
        let account = self.require_account()?;
        let event = SessionEvent::BalanceHistory {
            balance: account.balance(),
            entries: account.wallet.history().to_vec(),
        };
        self.emit(event).await;
        Ok(())
    }

    /// Helper: the logged-in account or NotLoggedIn
    fn require_account(&self) -> Result<&Account, AppError> {
        self.account.as_ref().ok_or(AppError::NotLoggedIn)
    }

    /// Helper: the open conversation id or NoConversationOpen
    fn require_open_conversation(&self) -> Result<ConversationId, AppError> {
        self.open_conversation
            .clone()
            .ok_or(AppError::NoConversationOpen)
    }

    /// Helper: whether a timer belongs to the current login
    fn timer_is_current(&self, login: u64) -> bool {
        let current = self.account.is_some() && login == self.login_generation;
        if !current {
            debug!("Dropping timer from an ended login");
        }
        current
    }

    /// Helper: post a command back to this actor after a delay
    fn schedule(&self, delay: Duration, cmd: SessionCommand) {
        let timers = self.timers.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(tx) = timers.upgrade() {
                let _ = tx.send(cmd).await;
            }
        });
    }

    /// Helper: send an event, ignoring a departed front end
    async fn emit(&self, event: SessionEvent) {
        if self.events.send(event).await.is_err() {
            debug!("Event receiver closed, dropping event");
        }
    }
}
