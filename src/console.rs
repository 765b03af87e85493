//! Line-oriented console front end
//!
//! Parses text commands into `SessionCommand`s and renders `SessionEvent`s
//! as readable lines. Reading input and rendering events are multiplexed in
//! one loop so the prompt never blocks incoming events.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::billing::Credits;
use crate::document::DocumentKind;
use crate::error::AppError;
use crate::message::{Message, MessagePriority, SessionEvent};
use crate::session::SessionCommand;
use crate::types::{ConversationId, ParticipantId};

pub const HELP: &str = "\
Commands:
  login <cpf|cnpj> <document>   log in with a CPF or CNPJ
  mask <cpf|cnpj> <digits>      show the formatted document
  logout                        end the session
  list [term]                   list conversations, optionally filtered
  users                         users available for a new conversation
  new <user-id>                 start a conversation
  open <conversation-id>        open a conversation
  back                          close the open conversation
  send <text>                   send a message (0.25)
  urgent <text>                 send an urgent message (0.50)
  search <term>                 search messages in the open conversation
  history                       balance and history
  help                          this text
  quit                          exit";

/// One parsed line of input
#[derive(Debug)]
pub enum ConsoleInput {
    Command(SessionCommand),
    Help,
    Quit,
    Empty,
}

/// Parse a line of user input
pub fn parse_command(line: &str) -> Result<ConsoleInput, AppError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(ConsoleInput::Empty);
    }

    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let cmd = match verb.to_ascii_lowercase().as_str() {
        "help" | "?" => return Ok(ConsoleInput::Help),
        "quit" | "exit" => return Ok(ConsoleInput::Quit),
        "login" => {
            let (kind, document) = kind_and_rest(rest, "login <cpf|cnpj> <document>")?;
            if document.is_empty() {
                return Err(usage("login <cpf|cnpj> <document>"));
            }
            SessionCommand::Login { document, kind }
        }
        "mask" => {
            let (kind, raw) = kind_and_rest(rest, "mask <cpf|cnpj> <digits>")?;
            SessionCommand::FormatDocument { raw, kind }
        }
        "logout" => SessionCommand::Logout,
        "list" => SessionCommand::ListConversations {
            search: (!rest.is_empty()).then(|| rest.to_string()),
        },
        "users" => SessionCommand::AvailableUsers,
        "new" => SessionCommand::StartConversation {
            user_id: ParticipantId::new(required(rest, "new <user-id>")?),
        },
        "open" => SessionCommand::OpenConversation {
            conversation_id: ConversationId::from_string(required(rest, "open <conversation-id>")?),
        },
        "back" => SessionCommand::CloseConversation,
        "send" => SessionCommand::SendMessage {
            content: rest.to_string(),
            priority: MessagePriority::Normal,
        },
        "urgent" => SessionCommand::SendMessage {
            content: rest.to_string(),
            priority: MessagePriority::High,
        },
        "search" => SessionCommand::SearchMessages {
            term: rest.to_string(),
        },
        "history" | "balance" => SessionCommand::BalanceHistory,
        other => {
            return Err(AppError::InvalidCommand(format!(
                "unknown command '{}', type 'help'",
                other
            )))
        }
    };

    Ok(ConsoleInput::Command(cmd))
}

fn usage(text: &str) -> AppError {
    AppError::InvalidCommand(format!("usage: {}", text))
}

fn required<'a>(rest: &'a str, usage_text: &str) -> Result<&'a str, AppError> {
    if rest.is_empty() {
        Err(usage(usage_text))
    } else {
        Ok(rest)
    }
}

fn kind_and_rest(rest: &str, usage_text: &str) -> Result<(DocumentKind, String), AppError> {
    let (kind, value) = match rest.split_once(char::is_whitespace) {
        Some((kind, value)) => (kind, value.trim()),
        None => (rest, ""),
    };
    if kind.is_empty() {
        return Err(usage(usage_text));
    }
    Ok((kind.parse()?, value.to_string()))
}

fn render_message(message: &Message) -> String {
    let time = message.timestamp.format("%Y-%m-%d %H:%M");
    let urgent = match message.priority {
        MessagePriority::High => " [urgent]",
        MessagePriority::Normal => "",
    };
    if message.is_from_client() {
        format!("  {} > {}{} ({})", time, message.content, urgent, message.status)
    } else {
        format!("  {} < {}{}", time, message.content, urgent)
    }
}

fn signed(amount: Credits) -> String {
    if amount > Credits::ZERO {
        format!("+{}", amount)
    } else {
        amount.to_string()
    }
}

/// Render an event as console text; `None` for events with nothing to show
pub fn render(event: &SessionEvent) -> Option<String> {
    let text = match event {
        SessionEvent::LoggedIn {
            client_name,
            document_kind,
            document,
            balance,
        } => format!(
            "Logged in as {} ({} {}), balance {}",
            client_name, document_kind, document, balance
        ),
        SessionEvent::LoggedOut => "Logged out".to_string(),
        SessionEvent::DocumentFormatted { kind, formatted } => format!("{}: {}", kind, formatted),
        SessionEvent::Conversations { conversations } => {
            if conversations.is_empty() {
                return Some("No conversations found".to_string());
            }
            let mut lines = vec!["Conversations:".to_string()];
            for c in conversations {
                let unread = if c.unread_count > 0 {
                    format!(" ({} unread)", c.unread_count)
                } else {
                    String::new()
                };
                lines.push(format!(
                    "  [{}] {}{} - {} ({})",
                    c.id,
                    c.recipient_name,
                    unread,
                    c.last_message_content,
                    c.last_message_time.format("%Y-%m-%d %H:%M")
                ));
            }
            lines.join("\n")
        }
        SessionEvent::AvailableUsers { users } => {
            if users.is_empty() {
                return Some("No users available for new conversations".to_string());
            }
            let mut lines = vec!["Available users:".to_string()];
            lines.extend(users.iter().map(|u| format!("  {} {}", u.id, u.name)));
            lines.join("\n")
        }
        SessionEvent::ConversationStarted { conversation } => format!(
            "Started conversation [{}] with {}",
            conversation.id, conversation.recipient_name
        ),
        SessionEvent::ConversationOpened {
            conversation,
            messages,
        } => {
            let mut lines = vec![format!(
                "--- {} [{}] ---",
                conversation.recipient_name, conversation.id
            )];
            lines.extend(messages.iter().map(render_message));
            lines.join("\n")
        }
        SessionEvent::ConversationClosed => "Conversation closed".to_string(),
        SessionEvent::MessageSent { message, balance } => {
            format!("{}\n  balance {}", render_message(message), balance)
        }
        SessionEvent::MessageReceived { message } => {
            format!("[{}]\n{}", message.conversation_id, render_message(message))
        }
        SessionEvent::MessageStatusChanged {
            conversation_id,
            status,
            ..
        } => format!("[{}] message {}", conversation_id, status),
        SessionEvent::PartnerTyping { conversation_id } => {
            format!("[{}] typing...", conversation_id)
        }
        SessionEvent::PartnerStopTyping { .. } => return None,
        SessionEvent::SearchResults {
            conversation_id,
            term,
            messages,
        } => {
            let mut lines = vec![format!(
                "{} message(s) matching '{}' in [{}]",
                messages.len(),
                term,
                conversation_id
            )];
            lines.extend(messages.iter().map(render_message));
            lines.join("\n")
        }
        SessionEvent::BalanceHistory { balance, entries } => {
            let mut lines = vec![format!("Balance: {}", balance)];
            lines.extend(entries.iter().map(|e| {
                format!(
                    "  {}  {:>8}  {} (balance {})",
                    e.date.format("%Y-%m-%d %H:%M"),
                    signed(e.amount),
                    e.description,
                    e.balance
                )
            }));
            lines.join("\n")
        }
        SessionEvent::Error { message, .. } => format!("error: {}", message),
    };
    Some(text)
}

/// Drive a session from line input, writing rendered events to `output`
///
/// On `quit` or end of input the command sender is dropped and the
/// remaining events are rendered until the session closes its channel, so
/// piped input still gets all of its output. Pending delivery timers do not
/// keep the session alive.
pub async fn run_console<R, W>(
    input: R,
    output: &mut W,
    cmd_tx: mpsc::Sender<SessionCommand>,
    mut events: mpsc::Receiver<SessionEvent>,
) -> Result<(), AppError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    write_line(output, "Type 'help' for commands").await?;

    loop {
        tokio::select! {
            biased;

            event = events.recv() => {
                let Some(event) = event else {
                    debug!("Session closed the event channel");
                    break;
                };
                if let Some(text) = render(&event) {
                    write_line(output, &text).await?;
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    debug!("End of input");
                    break;
                };
                match parse_command(&line) {
                    Ok(ConsoleInput::Command(cmd)) => {
                        if cmd_tx.send(cmd).await.is_err() {
                            return Err(AppError::ChannelSend);
                        }
                    }
                    Ok(ConsoleInput::Help) => write_line(output, HELP).await?,
                    Ok(ConsoleInput::Quit) => {
                        info!("Quit requested");
                        break;
                    }
                    Ok(ConsoleInput::Empty) => {}
                    Err(e) => write_line(output, &format!("error: {}", e)).await?,
                }
            }
        }
    }

    drop(cmd_tx);
    while let Some(event) = events.recv().await {
        if let Some(text) = render(&event) {
            write_line(output, &text).await?;
        }
    }

    output.flush().await?;
    Ok(())
}

async fn write_line<W: AsyncWrite + Unpin>(output: &mut W, text: &str) -> Result<(), AppError> {
    output.write_all(text.as_bytes()).await?;
    output.write_all(b"\n").await?;
    output.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::LedgerEntry;
    use crate::message::ErrorCode;
    use crate::auth::MemoryKeyValueStore;
    use crate::config::Config;
    use crate::session::{ChatSession, Stores};
    use chrono::Utc;
    use std::time::Duration;
    use tokio::io::BufReader;
    use uuid::Uuid;

    fn parse(line: &str) -> SessionCommand {
        match parse_command(line).unwrap() {
            ConsoleInput::Command(cmd) => cmd,
            other => panic!("expected command, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_login() {
        match parse("login CPF 529.982.247-25") {
            SessionCommand::Login { document, kind } => {
                assert_eq!(kind, DocumentKind::Cpf);
                assert_eq!(document, "529.982.247-25");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(parse_command("login cpf").is_err());
        assert!(parse_command("login rg 123").is_err());
    }

    #[test]
    fn test_parse_mask_keeps_spaces() {
        match parse("mask cnpj 11 222 333") {
            SessionCommand::FormatDocument { raw, kind } => {
                assert_eq!(kind, DocumentKind::Cnpj);
                assert_eq!(raw, "11 222 333");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_messages() {
        match parse("send  Olá, tudo bem? ") {
            SessionCommand::SendMessage { content, priority } => {
                assert_eq!(content, "Olá, tudo bem?");
                assert_eq!(priority, MessagePriority::Normal);
            }
            other => panic!("unexpected {:?}", other),
        }
        match parse("URGENT preciso de ajuda") {
            SessionCommand::SendMessage { priority, .. } => {
                assert_eq!(priority, MessagePriority::High)
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_navigation() {
        assert!(matches!(
            parse("list"),
            SessionCommand::ListConversations { search: None }
        ));
        match parse("list maria") {
            SessionCommand::ListConversations { search } => {
                assert_eq!(search.as_deref(), Some("maria"))
            }
            other => panic!("unexpected {:?}", other),
        }
        match parse("open ab12cd") {
            SessionCommand::OpenConversation { conversation_id } => {
                assert_eq!(conversation_id.0, "AB12CD")
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(parse("back"), SessionCommand::CloseConversation));
        assert!(matches!(parse("history"), SessionCommand::BalanceHistory));
        assert!(parse_command("open").is_err());
        assert!(parse_command("new").is_err());
    }

    #[test]
    fn test_parse_meta() {
        assert!(matches!(parse_command("  ").unwrap(), ConsoleInput::Empty));
        assert!(matches!(parse_command("help").unwrap(), ConsoleInput::Help));
        assert!(matches!(parse_command("exit").unwrap(), ConsoleInput::Quit));
        let err = parse_command("dance").unwrap_err();
        assert!(err.to_string().contains("unknown command 'dance'"));
    }

    #[test]
    fn test_render_balance_history() {
        let event = SessionEvent::BalanceHistory {
            balance: Credits(49_975),
            entries: vec![LedgerEntry {
                id: Uuid::new_v4(),
                date: Utc::now(),
                amount: Credits(-25),
                description: "Normal message to Ana Costa".to_string(),
                balance: Credits(49_975),
            }],
        };
        let text = render(&event).unwrap();
        assert!(text.starts_with("Balance: 499.75"));
        assert!(text.contains("-0.25"));
        assert!(text.contains("Normal message to Ana Costa"));
    }

    #[test]
    fn test_render_error_and_silent_events() {
        let event: SessionEvent = AppError::NotLoggedIn.into();
        assert!(matches!(
            event,
            SessionEvent::Error {
                code: ErrorCode::NotLoggedIn,
                ..
            }
        ));
        assert_eq!(render(&event).unwrap(), "error: Not logged in");

        let silent = SessionEvent::PartnerStopTyping {
            conversation_id: ConversationId::from_string("1"),
        };
        assert!(render(&silent).is_none());
    }

    /// Stand-in session: collects commands, closes events once the
    /// command channel is gone
    fn collect_commands(
        mut cmd_rx: mpsc::Receiver<SessionCommand>,
        event_tx: mpsc::Sender<SessionEvent>,
    ) -> tokio::task::JoinHandle<Vec<SessionCommand>> {
        tokio::spawn(async move {
            let mut commands = Vec::new();
            while let Some(cmd) = cmd_rx.recv().await {
                commands.push(cmd);
            }
            drop(event_tx);
            commands
        })
    }

    #[tokio::test]
    async fn test_run_console_forwards_and_renders() {
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let (event_tx, event_rx) = mpsc::channel(8);

        event_tx.send(SessionEvent::LoggedOut).await.unwrap();
        let session = collect_commands(cmd_rx, event_tx);

        let input = BufReader::new(&b"list ana\nbogus\n\nhelp\n"[..]);
        let mut output: Vec<u8> = Vec::new();

        run_console(input, &mut output, cmd_tx, event_rx)
            .await
            .unwrap();

        let commands = session.await.unwrap();
        assert_eq!(commands.len(), 1);
        match &commands[0] {
            SessionCommand::ListConversations { search } => {
                assert_eq!(search.as_deref(), Some("ana"))
            }
            other => panic!("unexpected {:?}", other),
        }

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("Logged out"));
        assert!(text.contains("error: Invalid command: unknown command 'bogus'"));
        assert!(text.contains("Commands:"));
    }

    #[tokio::test]
    async fn test_run_console_stops_on_quit() {
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let (event_tx, event_rx) = mpsc::channel(8);
        let session = collect_commands(cmd_rx, event_tx);

        let input = BufReader::new(&b"quit\nlogout\n"[..]);
        let mut output: Vec<u8> = Vec::new();

        run_console(input, &mut output, cmd_tx, event_rx)
            .await
            .unwrap();

        // Nothing after quit is forwarded
        assert!(session.await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_piped_input_renders_every_event() {
        let config = Config {
            delivery_delay: Duration::from_millis(10),
            reply_delay: Duration::from_millis(10),
            ..Config::default()
        };
        let (event_tx, event_rx) = mpsc::channel(config.channel_buffer);
        let stores = Stores::seeded(Box::new(MemoryKeyValueStore::new()));
        let (cmd_tx, session) = ChatSession::new(config, stores, event_tx);
        let session = tokio::spawn(session.run());

        let input = BufReader::new(&b"login cpf 52998224725\nlist\nopen 1\nsend Oi\nhistory\n"[..]);
        let mut output: Vec<u8> = Vec::new();

        tokio::time::timeout(
            Duration::from_secs(2),
            run_console(input, &mut output, cmd_tx, event_rx),
        )
        .await
        .expect("console did not finish")
        .unwrap();
        session.await.unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("Logged in as Empresa ABC (CPF 529.982.247-25), balance 500.00"));
        assert!(text.contains("Conversations:"));
        assert!(text.contains("[3] Ana Costa"));
        assert!(text.contains("--- Maria Oliveira [1] ---"));
        assert!(text.contains("> Oi (sent)"));
        assert!(text.contains("Balance: 499.75"));
        assert!(text.contains("Normal message to Maria Oliveira"));
    }
}
