use chrono::{DateTime, Local};
use streambot_shared::{ChatMessage, ChatOptions, ChatRequest, MessageRole};
use tracing::{debug, info, warn};

use crate::error::StreamError;

pub type Clock = Box<dyn Fn() -> DateTime<Local> + Send>;

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    pub created_at: Option<DateTime<Local>>,
    /// First chunk received (assistant only).
    pub started_at: Option<DateTime<Local>>,
    /// Stream settled, whatever the outcome (assistant only).
    pub ended_at: Option<DateTime<Local>>,
}

impl Message {
    fn new(role: MessageRole, content: impl Into<String>, created_at: DateTime<Local>) -> Self {
        Self {
            role,
            content: content.into(),
            created_at: Some(created_at),
            started_at: None,
            ended_at: None,
        }
    }
}

/// Identifies the placeholder a send is filling. Chunks and completions
/// carrying any other ticket are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiveTicket {
    generation: u64,
    index: usize,
}

/// What the caller has to put on the wire for an accepted send.
#[derive(Debug, Clone)]
pub struct Dispatch {
    pub ticket: LiveTicket,
    pub request: ChatRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Sending { ticket: LiveTicket, stopping: bool },
}

/// Owns the conversation and drives a single in-flight send at a time.
pub struct ChatController {
    messages: Vec<Message>,
    phase: Phase,
    error: Option<String>,
    options: ChatOptions,
    generation: u64,
    clock: Clock,
}

impl std::fmt::Debug for ChatController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatController")
            .field("messages", &self.messages.len())
            .field("phase", &self.phase)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl ChatController {
    pub fn new(options: ChatOptions) -> Self {
        Self::with_clock(options, Box::new(Local::now))
    }

    pub fn with_clock(options: ChatOptions, clock: Clock) -> Self {
        Self {
            messages: Vec::new(),
            phase: Phase::Idle,
            error: None,
            options,
            generation: 0,
            clock,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self.phase, Phase::Sending { .. })
    }

    pub fn is_stopping(&self) -> bool {
        matches!(self.phase, Phase::Sending { stopping: true, .. })
    }

    /// Prior turns as the backend sees them. System messages stay local.
    pub fn history(&self) -> Vec<ChatMessage> {
        self.messages
            .iter()
            .filter(|m| m.role != MessageRole::System)
            .map(|m| ChatMessage {
                role: m.role,
                content: m.content.clone(),
            })
            .collect()
    }

    /// Starts a send. Returns `None` while another send is in flight or when
    /// `text` is blank.
    pub fn send(&mut self, text: &str) -> Option<Dispatch> {
        if self.is_streaming() {
            debug!("Send rejected: a response is still streaming");
            return None;
        }
        let text = text.trim();
        if text.is_empty() {
            debug!("Send rejected: empty input");
            return None;
        }

        self.error = None;
        let history = self.history();
        let now = (self.clock)();
        self.messages.push(Message::new(MessageRole::User, text, now));
        self.messages.push(Message::new(MessageRole::Assistant, "", now));

        self.generation += 1;
        let ticket = LiveTicket {
            generation: self.generation,
            index: self.messages.len() - 1,
        };
        self.phase = Phase::Sending {
            ticket,
            stopping: false,
        };
        debug!("Send accepted (generation {})", ticket.generation);

        Some(Dispatch {
            ticket,
            request: ChatRequest {
                message: text.to_string(),
                history,
                options: self.options.clone(),
            },
        })
    }

    /// Appends a streamed chunk to the live placeholder. Returns whether the
    /// chunk was applied.
    pub fn apply_chunk(&mut self, ticket: LiveTicket, chunk: &str) -> bool {
        if !self.is_live(ticket) {
            debug!("Dropping chunk for a send that is no longer live");
            return false;
        }
        let clock = &self.clock;
        let Some(message) = self.messages.get_mut(ticket.index) else {
            debug!("Dropping chunk: live index {} out of range", ticket.index);
            return false;
        };
        message.content.push_str(chunk);
        if message.started_at.is_none() {
            message.started_at = Some(clock());
        }
        true
    }

    /// Settles the send identified by `ticket`. Returns `false` when the
    /// ticket is not the in-flight one.
    pub fn finish(&mut self, ticket: LiveTicket, result: Result<(), StreamError>) -> bool {
        if !self.is_live(ticket) {
            debug!("Ignoring completion for a send that is no longer live");
            return false;
        }
        self.phase = Phase::Idle;

        let now = (self.clock)();
        if let Some(message) = self
            .messages
            .iter_mut()
            .rev()
            .find(|m| m.role == MessageRole::Assistant && m.ended_at.is_none())
        {
            if message.started_at.is_none() {
                message.started_at = message.created_at;
            }
            message.ended_at = Some(now);
        }

        match result {
            Ok(()) => info!("Response complete"),
            Err(err) if err.is_aborted() => info!("Response stopped by user"),
            Err(err) => {
                warn!("Response failed: {}", err);
                self.error = Some(err.user_message());
            }
        }
        true
    }

    /// Marks the in-flight send as stopping. The stream itself settles
    /// through [`ChatController::finish`] once the abort lands.
    pub fn request_stop(&mut self) -> bool {
        match &mut self.phase {
            Phase::Sending { stopping, .. } => {
                *stopping = true;
                true
            }
            Phase::Idle => false,
        }
    }

    /// Forgets the conversation. Not allowed mid-send.
    pub fn clear(&mut self) -> bool {
        if self.is_streaming() {
            return false;
        }
        self.messages.clear();
        self.error = None;
        true
    }

    fn is_live(&self, ticket: LiveTicket) -> bool {
        matches!(self.phase, Phase::Sending { ticket: live, .. } if live == ticket)
    }
}
