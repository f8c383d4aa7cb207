use chrono::{DateTime, Local};

use crate::controller::{EventSink, QueryState};

/// Rendering category for an entry in the trace pane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    Info,
    Success,
    Error,
    Warning,
    Thinking,
    Action,
    Observation,
}

impl LogKind {
    pub fn rgb(self) -> [u8; 3] {
        match self {
            LogKind::Info => [0x34, 0x98, 0xdb],
            LogKind::Success => [0x27, 0xae, 0x60],
            LogKind::Error => [0xe7, 0x4c, 0x3c],
            LogKind::Warning => [0xf3, 0x9c, 0x12],
            LogKind::Thinking => [0x9b, 0x59, 0xb6],
            LogKind::Action => [0xe6, 0x7e, 0x22],
            LogKind::Observation => [0x16, 0xa0, 0x85],
        }
    }
}

pub const TIMESTAMP_RGB: [u8; 3] = [0x95, 0xa5, 0xa6];

pub fn clock(ts: &DateTime<Local>) -> String {
    ts.format("%H:%M:%S").to_string()
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub kind: LogKind,
    pub message: String,
}

impl LogEntry {
    pub fn new(kind: LogKind, message: impl Into<String>) -> Self {
        LogEntry {
            timestamp: Local::now(),
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Agent,
    System,
}

#[derive(Debug, Clone)]
pub struct ConversationEntry {
    pub timestamp: DateTime<Local>,
    pub speaker: Speaker,
    pub text: String,
}

impl ConversationEntry {
    pub fn new(speaker: Speaker, text: impl Into<String>) -> Self {
        ConversationEntry {
            timestamp: Local::now(),
            speaker,
            text: text.into(),
        }
    }

    /// Text with the speaker badge, as shown in the conversation pane.
    pub fn display(&self) -> String {
        match self.speaker {
            Speaker::User => format!("👤 You: {}", self.text),
            Speaker::Agent => format!("🤖 Agent: {}", self.text),
            Speaker::System => format!("❌ Error: {}", self.text),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertLevel {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub level: AlertLevel,
    pub title: String,
    pub message: String,
}

impl Alert {
    pub fn warning(message: impl Into<String>) -> Self {
        Alert {
            level: AlertLevel::Warning,
            title: "Warning".to_string(),
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Alert {
            level: AlertLevel::Error,
            title: "Error".to_string(),
            message: message.into(),
        }
    }
}

/// Append-only list of entries.
///
/// `clear_view` hides everything appended so far without dropping it.
#[derive(Debug, Clone)]
pub struct Transcript<T> {
    entries: Vec<T>,
    visible_from: usize,
}

impl<T> Default for Transcript<T> {
    fn default() -> Self {
        Transcript {
            entries: Vec::new(),
            visible_from: 0,
        }
    }
}

impl<T> Transcript<T> {
    pub fn push(&mut self, entry: T) {
        self.entries.push(entry);
    }

    pub fn visible(&self) -> &[T] {
        &self.entries[self.visible_from..]
    }

    pub fn all(&self) -> &[T] {
        &self.entries
    }

    pub fn clear_view(&mut self) {
        self.visible_from = self.entries.len();
    }
}

/// GUI model behind the two panes.
#[derive(Debug, Default)]
pub struct Panes {
    pub steps: Transcript<LogEntry>,
    pub conversation: Transcript<ConversationEntry>,
    pub alert: Option<Alert>,
    pub state: QueryState,
}

impl Panes {
    pub fn dismiss_alert(&mut self) {
        self.alert = None;
    }

    pub fn last_answer(&self) -> Option<&ConversationEntry> {
        self.conversation
            .visible()
            .iter()
            .rev()
            .find(|entry| entry.speaker == Speaker::Agent)
    }
}

impl EventSink for Panes {
    fn log(&mut self, entry: LogEntry) {
        self.steps.push(entry);
    }

    fn converse(&mut self, entry: ConversationEntry) {
        self.conversation.push(entry);
    }

    fn alert(&mut self, alert: Alert) {
        self.alert = Some(alert);
    }

    fn state_changed(&mut self, state: QueryState) {
        self.state = state;
    }

    fn clear(&mut self) {
        self.steps.clear_view();
        self.conversation.clear_view();
        tracing::debug!(
            steps = self.steps.all().len(),
            conversation = self.conversation.all().len(),
            "panes cleared, entries kept"
        );
    }
}
