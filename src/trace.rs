//! Classification of the agent's line-oriented reasoning trace.

use crate::transcript::LogKind;

/// Category of one trace line, decided by its leading prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Thought,
    Action,
    ActionInput,
    Observation,
    FinalAnswer,
    Unclassified,
}

// Checked in order; the first prefix that matches wins.
const PREFIXES: [(&str, EventKind); 5] = [
    ("Thought:", EventKind::Thought),
    ("Action:", EventKind::Action),
    ("Action Input:", EventKind::ActionInput),
    ("Observation:", EventKind::Observation),
    ("Final Answer:", EventKind::FinalAnswer),
];

impl EventKind {
    pub fn classify(line: &str) -> Self {
        PREFIXES
            .iter()
            .find(|(prefix, _)| line.starts_with(*prefix))
            .map(|(_, kind)| *kind)
            .unwrap_or(EventKind::Unclassified)
    }

    pub fn icon(self) -> &'static str {
        match self {
            EventKind::Thought => "🧠",
            EventKind::Action => "⚡",
            EventKind::ActionInput => "📝",
            EventKind::Observation => "👁️",
            EventKind::FinalAnswer => "✅",
            EventKind::Unclassified => "",
        }
    }

    pub fn log_kind(self) -> LogKind {
        match self {
            EventKind::Thought => LogKind::Thinking,
            EventKind::Action | EventKind::ActionInput => LogKind::Action,
            EventKind::Observation => LogKind::Observation,
            EventKind::FinalAnswer => LogKind::Success,
            EventKind::Unclassified => LogKind::Info,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceLine {
    pub kind: EventKind,
    /// Trimmed line content, prefix included.
    pub text: String,
}

impl TraceLine {
    /// Text as shown in the trace pane.
    pub fn display(&self) -> String {
        format!("{} {}", self.kind.icon(), self.text)
    }
}

/// Lazily classifies `output` line by line.
///
/// Blank and unclassified lines are skipped, so the iterator never yields
/// more items than `output` has non-blank lines.
pub fn parse_trace(output: &str) -> impl Iterator<Item = TraceLine> + '_ {
    output
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| match EventKind::classify(line) {
            EventKind::Unclassified => None,
            kind => Some(TraceLine {
                kind,
                text: line.to_string(),
            }),
        })
}
