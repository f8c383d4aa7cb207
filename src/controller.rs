//! Query lifecycle: one query in flight at a time, results applied in order.
//!
//! The controller never awaits anything itself. `submit` hands back a
//! [`PendingQuery`] for the caller to run off the UI thread, and the
//! [`QueryOutcome`] it produces is applied with `finish` back on the UI
//! thread. All presentation goes through an [`EventSink`].

use std::fmt;
use std::sync::Arc;

use crate::agent::{Agent, AgentOutput};
use crate::error::Error;
use crate::trace::parse_trace;
use crate::transcript::{Alert, ConversationEntry, LogEntry, LogKind, Speaker};

const RAW_RESPONSE_PREVIEW_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QueryState {
    #[default]
    Idle,
    InFlight,
    Completed,
    Failed,
}

/// Receives everything the controller wants shown, in order.
///
/// Implementations append what they are given and never reorder or drop it.
pub trait EventSink {
    fn log(&mut self, entry: LogEntry);
    fn converse(&mut self, entry: ConversationEntry);
    fn alert(&mut self, alert: Alert);
    fn state_changed(&mut self, _state: QueryState) {}
    fn clear(&mut self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitError {
    EmptyQuery,
    AgentNotReady,
    Busy,
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitError::EmptyQuery => write!(f, "Please enter a question!"),
            SubmitError::AgentNotReady => write!(f, "Agent not initialized!"),
            SubmitError::Busy => write!(f, "A query is already being processed!"),
        }
    }
}

impl SubmitError {
    fn alert(self) -> Alert {
        match self {
            SubmitError::AgentNotReady => Alert::error(self.to_string()),
            SubmitError::EmptyQuery | SubmitError::Busy => Alert::warning(self.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub enum QueryOutcome {
    Completed(AgentOutput),
    Failed(String),
}

/// An accepted query, ready to run on a background task.
pub struct PendingQuery {
    query: String,
    agent: Arc<dyn Agent>,
}

impl fmt::Debug for PendingQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingQuery").field("query", &self.query).finish()
    }
}

impl PendingQuery {
    pub fn query(&self) -> &str {
        &self.query
    }

    pub async fn run(self) -> QueryOutcome {
        tracing::debug!(query = %self.query(), "invoking agent");
        match self.agent.invoke(&self.query).await {
            Ok(output) => QueryOutcome::Completed(output),
            Err(e) => {
                tracing::error!(error = %e, "query failed");
                QueryOutcome::Failed(e.to_string())
            }
        }
    }
}

#[derive(Default)]
pub struct QueryController {
    state: QueryState,
    agent: Option<Arc<dyn Agent>>,
    init_failed: bool,
}

impl QueryController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> QueryState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.agent.is_some()
    }

    pub fn can_submit(&self) -> bool {
        self.is_ready() && self.state != QueryState::InFlight
    }

    /// One-line summary for the status bar.
    pub fn status(&self) -> &'static str {
        if self.state == QueryState::InFlight {
            "Processing your query..."
        } else if self.can_submit() {
            "Ready to assist you!"
        } else if self.init_failed {
            "Agent failed to initialize"
        } else {
            "Initializing agent..."
        }
    }

    pub fn agent_ready(&mut self, agent: Arc<dyn Agent>, sink: &mut dyn EventSink) {
        self.agent = Some(agent);
        self.init_failed = false;
        tracing::info!("agent initialized");
        sink.log(LogEntry::new(LogKind::Success, "✅ Agent initialized successfully!"));
    }

    pub fn agent_failed(&mut self, error: &Error, sink: &mut dyn EventSink) {
        self.init_failed = true;
        tracing::error!(error = %error, "agent initialization failed");
        sink.log(LogEntry::new(
            LogKind::Error,
            format!("❌ Error initializing agent: {}", error),
        ));
        sink.alert(Alert::error(format!("Failed to initialize agent: {}", error)));
    }

    /// Accepts `query` unless it is blank, the agent is not ready, or a
    /// query is already in flight. Rejections raise an alert and change
    /// nothing else.
    pub fn submit(
        &mut self,
        query: &str,
        sink: &mut dyn EventSink,
    ) -> Result<PendingQuery, SubmitError> {
        let query = query.trim();
        let rejection = if query.is_empty() {
            Some(SubmitError::EmptyQuery)
        } else if self.agent.is_none() {
            Some(SubmitError::AgentNotReady)
        } else if self.state == QueryState::InFlight {
            Some(SubmitError::Busy)
        } else {
            None
        };

        if let Some(rejection) = rejection {
            tracing::warn!(reason = %rejection, "query rejected");
            sink.alert(rejection.alert());
            return Err(rejection);
        }

        let agent = match &self.agent {
            Some(agent) => agent.clone(),
            None => return Err(SubmitError::AgentNotReady),
        };

        self.transition(QueryState::InFlight, sink);
        sink.converse(ConversationEntry::new(Speaker::User, query));
        sink.log(LogEntry::new(
            LogKind::Thinking,
            format!("🤔 Received query: {}", query),
        ));
        tracing::info!(query, "query submitted");

        Ok(PendingQuery {
            query: query.to_string(),
            agent,
        })
    }

    /// Applies the result of the query currently in flight.
    pub fn finish(&mut self, outcome: QueryOutcome, sink: &mut dyn EventSink) {
        if self.state != QueryState::InFlight {
            tracing::warn!(state = ?self.state, "ignoring result with no query in flight");
            return;
        }

        match outcome {
            QueryOutcome::Completed(AgentOutput { output, trace }) => {
                sink.log(LogEntry::new(
                    LogKind::Info,
                    format!("🔍 Raw response: {}...", preview(&output)),
                ));
                for line in parse_trace(&trace) {
                    sink.log(LogEntry::new(line.kind.log_kind(), line.display()));
                }
                sink.converse(ConversationEntry::new(Speaker::Agent, output));
                sink.log(LogEntry::new(LogKind::Success, "✅ Query processed successfully!"));
                self.transition(QueryState::Completed, sink);
            }
            QueryOutcome::Failed(error) => {
                sink.log(LogEntry::new(
                    LogKind::Error,
                    format!("❌ Error processing query: {}", error),
                ));
                sink.converse(ConversationEntry::new(Speaker::System, error));
                self.transition(QueryState::Failed, sink);
            }
        }
    }

    pub fn clear(&self, sink: &mut dyn EventSink) {
        sink.clear();
        sink.log(LogEntry::new(LogKind::Info, "🗑️ Cleared all content"));
    }

    fn transition(&mut self, state: QueryState, sink: &mut dyn EventSink) {
        tracing::debug!(from = ?self.state, to = ?state, "query state");
        self.state = state;
        sink.state_changed(state);
    }
}

fn preview(text: &str) -> &str {
    match text.char_indices().nth(RAW_RESPONSE_PREVIEW_CHARS) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::transcript::{AlertLevel, Panes};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    enum Event {
        Log(LogKind, String),
        Converse(Speaker, String),
        Alert(AlertLevel, String),
        State(QueryState),
        Clear,
    }

    #[derive(Default)]
    struct RecordingSink {
        events: Vec<Event>,
    }

    impl RecordingSink {
        fn alerts(&self) -> Vec<&str> {
            self.events
                .iter()
                .filter_map(|e| match e {
                    Event::Alert(_, msg) => Some(msg.as_str()),
                    _ => None,
                })
                .collect()
        }

        fn logs(&self) -> Vec<(LogKind, &str)> {
            self.events
                .iter()
                .filter_map(|e| match e {
                    Event::Log(kind, msg) => Some((*kind, msg.as_str())),
                    _ => None,
                })
                .collect()
        }

        fn conversation(&self) -> Vec<(Speaker, &str)> {
            self.events
                .iter()
                .filter_map(|e| match e {
                    Event::Converse(speaker, text) => Some((*speaker, text.as_str())),
                    _ => None,
                })
                .collect()
        }
    }

    impl EventSink for RecordingSink {
        fn log(&mut self, entry: LogEntry) {
            self.events.push(Event::Log(entry.kind, entry.message));
        }

        fn converse(&mut self, entry: ConversationEntry) {
            self.events.push(Event::Converse(entry.speaker, entry.text));
        }

        fn alert(&mut self, alert: Alert) {
            self.events.push(Event::Alert(alert.level, alert.message));
        }

        fn state_changed(&mut self, state: QueryState) {
            self.events.push(Event::State(state));
        }

        fn clear(&mut self) {
            self.events.push(Event::Clear);
        }
    }

    struct FakeAgent {
        calls: AtomicUsize,
        result: std::result::Result<AgentOutput, String>,
    }

    impl FakeAgent {
        fn answering(output: &str, trace: &str) -> Arc<Self> {
            Arc::new(FakeAgent {
                calls: AtomicUsize::new(0),
                result: Ok(AgentOutput {
                    output: output.into(),
                    trace: trace.into(),
                }),
            })
        }

        fn failing(message: &str) -> Arc<Self> {
            Arc::new(FakeAgent {
                calls: AtomicUsize::new(0),
                result: Err(message.into()),
            })
        }
    }

    #[async_trait]
    impl Agent for FakeAgent {
        async fn invoke(&self, _query: &str) -> Result<AgentOutput> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone().map_err(Error::Query)
        }
    }

    fn ready(agent: Arc<FakeAgent>, sink: &mut RecordingSink) -> QueryController {
        let mut controller = QueryController::new();
        controller.agent_ready(agent, sink);
        sink.events.clear();
        controller
    }

    const LAHORE_TRACE: &str = "Thought: I should search\nAction: Search\nAction Input: weather in Lahore\nObservation: Sunny\nFinal Answer: It is sunny";

    #[test]
    fn test_rejects_blank_query() {
        let mut sink = RecordingSink::default();
        let mut controller = ready(FakeAgent::answering("a", ""), &mut sink);

        let err = controller.submit("   \n\t", &mut sink).unwrap_err();
        assert_eq!(err, SubmitError::EmptyQuery);
        assert_eq!(sink.alerts(), vec!["Please enter a question!"]);
        assert!(sink.conversation().is_empty());
        assert_eq!(controller.state(), QueryState::Idle);
    }

    #[test]
    fn test_rejects_before_agent_ready() {
        let mut sink = RecordingSink::default();
        let mut controller = QueryController::new();

        let err = controller.submit("hello", &mut sink).unwrap_err();
        assert_eq!(err, SubmitError::AgentNotReady);
        assert!(matches!(
            sink.events.as_slice(),
            [Event::Alert(AlertLevel::Error, msg)] if msg == "Agent not initialized!"
        ));
        assert!(!controller.can_submit());
    }

    #[test]
    fn test_blank_check_comes_before_readiness() {
        let mut sink = RecordingSink::default();
        let mut controller = QueryController::new();
        assert_eq!(
            controller.submit("", &mut sink).unwrap_err(),
            SubmitError::EmptyQuery
        );
    }

    #[tokio::test]
    async fn test_double_submit_invokes_agent_once() {
        let agent = FakeAgent::answering("It is sunny", LAHORE_TRACE);
        let mut sink = RecordingSink::default();
        let mut controller = ready(agent.clone(), &mut sink);

        let pending = controller.submit("weather in Lahore?", &mut sink).unwrap();
        assert_eq!(controller.state(), QueryState::InFlight);
        assert!(!controller.can_submit());

        let second = controller.submit("again", &mut sink);
        assert_eq!(second.unwrap_err(), SubmitError::Busy);
        assert_eq!(sink.alerts(), vec!["A query is already being processed!"]);

        let outcome = pending.run().await;
        controller.finish(outcome, &mut sink);

        assert_eq!(agent.calls.load(Ordering::SeqCst), 1);
        assert_eq!(sink.alerts().len(), 1);
        assert_eq!(
            sink.conversation(),
            vec![
                (Speaker::User, "weather in Lahore?"),
                (Speaker::Agent, "It is sunny"),
            ]
        );
    }

    #[tokio::test]
    async fn test_completed_query_orders_events() {
        let mut sink = RecordingSink::default();
        let mut controller = ready(FakeAgent::answering("It is sunny", LAHORE_TRACE), &mut sink);

        let pending = controller.submit("  weather in Lahore?  ", &mut sink).unwrap();
        assert_eq!(pending.query(), "weather in Lahore?");
        controller.finish(pending.run().await, &mut sink);

        assert_eq!(controller.state(), QueryState::Completed);
        assert!(controller.can_submit());

        let rendered: Vec<String> = sink
            .events
            .iter()
            .map(|e| match e {
                Event::Log(kind, msg) => format!("log {:?} {}", kind, msg),
                Event::Converse(speaker, text) => format!("say {:?} {}", speaker, text),
                Event::Alert(_, msg) => format!("alert {}", msg),
                Event::State(state) => format!("state {:?}", state),
                Event::Clear => "clear".to_string(),
            })
            .collect();

        assert_eq!(
            rendered,
            vec![
                "state InFlight",
                "say User weather in Lahore?",
                "log Thinking 🤔 Received query: weather in Lahore?",
                "log Info 🔍 Raw response: It is sunny...",
                "log Thinking 🧠 Thought: I should search",
                "log Action ⚡ Action: Search",
                "log Action 📝 Action Input: weather in Lahore",
                "log Observation 👁️ Observation: Sunny",
                "log Success ✅ Final Answer: It is sunny",
                "say Agent It is sunny",
                "log Success ✅ Query processed successfully!",
                "state Completed",
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_query_reports_in_both_panes() {
        let mut sink = RecordingSink::default();
        let mut controller = ready(FakeAgent::failing("Groq API error: 503"), &mut sink);

        let pending = controller.submit("anything", &mut sink).unwrap();
        controller.finish(pending.run().await, &mut sink);

        assert_eq!(controller.state(), QueryState::Failed);
        assert!(sink
            .logs()
            .contains(&(LogKind::Error, "❌ Error processing query: Groq API error: 503")));
        assert_eq!(
            sink.conversation().last(),
            Some(&(Speaker::System, "Groq API error: 503"))
        );

        // A failed query leaves the controller ready for the next one.
        assert!(controller.submit("retry", &mut sink).is_ok());
    }

    #[test]
    fn test_unclassified_trace_lines_are_not_forwarded() {
        let mut sink = RecordingSink::default();
        let mut controller = ready(FakeAgent::answering("ok", ""), &mut sink);
        let _pending = controller.submit("q", &mut sink).unwrap();
        sink.events.clear();

        controller.finish(
            QueryOutcome::Completed(AgentOutput {
                output: "ok".into(),
                trace: "> Entering new chain\n\nThought: go\nnoise\n".into(),
            }),
            &mut sink,
        );

        let logs = sink.logs();
        assert_eq!(logs.len(), 3);
        assert_eq!(logs[1], (LogKind::Thinking, "🧠 Thought: go"));
    }

    #[test]
    fn test_finish_without_query_in_flight_is_ignored() {
        let mut sink = RecordingSink::default();
        let mut controller = ready(FakeAgent::answering("a", ""), &mut sink);

        controller.finish(QueryOutcome::Failed("late".into()), &mut sink);
        assert!(sink.events.is_empty());
        assert_eq!(controller.state(), QueryState::Idle);
    }

    #[test]
    fn test_agent_failed_raises_alert() {
        let mut sink = RecordingSink::default();
        let mut controller = QueryController::new();
        controller.agent_failed(&Error::AgentInit("no network".into()), &mut sink);

        assert_eq!(
            sink.logs(),
            vec![(LogKind::Error, "❌ Error initializing agent: no network")]
        );
        assert_eq!(sink.alerts(), vec!["Failed to initialize agent: no network"]);
        assert!(!controller.is_ready());
        assert_eq!(controller.status(), "Agent failed to initialize");
    }

    #[test]
    fn test_status_follows_lifecycle() {
        let mut sink = RecordingSink::default();
        let mut controller = QueryController::new();
        assert_eq!(controller.status(), "Initializing agent...");

        controller.agent_ready(FakeAgent::answering("a", ""), &mut sink);
        assert_eq!(controller.status(), "Ready to assist you!");

        let _pending = controller.submit("q", &mut sink).unwrap();
        assert_eq!(controller.status(), "Processing your query...");

        controller.finish(QueryOutcome::Failed("boom".into()), &mut sink);
        assert_eq!(controller.status(), "Ready to assist you!");
    }

    #[test]
    fn test_panes_track_query_state() {
        let mut panes = Panes::default();
        let mut controller = QueryController::new();
        controller.agent_ready(FakeAgent::answering("a", ""), &mut panes);

        let _pending = controller.submit("q", &mut panes).unwrap();
        assert_eq!(panes.state, QueryState::InFlight);

        controller.finish(QueryOutcome::Failed("boom".into()), &mut panes);
        assert_eq!(panes.state, QueryState::Failed);
    }

    #[test]
    fn test_clear_logs_notice() {
        let mut sink = RecordingSink::default();
        let controller = QueryController::new();
        controller.clear(&mut sink);
        assert!(matches!(sink.events.first(), Some(Event::Clear)));
        assert_eq!(sink.logs(), vec![(LogKind::Info, "🗑️ Cleared all content")]);
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let long = "é".repeat(150);
        assert_eq!(preview(&long).chars().count(), 100);
        assert_eq!(preview("short"), "short");
    }
}
