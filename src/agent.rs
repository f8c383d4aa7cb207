//! A minimal zero-shot ReAct loop: reason, pick a tool, observe, repeat.
//!
//! The loop keeps a plain-text trace of every step in the
//! `Thought:` / `Action:` / `Observation:` format so the UI can replay it.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::llm::{ChatModel, GroqClient};
use crate::search::TavilySearch;
use crate::tools::{Tool, ToolBox};
use crate::trace::EventKind;

const FINAL_ANSWER: &str = "Final Answer:";
const STOP: [&str; 2] = ["\nObservation:", "\n\tObservation:"];

pub const ITERATION_LIMIT_OUTPUT: &str = "Agent stopped due to iteration limit or time limit.";

static ACTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)Action\s*\d*\s*:[\s]*(.*?)[\s]*Action\s*\d*\s*Input\s*\d*\s*:[\s]*(.*)")
        .expect("action pattern is valid")
});
static ACTION_ONLY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)Action\s*\d*\s*:").expect("action pattern is valid"));
static ACTION_INPUT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)[\s]*Action\s*\d*\s*Input\s*\d*\s*:").expect("action input pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentOutput {
    /// The final answer shown in the conversation.
    pub output: String,
    /// Every step the agent took, one prefixed line at a time.
    pub trace: String,
}

#[async_trait]
pub trait Agent: Send + Sync {
    async fn invoke(&self, query: &str) -> Result<AgentOutput>;
}

#[derive(Debug, PartialEq, Eq)]
enum Step {
    Action { tool: String, input: String },
    Finish(String),
    /// Output the loop could not parse; fed back to the model as the observation.
    Invalid(String),
}

fn parse_step(text: &str) -> Step {
    let answer_at = text.find(FINAL_ANSWER);

    if let Some(caps) = ACTION_RE.captures(text) {
        let action_at = caps.get(0).map_or(0, |m| m.start());
        match answer_at {
            Some(at) if at < action_at => {
                let answer = &text[at + FINAL_ANSWER.len()..action_at];
                return Step::Finish(answer.trim().to_string());
            }
            Some(_) => {
                return Step::Invalid(format!(
                    "Parsing LLM output produced both a final answer and a parse-able action: {}",
                    text
                ));
            }
            None => {}
        }

        let tool = caps.get(1).map_or("", |m| m.as_str()).trim().to_string();
        let input = caps
            .get(2)
            .map_or("", |m| m.as_str())
            .trim_matches(' ')
            .trim_matches('"')
            .to_string();
        return Step::Action { tool, input };
    }

    if let Some(at) = text.rfind(FINAL_ANSWER) {
        return Step::Finish(text[at + FINAL_ANSWER.len()..].trim().to_string());
    }

    if !ACTION_ONLY_RE.is_match(text) {
        Step::Invalid("Invalid Format: Missing 'Action:' after 'Thought:'".to_string())
    } else if !ACTION_INPUT_RE.is_match(text) {
        Step::Invalid("Invalid Format: Missing 'Action Input:' after 'Action:'".to_string())
    } else {
        Step::Invalid(format!("Could not parse LLM output: `{}`", text))
    }
}

pub struct ReactAgent {
    model: Arc<dyn ChatModel>,
    tools: ToolBox,
    max_iterations: usize,
}

impl ReactAgent {
    pub fn new(model: Arc<dyn ChatModel>, tools: ToolBox, max_iterations: usize) -> Result<Self> {
        if max_iterations == 0 {
            return Err(Error::AgentInit(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        Ok(ReactAgent {
            model,
            tools,
            max_iterations,
        })
    }

    /// Builds the Groq-backed agent with the calculator, weather and search tools.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::AgentInit(format!("could not build HTTP client: {}", e)))?;

        let settings = &config.settings;
        if settings.model.name.trim().is_empty() {
            return Err(Error::AgentInit("model name is empty".to_string()));
        }

        let search = TavilySearch::new(
            &settings.search,
            config.credentials.tavily_api_key.clone(),
            client.clone(),
        );
        let model = GroqClient::with_config(
            &settings.model,
            config.credentials.groq_api_key.clone(),
            client,
        );
        tracing::info!(model = model.get_model(), "agent model configured");

        let tools = ToolBox::new(vec![Tool::Calculator, Tool::Weather, Tool::Search(search)]);
        Self::new(Arc::new(model), tools, settings.agent.max_iterations)
    }

    fn prompt(&self, query: &str, scratchpad: &str) -> String {
        format!(
            "Answer the following questions as best you can. You have access to the following tools:

{tools}

Use the following format:

Question: the input question you must answer
Thought: you should always think about what to do
Action: the action to take, should be one of [{names}]
Action Input: the input to the action
Observation: the result of the action
... (this Thought/Action/Action Input/Observation can repeat N times)
Thought: I now know the final answer
Final Answer: the final answer to the original input question

Begin!

Question: {query}
Thought:{scratchpad}",
            tools = self.tools.describe(),
            names = self.tools.names().join(", "),
            query = query,
            scratchpad = scratchpad,
        )
    }

    async fn observe(&self, tool: &str, input: &str) -> Result<String> {
        match self.tools.get(tool) {
            Some(found) => found.run(input).await,
            None => Ok(format!(
                "{} is not a valid tool, try one of [{}].",
                tool,
                self.tools.names().join(", ")
            )),
        }
    }
}

#[async_trait]
impl Agent for ReactAgent {
    async fn invoke(&self, query: &str) -> Result<AgentOutput> {
        let mut scratchpad = String::new();
        let mut trace = String::new();

        for iteration in 1..=self.max_iterations {
            let prompt = self.prompt(query, &scratchpad);
            let text = self
                .model
                .complete(&prompt, &STOP)
                .await
                .map_err(|e| Error::Query(format!("{:#}", e)))?;

            // The prompt ends in `Thought:`, so a reply without its own prefix continues it.
            let step = text.trim();
            if EventKind::classify(step) == EventKind::Unclassified {
                trace.push_str("Thought: ");
            }
            trace.push_str(step);
            trace.push('\n');

            let observation = match parse_step(&text) {
                Step::Finish(answer) => {
                    tracing::debug!(iteration, "agent finished");
                    return Ok(AgentOutput {
                        output: answer,
                        trace,
                    });
                }
                Step::Action { tool, input } => {
                    tracing::debug!(iteration, tool = %tool, input = %input, "agent chose tool");
                    self.observe(&tool, &input).await?
                }
                Step::Invalid(message) => {
                    tracing::debug!(iteration, "agent output did not parse");
                    message
                }
            };

            trace.push_str("Observation: ");
            trace.push_str(&observation);
            trace.push('\n');

            scratchpad.push_str(&text);
            scratchpad.push_str("\nObservation: ");
            scratchpad.push_str(&observation);
            scratchpad.push_str("\nThought: ");
        }

        tracing::warn!(max_iterations = self.max_iterations, "agent hit the iteration limit");
        Ok(AgentOutput {
            output: ITERATION_LIMIT_OUTPUT.to_string(),
            trace,
        })
    }
}
