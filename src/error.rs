use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Missing or unusable startup configuration. Fatal.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The agent or one of its tools could not be constructed.
    #[error("{0}")]
    AgentInit(String),

    /// A tool failed in a way it could not turn into an observation.
    #[error("Tool '{tool}' failed: {message}")]
    Tool { tool: String, message: String },

    /// Anything that went wrong during a single agent invocation.
    #[error("{0}")]
    Query(String),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }
}
