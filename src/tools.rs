use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::Result;
use crate::search::TavilySearch;

pub const CALCULATOR_ERROR: &str = "Error: Could not calculate that expression";

const CALCULATOR_SAFE_CHARS: &str = "0123456789+-*/(). ";

// Integer literals with leading zeros, such as `007`. A run of zeros alone is fine.
static LEADING_ZERO_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[^0-9.])0+[1-9]").expect("leading zero pattern is valid"));

/// Tools the agent can pick from, dispatched by name.
#[derive(Debug, Clone)]
pub enum Tool {
    Calculator,
    Weather,
    Search(TavilySearch),
}

impl Tool {
    pub fn name(&self) -> &'static str {
        match self {
            Tool::Calculator => "Calculator",
            Tool::Weather => "Weather",
            Tool::Search(_) => "tavily_search_results_json",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Tool::Calculator => {
                "Useful for math calculations. Input should be a math expression like '2+2' or '10*5'"
            }
            Tool::Weather => "Useful for weather information. Input should be a city name",
            Tool::Search(_) => {
                "A search engine optimized for comprehensive, accurate, and trusted results. \
                 Useful for when you need to answer questions about current events. \
                 Input should be a search query."
            }
        }
    }

    pub async fn run(&self, input: &str) -> Result<String> {
        tracing::debug!(tool = self.name(), input, "running tool");
        match self {
            Tool::Calculator => Ok(calculator(input)),
            Tool::Weather => Ok(weather(input)),
            Tool::Search(search) => search.run(input).await,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ToolBox {
    tools: Vec<Tool>,
}

impl ToolBox {
    pub fn new(tools: Vec<Tool>) -> Self {
        ToolBox { tools }
    }

    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.iter().find(|tool| tool.name() == name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tools.iter().map(Tool::name).collect()
    }

    /// One `name: description` line per tool, for the agent prompt.
    pub fn describe(&self) -> String {
        self.tools
            .iter()
            .map(|tool| format!("{}: {}", tool.name(), tool.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Evaluates plain arithmetic after stripping everything that is not a
/// digit, an operator, a parenthesis, a dot or a space.
pub fn calculator(input: &str) -> String {
    let cleaned: String = input
        .chars()
        .filter(|c| CALCULATOR_SAFE_CHARS.contains(*c))
        .collect();

    match evaluate(&cleaned) {
        Some(value) => format_number(value),
        None => CALCULATOR_ERROR.to_string(),
    }
}

fn evaluate(expression: &str) -> Option<f64> {
    if expression.trim().is_empty() || LEADING_ZERO_RE.is_match(expression) {
        return None;
    }

    // `**` is how the model writes powers; meval spells it `^`.
    let expression = expression.replace("**", "^");
    match meval::eval_str(&expression) {
        Ok(value) if value.is_finite() => Some(value),
        Ok(value) => {
            tracing::debug!(expression = %expression, value, "calculator result is not finite");
            None
        }
        Err(e) => {
            tracing::debug!(expression = %expression, error = %e, "calculator could not evaluate");
            None
        }
    }
}

/// Evaluation is in `f64`, so integral results past 2^53 are rounded.
fn format_number(value: f64) -> String {
    // Adding zero folds -0 into 0.
    let value = value + 0.0;
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}

pub fn weather(city: &str) -> String {
    format!("Weather in {}: Sunny, 25°C", city)
}
