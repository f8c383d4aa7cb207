use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::PathBuf;

use crate::error::{Error, Result};

pub const GROQ_API_KEY: &str = "GROQ_API_KEY";
pub const TAVILY_API_KEY: &str = "TAVILY_API_KEY";

fn default_model_name() -> String {
    "llama-3.3-70b-versatile".to_string()
}

fn default_model_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_search_url() -> String {
    "https://api.tavily.com".to_string()
}

fn default_max_iterations() -> usize {
    3
}

fn default_max_results() -> usize {
    5
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub model: ModelSettings,
    #[serde(default)]
    pub agent: AgentSettings,
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub window: WindowSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelSettings {
    #[serde(default = "default_model_name")]
    pub name: String,
    #[serde(default = "default_model_url")]
    pub base_url: String,
    #[serde(default)]
    pub temperature: f32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AgentSettings {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchSettings {
    #[serde(default = "default_search_url")]
    pub base_url: String,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WindowSettings {
    pub width: u32,
    pub height: u32,
}

impl Default for ModelSettings {
    fn default() -> Self {
        ModelSettings {
            name: default_model_name(),
            base_url: default_model_url(),
            temperature: 0.0,
        }
    }
}

impl Default for AgentSettings {
    fn default() -> Self {
        AgentSettings {
            max_iterations: default_max_iterations(),
        }
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        SearchSettings {
            base_url: default_search_url(),
            max_results: default_max_results(),
        }
    }
}

impl Default for WindowSettings {
    fn default() -> Self {
        WindowSettings {
            width: 1000,
            height: 700,
        }
    }
}

impl Settings {
    pub fn load() -> Self {
        let config_path = Self::get_config_path();

        if config_path.exists() {
            match fs::read_to_string(&config_path) {
                Ok(contents) => match Self::parse(&contents) {
                    Ok(settings) => return settings,
                    Err(e) => tracing::warn!(
                        path = %config_path.display(),
                        "Error parsing config.toml: {}. Using defaults.",
                        e
                    ),
                },
                Err(e) => tracing::warn!(
                    path = %config_path.display(),
                    "Error reading config.toml: {}. Using defaults.",
                    e
                ),
            }
        }

        Settings::default()
    }

    pub fn parse(contents: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    pub fn get_config_path() -> PathBuf {
        Self::get_config_dir().join("config.toml")
    }

    pub fn get_config_dir() -> PathBuf {
        if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home).join(".config/react-desk")
        } else {
            PathBuf::from(".")
        }
    }
}

/// API keys for the model and search providers.
#[derive(Clone)]
pub struct Credentials {
    pub groq_api_key: String,
    pub tavily_api_key: String,
}

impl Credentials {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Both keys are required; an empty value counts as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| Error::config(format!("Please set {} environment variable", key)))
        };

        Ok(Credentials {
            groq_api_key: require(GROQ_API_KEY)?,
            tavily_api_key: require(TAVILY_API_KEY)?,
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("groq_api_key", &"***")
            .field("tavily_api_key", &"***")
            .finish()
    }
}

/// Everything the application needs at startup, built once in `main`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub settings: Settings,
    pub credentials: Credentials,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let credentials = Credentials::from_env()?;
        Ok(AppConfig {
            settings: Settings::load(),
            credentials,
        })
    }
}
