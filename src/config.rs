//! Configuration management for homesteward.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub agent: AgentConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Reasoning model used to generate the plan.
    pub planner_model: String,
    /// Tool-calling model that executes the plan.
    pub executor_model: String,
    /// Cheap model for auxiliary completions (tool description cleanup).
    pub simple_model: String,
    pub max_tokens: u32,
    #[serde(default = "default_summary_max_tokens")]
    pub summary_max_tokens: u32,
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_summary_max_tokens() -> u32 {
    200
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Hard ceiling on executor turns before the run is abandoned.
    pub max_turns: usize,
    /// Rewrite tool docs into audience-friendly descriptions at startup.
    /// Costs one cheap completion per tool.
    #[serde(default = "bool_true")]
    pub summarize_descriptions: bool,
}

fn bool_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Directory for the persistent browser profile.
    #[serde(default)]
    pub user_data_dir: Option<PathBuf>,
    /// Run the browser headfully.
    #[serde(default)]
    pub debug: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            user_data_dir: None,
            debug: false,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig {
                api_base: None,
                api_key: None,
                api_key_env: default_api_key_env(),
                planner_model: "o1-mini".to_string(),
                executor_model: "gpt-4o-mini".to_string(),
                simple_model: "gpt-4o-mini".to_string(),
                max_tokens: 4096,
                summary_max_tokens: default_summary_max_tokens(),
            },
            agent: AgentConfig {
                max_turns: 50,
                summarize_descriptions: true,
            },
            browser: BrowserConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".homesteward").join("config.toml"))
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path).with_context(|| {
                format!("Failed to read config file: {}", config_path.display())
            })?;
            toml::from_str(&content).with_context(|| {
                format!("Failed to parse config file: {}", config_path.display())
            })?
        } else {
            Self::default()
        };

        if let Ok(api_base) = std::env::var("HOMESTEWARD_API_BASE") {
            config.llm.api_base = Some(api_base);
        }
        if let Ok(model) = std::env::var("HOMESTEWARD_PLANNER_MODEL") {
            config.llm.planner_model = model;
        }
        if let Ok(model) = std::env::var("HOMESTEWARD_EXECUTOR_MODEL") {
            config.llm.executor_model = model;
        }

        Ok(config)
    }

    pub fn api_key(&self) -> Result<String> {
        if let Some(key) = &self.llm.api_key {
            if !key.is_empty() {
                return Ok(key.clone());
            }
        }
        std::env::var(&self.llm.api_key_env).with_context(|| {
            format!(
                "API key not found. Either:\n  \
                 1. Set api_key in config file: {}\n  \
                 2. Set environment variable: export {}=your-key",
                Self::config_path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default(),
                self.llm.api_key_env
            )
        })
    }

    pub fn save_default() -> Result<PathBuf> {
        let config_path = Self::config_path()?;
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        let default = Self::default();
        let content = toml::to_string_pretty(&default).context("Failed to serialize config")?;
        std::fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;
        Ok(config_path)
    }
}
