use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::workload::PromptClass;

/// What a single invocation benchmarks. Fixed for the duration of a sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Explicit model to test; takes precedence over `all`
    pub model: Option<String>,
    /// Test every model the backend reports
    pub all: bool,
    /// Persist the sweep result as JSON
    pub save: bool,
    pub prompt_classes: Vec<PromptClass>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            model: None,
            all: false,
            save: false,
            prompt_classes: PromptClass::ALL.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub endpoint: EndpointConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout: u64, // Generation request timeout in seconds
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout: u64, // Reachability and model listing timeout in seconds
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_format")]
    pub format: OutputFormat,
    /// Directory for saved result files
    #[serde(default = "default_output_directory")]
    pub directory: PathBuf,
    #[serde(default)]
    pub quiet: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_log: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: LogLevel,
    /// Per-module log level overrides (e.g., ["reqwest=warn", "hyper=info"])
    #[serde(default)]
    pub filter: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Console,
    Json,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout: default_timeout(),
            probe_timeout: default_probe_timeout(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_output_format(),
            directory: default_output_directory(),
            quiet: false,
            trace_log: None,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            filter: Vec::new(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_timeout() -> u64 {
    300
}

fn default_probe_timeout() -> u64 {
    5
}

fn default_output_format() -> OutputFormat {
    OutputFormat::Console
}

fn default_output_directory() -> PathBuf {
    PathBuf::from(".")
}

fn default_log_level() -> LogLevel {
    LogLevel::Warn
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.endpoint.base_url.trim().is_empty() {
            anyhow::bail!("endpoint.base_url must not be empty");
        }

        if self.endpoint.timeout == 0 {
            anyhow::bail!("endpoint.timeout must be greater than 0");
        }

        if self.endpoint.probe_timeout == 0 {
            anyhow::bail!("endpoint.probe_timeout must be greater than 0");
        }

        Ok(())
    }
}
