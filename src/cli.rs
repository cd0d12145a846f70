use clap::Parser;
use std::path::PathBuf;

use crate::config::{Config, RunConfig};
use crate::workload::PromptClass;

#[derive(Parser, Debug)]
#[command(name = "local-llm-bench")]
#[command(author, version, about = "Benchmark local LLM performance", long_about = None)]
pub struct Cli {
    /// Specific model to test
    #[arg(short, long)]
    pub model: Option<String>,

    /// Test all available models
    #[arg(short, long)]
    pub all: bool,

    /// Save results to a timestamped JSON file
    #[arg(short, long)]
    pub save: bool,

    /// Prompt class to run; repeat to select several (default: all)
    #[arg(short, long = "prompt", value_enum)]
    pub prompts: Vec<PromptClass>,

    /// Path to an optional TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Backend base URL, overrides `endpoint.base_url`
    #[arg(long)]
    pub base_url: Option<String>,

    /// Directory for saved results, overrides `output.directory`
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Load the config file (or defaults) and apply command line overrides.
    pub fn load_config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };

        if let Some(base_url) = &self.base_url {
            config.endpoint.base_url = base_url.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output.directory = dir.clone();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn run_config(&self) -> RunConfig {
        let prompt_classes = if self.prompts.is_empty() {
            PromptClass::ALL.to_vec()
        } else {
            self.prompts.clone()
        };

        RunConfig {
            model: self.model.clone(),
            all: self.all,
            save: self.save,
            prompt_classes,
        }
    }
}
