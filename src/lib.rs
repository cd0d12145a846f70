pub mod benchmark;
pub mod cli;
pub mod client;
pub mod config;
pub mod host;
pub mod metrics;
pub mod record;
pub mod report;
pub mod workload;

pub use benchmark::{BenchmarkRunner, ModelSelection, SelectionError, select_models};
pub use cli::Cli;
pub use client::{ClientConfig, ClientError, GenerateRequest, GenerateResponse, OllamaClient};
pub use config::{Config, RunConfig};
pub use host::SystemInfo;
pub use metrics::{Metrics, RequestStatus};
pub use record::{BenchmarkRecord, FailureKind, RunFailure, RunMetrics, SweepResult};
pub use report::{PerformanceTier, Summary, summarize};
pub use workload::PromptClass;
