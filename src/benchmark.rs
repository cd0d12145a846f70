use anyhow::Result;
use chrono::Local;
use log::{debug, info, warn};
use std::io::{self, Write};
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::client::{ClientConfig, OllamaClient};
use crate::config::{Config, OutputFormat, RunConfig};
use crate::host::SystemInfo;
use crate::metrics::{Metrics, RequestStatus};
use crate::record::{BenchmarkRecord, RunFailure, RunMetrics, SweepResult};
use crate::report;
use crate::workload::PromptClass;

/// Conditions that stop a run before any generation request is sent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("cannot reach backend at {base_url}; start it with `ollama serve`")]
    BackendUnreachable { base_url: String },

    #[error("no models available; pull one with `ollama pull qwen2.5-coder:7b`")]
    NoModels,

    #[error("model '{model}' not found. Available: {}", .available.join(", "))]
    ModelNotFound { model: String, available: Vec<String> },
}

/// Models chosen for a sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelection {
    pub models: Vec<String>,
    /// True when no model was named and `--all` was not given, so only the
    /// first listed model is tested
    pub defaulted: bool,
    /// Number of models the backend reported
    pub available: usize,
}

/// Choose the models to benchmark from what the backend reports.
///
/// An explicit model takes precedence over `all`. Without either, the first
/// listed model is used.
pub fn select_models(run: &RunConfig, available: &[String]) -> Result<ModelSelection, SelectionError> {
    if available.is_empty() {
        return Err(SelectionError::NoModels);
    }

    if let Some(model) = &run.model {
        if !available.iter().any(|m| m == model) {
            return Err(SelectionError::ModelNotFound {
                model: model.clone(),
                available: available.to_vec(),
            });
        }
        return Ok(ModelSelection {
            models: vec![model.clone()],
            defaulted: false,
            available: available.len(),
        });
    }

    if run.all {
        return Ok(ModelSelection {
            models: available.to_vec(),
            defaulted: false,
            available: available.len(),
        });
    }

    Ok(ModelSelection {
        models: vec![available[0].clone()],
        defaulted: true,
        available: available.len(),
    })
}

/// Sequential benchmark driver for an Ollama-compatible backend.
///
/// Requests are issued one at a time so each measurement sees an otherwise
/// idle backend. A failed request becomes a failure record and never stops the
/// sweep.
///
/// # Examples
///
/// ```no_run
/// use local_llm_bench::{BenchmarkRunner, Config, RunConfig};
///
/// # async fn example() -> anyhow::Result<()> {
/// let runner = BenchmarkRunner::new(Config::default())?;
/// runner.run(&RunConfig::default()).await?;
/// # Ok(())
/// # }
/// ```
pub struct BenchmarkRunner {
    client: OllamaClient,
    config: Config,
}

impl BenchmarkRunner {
    pub fn new(config: Config) -> Result<Self> {
        let client = OllamaClient::new(ClientConfig {
            base_url: config.endpoint.base_url.clone(),
            timeout: Duration::from_secs(config.endpoint.timeout),
            probe_timeout: Duration::from_secs(config.endpoint.probe_timeout),
        })?;

        Ok(Self { client, config })
    }

    pub fn client(&self) -> &OllamaClient {
        &self.client
    }

    fn show_progress(&self) -> bool {
        !self.config.output.quiet && self.config.output.format == OutputFormat::Console
    }

    /// Check the backend and resolve which models to test.
    pub async fn prepare(&self, run: &RunConfig) -> Result<ModelSelection, SelectionError> {
        if !self.client.is_reachable().await {
            return Err(SelectionError::BackendUnreachable {
                base_url: self.client.base_url().to_string(),
            });
        }

        let available = self.client.list_models().await;
        debug!("Backend reports {} models: {:?}", available.len(), available);

        select_models(run, &available)
    }

    /// Run one generation request and turn the outcome into a record.
    pub async fn execute(&self, model: &str, class: PromptClass) -> BenchmarkRecord {
        let request = self.client.create_request(model, class);

        Metrics::record_request_sent();
        let start = Instant::now();
        let outcome = self.client.generate(&request).await;
        let elapsed = start.elapsed();

        match outcome {
            Ok(response) => {
                let metrics = RunMetrics::from_response(model, class, elapsed, &response);

                Metrics::record_tokens(metrics.tokens_generated);
                Metrics::record_request_complete(RequestStatus::Success);

                debug!(
                    "Request completed - model: {}, class: {}, tokens: {}, tps: {:.2}, ttft_s: {:.3}, total_s: {:.2}",
                    model,
                    class,
                    metrics.tokens_generated,
                    metrics.tokens_per_second,
                    metrics.ttft,
                    metrics.total_time
                );

                BenchmarkRecord::Success(metrics)
            }
            Err(e) => {
                let failure = RunFailure::from_client_error(model, class, &e);
                Metrics::record_request_complete(RequestStatus::Failed(failure.kind));

                warn!("Request failed - model: {}, class: {}: {}", model, class, e);

                BenchmarkRecord::Failure(failure)
            }
        }
    }

    /// Benchmark every model against every class, models outer and classes
    /// inner. Yields exactly `models.len() * classes.len()` records in
    /// submission order.
    pub async fn run_sweep(&self, models: &[String], classes: &[PromptClass]) -> SweepResult {
        self.sweep(models, classes, &mut io::stdout()).await
    }

    async fn sweep<W: Write>(
        &self,
        models: &[String],
        classes: &[PromptClass],
        out: &mut W,
    ) -> SweepResult {
        let system = SystemInfo::capture();
        let timestamp = Local::now();
        let mut results = Vec::with_capacity(models.len() * classes.len());

        info!(
            "Starting sweep: {} models x {} prompt classes",
            models.len(),
            classes.len()
        );

        for model in models {
            for &class in classes {
                if self.show_progress() {
                    let _ = writeln!(out, "Testing {} ({})...", model, class);
                    let _ = out.flush();
                }
                results.push(self.execute(model, class).await);
            }
        }

        SweepResult {
            timestamp,
            system,
            results,
        }
    }

    /// Select models, run the sweep, then report to stdout and optionally save.
    pub async fn run(&self, run: &RunConfig) -> Result<()> {
        self.run_with_output(run, &mut io::stdout()).await
    }

    /// Like [`run`](Self::run) with the report written to `out`. In JSON
    /// mode `out` receives only the JSON document and notices go to stderr.
    pub async fn run_with_output<W: Write>(&self, run: &RunConfig, out: &mut W) -> Result<()> {
        let selection = self.prepare(run).await?;

        if selection.defaulted && !self.config.output.quiet {
            let notice = default_model_notice(&selection);
            match self.config.output.format {
                OutputFormat::Console => writeln!(out, "{}\n", notice)?,
                OutputFormat::Json => eprintln!("{}", notice),
            }
        }

        let counters_before = Metrics::snapshot();
        let result = self.sweep(&selection.models, &run.prompt_classes, out).await;
        let counters = Metrics::snapshot().since(&counters_before);
        let summary = report::summarize(&result);

        info!(
            "Sweep finished: {} ok, {} failed",
            summary.successful, summary.failed
        );

        match self.config.output.format {
            OutputFormat::Console => {
                report::write_console_report(out, &result, &summary, &counters)?;
            }
            OutputFormat::Json => {
                writeln!(out, "{}", report::to_json(&result)?)?;
            }
        }

        if run.save {
            let path = report::save_json(&result, &self.config.output.directory).await?;
            if self.show_progress() {
                writeln!(out)?;
                writeln!(out, "Results saved to {}", path.display())?;
            }
        }

        out.flush()?;
        Ok(())
    }
}

/// Notice shown when no model was named and `--all` was not given.
pub fn default_model_notice(selection: &ModelSelection) -> String {
    let model = selection.models.first().map(String::as_str).unwrap_or("-");
    format!(
        "Testing model: {}\nUse --all to test all {} available models",
        model, selection.available
    )
}
