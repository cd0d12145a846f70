use anyhow::Result;
use local_llm_bench::config::OutputFormat;
use local_llm_bench::{BenchmarkRunner, Cli, Config, RunConfig};
use log::{LevelFilter, Metadata, Record, debug, info};
use ringlog::{Drain, File, LogBuilder, MultiLogBuilder, Output, Stderr};
use std::collections::HashMap;
use std::io::Write;
use std::sync::Mutex;

/// Maximum log file size before rotation (10MB)
const LOG_FILE_MAX_SIZE: u64 = 1024 * 1024 * 10;

/// Parse log filter strings like "reqwest=warn" into a map of module prefix to level filter
fn parse_log_filters(filters: &[String]) -> HashMap<String, LevelFilter> {
    let mut map = HashMap::new();
    for filter in filters {
        if let Some((module, level)) = filter.split_once('=') {
            let level_filter = match level.to_lowercase().as_str() {
                "error" => LevelFilter::Error,
                "warn" => LevelFilter::Warn,
                "info" => LevelFilter::Info,
                "debug" => LevelFilter::Debug,
                "trace" => LevelFilter::Trace,
                "off" => LevelFilter::Off,
                _ => continue,
            };
            map.insert(module.to_string(), level_filter);
        }
    }
    map
}

/// Longest matching module prefix decides; unmatched targets fall through to
/// the global level.
fn should_log(metadata: &Metadata, filters: &HashMap<String, LevelFilter>) -> bool {
    let target = metadata.target();

    filters
        .iter()
        .filter(|(prefix, _)| target.starts_with(prefix.as_str()))
        .max_by_key(|(prefix, _)| prefix.len())
        .map(|(_, level)| metadata.level() <= *level)
        .unwrap_or(true)
}

/// Logger with per-module filtering over a ringlog output
struct FilteredLogger {
    output: Mutex<Box<dyn Output>>,
    max_level: LevelFilter,
    filters: HashMap<String, LevelFilter>,
}

impl log::Log for FilteredLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level && should_log(metadata, &self.filters)
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata())
            && let Ok(mut output) = self.output.lock()
        {
            let message = format!("{} [{}] {}\n", record.level(), record.target(), record.args());
            let _ = output.write_all(message.as_bytes());
        }
    }

    fn flush(&self) {
        if let Ok(mut output) = self.output.lock() {
            let _ = output.flush();
        }
    }
}

/// Install the logger. Returns the ringlog drain when one needs flushing.
fn init_logging(config: &Config) -> Result<Option<Box<dyn Drain>>> {
    let log_level = config.log.level.to_level_filter();

    let output: Box<dyn Output> = if let Some(ref log_file) = config.output.trace_log {
        let backup_file = log_file.with_extension("old");
        Box::new(File::new(log_file.clone(), backup_file, LOG_FILE_MAX_SIZE)?)
    } else {
        Box::new(Stderr::new())
    };

    let filters = parse_log_filters(&config.log.filter);

    if filters.is_empty() {
        let base_log = LogBuilder::new()
            .output(output)
            .build()
            .map_err(|e| anyhow::anyhow!("failed to initialize logger: {:?}", e))?;

        let drain = MultiLogBuilder::new()
            .level_filter(log_level)
            .default(base_log)
            .build()
            .start();

        Ok(Some(drain))
    } else {
        let logger = FilteredLogger {
            output: Mutex::new(output),
            max_level: log_level,
            filters,
        };

        log::set_boxed_logger(Box::new(logger))?;
        log::set_max_level(log_level);
        Ok(None)
    }
}

fn print_banner(config: &Config, run: &RunConfig) {
    let classes: Vec<&str> = run.prompt_classes.iter().map(|c| c.as_str()).collect();

    println!("Local LLM Benchmark");
    println!("   Target: {}", config.endpoint.base_url);
    println!("   Prompts: {}", classes.join(", "));
    println!();
}

fn main() -> Result<()> {
    let cli = Cli::parse_args();
    let config = cli.load_config()?;
    let run = cli.run_config();

    let mut drain = init_logging(&config)?;

    if !config.output.quiet && config.output.format == OutputFormat::Console {
        print_banner(&config, &run);
    }

    // Requests are strictly sequential, so a single thread is enough
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let result = runtime.block_on(run_benchmark(config, run));

    if let Some(drain) = drain.as_mut() {
        let _ = drain.flush();
    }

    result
}

async fn run_benchmark(config: Config, run: RunConfig) -> Result<()> {
    debug!("Initializing benchmark runner");
    let runner = BenchmarkRunner::new(config)?;
    info!("Starting benchmark run");
    runner.run(&run).await?;
    info!("Benchmark completed successfully");
    Ok(())
}
