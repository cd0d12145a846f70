use anyhow::Result;
use chrono::{DateTime, Local};
use colored::{ColoredString, Colorize};
use serde::Serialize;
use std::fmt::Write as _;
use std::io;
use std::path::{Path, PathBuf};

use crate::host::SystemInfo;
use crate::metrics::CounterSnapshot;
use crate::record::{BenchmarkRecord, SweepResult, round_to};

/// Mean tokens/second at or above which a setup counts as excellent.
pub const EXCELLENT_TOKENS_PER_SECOND: f64 = 40.0;

/// Mean tokens/second at or above which a setup counts as good.
pub const GOOD_TOKENS_PER_SECOND: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceTier {
    Excellent,
    Good,
    Slow,
}

impl PerformanceTier {
    pub fn from_tokens_per_second(tokens_per_second: f64) -> Self {
        if tokens_per_second >= EXCELLENT_TOKENS_PER_SECOND {
            PerformanceTier::Excellent
        } else if tokens_per_second >= GOOD_TOKENS_PER_SECOND {
            PerformanceTier::Good
        } else {
            PerformanceTier::Slow
        }
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            PerformanceTier::Excellent => "Excellent performance! Your setup is production-ready.",
            PerformanceTier::Good => {
                "Good performance. Consider Q8 quant or smaller model for better speed."
            }
            PerformanceTier::Slow => {
                "Slow performance. Try smaller model, higher quant, or check GPU utilization."
            }
        }
    }

    fn paint(&self, text: &str) -> ColoredString {
        match self {
            PerformanceTier::Excellent => text.green(),
            PerformanceTier::Good => text.yellow(),
            PerformanceTier::Slow => text.red(),
        }
    }
}

/// Aggregate view of a sweep. The mean and tier are `None` when no request
/// succeeded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub mean_tokens_per_second: Option<f64>,
    pub tier: Option<PerformanceTier>,
}

/// Mean throughput over successful records and the tier it falls into.
pub fn summarize(result: &SweepResult) -> Summary {
    let throughputs: Vec<f64> = result.successes().map(|m| m.tokens_per_second).collect();

    let mean_tokens_per_second = if throughputs.is_empty() {
        None
    } else {
        Some(throughputs.iter().sum::<f64>() / throughputs.len() as f64)
    };

    Summary {
        total: result.results.len(),
        successful: throughputs.len(),
        failed: result.results.len() - throughputs.len(),
        mean_tokens_per_second,
        tier: mean_tokens_per_second.map(PerformanceTier::from_tokens_per_second),
    }
}

/// Document written by `--save` and by the JSON output format.
#[derive(Debug, Serialize)]
pub struct PersistedReport<'a> {
    pub timestamp: DateTime<Local>,
    pub system: &'a SystemInfo,
    pub results: &'a [BenchmarkRecord],
}

impl<'a> PersistedReport<'a> {
    pub fn new(result: &'a SweepResult, timestamp: DateTime<Local>) -> Self {
        Self {
            timestamp,
            system: &result.system,
            results: &result.results,
        }
    }
}

pub fn to_json(result: &SweepResult) -> Result<String> {
    Ok(serde_json::to_string_pretty(&PersistedReport::new(
        result,
        Local::now(),
    ))?)
}

/// File name for results saved at `timestamp`.
pub fn results_file_name(timestamp: &DateTime<Local>) -> String {
    format!("benchmark_{}.json", timestamp.format("%Y%m%d_%H%M%S"))
}

/// Write the sweep result as pretty JSON into `directory` and return the path.
pub async fn save_json(result: &SweepResult, directory: &Path) -> Result<PathBuf> {
    let now = Local::now();
    let path = directory.join(results_file_name(&now));
    let json = serde_json::to_string_pretty(&PersistedReport::new(result, now))?;

    tokio::fs::create_dir_all(directory).await?;
    tokio::fs::write(&path, json).await?;

    log::info!("Results saved to {}", path.display());
    Ok(path)
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

pub fn render_system_info(system: &SystemInfo) -> String {
    let ram = match system.ram_gb {
        Some(gb) => format!("{:.1} GB", gb),
        None => "Unknown".to_string(),
    };

    let mut out = String::new();
    let _ = writeln!(out, "{}", "System Information".bold().blue());
    let _ = writeln!(out, "  OS:  {} {}", system.os, truncate(&system.os_version, 30));
    let _ = writeln!(out, "  CPU: {}", truncate(&system.cpu, 40));
    let _ = writeln!(out, "  RAM: {}", ram);
    let _ = writeln!(out, "  GPU: {}", system.gpu);
    out
}

/// Result table, one row per record in submission order. Throughput cells are
/// coloured by tier and failed runs show an error marker.
pub fn render_table(records: &[BenchmarkRecord]) -> String {
    let model_width = records
        .iter()
        .map(|r| r.model().chars().count())
        .max()
        .unwrap_or(0)
        .max("Model".len());

    let mut out = String::new();
    let _ = writeln!(out, "{}", "Benchmark Results".bold().cyan());
    let header = format!(
        "{:<mw$}  {:<7}  {:>10}  {:>8}  {:>9}  {:>6}",
        "Model",
        "Prompt",
        "Tokens/sec",
        "TTFT (s)",
        "Total (s)",
        "Tokens",
        mw = model_width
    );
    let _ = writeln!(out, "{}", header.bold());

    for record in records {
        let prefix = format!(
            "{:<mw$}  {:<7}",
            record.model(),
            record.prompt_type().as_str(),
            mw = model_width
        );

        match record {
            BenchmarkRecord::Success(m) => {
                let tps = format!("{:>10}", format!("{:.2}", round_to(m.tokens_per_second, 2)));
                let tier = PerformanceTier::from_tokens_per_second(m.tokens_per_second);
                let _ = writeln!(
                    out,
                    "{}  {}  {:>8}  {:>9}  {:>6}",
                    prefix,
                    tier.paint(&tps),
                    format!("{:.3}", round_to(m.ttft, 3)),
                    format!("{:.2}", round_to(m.total_time, 2)),
                    m.tokens_generated
                );
            }
            BenchmarkRecord::Failure(f) => {
                let _ = writeln!(
                    out,
                    "{}  {}  {:>8}  {:>9}  {:>6}  {}",
                    prefix,
                    format!("{:>10}", "Error").red(),
                    "-",
                    "-",
                    "-",
                    f.error.dimmed()
                );
            }
        }
    }

    out
}

pub fn render_summary(summary: &Summary) -> String {
    let mut out = String::new();

    match (summary.mean_tokens_per_second, summary.tier) {
        (Some(mean), Some(tier)) => {
            let _ = writeln!(
                out,
                "{} {:.2}",
                "Average Tokens/sec:".bold().green(),
                mean
            );
            let _ = writeln!(out);
            let _ = writeln!(out, "{}", "Recommendations:".bold());
            let _ = writeln!(out, "{}", tier.paint(tier.recommendation()));
        }
        _ => {
            let _ = writeln!(
                out,
                "{} undefined (no successful runs)",
                "Average Tokens/sec:".bold().red()
            );
        }
    }

    out
}

pub fn render_counters(counters: &CounterSnapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Requests: Sent: {}", counters.sent);
    let _ = writeln!(
        out,
        "Responses: Ok: {} Err: {}",
        counters.success, counters.failed
    );
    if counters.failed > 0 {
        let _ = writeln!(
            out,
            "Errors: Timeout: {} HTTP: {} Transport: {}",
            counters.timeout, counters.http_status, counters.transport
        );
    }
    let _ = writeln!(out, "Tokens: Output: {}", counters.output_tokens);
    out
}

/// Write the full console report for a finished sweep.
pub fn write_console_report<W: io::Write>(
    out: &mut W,
    result: &SweepResult,
    summary: &Summary,
    counters: &CounterSnapshot,
) -> io::Result<()> {
    writeln!(out)?;
    write!(out, "{}", render_system_info(&result.system))?;
    writeln!(out)?;
    write!(out, "{}", render_table(&result.results))?;
    writeln!(out)?;
    write!(out, "{}", render_summary(summary))?;
    writeln!(out)?;
    write!(out, "{}", render_counters(counters).dimmed())?;
    out.flush()
}
