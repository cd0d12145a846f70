//! Benchmark records and the sweep result that collects them.
//!
//! Records keep full-precision values. Rounding to presentation precision
//! happens only when a record is serialized or rendered.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize, Serializer};
use std::time::Duration;

use crate::client::{ClientError, GenerateResponse};
use crate::host::SystemInfo;
use crate::workload::PromptClass;

const NANOS_PER_SECOND: f64 = 1e9;

/// Round `value` to `places` decimal places.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

fn serialize_2dp<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(round_to(*value, 2))
}

fn serialize_3dp<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(round_to(*value, 3))
}

/// Generated tokens per second of generation time. Zero when the backend
/// reports no generation time.
pub fn tokens_per_second(eval_count: u64, eval_duration_ns: u64) -> f64 {
    if eval_duration_ns == 0 {
        return 0.0;
    }
    eval_count as f64 / (eval_duration_ns as f64 / NANOS_PER_SECOND)
}

/// Prompt processing time in seconds. Requests are not streamed, so this is
/// the closest available proxy for time to first token.
pub fn time_to_first_token(prompt_eval_duration_ns: u64) -> f64 {
    prompt_eval_duration_ns as f64 / NANOS_PER_SECOND
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Timeout,
    HttpStatus,
    Transport,
}

/// Metrics of one successful generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    pub model: String,
    pub prompt_type: PromptClass,
    /// Wall time of the request in seconds
    #[serde(serialize_with = "serialize_2dp")]
    pub total_time: f64,
    pub tokens_generated: u64,
    #[serde(serialize_with = "serialize_2dp")]
    pub tokens_per_second: f64,
    /// Prompt evaluation time in seconds
    #[serde(serialize_with = "serialize_3dp")]
    pub ttft: f64,
    /// Length of the generated text in characters
    pub output_length: usize,
}

impl RunMetrics {
    pub fn from_response(
        model: &str,
        prompt_type: PromptClass,
        elapsed: Duration,
        response: &GenerateResponse,
    ) -> Self {
        Self {
            model: model.to_string(),
            prompt_type,
            total_time: elapsed.as_secs_f64(),
            tokens_generated: response.eval_count,
            tokens_per_second: tokens_per_second(response.eval_count, response.eval_duration),
            ttft: time_to_first_token(response.prompt_eval_duration),
            output_length: response.response.chars().count(),
        }
    }
}

/// A generation request that did not produce metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunFailure {
    pub model: String,
    pub prompt_type: PromptClass,
    pub kind: FailureKind,
    pub error: String,
}

impl RunFailure {
    pub fn from_client_error(model: &str, prompt_type: PromptClass, error: &ClientError) -> Self {
        let (kind, message) = match error {
            ClientError::Timeout(_) => (FailureKind::Timeout, "timed out".to_string()),
            ClientError::BadStatus { status, .. } => {
                (FailureKind::HttpStatus, format!("HTTP {}", status))
            }
            ClientError::Unreachable(_) | ClientError::Parse(_) | ClientError::Transport(_) => {
                (FailureKind::Transport, error.to_string())
            }
        };

        Self {
            model: model.to_string(),
            prompt_type,
            kind,
            error: message,
        }
    }
}

/// Outcome of one (model, prompt class) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum BenchmarkRecord {
    Success(RunMetrics),
    Failure(RunFailure),
}

impl BenchmarkRecord {
    pub fn model(&self) -> &str {
        match self {
            BenchmarkRecord::Success(m) => &m.model,
            BenchmarkRecord::Failure(f) => &f.model,
        }
    }

    pub fn prompt_type(&self) -> PromptClass {
        match self {
            BenchmarkRecord::Success(m) => m.prompt_type,
            BenchmarkRecord::Failure(f) => f.prompt_type,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, BenchmarkRecord::Success(_))
    }

    pub fn metrics(&self) -> Option<&RunMetrics> {
        match self {
            BenchmarkRecord::Success(m) => Some(m),
            BenchmarkRecord::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&RunFailure> {
        match self {
            BenchmarkRecord::Success(_) => None,
            BenchmarkRecord::Failure(f) => Some(f),
        }
    }
}

/// Every record of one sweep in submission order, plus the host snapshot
/// taken before the first request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepResult {
    pub timestamp: DateTime<Local>,
    pub system: SystemInfo,
    pub results: Vec<BenchmarkRecord>,
}

impl SweepResult {
    pub fn successes(&self) -> impl Iterator<Item = &RunMetrics> {
        self.results.iter().filter_map(BenchmarkRecord::metrics)
    }

    pub fn failures(&self) -> impl Iterator<Item = &RunFailure> {
        self.results.iter().filter_map(BenchmarkRecord::failure)
    }
}
