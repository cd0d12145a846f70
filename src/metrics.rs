use metriken::{Counter, LazyCounter, metric};

use crate::record::FailureKind;

#[derive(Debug, Clone, Copy)]
pub enum RequestStatus {
    Success,
    Failed(FailureKind),
}

// Request metrics
#[metric(
    name = "requests",
    description = "Total number of generation requests",
    metadata = { status = "sent" }
)]
pub static REQUESTS_SENT: LazyCounter = LazyCounter::new(Counter::default);

#[metric(
    name = "requests",
    description = "Successful generation requests",
    metadata = { status = "success" }
)]
pub static REQUESTS_SUCCESS: LazyCounter = LazyCounter::new(Counter::default);

#[metric(
    name = "requests",
    description = "Failed generation requests",
    metadata = { status = "failed" }
)]
pub static REQUESTS_FAILED: LazyCounter = LazyCounter::new(Counter::default);

// Failure category metrics
#[metric(
    name = "errors",
    description = "Generation requests that timed out",
    metadata = { "type" = "timeout" }
)]
pub static ERRORS_TIMEOUT: LazyCounter = LazyCounter::new(Counter::default);

#[metric(
    name = "errors",
    description = "Non-2xx responses",
    metadata = { "type" = "http_status" }
)]
pub static ERRORS_HTTP_STATUS: LazyCounter = LazyCounter::new(Counter::default);

#[metric(
    name = "errors",
    description = "Transport and parse errors",
    metadata = { "type" = "transport" }
)]
pub static ERRORS_TRANSPORT: LazyCounter = LazyCounter::new(Counter::default);

// Token metrics
#[metric(
    name = "tokens",
    description = "Output tokens generated",
    metadata = { direction = "output" }
)]
pub static TOKENS_OUTPUT: LazyCounter = LazyCounter::new(Counter::default);

/// Point-in-time copy of the request counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub sent: u64,
    pub success: u64,
    pub failed: u64,
    pub timeout: u64,
    pub http_status: u64,
    pub transport: u64,
    pub output_tokens: u64,
}

pub struct Metrics;

impl Metrics {
    pub fn record_request_sent() {
        REQUESTS_SENT.increment();
    }

    pub fn record_request_complete(status: RequestStatus) {
        match status {
            RequestStatus::Success => {
                REQUESTS_SUCCESS.increment();
            }
            RequestStatus::Failed(kind) => {
                REQUESTS_FAILED.increment();
                match kind {
                    FailureKind::Timeout => ERRORS_TIMEOUT.increment(),
                    FailureKind::HttpStatus => ERRORS_HTTP_STATUS.increment(),
                    FailureKind::Transport => ERRORS_TRANSPORT.increment(),
                };
            }
        }
    }

    pub fn record_tokens(output: u64) {
        TOKENS_OUTPUT.add(output);
    }

    pub fn snapshot() -> CounterSnapshot {
        CounterSnapshot {
            sent: REQUESTS_SENT.value(),
            success: REQUESTS_SUCCESS.value(),
            failed: REQUESTS_FAILED.value(),
            timeout: ERRORS_TIMEOUT.value(),
            http_status: ERRORS_HTTP_STATUS.value(),
            transport: ERRORS_TRANSPORT.value(),
            output_tokens: TOKENS_OUTPUT.value(),
        }
    }
}

impl CounterSnapshot {
    /// Counter growth since an earlier snapshot.
    pub fn since(&self, earlier: &CounterSnapshot) -> CounterSnapshot {
        CounterSnapshot {
            sent: self.sent.saturating_sub(earlier.sent),
            success: self.success.saturating_sub(earlier.success),
            failed: self.failed.saturating_sub(earlier.failed),
            timeout: self.timeout.saturating_sub(earlier.timeout),
            http_status: self.http_status.saturating_sub(earlier.http_status),
            transport: self.transport.saturating_sub(earlier.transport),
            output_tokens: self.output_tokens.saturating_sub(earlier.output_tokens),
        }
    }
}
