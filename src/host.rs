//! Host hardware snapshot
//!
//! Best-effort identification of the OS, CPU, RAM and GPU the benchmark ran
//! on. Every probe degrades to a placeholder instead of failing.

use serde::{Deserialize, Serialize};
use std::process::Command;
use sysinfo::{CpuRefreshKind, MemoryRefreshKind, RefreshKind, System};

const UNKNOWN: &str = "Unknown";

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Read-only description of the benchmark host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub os: String,
    pub os_version: String,
    pub cpu: String,
    /// Total RAM in GB, `None` when it could not be determined
    pub ram_gb: Option<f64>,
    pub gpu: String,
}

impl SystemInfo {
    /// Capture a snapshot of the current host. Runs synchronously and may
    /// spawn `nvidia-smi`.
    pub fn capture() -> Self {
        let mut sys = System::new_with_specifics(
            RefreshKind::new()
                .with_memory(MemoryRefreshKind::everything())
                .with_cpu(CpuRefreshKind::everything()),
        );
        sys.refresh_memory();

        let info = Self {
            os: os_name(),
            os_version: System::long_os_version()
                .or_else(System::kernel_version)
                .unwrap_or_else(|| UNKNOWN.to_string()),
            cpu: cpu_brand(&sys).unwrap_or_else(|| UNKNOWN.to_string()),
            ram_gb: bytes_to_gb(sys.total_memory()),
            gpu: detect_gpu(),
        };
        log::debug!("Captured system info: {:?}", info);
        info
    }
}

fn os_name() -> String {
    match std::env::consts::OS {
        "linux" => "Linux".to_string(),
        "macos" => "Darwin".to_string(),
        "windows" => "Windows".to_string(),
        other => other.to_string(),
    }
}

fn cpu_brand(sys: &System) -> Option<String> {
    sys.cpus()
        .first()
        .map(|cpu| cpu.brand().trim().to_string())
        .filter(|brand| !brand.is_empty())
}

/// Zero means the platform reported nothing.
fn bytes_to_gb(bytes: u64) -> Option<f64> {
    if bytes == 0 {
        None
    } else {
        Some(bytes as f64 / BYTES_PER_GB)
    }
}

/// Detect GPU (best effort). Only NVIDIA GPUs are identified by name.
fn detect_gpu() -> String {
    match Command::new("nvidia-smi")
        .args(["--query-gpu=name,memory.total", "--format=csv,noheader"])
        .output()
    {
        Ok(output) if output.status.success() => {
            parse_nvidia_smi(&String::from_utf8_lossy(&output.stdout))
        }
        Ok(_) => "No NVIDIA GPU detected".to_string(),
        Err(_) => {
            if cfg!(target_os = "macos") {
                "Apple Silicon (Metal)".to_string()
            } else {
                "No GPU detected".to_string()
            }
        }
    }
}

/// One GPU per line, joined with "; ".
fn parse_nvidia_smi(stdout: &str) -> String {
    let gpus: Vec<&str> = stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    if gpus.is_empty() {
        "No NVIDIA GPU detected".to_string()
    } else {
        gpus.join("; ")
    }
}
