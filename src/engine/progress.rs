// Job progress payload and sinks

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Progress payload emitted during long-running engine runs.
/// Transcode, rehash and watermark all report this same shape.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProgress {
    pub job_id: String,
    pub phase: String,
    pub current: u64,
    pub total: u64,
    pub percent: f64,
    pub message: String,
    pub is_cancelled: bool,
    pub is_error: bool,
    pub error_message: Option<String>,
}

impl JobProgress {
    pub fn new(job_id: impl Into<String>, phase: impl Into<String>, current: u64, total: u64) -> Self {
        let total_safe = total.max(1);
        let percent = (current as f64 / total_safe as f64) * 100.0;
        Self {
            job_id: job_id.into(),
            phase: phase.into(),
            current,
            total,
            percent: percent.min(100.0),
            message: String::new(),
            is_cancelled: false,
            is_error: false,
            error_message: None,
        }
    }

    pub fn with_message(mut self, msg: impl Into<String>) -> Self {
        self.message = msg.into();
        self
    }

    /// Set when the watchdog killed the run.
    pub fn cancelled(mut self) -> Self {
        self.is_cancelled = true;
        self
    }

    pub fn error(mut self, msg: impl Into<String>) -> Self {
        self.is_error = true;
        self.error_message = Some(msg.into());
        self
    }
}

/// Receives progress from engine runs. Implementations must be cheap; they
/// are called on the runner thread between engine events.
pub trait ProgressSink: Send + Sync {
    fn report(&self, progress: &JobProgress);
}

/// Writes "Processing: N% done" lines through the log facade, once per whole percent.
#[derive(Debug)]
pub struct LogProgress {
    last_percent: AtomicU64,
}

impl LogProgress {
    pub fn new() -> Self {
        Self { last_percent: AtomicU64::new(u64::MAX) }
    }
}

impl Default for LogProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for LogProgress {
    fn report(&self, progress: &JobProgress) {
        if progress.is_error {
            log::error!(
                "[{}] {} failed: {}",
                progress.job_id,
                progress.phase,
                progress.error_message.as_deref().unwrap_or("unknown error")
            );
            return;
        }
        if progress.is_cancelled {
            log::warn!("[{}] {} cancelled", progress.job_id, progress.phase);
            return;
        }

        let whole = progress.percent.round() as u64;
        if self.last_percent.swap(whole, Ordering::Relaxed) != whole {
            log::info!("[{}] {}: Processing: {}% done", progress.job_id, progress.phase, whole);
        }
    }
}

/// Discards everything.
#[derive(Debug, Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn report(&self, _progress: &JobProgress) {}
}

/// Parse an ffmpeg time stamp ("HH:MM:SS.ms") to seconds.
/// Negative and "N/A" stamps yield None.
pub fn parse_ffmpeg_time(time_str: &str) -> Option<f64> {
    let time_str = time_str.trim();
    if time_str.starts_with('-') || time_str.starts_with('N') {
        return None;
    }

    let parts: Vec<&str> = time_str.split(':').collect();
    if parts.len() == 3 {
        let hours: f64 = parts[0].parse().ok()?;
        let minutes: f64 = parts[1].parse().ok()?;
        let seconds: f64 = parts[2].parse().ok()?;
        Some(hours * 3600.0 + minutes * 60.0 + seconds)
    } else {
        None
    }
}

/// Percent of `total_secs` reached at `elapsed_secs`, capped at 99 until the run exits.
pub fn percent_of(elapsed_secs: f64, total_secs: Option<f64>) -> u64 {
    match total_secs.filter(|t| *t > 0.0) {
        Some(total) => ((elapsed_secs / total) * 100.0).clamp(0.0, 99.0) as u64,
        None => 0,
    }
}
