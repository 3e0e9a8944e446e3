// Vidshift - Engine Runner
// Spawns ffmpeg through ffmpeg-sidecar, forwards its structured event stream
// to a progress sink, enforces the no-progress watchdog and classifies
// failures from stderr.

pub mod progress;
pub mod watchdog;

use std::collections::VecDeque;
use std::path::Path;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::OnceLock;
use std::thread;
use std::time::Duration;

use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::{FfmpegEvent, LogLevel};
use regex::Regex;

use crate::constants::{TRANSCODE_INITIAL_TIMEOUT_SECS, TRANSCODE_PROGRESS_TIMEOUT_SECS};
use crate::error::{Result, TranscodeFailure, VidshiftError};
use progress::{parse_ffmpeg_time, percent_of, JobProgress, ProgressSink};
use watchdog::Watchdog;

/// Stderr lines kept for the error message.
const STDERR_TAIL_LINES: usize = 40;

/// One engine invocation.
#[derive(Debug, Clone)]
pub struct EngineRun {
    pub job_id: String,
    pub phase: String,
    pub args: Vec<String>,
    pub initial_timeout: Duration,
    pub progress_timeout: Duration,
    /// Used to turn progress time stamps into percentages
    pub expected_duration_secs: Option<f64>,
}

impl EngineRun {
    pub fn new(job_id: impl Into<String>, phase: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            job_id: job_id.into(),
            phase: phase.into(),
            args,
            initial_timeout: Duration::from_secs(TRANSCODE_INITIAL_TIMEOUT_SECS),
            progress_timeout: Duration::from_secs(TRANSCODE_PROGRESS_TIMEOUT_SECS),
            expected_duration_secs: None,
        }
    }

    pub fn with_timeouts(mut self, initial: Duration, progress: Duration) -> Self {
        self.initial_timeout = initial;
        self.progress_timeout = progress;
        self
    }

    pub fn with_duration(mut self, secs: Option<f64>) -> Self {
        self.expected_duration_secs = secs;
        self
    }
}

fn push_tail(line: String, tail: &mut VecDeque<String>) {
    if tail.len() == STDERR_TAIL_LINES {
        tail.pop_front();
    }
    tail.push_back(line);
}

enum EngineEvent {
    Progress(Option<f64>),
    Stderr(String),
    ErrorLine(String),
}

fn signatures() -> &'static [(Regex, TranscodeFailure)] {
    static SIGNATURES: OnceLock<Vec<(Regex, TranscodeFailure)>> = OnceLock::new();
    SIGNATURES.get_or_init(|| {
        [
            (r"(?i)error reinitializing filters", TranscodeFailure::FilterReinit),
            (r"(?i)failed to inject frame into filter network", TranscodeFailure::FilterReinit),
            (r"(?i)invalid argument", TranscodeFailure::InvalidArgument),
        ]
        .into_iter()
        .filter_map(|(pattern, kind)| Regex::new(pattern).ok().map(|re| (re, kind)))
        .collect()
    })
}

/// Map stderr lines to a failure sub-kind. The first matching signature wins.
pub fn classify_stderr<S: AsRef<str>>(lines: &[S]) -> TranscodeFailure {
    for (re, kind) in signatures() {
        if lines.iter().any(|l| re.is_match(l.as_ref())) {
            return *kind;
        }
    }
    TranscodeFailure::NonZeroExit
}

/// Run ffmpeg to completion.
///
/// The watchdog starts at `initial_timeout` and is reset to `progress_timeout`
/// on every progress event. When it fires the process is killed and
/// `Timeout` is returned. A nonzero exit returns `Transcode` carrying the
/// stderr tail verbatim.
pub fn run(ffmpeg: &Path, job: &EngineRun, sink: &dyn ProgressSink) -> Result<()> {
    log::info!("[{}] Starting {}", job.job_id, job.phase);
    log::debug!("[{}] {} {}", job.job_id, ffmpeg.display(), job.args.join(" "));

    let mut child = FfmpegCommand::new_with_path(ffmpeg)
        .args(&job.args)
        .spawn()
        .map_err(|e| {
            VidshiftError::transcode(TranscodeFailure::Spawn, format!("Failed to start ffmpeg: {}", e))
        })?;

    let events = child.iter().map_err(|e| {
        let _ = child.kill();
        VidshiftError::transcode(TranscodeFailure::Spawn, format!("Failed to read ffmpeg output: {}", e))
    })?;

    let (tx, rx) = mpsc::channel();
    let reader = thread::spawn(move || {
        for event in events {
            let forwarded = match event {
                FfmpegEvent::Progress(p) => EngineEvent::Progress(parse_ffmpeg_time(&p.time)),
                FfmpegEvent::Log(LogLevel::Error | LogLevel::Fatal, line) => EngineEvent::ErrorLine(line),
                FfmpegEvent::Log(_, line) => EngineEvent::Stderr(line),
                FfmpegEvent::Error(line) => EngineEvent::ErrorLine(line),
                _ => continue,
            };
            if tx.send(forwarded).is_err() {
                break;
            }
        }
    });

    let mut dog = Watchdog::new(job.initial_timeout, job.progress_timeout);
    let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);

    loop {
        match rx.recv_timeout(dog.remaining()) {
            Ok(EngineEvent::Progress(secs)) => {
                dog.tick();
                let elapsed = secs.unwrap_or(0.0);
                let percent = percent_of(elapsed, job.expected_duration_secs);
                log::debug!("[{}] {} progress t={:.2}s ({}%)", job.job_id, job.phase, elapsed, percent);
                sink.report(
                    &JobProgress::new(&job.job_id, &job.phase, percent, 100)
                        .with_message(format!("Processing: {}% done", percent)),
                );
            }
            Ok(EngineEvent::Stderr(line)) => push_tail(line, &mut tail),
            Ok(EngineEvent::ErrorLine(line)) => {
                log::warn!("[{}] ffmpeg: {}", job.job_id, line);
                push_tail(line, &mut tail);
            }
            Err(RecvTimeoutError::Timeout) => {
                if !dog.is_expired() {
                    continue;
                }
                let window_secs = dog.window().as_secs();
                log::error!(
                    "[{}] {} made no progress for {}s, killing ffmpeg",
                    job.job_id,
                    job.phase,
                    window_secs
                );
                let _ = child.kill();
                let _ = child.wait();
                sink.report(&JobProgress::new(&job.job_id, &job.phase, 0, 100).cancelled());
                return Err(VidshiftError::Timeout { phase: job.phase.clone(), window_secs });
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    let _ = reader.join();
    let status = child.wait().map_err(|e| {
        VidshiftError::transcode(TranscodeFailure::Other, format!("ffmpeg process error: {}", e))
    })?;

    if !status.success() {
        let lines: Vec<String> = tail.into_iter().collect();
        let kind = classify_stderr(&lines);
        let message = format!(
            "ffmpeg exited with code {}: {}",
            status.code().unwrap_or(-1),
            lines.join("\n")
        );
        sink.report(&JobProgress::new(&job.job_id, &job.phase, 0, 100).error(kind.to_string()));
        return Err(VidshiftError::transcode(kind, message));
    }

    sink.report(&JobProgress::new(&job.job_id, &job.phase, 100, 100).with_message("Processing: 100% done"));
    log::info!("[{}] Finished {}", job.job_id, job.phase);
    Ok(())
}

/// Convert a Path to a String argument, failing on non-UTF8
pub fn path_arg(path: &Path) -> Result<String> {
    path.to_str()
        .map(|s| s.to_string())
        .ok_or_else(|| VidshiftError::InvalidPath(format!("Path contains non-UTF8 characters: {}", path.display())))
}
