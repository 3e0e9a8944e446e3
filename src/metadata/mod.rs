// Source stream facts and container metadata

pub mod ffprobe;
pub mod synth;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_FPS, DEFAULT_HEIGHT, DEFAULT_SAMPLE_RATE, DEFAULT_WIDTH};

pub use synth::MetadataBundle;

/// Facts probed once per input. Read-only after probing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceStreamInfo {
    /// Frames per second (30 when the stream does not report a usable rate)
    pub fps: f64,
    /// Rate as reported, e.g. "30000/1001"
    pub fps_rational: Option<String>,
    pub sample_rate: u32,
    pub width: u32,
    pub height: u32,
    pub duration_secs: Option<f64>,
    /// Frame count from the container, if reported
    pub frame_count: Option<u64>,
    pub has_audio: bool,
}

impl Default for SourceStreamInfo {
    fn default() -> Self {
        Self {
            fps: DEFAULT_FPS,
            fps_rational: None,
            sample_rate: DEFAULT_SAMPLE_RATE,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            duration_secs: None,
            frame_count: None,
            has_audio: true,
        }
    }
}

impl SourceStreamInfo {
    /// Total frames: container count when present, otherwise duration x fps.
    pub fn total_frames(&self) -> Option<u64> {
        self.frame_count.filter(|n| *n > 0).or_else(|| {
            self.duration_secs
                .filter(|d| *d > 0.0)
                .map(|d| (d * self.fps).floor() as u64)
        })
    }
}
