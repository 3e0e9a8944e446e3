// Vidshift - Filter Chain Builder
// Turns clamped parameters plus probed stream facts into ordered video and
// audio filter stages, and renders them into ffmpeg -vf / -af strings.

pub mod audio;
pub mod tempo;
pub mod video;

use std::fmt;

use rand::Rng;
use serde::Serialize;

use crate::constants::FPS_PERCENT_UNSET_RANGE;
use crate::error::{Result, VidshiftError};
use crate::metadata::SourceStreamInfo;
use crate::params::TransformParameters;

/// One named filter with its ordered options, rendered as `name=a:b:c`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterStage {
    pub name: String,
    pub options: Vec<String>,
}

impl FilterStage {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), options: Vec::new() }
    }

    pub fn opt(mut self, option: impl Into<String>) -> Self {
        self.options.push(option.into());
        self
    }

    /// Append a `key=value` option.
    pub fn kv(mut self, key: &str, value: impl fmt::Display) -> Self {
        self.options.push(format!("{}={}", key, value));
        self
    }

    /// Value of a `key=value` option, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.options.iter().find_map(|o| {
            o.split_once('=')
                .filter(|(k, _)| *k == key)
                .map(|(_, v)| v)
        })
    }
}

impl fmt::Display for FilterStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.options.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}={}", self.name, self.options.join(":"))
        }
    }
}

/// Immutable result of one build: both stage lists plus the output rate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterChain {
    pub video: Vec<FilterStage>,
    pub audio: Vec<FilterStage>,
    /// Floored playback multiplier the stages were built for
    pub speed_multiplier: f64,
    /// Resolved fps adjustment in percent (drawn when the caller left it unset)
    pub fps_percent: f64,
    pub output_fps: f64,
}

impl FilterChain {
    pub fn video_graph(&self) -> Option<String> {
        render(&self.video)
    }

    pub fn audio_graph(&self) -> Option<String> {
        render(&self.audio)
    }

    pub fn audio_stage_names(&self) -> Vec<&str> {
        self.audio.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn video_stage_names(&self) -> Vec<&str> {
        self.video.iter().map(|s| s.name.as_str()).collect()
    }
}

fn render(stages: &[FilterStage]) -> Option<String> {
    if stages.is_empty() {
        return None;
    }
    Some(
        stages
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(","),
    )
}

/// Format a number for a filter option: up to six decimals, trailing zeros dropped.
pub(crate) fn num(value: f64) -> String {
    let s = format!("{:.6}", value);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s.is_empty() || s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

/// Build the full chain for one output.
///
/// Parameters are clamped first. An unset `fps_percent` is drawn from `rng`
/// in [-5, 5]. A source with an unusable frame or sample rate fails with
/// `FilterBuild` before any stage is produced.
pub fn build_filter_chain<R: Rng + ?Sized>(
    params: &TransformParameters,
    info: &SourceStreamInfo,
    watermark_token: Option<&str>,
    rng: &mut R,
) -> Result<FilterChain> {
    if !info.fps.is_finite() || info.fps <= 0.0 {
        return Err(VidshiftError::FilterBuild(format!("Unusable source frame rate: {}", info.fps)));
    }
    if info.sample_rate == 0 {
        return Err(VidshiftError::FilterBuild("Source sample rate is zero".to_string()));
    }

    let params = params.clamp();
    let speed = params.speed_multiplier();

    let fps_percent = params
        .fps_percent
        .unwrap_or_else(|| rng.gen_range(FPS_PERCENT_UNSET_RANGE.0..=FPS_PERCENT_UNSET_RANGE.1));
    let output_fps = info.fps * (1.0 + fps_percent / 100.0);

    let video = video::build_video_stages(&params, speed);
    let audio = if info.has_audio {
        audio::build_audio_stages(&params.audio, info.sample_rate, speed, watermark_token)?
    } else {
        log::debug!("Source has no audio stream, skipping audio stages");
        Vec::new()
    };

    log::debug!(
        "Filter chain: speed x{:.3}, fps {:.3} -> {:.3} ({:+.2}%), {} video / {} audio stages",
        speed,
        info.fps,
        output_fps,
        fps_percent,
        video.len(),
        audio.len()
    );

    Ok(FilterChain { video, audio, speed_multiplier: speed, fps_percent, output_fps })
}
