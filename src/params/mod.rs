// Vidshift - Transformation Parameters
// Holds every numeric knob, clamps it into its safe domain, and draws
// randomized sets for the subtle / full-random modes.

pub mod bands;

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::VidshiftError;
pub use bands::{Band, ParameterBands};

/// Randomization profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ParameterMode {
    /// Barely perceptible changes
    #[default]
    Subtle,
    /// Bands ten times wider than subtle
    Full,
}

impl FromStr for ParameterMode {
    type Err = VidshiftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "subtle" => Ok(ParameterMode::Subtle),
            "full" | "full-random" | "full_random" => Ok(ParameterMode::Full),
            other => Err(VidshiftError::Config(format!("Unknown parameter mode: {}", other))),
        }
    }
}

impl fmt::Display for ParameterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterMode::Subtle => f.write_str("subtle"),
            ParameterMode::Full => f.write_str("full"),
        }
    }
}

/// Audio effect parameters. `None` means the stage is not built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AudioParameters {
    pub reverb: Option<f64>,
    pub delay: Option<f64>,
    pub pitch_semitones: Option<f64>,
    pub distortion: Option<f64>,
    pub noise_reduction: Option<f64>,
    pub eq_low: Option<f64>,
    pub eq_mid: Option<f64>,
    pub eq_high: Option<f64>,
    pub compression: Option<f64>,
    pub de_essing: Option<f64>,
}

/// Full parameter set for one transformation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransformParameters {
    pub speed_percent: Option<f64>,
    pub saturation: Option<f64>,
    pub brightness: Option<f64>,
    pub contrast: Option<f64>,
    /// `None` is resolved to a random value in [-5, 5] when the chain is built
    pub fps_percent: Option<f64>,
    pub audio: AudioParameters,
}

/// Clamp into `range`; NaN counts as unset.
fn clamp_value(value: f64, range: (f64, f64)) -> Option<f64> {
    if value.is_nan() {
        None
    } else {
        Some(value.clamp(range.0, range.1))
    }
}

fn clamp_opt(value: Option<f64>, range: (f64, f64)) -> Option<f64> {
    value.and_then(|v| clamp_value(v, range))
}

fn clamp_or(value: Option<f64>, range: (f64, f64), default: f64) -> Option<f64> {
    Some(clamp_opt(value, range).unwrap_or(default))
}

impl TransformParameters {
    /// Clamp every present field into its domain and fill the video defaults.
    /// Total: out-of-range input is reduced, never rejected.
    pub fn clamp(&self) -> Self {
        let a = &self.audio;
        Self {
            speed_percent: clamp_or(self.speed_percent, SPEED_PERCENT_RANGE, DEFAULT_SPEED_PERCENT),
            saturation: clamp_or(self.saturation, SATURATION_RANGE, DEFAULT_SATURATION),
            brightness: clamp_or(self.brightness, BRIGHTNESS_RANGE, DEFAULT_BRIGHTNESS),
            contrast: clamp_or(self.contrast, CONTRAST_RANGE, DEFAULT_CONTRAST),
            fps_percent: clamp_opt(self.fps_percent, FPS_PERCENT_RANGE),
            audio: AudioParameters {
                reverb: clamp_opt(a.reverb, REVERB_RANGE),
                delay: clamp_opt(a.delay, DELAY_RANGE),
                pitch_semitones: clamp_opt(a.pitch_semitones, PITCH_SEMITONES_RANGE),
                distortion: clamp_opt(a.distortion, DISTORTION_RANGE),
                noise_reduction: clamp_opt(a.noise_reduction, NOISE_REDUCTION_RANGE),
                eq_low: clamp_opt(a.eq_low, EQ_GAIN_RANGE),
                eq_mid: clamp_opt(a.eq_mid, EQ_GAIN_RANGE),
                eq_high: clamp_opt(a.eq_high, EQ_GAIN_RANGE),
                compression: clamp_opt(a.compression, COMPRESSION_RANGE),
                de_essing: clamp_opt(a.de_essing, DE_ESSING_RANGE),
            },
        }
    }

    /// Draw a fresh parameter set from the mode's bands.
    pub fn randomize<R: Rng + ?Sized>(mode: ParameterMode, rng: &mut R) -> Self {
        let bands = ParameterBands::for_mode(mode);
        Self {
            speed_percent: Some(bands.speed_percent.sample(rng)),
            saturation: Some(bands.saturation.sample(rng)),
            brightness: Some(bands.brightness.sample(rng)),
            contrast: Some(bands.contrast.sample(rng)),
            fps_percent: Some(bands.fps_percent.sample(rng)),
            audio: AudioParameters {
                reverb: Some(bands.reverb.sample(rng)),
                delay: Some(bands.delay.sample(rng)),
                pitch_semitones: Some(bands.pitch_semitones.sample(rng)),
                distortion: Some(bands.distortion.sample(rng)),
                noise_reduction: Some(bands.noise_reduction.sample(rng)),
                eq_low: Some(bands.eq.sample(rng)),
                eq_mid: Some(bands.eq.sample(rng)),
                eq_high: Some(bands.eq.sample(rng)),
                compression: Some(bands.compression.sample(rng)),
                de_essing: Some(bands.de_essing.sample(rng)),
            },
        }
        .clamp()
    }

    /// Per-output jitter so two variations never share identical values.
    pub fn jitter<R: Rng + ?Sized>(&self, rng: &mut R) -> Self {
        fn nudge<R: Rng + ?Sized>(value: Option<f64>, spread: f64, rng: &mut R) -> Option<f64> {
            value.map(|v| v + rng.gen_range(-spread..=spread))
        }

        let a = &self.audio;
        Self {
            speed_percent: nudge(self.speed_percent, 0.3, rng),
            saturation: nudge(self.saturation, 0.02, rng),
            brightness: nudge(self.brightness, 0.01, rng),
            contrast: nudge(self.contrast, 0.02, rng),
            fps_percent: nudge(self.fps_percent, 0.2, rng),
            audio: AudioParameters {
                reverb: nudge(a.reverb, 0.2, rng),
                delay: nudge(a.delay, 0.2, rng),
                pitch_semitones: nudge(a.pitch_semitones, 0.05, rng),
                eq_low: nudge(a.eq_low, 0.1, rng),
                eq_mid: nudge(a.eq_mid, 0.1, rng),
                eq_high: nudge(a.eq_high, 0.1, rng),
                ..a.clone()
            },
        }
        .clamp()
    }

    /// Playback-rate multiplier from `speed_percent`, floored above zero.
    pub fn speed_multiplier(&self) -> f64 {
        let pct = self.speed_percent.unwrap_or(DEFAULT_SPEED_PERCENT);
        (1.0 + pct / 100.0).max(MIN_SPEED_MULTIPLIER)
    }

    /// True when every video value is identity and no audio stage is set.
    pub fn is_identity(&self) -> bool {
        let c = self.clamp();
        c.speed_percent == Some(DEFAULT_SPEED_PERCENT)
            && c.saturation == Some(DEFAULT_SATURATION)
            && c.brightness == Some(DEFAULT_BRIGHTNESS)
            && c.contrast == Some(DEFAULT_CONTRAST)
            && c.audio == AudioParameters::default()
    }
}

/// Clamp a requested variation count into [1, 5].
pub fn clamp_variations(count: u32) -> u32 {
    count.clamp(MIN_VARIATIONS, MAX_VARIATIONS)
}
