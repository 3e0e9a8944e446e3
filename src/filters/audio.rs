// Audio-domain stages in fixed pipeline order:
// noise cleanup, voice enhance, EQ, de-essing, distortion, compression,
// echo (reverb or delay), watermark tremolo, pitch pair, tempo chain.
// Timing-changing stages go last so earlier effects are not re-timed.

use crate::constants::{
    EQ_HIGH_FREQ, EQ_LOW_FREQ, EQ_MID_FREQ, TREMOLO_DEPTH, VOICE_HIGHPASS_HZ, VOICE_LOWPASS_HZ,
};
use crate::error::Result;
use crate::params::AudioParameters;

use super::tempo::tempo_stages;
use super::{num, FilterStage};

/// A present, non-zero value. Zero is identity and skips the stage.
fn active(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v != 0.0)
}

pub fn build_audio_stages(
    audio: &AudioParameters,
    sample_rate: u32,
    speed_multiplier: f64,
    watermark_token: Option<&str>,
) -> Result<Vec<FilterStage>> {
    let mut stages = Vec::new();

    if let Some(nr) = active(audio.noise_reduction) {
        stages.push(FilterStage::new("afftdn").kv("nr", num(nr)));
        stages.push(FilterStage::new("highpass").kv("f", VOICE_HIGHPASS_HZ));
        stages.push(FilterStage::new("lowpass").kv("f", VOICE_LOWPASS_HZ));
    }

    for (freq, gain) in [
        (EQ_LOW_FREQ, audio.eq_low),
        (EQ_MID_FREQ, audio.eq_mid),
        (EQ_HIGH_FREQ, audio.eq_high),
    ] {
        if let Some(g) = active(gain) {
            stages.push(equalizer_stage(freq, g));
        }
    }

    if let Some(d) = active(audio.de_essing) {
        stages.push(FilterStage::new("deesser").kv("i", num(d / 10.0)));
    }

    if let Some(d) = active(audio.distortion) {
        stages.push(distortion_stage(d));
    }

    if let Some(c) = active(audio.compression) {
        stages.push(compression_stage(c));
    }

    if let Some(echo) = echo_stage(audio.reverb, audio.delay) {
        stages.push(echo);
    }

    if let Some(token) = watermark_token.filter(|t| !t.is_empty()) {
        stages.push(tremolo_stage(token));
    }

    // Pitch pair is emitted for any present value, 0 included
    let mut pitch_ratio = 1.0;
    if let Some(semitones) = audio.pitch_semitones {
        let (shift, ratio) = pitch_stages(semitones, sample_rate);
        stages.extend(shift);
        pitch_ratio = ratio;
    }

    // asetrate also speeds playback by the pitch ratio; the tempo chain undoes it
    stages.extend(tempo_stages(speed_multiplier / pitch_ratio)?);

    Ok(stages)
}

fn equalizer_stage(freq: u32, gain: f64) -> FilterStage {
    FilterStage::new("equalizer")
        .kv("f", freq)
        .kv("t", "q")
        .kv("w", 1)
        .kv("g", num(gain))
}

/// Bit-crush depth falls from 16 to 4 bits as distortion rises to 100.
fn distortion_stage(level: f64) -> FilterStage {
    let amount = level / 100.0;
    FilterStage::new("acrusher")
        .kv("bits", num(16.0 - amount * 12.0))
        .kv("mix", num(amount))
        .kv("mode", "log")
        .kv("aa", 1)
}

/// `level` is the gain reduction depth in dB; acompressor wants a linear threshold.
fn compression_stage(level: f64) -> FilterStage {
    let threshold = 10f64.powf(-level / 20.0);
    FilterStage::new("acompressor")
        .kv("threshold", num(threshold))
        .kv("ratio", num(1.0 + level / 10.0))
        .kv("attack", 20)
        .kv("release", 250)
}

/// Short dual taps.
pub fn reverb_stage(level: f64) -> FilterStage {
    let amount = level / 100.0;
    FilterStage::new("aecho")
        .opt("0.8")
        .opt("0.88")
        .opt("60|90")
        .opt(format!("{}|{}", num((amount * 0.4).max(0.001)), num((amount * 0.3).max(0.001))))
}

/// One long tap, 100-1000 ms.
pub fn delay_stage(level: f64) -> FilterStage {
    FilterStage::new("aecho")
        .opt("0.8")
        .opt("0.9")
        .opt(num(100.0 + level * 10.0))
        .opt(num(0.2 + level / 300.0))
}

/// At most one echo: the larger magnitude wins, reverb on ties.
fn echo_stage(reverb: Option<f64>, delay: Option<f64>) -> Option<FilterStage> {
    match (active(reverb), active(delay)) {
        (Some(r), Some(d)) if d.abs() > r.abs() => Some(delay_stage(d)),
        (Some(r), _) => Some(reverb_stage(r)),
        (None, Some(d)) => Some(delay_stage(d)),
        (None, None) => None,
    }
}

/// Imperceptible amplitude wobble whose rate is derived from the token.
fn tremolo_stage(token: &str) -> FilterStage {
    FilterStage::new("tremolo")
        .kv("f", num(tremolo_frequency(token)))
        .kv("d", num(TREMOLO_DEPTH))
}

/// Stable per-token frequency in [5, 15) Hz.
pub fn tremolo_frequency(token: &str) -> f64 {
    let hash = blake3::hash(token.as_bytes());
    let bytes = hash.as_bytes();
    let seed = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    5.0 + (seed % 1000) as f64 / 100.0
}

/// Resample-rate change then resample back. Returns the stages and the
/// effective playback ratio of the pair.
fn pitch_stages(semitones: f64, sample_rate: u32) -> (Vec<FilterStage>, f64) {
    let ratio = 2f64.powf(semitones / 12.0);
    let shifted = (sample_rate as f64 * ratio).round().max(1.0) as u32;
    let stages = vec![
        FilterStage::new("asetrate").opt(shifted.to_string()),
        FilterStage::new("aresample").opt(sample_rate.to_string()),
    ];
    (stages, shifted as f64 / sample_rate as f64)
}
