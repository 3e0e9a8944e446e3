// FFprobe wrapper for source stream facts

use std::path::Path;
use std::process::Command;
use serde::Deserialize;

use crate::constants::{DEFAULT_FPS, DEFAULT_HEIGHT, DEFAULT_SAMPLE_RATE, DEFAULT_WIDTH};
use crate::error::{VidshiftError, Result};
use crate::metadata::SourceStreamInfo;

#[derive(Debug, Deserialize)]
struct FFprobeOutput {
    streams: Option<Vec<FFprobeStream>>,
    format: Option<FFprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FFprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    sample_rate: Option<String>,
    duration: Option<String>,
    nb_frames: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FFprobeFormat {
    duration: Option<String>,
}

/// Run ffprobe on a file and extract the facts the filter builder needs.
/// Fails with `Probe` when the file has no decodable video stream.
pub fn probe(ffprobe: &Path, path: &Path) -> Result<SourceStreamInfo> {
    if !path.exists() {
        return Err(VidshiftError::Probe(format!("Input not found: {}", path.display())));
    }

    let output = Command::new(ffprobe)
        .args([
            "-v", "quiet",
            "-print_format", "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .output()
        .map_err(|e| VidshiftError::Probe(format!("Failed to run ffprobe: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(VidshiftError::Probe(format!("ffprobe failed: {}", stderr)));
    }

    parse_probe_json(&output.stdout)
}

/// Turn ffprobe JSON into `SourceStreamInfo`, applying the documented defaults.
pub fn parse_probe_json(json: &[u8]) -> Result<SourceStreamInfo> {
    let probe_output: FFprobeOutput = serde_json::from_slice(json)
        .map_err(|e| VidshiftError::Probe(format!("Failed to parse ffprobe output: {}", e)))?;

    let streams = probe_output.streams.unwrap_or_default();

    let video = streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| VidshiftError::Probe("No video stream found".to_string()))?;
    let audio = streams.iter().find(|s| s.codec_type.as_deref() == Some("audio"));

    let rate_str = video.r_frame_rate.as_deref().or(video.avg_frame_rate.as_deref());
    let fps = parse_frame_rate(rate_str).unwrap_or(DEFAULT_FPS);

    let duration_secs = parse_seconds(video.duration.as_deref()).or_else(|| {
        probe_output
            .format
            .as_ref()
            .and_then(|f| parse_seconds(f.duration.as_deref()))
    });

    let sample_rate = audio
        .and_then(|a| a.sample_rate.as_deref())
        .and_then(|s| s.parse::<u32>().ok())
        .filter(|sr| *sr > 0)
        .unwrap_or(DEFAULT_SAMPLE_RATE);

    Ok(SourceStreamInfo {
        fps,
        fps_rational: rate_str.map(str::to_string),
        sample_rate,
        width: video.width.filter(|w| *w > 0).unwrap_or(DEFAULT_WIDTH),
        height: video.height.filter(|h| *h > 0).unwrap_or(DEFAULT_HEIGHT),
        duration_secs,
        frame_count: video.nb_frames.as_deref().and_then(|n| n.parse().ok()),
        has_audio: audio.is_some(),
    })
}

/// Parse frame rate string like "30000/1001" to f64. Zero or malformed rates yield None.
pub fn parse_frame_rate(rate_str: Option<&str>) -> Option<f64> {
    let rate_str = rate_str?;
    let fps = if let Some((num, den)) = rate_str.split_once('/') {
        let num: f64 = num.trim().parse().ok()?;
        let den: f64 = den.trim().parse().ok()?;
        if den <= 0.0 {
            return None;
        }
        num / den
    } else {
        rate_str.trim().parse().ok()?
    };

    if fps.is_finite() && fps > 0.0 {
        Some(fps)
    } else {
        None
    }
}

fn parse_seconds(duration_str: Option<&str>) -> Option<f64> {
    duration_str?
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite() && *d > 0.0)
}
