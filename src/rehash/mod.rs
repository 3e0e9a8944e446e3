// Vidshift - Rehash Engine
// Fingerprint-alteration pass. The full strategy reorders a few adjacent
// frames in the middle of the clip; the lite strategy only retimes the
// stream. Both micro-shift the audio pitch, optionally blend an overlay clip
// and rewrite the container tags.

pub mod full;
pub mod lite;
pub mod overlays;
pub mod window;
pub mod workspace;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::constants::{
    REHASH_COMMENT, REHASH_OVERLAY_OPACITY, REHASH_PITCH_MAX, REHASH_PITCH_MIN, REHASH_PRESET,
    REHASH_VIDEO_BITRATE,
};
use crate::engine::progress::ProgressSink;
use crate::engine::{self, path_arg, EngineRun};
use crate::error::{Result, VidshiftError};
use crate::filters::num;
use crate::metadata::synth::metadata_args;
use crate::metadata::{ffprobe, MetadataBundle, SourceStreamInfo};

pub use workspace::JobWorkspace;

/// Which rehash pass to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RehashStrategy {
    /// Frame surgery: extract, swap, recompose
    #[default]
    Full,
    /// Timing and pitch only, stream copy where possible
    Lite,
}

impl FromStr for RehashStrategy {
    type Err = VidshiftError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "full" => Ok(RehashStrategy::Full),
            "lite" | "light" => Ok(RehashStrategy::Lite),
            other => Err(VidshiftError::Config(format!("Unknown rehash strategy: {}", other))),
        }
    }
}

impl fmt::Display for RehashStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RehashStrategy::Full => f.write_str("full"),
            RehashStrategy::Lite => f.write_str("lite"),
        }
    }
}

/// One rehash of one file. Produces exactly one output or fails.
#[derive(Debug, Clone)]
pub struct RehashJob {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub overlays_dir: Option<PathBuf>,
    pub watermark_token: Option<String>,
}

impl RehashJob {
    pub fn new(input_path: impl Into<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            input_path: input_path.into(),
            output_path: output_path.into(),
            overlays_dir: None,
            watermark_token: None,
        }
    }

    pub fn with_overlays(mut self, dir: Option<PathBuf>) -> Self {
        self.overlays_dir = dir;
        self
    }

    pub fn with_watermark(mut self, token: Option<String>) -> Self {
        self.watermark_token = token;
        self
    }

    fn stem(&self) -> String {
        self.input_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "video".to_string())
    }
}

#[derive(Debug, Clone)]
pub struct RehashEngine {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    strategy: RehashStrategy,
    work_root: PathBuf,
    initial_timeout: Duration,
    progress_timeout: Duration,
}

/// Everything a strategy needs for one job.
pub(crate) struct RehashContext<'a> {
    pub engine: &'a RehashEngine,
    pub job_id: &'a str,
    pub job: &'a RehashJob,
    pub info: &'a SourceStreamInfo,
    pub overlay: Option<&'a Path>,
    pub tags: &'a [(&'static str, String)],
    pub sink: &'a dyn ProgressSink,
}

impl RehashContext<'_> {
    pub fn run_engine(&self, phase: &str, args: Vec<String>) -> Result<()> {
        let run = EngineRun::new(self.job_id, phase, args)
            .with_timeouts(self.engine.initial_timeout, self.engine.progress_timeout)
            .with_duration(self.info.duration_secs);
        engine::run(&self.engine.ffmpeg, &run, self.sink)
    }

    pub fn work_root(&self) -> &Path {
        &self.engine.work_root
    }
}

impl RehashEngine {
    pub fn new(config: &PipelineConfig) -> Self {
        let (initial_timeout, progress_timeout) = config.transcode_timeouts();
        Self {
            ffmpeg: config.ffmpeg(),
            ffprobe: config.ffprobe(),
            strategy: config.rehash_strategy,
            work_root: config.work_root(),
            initial_timeout,
            progress_timeout,
        }
    }

    pub fn strategy(&self) -> RehashStrategy {
        self.strategy
    }

    /// Probe, pick an overlay, then run the configured strategy.
    /// The full strategy drops to lite when the clip is too short for frame surgery.
    pub fn run<R: Rng + ?Sized>(
        &self,
        job_id: &str,
        job: &RehashJob,
        sink: &dyn ProgressSink,
        rng: &mut R,
    ) -> Result<PathBuf> {
        let info = ffprobe::probe(&self.ffprobe, &job.input_path)?;
        let overlay = overlays::select_overlay(job.overlays_dir.as_deref(), rng);

        let edit_id: u32 = rng.gen_range(0..=1000);
        let tags = MetadataBundle::generate(rng).rehash_tags(&job.stem(), edit_id, REHASH_COMMENT);

        let ctx = RehashContext {
            engine: self,
            job_id,
            job,
            info: &info,
            overlay: overlay.as_deref(),
            tags: &tags,
            sink,
        };

        match self.strategy {
            RehashStrategy::Full => match info.total_frames().and_then(window::compute_window) {
                Some(w) => full::run(&ctx, w, rng),
                None => {
                    log::info!(
                        "[{}] Clip too short for frame surgery ({:?} frames), using lite rehash",
                        job_id,
                        info.total_frames()
                    );
                    lite::run(&ctx, rng)
                }
            },
            RehashStrategy::Lite => lite::run(&ctx, rng),
        }
    }
}

/// Sub-percent pitch factor in [1.005, 1.015].
pub fn draw_pitch<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    rng.gen_range(REHASH_PITCH_MIN..=REHASH_PITCH_MAX)
}

/// `asetrate` then `aresample` back to the source rate.
pub fn micro_pitch_filter(sample_rate: u32, pitch: f64) -> String {
    let shifted = (sample_rate as f64 * pitch).round() as u64;
    format!("asetrate={},aresample={}", shifted, sample_rate)
}

/// Scale input `input_idx` to the frame size and blend it over `base` at 30%.
pub fn overlay_graph(base: &str, input_idx: usize, width: u32, height: u32, out: &str) -> String {
    format!(
        "[{idx}:v]scale={w}:{h},format=yuva420p,colorchannelmixer=aa={a}[ov];[{base}][ov]overlay=0:0:shortest=1[{out}]",
        idx = input_idx,
        w = width,
        h = height,
        a = num(REHASH_OVERLAY_OPACITY),
        base = base,
        out = out,
    )
}

/// Encoder settings for any rehash output that must be re-encoded.
pub fn reencode_args() -> Vec<String> {
    vec![
        "-c:v".into(), "libx264".into(),
        "-preset".into(), REHASH_PRESET.into(),
        "-b:v".into(), REHASH_VIDEO_BITRATE.into(),
        "-pix_fmt".into(), "yuv420p".into(),
    ]
}

/// Drop source tags, write the rehash tags, then the output path.
pub fn finish_args(args: &mut Vec<String>, tags: &[(&'static str, String)], output: &Path) -> Result<()> {
    args.extend(["-map_metadata".to_string(), "-1".to_string()]);
    args.extend(metadata_args(tags));
    args.extend(["-movflags".to_string(), "+faststart".to_string()]);
    args.push(path_arg(output)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::progress::NullProgress;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_strategy_parse() {
        assert_eq!("full".parse::<RehashStrategy>().unwrap(), RehashStrategy::Full);
        assert_eq!("LITE".parse::<RehashStrategy>().unwrap(), RehashStrategy::Lite);
        assert!("turbo".parse::<RehashStrategy>().is_err());
        assert_eq!(RehashStrategy::Lite.to_string(), "lite");
    }

    #[test]
    fn test_pitch_bounds() {
        let mut rng = StdRng::seed_from_u64(8);
        for _ in 0..100 {
            let p = draw_pitch(&mut rng);
            assert!((1.005..=1.015).contains(&p));
        }
    }

    #[test]
    fn test_micro_pitch_filter() {
        assert_eq!(micro_pitch_filter(44100, 1.01), "asetrate=44541,aresample=44100");
    }

    #[test]
    fn test_overlay_graph() {
        let g = overlay_graph("cat", 2, 1280, 720, "vout");
        assert_eq!(
            g,
            "[2:v]scale=1280:720,format=yuva420p,colorchannelmixer=aa=0.3[ov];[cat][ov]overlay=0:0:shortest=1[vout]"
        );
    }

    #[test]
    fn test_job_stem() {
        let job = RehashJob::new("/in/holiday clip.mp4", "/out/x.mp4");
        assert_eq!(job.stem(), "holiday clip");
    }

    #[test]
    fn test_missing_input_is_probe_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            ffmpeg_path: Some(PathBuf::from("/nonexistent/ffmpeg")),
            ffprobe_path: Some(PathBuf::from("/nonexistent/ffprobe")),
            work_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let engine = RehashEngine::new(&config);
        let job = RehashJob::new(dir.path().join("missing.mp4"), dir.path().join("out.mp4"));
        let mut rng = StdRng::seed_from_u64(0);
        let err = engine.run("job_t", &job, &NullProgress, &mut rng).unwrap_err();
        assert!(matches!(err, VidshiftError::Probe(_)));
    }
}
