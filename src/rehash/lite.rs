// Lite rehash: retime video to 29.97 or 30.01 through input timestamp
// scaling so the stream can be copied, and micro-shift the audio pitch.
// Video is only re-encoded when an overlay has to be blended in.

use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use rand::Rng;

use crate::constants::{LITE_FPS_TARGETS, LITE_NOMINAL_FPS};
use crate::engine::path_arg;
use crate::error::Result;
use crate::filters::num;
use crate::metadata::SourceStreamInfo;

use super::{draw_pitch, finish_args, micro_pitch_filter, overlay_graph, reencode_args, RehashContext};

#[derive(Debug, Clone)]
pub struct LitePlan<'a> {
    pub input: &'a Path,
    pub info: &'a SourceStreamInfo,
    pub target_fps: f64,
    pub overlay: Option<&'a Path>,
    pub pitch: f64,
}

impl LitePlan<'_> {
    /// Timestamp multiplier that moves a nominal 30 fps stream to the target.
    pub fn timestamp_scale(&self) -> f64 {
        LITE_NOMINAL_FPS / self.target_fps
    }

    pub fn args(&self, tags: &[(&'static str, String)], output: &Path) -> Result<Vec<String>> {
        let mut args: Vec<String> = vec![
            "-y".into(),
            "-itsscale:v".into(), num(self.timestamp_scale()),
            "-i".into(), path_arg(self.input)?,
        ];

        match self.overlay {
            Some(overlay) => {
                args.extend(["-stream_loop".into(), "-1".into(), "-i".into(), path_arg(overlay)?]);
                args.extend([
                    "-filter_complex".into(),
                    overlay_graph("0:v", 1, self.info.width, self.info.height, "vout"),
                    "-map".into(), "[vout]".into(),
                ]);
                args.extend(reencode_args());
            }
            None => {
                args.extend(["-map".into(), "0:v:0".into(), "-c:v".into(), "copy".into()]);
            }
        }

        if self.info.has_audio {
            args.extend([
                "-map".into(), "0:a:0".into(),
                "-af".into(), micro_pitch_filter(self.info.sample_rate, self.pitch),
                "-c:a".into(), "aac".into(),
            ]);
        }

        finish_args(&mut args, tags, output)?;
        Ok(args)
    }
}

pub(crate) fn run<R: Rng + ?Sized>(ctx: &RehashContext<'_>, rng: &mut R) -> Result<PathBuf> {
    let target_fps = *LITE_FPS_TARGETS.choose(rng).unwrap_or(&LITE_FPS_TARGETS[0]);
    let plan = LitePlan {
        input: &ctx.job.input_path,
        info: ctx.info,
        target_fps,
        overlay: ctx.overlay,
        pitch: draw_pitch(rng),
    };

    log::info!(
        "[{}] Lite rehash: fps target {}, pitch x{:.4}, overlay {}",
        ctx.job_id,
        target_fps,
        plan.pitch,
        if plan.overlay.is_some() { "yes" } else { "no" }
    );
    ctx.run_engine("rehash-lite", plan.args(ctx.tags, &ctx.job.output_path)?)?;
    Ok(ctx.job.output_path.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flag_values<'a>(args: &'a [String], flag: &str) -> Vec<&'a str> {
        args.iter()
            .enumerate()
            .filter(|(_, a)| *a == flag)
            .filter_map(|(i, _)| args.get(i + 1).map(String::as_str))
            .collect()
    }

    #[test]
    fn test_stream_copy_without_overlay() {
        let info = SourceStreamInfo::default();
        let plan = LitePlan {
            input: Path::new("in.mp4"),
            info: &info,
            target_fps: 29.97,
            overlay: None,
            pitch: 1.01,
        };
        let args = plan.args(&[], Path::new("out.mp4")).unwrap();
        assert_eq!(flag_values(&args, "-itsscale:v"), vec!["1.001001"]);
        assert_eq!(flag_values(&args, "-c:v"), vec!["copy"]);
        assert_eq!(flag_values(&args, "-af"), vec!["asetrate=44541,aresample=44100"]);
        assert!(!args.contains(&"-filter_complex".to_string()));
        assert_eq!(flag_values(&args, "-map_metadata"), vec!["-1"]);
    }

    #[test]
    fn test_overlay_forces_reencode() {
        let info = SourceStreamInfo { has_audio: false, ..Default::default() };
        let plan = LitePlan {
            input: Path::new("in.mp4"),
            info: &info,
            target_fps: 30.01,
            overlay: Some(Path::new("ov.mp4")),
            pitch: 1.005,
        };
        let args = plan.args(&[], Path::new("out.mp4")).unwrap();
        assert_eq!(flag_values(&args, "-c:v"), vec!["libx264"]);
        assert_eq!(flag_values(&args, "-map"), vec!["[vout]"]);
        assert!(flag_values(&args, "-filter_complex")[0].contains("[0:v][ov]overlay"));
        assert!(flag_values(&args, "-af").is_empty());
    }

    #[test]
    fn test_timestamp_scale_sub_percent() {
        let info = SourceStreamInfo::default();
        for target in LITE_FPS_TARGETS {
            let plan = LitePlan { input: Path::new("a"), info: &info, target_fps: target, overlay: None, pitch: 1.01 };
            assert!((plan.timestamp_scale() - 1.0).abs() < 0.01);
        }
    }
}
