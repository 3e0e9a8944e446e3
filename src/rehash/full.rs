// Full rehash: EXTRACT_WINDOW -> SWAP_PAIRS -> RECOMPOSE -> CLEANUP.
// Probe and overlay selection happen in the engine before this runs.

use std::path::{Path, PathBuf};

use rand::Rng;

use crate::constants::FRAME_PATTERN;
use crate::engine::path_arg;
use crate::error::Result;
use crate::filters::num;
use crate::metadata::SourceStreamInfo;

use super::window::{apply_swaps, count_frames, plan_swaps, FrameWindow};
use super::workspace::JobWorkspace;
use super::{draw_pitch, finish_args, lite, micro_pitch_filter, overlay_graph, reencode_args, RehashContext};

/// Per-segment normalisation so concat sees matching streams
const SEGMENT_NORM: &str = "setpts=PTS-STARTPTS,settb=AVTB,setsar=1,format=yuv420p";

/// Pull frames [start, end) out as a numbered PNG sequence starting at 0.
pub fn extraction_args(input: &Path, window: FrameWindow, frames_dir: &Path) -> Result<Vec<String>> {
    Ok(vec![
        "-y".into(),
        "-i".into(), path_arg(input)?,
        "-vf".into(), format!("select=between(n\\,{}\\,{})", window.start, window.end - 1),
        "-vsync".into(), "0".into(),
        "-frames:v".into(), window.len().to_string(),
        "-start_number".into(), "0".into(),
        path_arg(&frames_dir.join(FRAME_PATTERN))?,
    ])
}

/// Head, swapped window, tail reassembled into one stream.
#[derive(Debug, Clone)]
pub struct Recompose<'a> {
    pub input: &'a Path,
    pub frames_dir: &'a Path,
    pub info: &'a SourceStreamInfo,
    /// Absolute frame range the extracted sequence replaces
    pub window: FrameWindow,
    pub overlay: Option<&'a Path>,
    pub pitch: f64,
}

impl Recompose<'_> {
    fn has_head(&self) -> bool {
        self.window.start > 0
    }

    fn has_tail(&self) -> bool {
        self.info.total_frames().map_or(true, |total| self.window.end < total)
    }

    /// Frames in (head, window, tail), when the total is known.
    pub fn segment_frames(&self) -> Option<(u64, u64, u64)> {
        let total = self.info.total_frames()?;
        Some((self.window.start, self.window.len(), total.saturating_sub(self.window.end)))
    }

    pub fn filter_graph(&self) -> String {
        let mut parts: Vec<String> = Vec::new();

        let (head_src, tail_src) = match (self.has_head(), self.has_tail()) {
            (true, true) => {
                parts.push("[0:v]split=2[hsrc][tsrc]".to_string());
                ("[hsrc]", "[tsrc]")
            }
            _ => ("[0:v]", "[0:v]"),
        };

        let mut segments: Vec<&str> = Vec::new();
        if self.has_head() {
            parts.push(format!("{}trim=end_frame={},{}[head]", head_src, self.window.start, SEGMENT_NORM));
            segments.push("[head]");
        }
        parts.push(format!("[1:v]{}[mid]", SEGMENT_NORM));
        segments.push("[mid]");
        if self.has_tail() {
            parts.push(format!("{}trim=start_frame={},{}[tail]", tail_src, self.window.end, SEGMENT_NORM));
            segments.push("[tail]");
        }

        let joined = if segments.len() > 1 {
            parts.push(format!("{}concat=n={}:v=1:a=0[cat]", segments.concat(), segments.len()));
            "cat"
        } else {
            "mid"
        };

        let video_out = match self.overlay {
            Some(_) => {
                parts.push(overlay_graph(joined, 2, self.info.width, self.info.height, "vout"));
                "vout"
            }
            None => joined,
        };
        if video_out != "vout" {
            parts.push(format!("[{}]null[vout]", video_out));
        }

        if self.info.has_audio {
            parts.push(format!("[0:a]{}[aout]", micro_pitch_filter(self.info.sample_rate, self.pitch)));
        }

        parts.join(";")
    }

    pub fn args(&self, tags: &[(&'static str, String)], output: &Path) -> Result<Vec<String>> {
        let framerate = self
            .info
            .fps_rational
            .clone()
            .unwrap_or_else(|| num(self.info.fps));

        let mut args: Vec<String> = vec![
            "-y".into(),
            "-i".into(), path_arg(self.input)?,
            "-framerate".into(), framerate,
            "-start_number".into(), "0".into(),
            "-i".into(), path_arg(&self.frames_dir.join(FRAME_PATTERN))?,
        ];
        if let Some(overlay) = self.overlay {
            args.extend(["-stream_loop".into(), "-1".into(), "-i".into(), path_arg(overlay)?]);
        }

        args.extend(["-filter_complex".into(), self.filter_graph()]);
        args.extend(["-map".into(), "[vout]".into()]);
        if self.info.has_audio {
            args.extend(["-map".into(), "[aout]".into(), "-c:a".into(), "aac".into()]);
        }
        args.extend(reencode_args());
        finish_args(&mut args, tags, output)?;
        Ok(args)
    }
}

pub(crate) fn run<R: Rng + ?Sized>(ctx: &RehashContext<'_>, window: FrameWindow, rng: &mut R) -> Result<PathBuf> {
    let job_id = ctx.job_id;
    let scratch = JobWorkspace::create(ctx.work_root())?;

    log::info!(
        "[{}] Full rehash: frames {}..{} of {:?}",
        job_id,
        window.start,
        window.end,
        ctx.info.total_frames()
    );
    ctx.run_engine("rehash-extract", extraction_args(&ctx.job.input_path, window, scratch.path())?)?;

    // The container frame count can be off; trust what landed on disk
    let extracted = count_frames(scratch.path());
    if extracted < 2 {
        log::warn!("[{}] Only {} frames extracted, using lite rehash", job_id, extracted);
        drop(scratch);
        return lite::run(ctx, rng);
    }
    let window = FrameWindow { start: window.start, end: window.start + extracted as u64 };

    let swaps = plan_swaps(extracted, rng);
    apply_swaps(scratch.path(), &swaps)?;
    log::info!("[{}] Swapped {} frame pairs at {:?}", job_id, swaps.len(), swaps);

    let recompose = Recompose {
        input: &ctx.job.input_path,
        frames_dir: scratch.path(),
        info: ctx.info,
        window,
        overlay: ctx.overlay,
        pitch: draw_pitch(rng),
    };
    ctx.run_engine("rehash-recompose", recompose.args(ctx.tags, &ctx.job.output_path)?)?;

    if let Err(e) = scratch.cleanup() {
        log::warn!("[{}] {}", job_id, e);
    }
    Ok(ctx.job.output_path.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(total: u64, has_audio: bool) -> SourceStreamInfo {
        SourceStreamInfo {
            fps: 30.0,
            fps_rational: Some("30/1".into()),
            width: 1280,
            height: 720,
            frame_count: Some(total),
            duration_secs: Some(total as f64 / 30.0),
            has_audio,
            ..Default::default()
        }
    }

    #[test]
    fn test_extraction_args() {
        let args = extraction_args(
            Path::new("in.mp4"),
            FrameWindow { start: 490, end: 510 },
            Path::new("/tmp/job_x"),
        )
        .unwrap();
        assert!(args.contains(&"select=between(n\\,490\\,509)".to_string()));
        assert!(args.contains(&"20".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("/tmp/job_x/frame_%05d.png"));
    }

    #[test]
    fn test_graph_three_segments_with_audio() {
        let info = info(1000, true);
        let r = Recompose {
            input: Path::new("in.mp4"),
            frames_dir: Path::new("/tmp/f"),
            info: &info,
            window: FrameWindow { start: 490, end: 510 },
            overlay: None,
            pitch: 1.01,
        };
        let g = r.filter_graph();
        assert!(g.contains("[0:v]split=2[hsrc][tsrc]"));
        assert!(g.contains("[hsrc]trim=end_frame=490,"));
        assert!(g.contains("[tsrc]trim=start_frame=510,"));
        assert!(g.contains("[head][mid][tail]concat=n=3:v=1:a=0[cat]"));
        assert!(g.contains("[cat]null[vout]"));
        assert!(g.contains("[0:a]asetrate=44541,aresample=44100[aout]"));
    }

    #[test]
    fn test_head_and_tail_frames_untouched() {
        let info = info(1000, false);
        let r = Recompose {
            input: Path::new("in.mp4"),
            frames_dir: Path::new("/tmp/f"),
            info: &info,
            window: FrameWindow { start: 490, end: 510 },
            overlay: None,
            pitch: 1.015,
        };
        let (head, mid, tail) = r.segment_frames().unwrap();
        assert_eq!(head, 490);
        assert_eq!(tail, 490);
        assert_eq!(head + mid + tail, 1000);
        // Only the audio is retimed, by at most 1.5%
        assert!((1.0 - 1.0 / r.pitch) <= 0.015);
    }

    #[test]
    fn test_graph_with_overlay_and_no_head() {
        let info = info(5, false);
        let r = Recompose {
            input: Path::new("in.mp4"),
            frames_dir: Path::new("/tmp/f"),
            info: &info,
            window: FrameWindow { start: 0, end: 5 },
            overlay: Some(Path::new("/ov/a.webm")),
            pitch: 1.01,
        };
        let g = r.filter_graph();
        assert!(!g.contains("split"));
        assert!(!g.contains("concat"));
        assert!(g.contains("[mid][ov]overlay=0:0:shortest=1[vout]"));
        assert!(!g.contains("[aout]"));

        let args = r.args(&[("title", "x fresh_edit_1".to_string())], Path::new("out.mp4")).unwrap();
        let loop_idx = args.iter().position(|a| a == "-stream_loop").unwrap();
        assert_eq!(args[loop_idx + 1], "-1");
        assert_eq!(args[loop_idx + 3], "/ov/a.webm");
        assert!(args.contains(&"title=x fresh_edit_1".to_string()));
        assert!(!args.contains(&"[aout]".to_string()));
    }
}
