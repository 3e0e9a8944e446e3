// Vidshift - Watermark Overlay
// Tiered: image overlay for pictographs, drawtext for anything else, and a
// no-op when both fail. Never an error to the caller.

pub mod asset;
pub mod classify;

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::PipelineConfig;
use crate::constants::{
    TRANSCODE_PRESET, WATERMARK_BOX_BORDER, WATERMARK_FONT_SIZE, WATERMARK_IMAGE_SIZE, WATERMARK_MARGIN,
};
use crate::engine::progress::ProgressSink;
use crate::engine::{self, path_arg, EngineRun};
use crate::error::{Result, VidshiftError};

use asset::{AssetAcquisitionError, AssetCache, AssetSource, HttpAssetSource};
use classify::{classify, TokenKind};

/// Why one tier attempt failed. Logged, never returned.
#[derive(thiserror::Error, Debug)]
enum TierError {
    #[error(transparent)]
    Asset(#[from] AssetAcquisitionError),

    #[error(transparent)]
    Engine(#[from] VidshiftError),
}

/// Which tier produced the final file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatermarkTier {
    Image,
    Text,
    /// Input returned unchanged
    None,
}

#[derive(Debug, Clone)]
pub struct WatermarkOutcome {
    pub path: PathBuf,
    pub tier: WatermarkTier,
}

pub struct WatermarkOverlay {
    ffmpeg: PathBuf,
    cache: AssetCache,
    source: Box<dyn AssetSource>,
    font_file: Option<PathBuf>,
    attempts: u32,
    tier_timeout: Duration,
}

impl WatermarkOverlay {
    pub fn new(config: &PipelineConfig) -> Self {
        Self::with_source(config, Box::new(HttpAssetSource::new(config)))
    }

    pub(crate) fn with_source(config: &PipelineConfig, source: Box<dyn AssetSource>) -> Self {
        Self {
            ffmpeg: config.ffmpeg(),
            cache: AssetCache::new(&config.asset_cache_root()),
            source,
            font_file: config.font_file.clone(),
            attempts: config.watermark_tier_attempts.max(1),
            tier_timeout: config.watermark_timeout(),
        }
    }

    /// Watermark `input` into `output`. Returns the path of the file to use
    /// downstream, which is `input` itself when no tier succeeded.
    pub fn apply(&self, job_id: &str, input: &Path, output: &Path, token: &str, sink: &dyn ProgressSink) -> PathBuf {
        self.apply_detailed(job_id, input, output, token, sink).path
    }

    pub fn apply_detailed(
        &self,
        job_id: &str,
        input: &Path,
        output: &Path,
        token: &str,
        sink: &dyn ProgressSink,
    ) -> WatermarkOutcome {
        let unchanged = WatermarkOutcome { path: input.to_path_buf(), tier: WatermarkTier::None };

        let kind = match classify(token) {
            Some(kind) => kind,
            None => return unchanged,
        };

        if let TokenKind::Pictograph(c) = kind {
            let attempt = |n: u32| -> std::result::Result<(), TierError> {
                let asset = self.cache.resolve(c, self.source.as_ref())?;
                log::debug!("[{}] Image watermark attempt {} with {}", job_id, n, asset.display());
                self.run_tier(job_id, "watermark-image", image_args(input, &asset, output)?, sink)?;
                Ok(())
            };
            if self.retry(job_id, "image", output, attempt) {
                return WatermarkOutcome { path: output.to_path_buf(), tier: WatermarkTier::Image };
            }
        }

        let attempt = |_n: u32| -> std::result::Result<(), TierError> {
            let args = text_args(input, token.trim(), self.font_file.as_deref(), output)?;
            self.run_tier(job_id, "watermark-text", args, sink)?;
            Ok(())
        };
        if self.retry(job_id, "text", output, attempt) {
            return WatermarkOutcome { path: output.to_path_buf(), tier: WatermarkTier::Text };
        }

        log::warn!("[{}] Watermark skipped, all tiers failed", job_id);
        unchanged
    }

    /// Up to `attempts` tries. A failed try leaves no partial output behind.
    fn retry<F>(&self, job_id: &str, tier: &str, output: &Path, mut attempt: F) -> bool
    where
        F: FnMut(u32) -> std::result::Result<(), TierError>,
    {
        for n in 1..=self.attempts {
            match attempt(n) {
                Ok(()) if output.exists() => return true,
                Ok(()) => log::warn!("[{}] {} watermark produced no output", job_id, tier),
                Err(e) => log::warn!("[{}] {} watermark attempt {}/{} failed: {}", job_id, tier, n, self.attempts, e),
            }
            let _ = std::fs::remove_file(output);
        }
        false
    }

    fn run_tier(&self, job_id: &str, phase: &str, args: Vec<String>, sink: &dyn ProgressSink) -> Result<()> {
        let run = EngineRun::new(job_id, phase, args).with_timeouts(self.tier_timeout, self.tier_timeout);
        engine::run(&self.ffmpeg, &run, sink)
    }
}

/// Image scaled to 400x400, bottom-right with a 20 px margin. Audio copied.
pub fn image_args(input: &Path, asset: &Path, output: &Path) -> Result<Vec<String>> {
    let graph = format!(
        "[1:v]scale={s}:{s}[wm];[0:v][wm]overlay=W-w-{m}:H-h-{m}[vout]",
        s = WATERMARK_IMAGE_SIZE,
        m = WATERMARK_MARGIN,
    );
    Ok(vec![
        "-y".into(),
        "-i".into(), path_arg(input)?,
        "-i".into(), path_arg(asset)?,
        "-filter_complex".into(), graph,
        "-map".into(), "[vout]".into(),
        "-map".into(), "0:a?".into(),
        "-c:v".into(), "libx264".into(),
        "-preset".into(), TRANSCODE_PRESET.into(),
        "-c:a".into(), "copy".into(),
        path_arg(output)?,
    ])
}

/// Backslash-escape every char in `special`.
fn escape_chars(text: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Unquoted filter option value inside a `-vf` graph. The option parser and
/// the graph parser each strip one level of escaping.
pub fn escape_filter_value(value: &str) -> String {
    let option = escape_chars(value, &['\\', '\'', ':']);
    escape_chars(&option, &['\\', '\'', '[', ']', ',', ';'])
}

/// drawtext `text`: `%` and `\` are expanded by drawtext itself before the
/// filter levels apply.
pub fn escape_drawtext(text: &str) -> String {
    escape_filter_value(&escape_chars(text, &['\\', '%']))
}

pub fn drawtext_filter(text: &str, font_file: Option<&Path>) -> String {
    let font = font_file
        .map(|f| format!("fontfile={}:", escape_filter_value(&f.to_string_lossy())))
        .unwrap_or_default();
    format!(
        "drawtext={font}text={text}:fontsize={size}:fontcolor=white:box=1:boxcolor=black@0.5:\
         boxborderw={border}:x=w-tw-{m}:y=h-th-{m}",
        font = font,
        text = escape_drawtext(text),
        size = WATERMARK_FONT_SIZE,
        border = WATERMARK_BOX_BORDER,
        m = WATERMARK_MARGIN,
    )
}

pub fn text_args(input: &Path, text: &str, font_file: Option<&Path>, output: &Path) -> Result<Vec<String>> {
    Ok(vec![
        "-y".into(),
        "-i".into(), path_arg(input)?,
        "-vf".into(), drawtext_filter(text, font_file),
        "-c:v".into(), "libx264".into(),
        "-preset".into(), TRANSCODE_PRESET.into(),
        "-c:a".into(), "copy".into(),
        path_arg(output)?,
    ])
}
