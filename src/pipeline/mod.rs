// Vidshift - Processing Pipeline
// Per-video: Transcode -> Rehash -> Watermark inside one job workspace.
// Batches run videos one after another; a failed video never stops the rest.


use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use rand::Rng;
use serde::Serialize;

use crate::config::PipelineConfig;
use crate::engine::progress::ProgressSink;
use crate::error::{Result, VidshiftError};
use crate::filters::build_filter_chain;
use crate::metadata::{ffprobe, MetadataBundle};
use crate::params::{clamp_variations, ParameterMode, TransformParameters};
use crate::rehash::{JobWorkspace, RehashEngine, RehashJob};
use crate::transcode::TranscodeExecutor;
use crate::watermark::WatermarkOverlay;

/// What a batch should produce.
#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub inputs: Vec<PathBuf>,
    pub out_dir: PathBuf,
    pub variations: u32,
    pub mode: ParameterMode,
    /// Explicit base parameters; drawn from `mode` bands when unset
    pub params: Option<TransformParameters>,
    pub watermark: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItem {
    pub input: PathBuf,
    pub variation: u32,
    pub output: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchFailure {
    pub input: PathBuf,
    pub variation: u32,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub succeeded: Vec<BatchItem>,
    pub failed: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct Pipeline {
    config: PipelineConfig,
    transcode: TranscodeExecutor,
    rehash: RehashEngine,
    watermark: WatermarkOverlay,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let config = config.normalized();
        Self {
            transcode: TranscodeExecutor::new(&config),
            rehash: RehashEngine::new(&config),
            watermark: WatermarkOverlay::new(&config),
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run one video through every stage and move the result to `output`.
    /// Intermediates live in the job workspace and are removed on every path.
    pub fn process_video<R: Rng + ?Sized>(
        &self,
        input: &Path,
        output: &Path,
        params: &TransformParameters,
        watermark: Option<&str>,
        sink: &dyn ProgressSink,
        rng: &mut R,
    ) -> Result<PathBuf> {
        let info = ffprobe::probe(&self.config.ffprobe(), input)?;
        let watermark = watermark.map(str::trim).filter(|t| !t.is_empty());
        let chain = build_filter_chain(params, &info, watermark, rng)?;
        let metadata = MetadataBundle::generate(rng);

        let workspace = JobWorkspace::create(&self.config.work_root())?;
        let job_id = workspace.id().to_string();
        log::info!(
            "[{}] Processing {} -> {} ({} rehash)",
            job_id,
            input.display(),
            output.display(),
            self.rehash.strategy()
        );
        if params.is_identity() && watermark.is_none() {
            log::info!("[{}] Identity parameters, only container metadata changes", job_id);
        }

        let transcoded = workspace.join("transcoded.mp4");
        self.transcode
            .execute(&job_id, input, &chain, &metadata, &info, &transcoded, sink)?;

        let rehash_job = RehashJob::new(&transcoded, workspace.join("rehashed.mp4"))
            .with_overlays(self.config.overlays_dir.clone())
            .with_watermark(watermark.map(str::to_string));
        let rehashed = self.rehash.run(&job_id, &rehash_job, sink, rng)?;

        let finished = match rehash_job.watermark_token.as_deref() {
            Some(token) => self
                .watermark
                .apply(&job_id, &rehashed, &workspace.join("watermarked.mp4"), token, sink),
            None => rehashed,
        };

        move_into_place(&finished, output)?;
        if let Err(e) = workspace.cleanup() {
            log::warn!("[{}] {}", job_id, e);
        }
        log::info!("[{}] Finished {}", job_id, output.display());
        Ok(output.to_path_buf())
    }

    /// Every (video, variation) pair in order. Failures are recorded, not raised.
    pub fn process_batch<R: Rng + ?Sized>(
        &self,
        request: &BatchRequest,
        sink: &dyn ProgressSink,
        rng: &mut R,
    ) -> Result<BatchReport> {
        std::fs::create_dir_all(&request.out_dir)?;

        let variations = clamp_variations(request.variations);
        let bases: Vec<TransformParameters> = (0..variations)
            .map(|_| match &request.params {
                Some(p) => p.clamp(),
                None => TransformParameters::randomize(request.mode, rng),
            })
            .collect();

        log::info!(
            "Batch: {} videos x {} variations ({} outputs)",
            request.inputs.len(),
            variations,
            request.inputs.len() * variations as usize
        );

        let mut report = BatchReport::default();
        for (i, input) in request.inputs.iter().enumerate() {
            if i > 0 {
                pause(self.config.inter_item_delay_ms);
            }

            for (v, base) in bases.iter().enumerate() {
                if v > 0 {
                    pause(self.config.inter_variation_delay_ms);
                }
                let variation = v as u32 + 1;
                let output = request.out_dir.join(output_name(input, variation, variations));
                // Caller-supplied parameters are used as given; only drawn sets are jittered
                let params = match request.params {
                    Some(_) => base.clone(),
                    None => base.jitter(rng),
                };

                match self.process_video(input, &output, &params, request.watermark.as_deref(), sink, rng) {
                    Ok(output) => report.succeeded.push(BatchItem {
                        input: input.clone(),
                        variation,
                        output,
                    }),
                    Err(e) => {
                        if e.is_timeout() {
                            log::error!("Stalled {} (variation {}): {}", input.display(), variation, e);
                        } else {
                            log::error!("Failed {} (variation {}): {}", input.display(), variation, e);
                        }
                        let _ = std::fs::remove_file(&output);
                        report.failed.push(BatchFailure {
                            input: input.clone(),
                            variation,
                            message: e.to_string(),
                        });
                    }
                }
            }
        }

        log::info!(
            "Batch complete: {} succeeded, {} failed",
            report.succeeded.len(),
            report.failed.len()
        );
        Ok(report)
    }
}

/// `output_{stem}.mp4`, with `_v{n}` when more than one variation is produced.
pub fn output_name(input: &Path, variation: u32, variations: u32) -> String {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "video".to_string());
    if variations > 1 {
        format!("output_{}_v{}.mp4", stem, variation)
    } else {
        format!("output_{}.mp4", stem)
    }
}

/// Rename, or copy when the workspace sits on another filesystem.
fn move_into_place(from: &Path, to: &Path) -> Result<()> {
    if let Some(parent) = to.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    if std::fs::rename(from, to).is_ok() {
        return Ok(());
    }
    std::fs::copy(from, to).map_err(|e| {
        VidshiftError::Other(format!("Failed to move {} to {}: {}", from.display(), to.display(), e))
    })?;
    Ok(())
}

fn pause(ms: u64) {
    if ms > 0 {
        thread::sleep(Duration::from_millis(ms));
    }
}
