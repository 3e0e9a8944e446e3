// Vidshift - Transcode Executor
// Composes the filter chain and metadata tags into a single ffmpeg run.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::PipelineConfig;
use crate::constants::{MAX_MUXING_QUEUE_SIZE, TRANSCODE_THREADS};
use crate::engine::{self, path_arg, EngineRun};
use crate::engine::progress::ProgressSink;
use crate::error::{Result, TranscodeFailure, VidshiftError};
use crate::filters::{num, FilterChain};
use crate::metadata::synth::metadata_args;
use crate::metadata::{MetadataBundle, SourceStreamInfo};

#[derive(Debug, Clone)]
pub struct TranscodeExecutor {
    ffmpeg: PathBuf,
    preset: String,
    crf: u32,
    initial_timeout: Duration,
    progress_timeout: Duration,
}

impl TranscodeExecutor {
    pub fn new(config: &PipelineConfig) -> Self {
        let (initial_timeout, progress_timeout) = config.transcode_timeouts();
        Self {
            ffmpeg: config.ffmpeg(),
            preset: config.encoder_preset.clone(),
            crf: config.encoder_crf,
            initial_timeout,
            progress_timeout,
        }
    }

    /// Full argument vector for one transcode.
    pub fn build_args(
        &self,
        input: &Path,
        chain: &FilterChain,
        metadata: &MetadataBundle,
        output: &Path,
    ) -> Result<Vec<String>> {
        let mut args: Vec<String> = vec!["-y".into(), "-i".into(), path_arg(input)?];

        if let Some(vf) = chain.video_graph() {
            args.extend(["-vf".into(), vf]);
        }
        if let Some(af) = chain.audio_graph() {
            args.extend(["-af".into(), af]);
        }

        args.extend([
            "-r".into(), num(chain.output_fps),
            "-c:v".into(), "libx264".into(),
            "-preset".into(), self.preset.clone(),
            "-crf".into(), self.crf.to_string(),
            "-c:a".into(), "aac".into(),
            "-threads".into(), TRANSCODE_THREADS.to_string(),
            "-max_muxing_queue_size".into(), MAX_MUXING_QUEUE_SIZE.to_string(),
            "-map_metadata".into(), "-1".into(),
        ]);
        args.extend(metadata_args(&metadata.tags()));
        args.extend(["-movflags".into(), "+faststart".into()]);
        args.push(path_arg(output)?);

        Ok(args)
    }

    /// Run the transcode. On engine failure a partially written output is left for the caller.
    pub fn execute(
        &self,
        job_id: &str,
        input: &Path,
        chain: &FilterChain,
        metadata: &MetadataBundle,
        info: &SourceStreamInfo,
        output: &Path,
        sink: &dyn ProgressSink,
    ) -> Result<PathBuf> {
        let args = self.build_args(input, chain, metadata, output)?;
        let expected = info.duration_secs.map(|d| d / chain.speed_multiplier);

        log::info!(
            "[{}] Transcoding {} (fps {:.3} -> {:.3}, speed x{:.3})",
            job_id,
            input.display(),
            info.fps,
            chain.output_fps,
            chain.speed_multiplier
        );

        let run = EngineRun::new(job_id, "transcode", args)
            .with_timeouts(self.initial_timeout, self.progress_timeout)
            .with_duration(expected);
        engine::run(&self.ffmpeg, &run, sink)?;

        if !output.exists() {
            return Err(VidshiftError::transcode(
                TranscodeFailure::Other,
                format!("ffmpeg reported success but {} is missing", output.display()),
            ));
        }
        Ok(output.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::progress::NullProgress;
    use crate::filters::build_filter_chain;
    use crate::params::TransformParameters;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn executor(ffmpeg: &str) -> TranscodeExecutor {
        let config = PipelineConfig { ffmpeg_path: Some(PathBuf::from(ffmpeg)), ..Default::default() };
        TranscodeExecutor::new(&config)
    }

    fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.iter().position(|a| a == flag).and_then(|i| args.get(i + 1)).map(|s| s.as_str())
    }

    #[test]
    fn test_identity_args_rewrite_metadata() {
        let mut rng = StdRng::seed_from_u64(1);
        let info = SourceStreamInfo::default();
        let chain = build_filter_chain(&TransformParameters::default(), &info, None, &mut rng).unwrap();
        let metadata = MetadataBundle::generate(&mut rng);
        let args = executor("ffmpeg")
            .build_args(Path::new("in.mp4"), &chain, &metadata, Path::new("out.mp4"))
            .unwrap();

        assert_eq!(args.first().map(String::as_str), Some("-y"));
        assert_eq!(args.last().map(String::as_str), Some("out.mp4"));
        assert_eq!(flag_value(&args, "-vf"), Some("eq=saturation=1:brightness=0:contrast=1,drawgrid=width=10:height=10:thickness=1:color=0x00000001"));
        assert_eq!(flag_value(&args, "-af"), None);
        assert_eq!(flag_value(&args, "-preset"), Some("ultrafast"));
        assert_eq!(flag_value(&args, "-crf"), Some("28"));
        assert_eq!(flag_value(&args, "-threads"), Some("4"));
        assert_eq!(flag_value(&args, "-max_muxing_queue_size"), Some("1024"));
        assert_eq!(flag_value(&args, "-movflags"), Some("+faststart"));
        assert_eq!(flag_value(&args, "-r"), Some(num(chain.output_fps).as_str()));

        let tags = args.iter().filter(|a| *a == "-metadata").count();
        assert_eq!(tags, metadata.tags().len());
        assert!(args.contains(&format!("device_model={}", metadata.device_model)));
    }

    #[test]
    fn test_execute_missing_engine_fails_typed() {
        let mut rng = StdRng::seed_from_u64(2);
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.mp4");
        std::fs::write(&input, b"not a video").unwrap();
        let info = SourceStreamInfo::default();
        let chain = build_filter_chain(&TransformParameters::default(), &info, None, &mut rng).unwrap();
        let metadata = MetadataBundle::generate(&mut rng);

        let err = executor("/nonexistent/vidshift/ffmpeg")
            .execute("job_t", &input, &chain, &metadata, &info, &dir.path().join("out.mp4"), &NullProgress)
            .unwrap_err();
        assert!(matches!(err, VidshiftError::Transcode { kind: TranscodeFailure::Spawn, .. }));
    }
}
