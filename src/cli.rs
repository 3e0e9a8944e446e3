// Vidshift CLI binary

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing_subscriber::EnvFilter;

use vidshift_lib::engine::progress::LogProgress;
use vidshift_lib::metadata::ffprobe;
use vidshift_lib::{tools, BatchRequest, ParameterMode, Pipeline, PipelineConfig, RehashStrategy, TransformParameters};

#[derive(Parser)]
#[command(name = "vidshift")]
#[command(about = "Vidshift - fingerprint-altering video transformations", long_about = None)]
#[command(version)]
struct Cli {
    /// JSON config file (VIDSHIFT_* env vars are applied on top)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Transform one or more videos
    Process {
        /// Input video files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Output directory
        #[arg(short, long)]
        out_dir: PathBuf,
        /// Parameter bands: subtle or full
        #[arg(short, long)]
        mode: Option<ParameterMode>,
        /// Variations per video (1-5)
        #[arg(short, long)]
        variations: Option<u32>,
        /// Watermark token (emoji or text)
        #[arg(short, long)]
        watermark: Option<String>,
        /// Rehash strategy: full or lite
        #[arg(long)]
        strategy: Option<RehashStrategy>,
        /// Directory of overlay clips
        #[arg(long)]
        overlays: Option<PathBuf>,
        /// Seed for reproducible parameter draws
        #[arg(long)]
        seed: Option<u64>,
        /// Explicit parameters as JSON instead of random bands
        #[arg(long)]
        params: Option<PathBuf>,
    },

    /// Show probed stream facts for a video
    Probe {
        input: PathBuf,
    },

    /// Print a randomized parameter set as JSON
    Params {
        #[arg(short, long, default_value = "subtle")]
        mode: ParameterMode,
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Check that ffmpeg and ffprobe are usable
    Doctor,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = PipelineConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Process { inputs, out_dir, mode, variations, watermark, strategy, overlays, seed, params } => {
            let mut config = config;
            if let Some(mode) = mode {
                config.mode = mode;
            }
            if let Some(v) = variations {
                config.variations = v;
            }
            if let Some(s) = strategy {
                config.rehash_strategy = s;
            }
            if overlays.is_some() {
                config.overlays_dir = overlays;
            }
            cmd_process(config, inputs, out_dir, watermark, seed, params)
        }
        Commands::Probe { input } => cmd_probe(&config, input),
        Commands::Params { mode, seed } => cmd_params(mode, seed),
        Commands::Doctor => cmd_doctor(&config),
    }
}

fn rng_from(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

fn cmd_process(
    config: PipelineConfig,
    inputs: Vec<PathBuf>,
    out_dir: PathBuf,
    watermark: Option<String>,
    seed: Option<u64>,
    params: Option<PathBuf>,
) -> Result<()> {
    let params = match params {
        Some(path) => {
            let data = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let parsed: TransformParameters = serde_json::from_str(&data)
                .with_context(|| format!("Invalid parameters in {}", path.display()))?;
            Some(parsed)
        }
        None => None,
    };

    let request = BatchRequest {
        inputs,
        out_dir,
        variations: config.variations,
        mode: config.mode,
        params,
        watermark,
    };

    println!(
        "Processing {} videos ({} mode, {} rehash, {} variations)",
        request.inputs.len(),
        config.mode,
        config.rehash_strategy,
        config.variations
    );

    let pipeline = Pipeline::new(config);
    let mut rng = rng_from(seed);
    let report = pipeline.process_batch(&request, &LogProgress::new(), &mut rng)?;

    println!();
    println!("Batch complete:");
    println!("  Succeeded: {}", report.succeeded.len());
    println!("  Failed:    {}", report.failed.len());
    for item in &report.succeeded {
        println!("  ok    {} (v{}) -> {}", item.input.display(), item.variation, item.output.display());
    }
    for failure in &report.failed {
        println!("  FAIL  {} (v{}): {}", failure.input.display(), failure.variation, failure.message);
    }

    if !report.failed.is_empty() && report.succeeded.is_empty() {
        anyhow::bail!("All {} outputs failed", report.failed.len());
    }
    Ok(())
}

fn cmd_probe(config: &PipelineConfig, input: PathBuf) -> Result<()> {
    let info = ffprobe::probe(&config.ffprobe(), &input)?;

    println!("File:        {}", input.display());
    println!("Resolution:  {}x{}", info.width, info.height);
    match &info.fps_rational {
        Some(rate) => println!("FPS:         {:.3} ({})", info.fps, rate),
        None => println!("FPS:         {:.3}", info.fps),
    }
    if let Some(duration) = info.duration_secs {
        println!("Duration:    {:.2}s", duration);
    }
    if let Some(frames) = info.total_frames() {
        println!("Frames:      {}", frames);
    }
    if info.has_audio {
        println!("Audio:       {} Hz", info.sample_rate);
    } else {
        println!("Audio:       none");
    }
    Ok(())
}

fn cmd_params(mode: ParameterMode, seed: Option<u64>) -> Result<()> {
    let mut rng = rng_from(seed);
    let params = TransformParameters::randomize(mode, &mut rng);
    println!("{}", serde_json::to_string_pretty(&params)?);
    Ok(())
}

fn cmd_doctor(config: &PipelineConfig) -> Result<()> {
    let ffmpeg = config.ffmpeg();
    let ffprobe = config.ffprobe();
    let ffmpeg_ok = tools::is_tool_available(&ffmpeg);
    let ffprobe_ok = tools::is_tool_available(&ffprobe);

    let status = |ok: bool| if ok { "ok" } else { "MISSING" };
    println!("ffmpeg:      {} ({})", status(ffmpeg_ok), ffmpeg.display());
    println!("ffprobe:     {} ({})", status(ffprobe_ok), ffprobe.display());
    println!("Work dir:    {}", config.work_root().display());
    println!("Asset cache: {}", config.asset_cache_root().display());
    match &config.overlays_dir {
        Some(dir) => println!("Overlays:    {}", dir.display()),
        None => println!("Overlays:    none"),
    }

    if !(ffmpeg_ok && ffprobe_ok) {
        anyhow::bail!("Required tools are missing");
    }
    Ok(())
}
