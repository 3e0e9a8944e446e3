// Vidshift Constants
// Parameter domains, randomization bands, engine limits and timeouts.
// Changing a domain bound changes what clamp() accepts; keep the bands inside the domains.

// ----- Parameter domains (inclusive) -----

pub const SPEED_PERCENT_RANGE: (f64, f64) = (-100.0, 100.0);
pub const SATURATION_RANGE: (f64, f64) = (0.0, 2.0);
pub const BRIGHTNESS_RANGE: (f64, f64) = (-1.0, 1.0);
pub const CONTRAST_RANGE: (f64, f64) = (0.0, 2.0);
pub const FPS_PERCENT_RANGE: (f64, f64) = (-10.0, 10.0);
pub const FPS_PERCENT_UNSET_RANGE: (f64, f64) = (-5.0, 5.0);

pub const REVERB_RANGE: (f64, f64) = (0.0, 100.0);
pub const DELAY_RANGE: (f64, f64) = (0.0, 90.0);
pub const PITCH_SEMITONES_RANGE: (f64, f64) = (-12.0, 12.0);
pub const DISTORTION_RANGE: (f64, f64) = (0.0, 100.0);
pub const NOISE_REDUCTION_RANGE: (f64, f64) = (0.0, 30.0);
pub const EQ_GAIN_RANGE: (f64, f64) = (-15.0, 15.0);
pub const COMPRESSION_RANGE: (f64, f64) = (0.0, 30.0);
pub const DE_ESSING_RANGE: (f64, f64) = (0.0, 10.0);

// Defaults for unset video fields
pub const DEFAULT_SPEED_PERCENT: f64 = 0.0;
pub const DEFAULT_SATURATION: f64 = 1.0;
pub const DEFAULT_BRIGHTNESS: f64 = 0.0;
pub const DEFAULT_CONTRAST: f64 = 1.0;

// -100% speed would be a zero multiplier
pub const MIN_SPEED_MULTIPLIER: f64 = 0.01;

// ----- Variations -----

pub const MIN_VARIATIONS: u32 = 1;
pub const MAX_VARIATIONS: u32 = 5;

// ----- Source stream fallbacks -----

pub const DEFAULT_FPS: f64 = 30.0;
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;
pub const DEFAULT_WIDTH: u32 = 1920;
pub const DEFAULT_HEIGHT: u32 = 1080;

// ----- Engine limits -----

/// atempo only accepts a ratio in [0.5, 2.0] per instance
pub const TEMPO_MIN_RATIO: f64 = 0.5;
pub const TEMPO_MAX_RATIO: f64 = 2.0;

pub const EQ_LOW_FREQ: u32 = 100;
pub const EQ_MID_FREQ: u32 = 1000;
pub const EQ_HIGH_FREQ: u32 = 8000;

pub const VOICE_HIGHPASS_HZ: u32 = 80;
pub const VOICE_LOWPASS_HZ: u32 = 16_000;

pub const TREMOLO_DEPTH: f64 = 0.01;

// ----- Transcode output -----

pub const TRANSCODE_PRESET: &str = "ultrafast";
pub const TRANSCODE_CRF: u32 = 28;
pub const TRANSCODE_THREADS: u32 = 4;
pub const MAX_MUXING_QUEUE_SIZE: u32 = 1024;

pub const REHASH_PRESET: &str = "fast";
pub const REHASH_VIDEO_BITRATE: &str = "2000k";

// ----- Timeouts (seconds) -----

pub const TRANSCODE_INITIAL_TIMEOUT_SECS: u64 = 600;
pub const TRANSCODE_PROGRESS_TIMEOUT_SECS: u64 = 300;
pub const WATERMARK_TIER_TIMEOUT_SECS: u64 = 300;
pub const ASSET_FETCH_TIMEOUT_SECS: u64 = 15;

// ----- Batch pacing (milliseconds) -----

pub const INTER_ITEM_DELAY_MS: u64 = 2000;
pub const INTER_VARIATION_DELAY_MS: u64 = 1000;

// ----- Rehash -----

pub const REHASH_MARGIN_FRACTION: f64 = 0.10;
pub const REHASH_MAX_WINDOW_FRAMES: u64 = 20;
pub const REHASH_MIN_SWAPS: usize = 3;
pub const REHASH_MAX_SWAPS: usize = 5;
pub const REHASH_PITCH_MIN: f64 = 1.005;
pub const REHASH_PITCH_MAX: f64 = 1.015;
pub const REHASH_OVERLAY_OPACITY: f64 = 0.3;
pub const LITE_NOMINAL_FPS: f64 = 30.0;
pub const LITE_FPS_TARGETS: [f64; 2] = [29.97, 30.01];
pub const FRAME_PATTERN: &str = "frame_%05d.png";
pub const REHASH_COMMENT: &str = "Processed with stealth mode script";

pub const OVERLAY_EXTENSIONS: [&str; 4] = ["mp4", "webm", "mov", "mkv"];

// ----- Watermark -----

/// Leading code points at or above this are treated as pictographs
pub const PICTOGRAPH_THRESHOLD: u32 = 0x1F000;
pub const WATERMARK_IMAGE_SIZE: u32 = 400;
pub const WATERMARK_MARGIN: u32 = 20;
pub const WATERMARK_FONT_SIZE: u32 = 48;
pub const WATERMARK_BOX_BORDER: u32 = 10;
pub const WATERMARK_TIER_ATTEMPTS: u32 = 2;
pub const PLACEHOLDER_SIZE: u32 = 72;
pub const PLACEHOLDER_COLOR: &str = "gold";
pub const EMOJI_ASSET_BASE_URL: &str = "https://cdn.jsdelivr.net/gh/twitter/twemoji@14.0.2/assets/72x72";
pub const ASSET_CACHE_SUBDIR: &str = "emoji";
pub const ASSET_KEY_LEN: usize = 16;

// Paths
pub const APP_QUALIFIER: &str = "io";
pub const APP_ORGANIZATION: &str = "vidshift";
pub const APP_NAME: &str = "vidshift";
pub const JOB_DIR_PREFIX: &str = "job_";
