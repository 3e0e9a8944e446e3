// Watermark image assets: content-addressed on-disk cache, HTTP fetch,
// engine-synthesized placeholder. Failures here stay inside the watermark
// component; callers fall through to the text tier.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::constants::{ASSET_CACHE_SUBDIR, ASSET_KEY_LEN, PLACEHOLDER_COLOR, PLACEHOLDER_SIZE};
use crate::engine::progress::NullProgress;
use crate::engine::{self, path_arg, EngineRun};

use super::classify::codepoint_hex;

#[derive(Error, Debug)]
pub(crate) enum AssetAcquisitionError {
    #[error("asset fetch disabled")]
    FetchDisabled,

    #[error("asset fetch failed: {0}")]
    Http(String),

    #[error("placeholder synthesis disabled")]
    SynthesisDisabled,

    #[error("placeholder synthesis failed: {0}")]
    Synthesis(String),

    #[error("asset cache IO error: {0}")]
    Io(#[from] io::Error),
}

/// Where image assets come from when the cache misses.
pub(crate) trait AssetSource: Send + Sync {
    /// Download the asset for `hex` into `dest`.
    fn fetch(&self, hex: &str, dest: &Path) -> Result<(), AssetAcquisitionError>;

    /// Write a plain placeholder image to `dest`.
    fn synthesize(&self, dest: &Path) -> Result<(), AssetAcquisitionError>;
}

/// Blocking HTTP fetch plus an ffmpeg lavfi placeholder.
pub(crate) struct HttpAssetSource {
    base_url: String,
    timeout: Duration,
    fetch_enabled: bool,
    synthesis_enabled: bool,
    ffmpeg: PathBuf,
    engine_timeout: Duration,
}

impl HttpAssetSource {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            base_url: config.asset_base_url.clone(),
            timeout: Duration::from_secs(config.asset_fetch_timeout_secs),
            fetch_enabled: config.asset_fetch_enabled,
            synthesis_enabled: config.placeholder_synthesis_enabled,
            ffmpeg: config.ffmpeg(),
            engine_timeout: config.watermark_timeout(),
        }
    }

    fn url_for(&self, hex: &str) -> String {
        format!("{}/{}.png", self.base_url.trim_end_matches('/'), hex)
    }
}

/// Temp sibling for an atomic write.
fn temp_sibling(dest: &Path) -> PathBuf {
    dest.with_extension(format!("{}.tmp.png", Uuid::new_v4().simple()))
}

/// Write through a temp file and rename into place.
fn write_atomic(dest: &Path, bytes: &[u8]) -> Result<(), AssetAcquisitionError> {
    let tmp = temp_sibling(dest);
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, dest).map_err(|e| {
        let _ = std::fs::remove_file(&tmp);
        AssetAcquisitionError::Io(e)
    })
}

impl AssetSource for HttpAssetSource {
    fn fetch(&self, hex: &str, dest: &Path) -> Result<(), AssetAcquisitionError> {
        if !self.fetch_enabled {
            return Err(AssetAcquisitionError::FetchDisabled);
        }

        let url = self.url_for(hex);
        log::debug!("Fetching watermark asset {}", url);

        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| AssetAcquisitionError::Http(format!("client error: {e}")))?;

        let bytes = client
            .get(&url)
            .send()
            .map_err(|e| AssetAcquisitionError::Http(format!("network error: {e}")))?
            .error_for_status()
            .map_err(|e| AssetAcquisitionError::Http(format!("HTTP error: {e}")))?
            .bytes()
            .map_err(|e| AssetAcquisitionError::Http(format!("body error: {e}")))?;

        if bytes.is_empty() {
            return Err(AssetAcquisitionError::Http(format!("empty body from {}", url)));
        }
        write_atomic(dest, &bytes)
    }

    fn synthesize(&self, dest: &Path) -> Result<(), AssetAcquisitionError> {
        if !self.synthesis_enabled {
            return Err(AssetAcquisitionError::SynthesisDisabled);
        }

        let tmp = temp_sibling(dest);
        let args = vec![
            "-y".to_string(),
            "-f".to_string(), "lavfi".to_string(),
            "-i".to_string(), format!("color=c={}:s={}x{}", PLACEHOLDER_COLOR, PLACEHOLDER_SIZE, PLACEHOLDER_SIZE),
            "-frames:v".to_string(), "1".to_string(),
            path_arg(&tmp).map_err(|e| AssetAcquisitionError::Synthesis(e.to_string()))?,
        ];
        let run = EngineRun::new("asset", "placeholder", args)
            .with_timeouts(self.engine_timeout, self.engine_timeout);

        let result = engine::run(&self.ffmpeg, &run, &NullProgress)
            .map_err(|e| AssetAcquisitionError::Synthesis(e.to_string()))
            .and_then(|_| std::fs::rename(&tmp, dest).map_err(AssetAcquisitionError::Io));
        if result.is_err() {
            let _ = std::fs::remove_file(&tmp);
        }
        result
    }
}

/// `{cache}/emoji/{key}.png`, key = first 16 hex chars of BLAKE3(code point hex).
/// Entries are never invalidated; concurrent writers produce the same bytes.
#[derive(Debug, Clone)]
pub struct AssetCache {
    root: PathBuf,
}

impl AssetCache {
    pub fn new(cache_root: &Path) -> Self {
        Self { root: cache_root.join(ASSET_CACHE_SUBDIR) }
    }

    pub fn key(hex: &str) -> String {
        let hash = blake3::hash(hex.as_bytes());
        hash.to_hex().as_str()[..ASSET_KEY_LEN].to_string()
    }

    pub fn path_for(&self, hex: &str) -> PathBuf {
        self.root.join(format!("{}.png", Self::key(hex)))
    }

    /// Placeholder shared by every code point, kept apart from fetched assets
    pub fn placeholder_path(&self) -> PathBuf {
        self.root.join("placeholder.png")
    }

    /// Cached asset, else fetched, else placeholder.
    pub(crate) fn resolve(&self, c: char, source: &dyn AssetSource) -> Result<PathBuf, AssetAcquisitionError> {
        let hex = codepoint_hex(c);
        let path = self.path_for(&hex);
        if is_cached(&path) {
            log::debug!("Watermark asset cache hit for U+{}", hex.to_uppercase());
            return Ok(path);
        }

        std::fs::create_dir_all(&self.root)?;

        match source.fetch(&hex, &path) {
            Ok(()) => return Ok(path),
            Err(e) => log::warn!("Watermark asset for U+{} unavailable: {}", hex.to_uppercase(), e),
        }

        let placeholder = self.placeholder_path();
        if !is_cached(&placeholder) {
            source.synthesize(&placeholder)?;
        }
        Ok(placeholder)
    }
}

fn is_cached(path: &Path) -> bool {
    std::fs::metadata(path).map(|m| m.is_file() && m.len() > 0).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts calls; each method succeeds or fails per flag.
    struct FakeSource {
        fetch_ok: bool,
        synth_ok: bool,
        fetches: AtomicUsize,
        synths: AtomicUsize,
    }

    impl FakeSource {
        fn new(fetch_ok: bool, synth_ok: bool) -> Self {
            Self { fetch_ok, synth_ok, fetches: AtomicUsize::new(0), synths: AtomicUsize::new(0) }
        }
    }

    impl AssetSource for FakeSource {
        fn fetch(&self, hex: &str, dest: &Path) -> Result<(), AssetAcquisitionError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.fetch_ok {
                write_atomic(dest, hex.as_bytes())
            } else {
                Err(AssetAcquisitionError::Http("offline".into()))
            }
        }

        fn synthesize(&self, dest: &Path) -> Result<(), AssetAcquisitionError> {
            self.synths.fetch_add(1, Ordering::SeqCst);
            if self.synth_ok {
                write_atomic(dest, b"placeholder")
            } else {
                Err(AssetAcquisitionError::SynthesisDisabled)
            }
        }
    }

    #[test]
    fn test_key_is_stable_and_short() {
        let a = AssetCache::key("1f525");
        assert_eq!(a.len(), 16);
        assert_eq!(a, AssetCache::key("1f525"));
        assert_ne!(a, AssetCache::key("1f600"));
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_fetch_then_cache_hit() {
        let dir = tempfile::tempdir().unwrap();
        let cache = AssetCache::new(dir.path());
        let source = FakeSource::new(true, false);

        let first = cache.resolve('🔥', &source).unwrap();
        let second = cache.resolve('🔥', &source).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, dir.path().join("emoji").join(format!("{}.png", AssetCache::key("1f525"))));
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(std::fs::read_to_string(&first).unwrap(), "1f525");
    }

    #[test]
    fn test_fetch_failure_uses_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let cache = AssetCache::new(dir.path());
        let source = FakeSource::new(false, true);

        let path = cache.resolve('🔥', &source).unwrap();
        assert_eq!(path, cache.placeholder_path());
        cache.resolve('😀', &source).unwrap();
        assert_eq!(source.synths.load(Ordering::SeqCst), 1);
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_everything_fails() {
        let dir = tempfile::tempdir().unwrap();
        let cache = AssetCache::new(dir.path());
        let source = FakeSource::new(false, false);
        assert!(cache.resolve('🔥', &source).is_err());
        assert!(!cache.path_for("1f525").exists());
    }

    #[test]
    fn test_disabled_http_source() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            asset_fetch_enabled: false,
            placeholder_synthesis_enabled: false,
            ..Default::default()
        };
        let source = HttpAssetSource::new(&config);
        let dest = dir.path().join("x.png");
        assert!(matches!(source.fetch("1f525", &dest), Err(AssetAcquisitionError::FetchDisabled)));
        assert!(matches!(source.synthesize(&dest), Err(AssetAcquisitionError::SynthesisDisabled)));
        assert_eq!(source.url_for("1f525"), format!("{}/1f525.png", config.asset_base_url));
    }
}
