// Vidshift - Pipeline Configuration
// Defaults, optional JSON file, then VIDSHIFT_* environment overrides.
// CLI flags are applied on top by the binary.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::{Result, VidshiftError};
use crate::params::{clamp_variations, ParameterMode};
use crate::rehash::RehashStrategy;
use crate::tools;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineConfig {
    /// Explicit engine binaries; resolved through `tools` when unset
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
    pub overlays_dir: Option<PathBuf>,
    /// Parent of per-job workspaces (system temp dir when unset)
    pub work_dir: Option<PathBuf>,
    pub asset_cache_dir: Option<PathBuf>,
    pub rehash_strategy: RehashStrategy,
    pub mode: ParameterMode,
    pub variations: u32,
    pub transcode_initial_timeout_secs: u64,
    pub transcode_progress_timeout_secs: u64,
    pub watermark_tier_timeout_secs: u64,
    pub watermark_tier_attempts: u32,
    pub asset_fetch_enabled: bool,
    pub asset_base_url: String,
    pub asset_fetch_timeout_secs: u64,
    pub placeholder_synthesis_enabled: bool,
    pub font_file: Option<PathBuf>,
    pub inter_item_delay_ms: u64,
    pub inter_variation_delay_ms: u64,
    pub encoder_preset: String,
    pub encoder_crf: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            ffprobe_path: None,
            overlays_dir: None,
            work_dir: None,
            asset_cache_dir: None,
            rehash_strategy: RehashStrategy::default(),
            mode: ParameterMode::default(),
            variations: MIN_VARIATIONS,
            transcode_initial_timeout_secs: TRANSCODE_INITIAL_TIMEOUT_SECS,
            transcode_progress_timeout_secs: TRANSCODE_PROGRESS_TIMEOUT_SECS,
            watermark_tier_timeout_secs: WATERMARK_TIER_TIMEOUT_SECS,
            watermark_tier_attempts: WATERMARK_TIER_ATTEMPTS,
            asset_fetch_enabled: true,
            asset_base_url: EMOJI_ASSET_BASE_URL.to_string(),
            asset_fetch_timeout_secs: ASSET_FETCH_TIMEOUT_SECS,
            placeholder_synthesis_enabled: true,
            font_file: None,
            inter_item_delay_ms: INTER_ITEM_DELAY_MS,
            inter_variation_delay_ms: INTER_VARIATION_DELAY_MS,
            encoder_preset: TRANSCODE_PRESET.to_string(),
            encoder_crf: TRANSCODE_CRF,
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl PipelineConfig {
    /// Load from an optional JSON file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.apply_env_with(|key| env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            VidshiftError::Config(format!("Cannot read config {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            VidshiftError::Config(format!("Invalid config {}: {}", path.display(), e))
        })?;
        Ok(config.normalized())
    }

    /// Apply overrides from a key lookup (the process environment in `load`).
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("VIDSHIFT_OVERLAYS_DIR").filter(|v| !v.is_empty()) {
            self.overlays_dir = Some(PathBuf::from(dir));
        }
        if let Some(dir) = lookup("VIDSHIFT_WORK_DIR").filter(|v| !v.is_empty()) {
            self.work_dir = Some(PathBuf::from(dir));
        }
        if let Some(dir) = lookup("VIDSHIFT_CACHE_DIR").filter(|v| !v.is_empty()) {
            self.asset_cache_dir = Some(PathBuf::from(dir));
        }
        if let Some(strategy) = lookup("VIDSHIFT_STRATEGY").filter(|v| !v.is_empty()) {
            self.rehash_strategy = strategy.parse()?;
        }
        if let Some(flag) = lookup("VIDSHIFT_ASSET_FETCH") {
            self.asset_fetch_enabled = parse_bool(&flag).ok_or_else(|| {
                VidshiftError::Config(format!("VIDSHIFT_ASSET_FETCH must be a boolean, got {}", flag))
            })?;
        }
        *self = std::mem::take(self).normalized();
        Ok(())
    }

    /// Pull counts back into range.
    pub fn normalized(mut self) -> Self {
        self.variations = clamp_variations(self.variations);
        self.watermark_tier_attempts = self.watermark_tier_attempts.max(1);
        self
    }

    pub fn ffmpeg(&self) -> PathBuf {
        self.ffmpeg_path.clone().unwrap_or_else(tools::ffmpeg_path)
    }

    pub fn ffprobe(&self) -> PathBuf {
        self.ffprobe_path.clone().unwrap_or_else(tools::ffprobe_path)
    }

    pub fn work_root(&self) -> PathBuf {
        self.work_dir
            .clone()
            .unwrap_or_else(|| env::temp_dir().join(APP_NAME))
    }

    /// Asset cache root: configured dir, else the platform cache dir, else temp.
    pub fn asset_cache_root(&self) -> PathBuf {
        if let Some(dir) = &self.asset_cache_dir {
            return dir.clone();
        }
        directories::ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.cache_dir().to_path_buf())
            .unwrap_or_else(|| env::temp_dir().join(APP_NAME).join("cache"))
    }

    pub fn transcode_timeouts(&self) -> (Duration, Duration) {
        (
            Duration::from_secs(self.transcode_initial_timeout_secs),
            Duration::from_secs(self.transcode_progress_timeout_secs),
        )
    }

    pub fn watermark_timeout(&self) -> Duration {
        Duration::from_secs(self.watermark_tier_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let c = PipelineConfig::default();
        assert_eq!(c.transcode_initial_timeout_secs, 600);
        assert_eq!(c.transcode_progress_timeout_secs, 300);
        assert_eq!(c.watermark_tier_attempts, 2);
        assert_eq!(c.inter_item_delay_ms, 2000);
        assert_eq!(c.variations, 1);
        assert!(c.asset_fetch_enabled);
    }

    #[test]
    fn test_from_file_partial_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vidshift.json");
        std::fs::write(
            &path,
            r#"{"rehashStrategy": "lite", "variations": 12, "assetFetchEnabled": false}"#,
        )
        .unwrap();
        let c = PipelineConfig::from_file(&path).unwrap();
        assert_eq!(c.rehash_strategy, RehashStrategy::Lite);
        assert_eq!(c.variations, 5);
        assert!(!c.asset_fetch_enabled);
        assert_eq!(c.encoder_crf, TRANSCODE_CRF);
    }

    #[test]
    fn test_from_file_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(PipelineConfig::from_file(&path), Err(VidshiftError::Config(_))));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("VIDSHIFT_OVERLAYS_DIR", "/srv/overlays"),
            ("VIDSHIFT_STRATEGY", "lite"),
            ("VIDSHIFT_ASSET_FETCH", "off"),
        ]
        .into_iter()
        .collect();
        let mut c = PipelineConfig::default();
        c.apply_env_with(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(c.overlays_dir, Some(PathBuf::from("/srv/overlays")));
        assert_eq!(c.rehash_strategy, RehashStrategy::Lite);
        assert!(!c.asset_fetch_enabled);
    }

    #[test]
    fn test_env_bad_bool() {
        let mut c = PipelineConfig::default();
        let result = c.apply_env_with(|k| (k == "VIDSHIFT_ASSET_FETCH").then(|| "maybe".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_cache_root_override() {
        let c = PipelineConfig { asset_cache_dir: Some(PathBuf::from("/tmp/x")), ..Default::default() };
        assert_eq!(c.asset_cache_root(), PathBuf::from("/tmp/x"));
    }
}
