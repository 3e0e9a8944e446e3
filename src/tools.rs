// Vidshift - Engine Binaries
// Where ffmpeg and ffprobe come from when the config names no explicit path.
// An existing VIDSHIFT_* override wins, then a copy shipped beside the
// vidshift binary, then whatever PATH finds.

use std::env;
use std::path::{Path, PathBuf};

fn exe_dir() -> Option<PathBuf> {
    env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|d| d.to_path_buf()))
}

/// `name` as shipped beside the binary, or bare for a PATH lookup.
fn resolve_tool(env_key: &str, name: &str) -> PathBuf {
    if let Ok(value) = env::var(env_key) {
        let overridden = PathBuf::from(&value);
        if overridden.exists() {
            return overridden;
        }
        log::warn!("{} points at missing file {}, ignoring", env_key, value);
    }

    let shipped = if cfg!(windows) { format!("{}.exe", name) } else { name.to_string() };
    exe_dir()
        .into_iter()
        .flat_map(|dir| [dir.join(&shipped), dir.join("bin").join(&shipped)])
        .find(|candidate| candidate.is_file())
        .unwrap_or_else(|| PathBuf::from(name))
}

pub fn ffmpeg_path() -> PathBuf {
    resolve_tool("VIDSHIFT_FFMPEG_PATH", "ffmpeg")
}

pub fn ffprobe_path() -> PathBuf {
    resolve_tool("VIDSHIFT_FFPROBE_PATH", "ffprobe")
}

/// Used by `vidshift doctor`. A clean `-version` exit counts as usable.
pub fn is_tool_available(path: &Path) -> bool {
    std::process::Command::new(path)
        .arg("-version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}
