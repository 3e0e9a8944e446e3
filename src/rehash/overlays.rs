// Overlay clip discovery for the rehash composite

use std::fs::File;
use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use rand::Rng;
use walkdir::WalkDir;

use crate::constants::OVERLAY_EXTENSIONS;

/// Usable overlay clips directly inside `dir`, sorted by path.
/// A missing or unreadable directory yields an empty list.
pub fn discover_overlays(dir: &Path) -> Vec<PathBuf> {
    if !dir.is_dir() {
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file() && is_overlay_file(p) && is_readable(p))
        .collect();

    // Sort by path for consistent ordering
    files.sort();
    files
}

/// Extension check only
pub fn is_overlay_file(path: &Path) -> bool {
    let ext = match path.extension().and_then(|e| e.to_str()) {
        Some(e) => e.to_lowercase(),
        None => return false,
    };
    OVERLAY_EXTENSIONS.contains(&ext.as_str())
}

fn is_readable(path: &Path) -> bool {
    let non_empty = std::fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false);
    non_empty && File::open(path).is_ok()
}

/// Pick one overlay at random. `None` when no directory is configured or
/// nothing usable is in it; that is not an error.
pub fn select_overlay<R: Rng + ?Sized>(dir: Option<&Path>, rng: &mut R) -> Option<PathBuf> {
    let dir = dir?;
    let overlays = discover_overlays(dir);
    let chosen = overlays.choose(rng).cloned();
    match &chosen {
        Some(p) => log::info!("Overlay selected: {}", p.display()),
        None => log::debug!("No usable overlays in {}", dir.display()),
    }
    chosen
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_discover_filters_extension_and_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.mp4"), b"data").unwrap();
        std::fs::write(dir.path().join("b.WEBM"), b"data").unwrap();
        std::fs::write(dir.path().join("c.mov"), b"").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"data").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("d.mkv"), b"data").unwrap();

        let found = discover_overlays(dir.path());
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.mp4", "b.WEBM"]);
    }

    #[test]
    fn test_missing_dir_is_not_an_error() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(discover_overlays(Path::new("/nonexistent/overlays")).is_empty());
        assert!(select_overlay(Some(Path::new("/nonexistent/overlays")), &mut rng).is_none());
        assert!(select_overlay(None, &mut rng).is_none());
    }

    #[test]
    fn test_select_from_available() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("only.mkv"), b"data").unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(select_overlay(Some(dir.path()), &mut rng), Some(dir.path().join("only.mkv")));
    }
}
