// Frame window and adjacent-pair swap planning for the full rehash.

use std::path::Path;

use rand::seq::index;
use rand::Rng;

use crate::constants::{REHASH_MARGIN_FRACTION, REHASH_MAX_SWAPS, REHASH_MAX_WINDOW_FRAMES, REHASH_MIN_SWAPS};
use crate::error::{Result, VidshiftError};

/// Fewest interior frames that still hold two swap pairs
pub const MIN_INTERIOR_FRAMES: u64 = 4;

/// Half-open range [start, end) of absolute frame indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameWindow {
    pub start: u64,
    pub end: u64,
}

impl FrameWindow {
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Centre a window of at most 20 frames inside the clip, keeping a 10%
/// margin at each end. `None` when fewer than 4 interior frames remain.
pub fn compute_window(total_frames: u64) -> Option<FrameWindow> {
    let margin = (total_frames as f64 * REHASH_MARGIN_FRACTION).floor() as u64;
    let interior = total_frames.checked_sub(2 * margin)?;
    if interior < MIN_INTERIOR_FRAMES {
        return None;
    }

    let len = interior.min(REHASH_MAX_WINDOW_FRAMES);
    let start = margin + (interior - len) / 2;
    Some(FrameWindow { start, end: start + len })
}

/// Choose 3-5 non-overlapping adjacent pairs in a window of `len` frames.
/// Returns the first index of each pair, ascending. Short windows get at
/// most `len / 2` pairs.
pub fn plan_swaps<R: Rng + ?Sized>(len: usize, rng: &mut R) -> Vec<usize> {
    let count = rng.gen_range(REHASH_MIN_SWAPS..=REHASH_MAX_SWAPS).min(len / 2);
    if count == 0 {
        return Vec::new();
    }

    // Pick `count` slots among len - count, then spread them one apart per
    // earlier pick so no two pairs touch.
    let mut picks = index::sample(rng, len - count, count).into_vec();
    picks.sort_unstable();
    picks
        .into_iter()
        .enumerate()
        .map(|(j, p)| p + j)
        .collect()
}

/// Name of the `index`-th extracted frame (`frame_%05d.png`, numbered from 0).
pub fn frame_name(index: usize) -> String {
    format!("frame_{:05}.png", index)
}

/// Extracted frames in `dir`, counted by consecutive names from 0.
pub fn count_frames(dir: &Path) -> usize {
    (0..).take_while(|i| dir.join(frame_name(*i)).is_file()).count()
}

/// Exchange each planned pair on disk by renaming through a temp name.
/// Pixel data is never touched.
pub fn apply_swaps(dir: &Path, swaps: &[usize]) -> Result<()> {
    for &i in swaps {
        let a = dir.join(frame_name(i));
        let b = dir.join(frame_name(i + 1));
        if !a.is_file() || !b.is_file() {
            return Err(VidshiftError::Other(format!("Swap pair {}/{} missing in {}", i, i + 1, dir.display())));
        }
        let tmp = dir.join(format!(".swap_{:05}.png", i));
        std::fs::rename(&a, &tmp)?;
        std::fs::rename(&b, &a)?;
        std::fs::rename(&tmp, &b)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_window_long_clip() {
        // 1000 frames: margin 100, interior 800, window 20 centred
        let w = compute_window(1000).unwrap();
        assert_eq!(w.len(), 20);
        assert_eq!(w.start, 100 + (800 - 20) / 2);
        assert!(w.start >= 100 && w.end <= 900);
    }

    #[test]
    fn test_window_short_clip() {
        let w = compute_window(10).unwrap();
        assert_eq!((w.start, w.end), (1, 9));
        assert_eq!(compute_window(5), Some(FrameWindow { start: 0, end: 5 }));
        assert_eq!(compute_window(3), None);
        assert_eq!(compute_window(0), None);
    }

    #[test]
    fn test_window_respects_margin_everywhere() {
        for total in 4..500u64 {
            if let Some(w) = compute_window(total) {
                let margin = (total as f64 * 0.1).floor() as u64;
                assert!(w.start >= margin, "total {}", total);
                assert!(w.end <= total - margin, "total {}", total);
                assert!(w.len() <= 20 && w.len() >= 4);
            }
        }
    }

    #[test]
    fn test_swaps_non_overlapping_and_in_range() {
        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let swaps = plan_swaps(20, &mut rng);
            assert!((3..=5).contains(&swaps.len()));
            for pair in swaps.windows(2) {
                assert!(pair[1] >= pair[0] + 2, "{:?}", swaps);
            }
            assert!(swaps.iter().all(|i| i + 1 < 20));
        }
    }

    #[test]
    fn test_swaps_short_window() {
        let mut rng = StdRng::seed_from_u64(4);
        let swaps = plan_swaps(4, &mut rng);
        assert_eq!(swaps, vec![0, 2]);
        assert!(plan_swaps(1, &mut rng).is_empty());
    }

    #[test]
    fn test_apply_swaps_exchanges_files() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..6 {
            std::fs::write(dir.path().join(frame_name(i)), format!("frame{}", i)).unwrap();
        }
        assert_eq!(count_frames(dir.path()), 6);

        apply_swaps(dir.path(), &[0, 3]).unwrap();

        let read = |i: usize| std::fs::read_to_string(dir.path().join(frame_name(i))).unwrap();
        assert_eq!(
            (0..6).map(read).collect::<Vec<_>>(),
            vec!["frame1", "frame0", "frame2", "frame4", "frame3", "frame5"]
        );
        assert_eq!(count_frames(dir.path()), 6);
    }

    #[test]
    fn test_apply_swaps_missing_frame() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(frame_name(0)), "x").unwrap();
        assert!(apply_swaps(dir.path(), &[0]).is_err());
    }
}
