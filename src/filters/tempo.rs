// Tempo decomposition for the atempo primitive.
// A single atempo instance only accepts [0.5, 2.0]; larger changes are split
// into k equal-ratio stages, k = ceil(ln m / ln boundary).

use crate::constants::{TEMPO_MAX_RATIO, TEMPO_MIN_RATIO};
use crate::error::{Result, VidshiftError};

use super::{num, FilterStage};

/// Multipliers this close to 1 emit no stage.
const UNITY_EPSILON: f64 = 1e-9;

/// Split `multiplier` into the fewest equal ratios that each fit atempo's range.
/// Returns an empty list for 1.0.
pub fn decompose(multiplier: f64) -> Result<Vec<f64>> {
    if !multiplier.is_finite() || multiplier <= 0.0 {
        return Err(VidshiftError::FilterBuild(format!("Invalid tempo multiplier: {}", multiplier)));
    }
    if (multiplier - 1.0).abs() < UNITY_EPSILON {
        return Ok(Vec::new());
    }

    let boundary = if multiplier > 1.0 { TEMPO_MAX_RATIO } else { TEMPO_MIN_RATIO };
    // Exact powers of the boundary land a hair above an integer in floating point
    let k = (multiplier.ln() / boundary.ln() - UNITY_EPSILON).ceil().max(1.0) as usize;
    let ratio = multiplier
        .powf(1.0 / k as f64)
        .clamp(TEMPO_MIN_RATIO, TEMPO_MAX_RATIO);

    Ok(vec![ratio; k])
}

/// atempo stages for `multiplier`.
pub fn tempo_stages(multiplier: f64) -> Result<Vec<FilterStage>> {
    Ok(decompose(multiplier)?
        .into_iter()
        .map(|r| FilterStage::new("atempo").opt(num(r)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_chain(m: f64) {
        let ratios = decompose(m).unwrap();
        let product: f64 = ratios.iter().product();
        assert!((product - m).abs() < 1e-9 * m.max(1.0), "m={} product={}", m, product);
        for r in &ratios {
            assert!((TEMPO_MIN_RATIO..=TEMPO_MAX_RATIO).contains(r), "m={} ratio={}", m, r);
        }
    }

    #[test]
    fn test_product_equals_target() {
        for m in [0.005, 0.01, 0.1, 0.25, 0.3, 0.5, 0.51, 0.98, 1.02, 1.5, 2.0, 2.5, 4.0, 7.3] {
            assert_chain(m);
        }
    }

    #[test]
    fn test_unity_emits_nothing() {
        assert!(decompose(1.0).unwrap().is_empty());
        assert!(tempo_stages(1.0).unwrap().is_empty());
    }

    #[test]
    fn test_minimum_stage_count() {
        assert_eq!(decompose(1.5).unwrap().len(), 1);
        assert_eq!(decompose(2.0).unwrap().len(), 1);
        assert_eq!(decompose(0.5).unwrap().len(), 1);
        assert_eq!(decompose(4.0).unwrap().len(), 2);
        assert_eq!(decompose(0.25).unwrap().len(), 2);
        assert_eq!(decompose(0.3).unwrap().len(), 2);
        assert_eq!(decompose(0.01).unwrap().len(), 7);
    }

    #[test]
    fn test_invalid_multiplier() {
        assert!(decompose(0.0).is_err());
        assert!(decompose(-1.0).is_err());
        assert!(decompose(f64::NAN).is_err());
    }

    #[test]
    fn test_stage_text() {
        let stages = tempo_stages(4.0).unwrap();
        let rendered: Vec<String> = stages.iter().map(|s| s.to_string()).collect();
        assert_eq!(rendered, vec!["atempo=2", "atempo=2"]);
    }
}
