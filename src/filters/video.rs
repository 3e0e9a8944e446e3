// Video-domain stages: speed (setpts), color (eq), and a near-invisible mesh.

use crate::constants::{DEFAULT_BRIGHTNESS, DEFAULT_CONTRAST, DEFAULT_SATURATION};
use crate::params::TransformParameters;

use super::{num, FilterStage};

/// 10x10 grid at alpha 0x01
fn mesh_stage() -> FilterStage {
    FilterStage::new("drawgrid")
        .kv("width", 10)
        .kv("height", 10)
        .kv("thickness", 1)
        .kv("color", "0x00000001")
}

/// `params` must already be clamped; `speed` is the floored multiplier.
pub fn build_video_stages(params: &TransformParameters, speed: f64) -> Vec<FilterStage> {
    let mut stages = Vec::with_capacity(3);

    if speed != 1.0 {
        stages.push(FilterStage::new("setpts").opt(format!("{}*PTS", num(1.0 / speed))));
    }

    // eq is always emitted, identity values included
    stages.push(
        FilterStage::new("eq")
            .kv("saturation", num(params.saturation.unwrap_or(DEFAULT_SATURATION)))
            .kv("brightness", num(params.brightness.unwrap_or(DEFAULT_BRIGHTNESS)))
            .kv("contrast", num(params.contrast.unwrap_or(DEFAULT_CONTRAST))),
    );

    stages.push(mesh_stage());
    stages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_video() {
        let params = TransformParameters::default().clamp();
        let stages = build_video_stages(&params, params.speed_multiplier());
        let rendered: Vec<String> = stages.iter().map(|s| s.to_string()).collect();
        assert_eq!(
            rendered,
            vec![
                "eq=saturation=1:brightness=0:contrast=1",
                "drawgrid=width=10:height=10:thickness=1:color=0x00000001",
            ]
        );
    }

    #[test]
    fn test_speed_up_shortens_pts() {
        let params = TransformParameters { speed_percent: Some(25.0), ..Default::default() }.clamp();
        let stages = build_video_stages(&params, params.speed_multiplier());
        assert_eq!(stages[0].to_string(), "setpts=0.8*PTS");
    }
}
