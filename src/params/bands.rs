// Randomization bands per parameter mode.
// Subtle bands are the "barely perceptible" profile; full bands are ten times wider.

use rand::Rng;

use super::ParameterMode;

/// Inclusive sampling band. Integer bands draw whole numbers only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub min: f64,
    pub max: f64,
    pub integer: bool,
}

impl Band {
    pub const fn real(min: f64, max: f64) -> Self {
        Self { min, max, integer: false }
    }

    pub const fn whole(min: f64, max: f64) -> Self {
        Self { min, max, integer: true }
    }

    pub fn width(&self) -> f64 {
        self.max - self.min
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        if self.integer {
            rng.gen_range(self.min as i64..=self.max as i64) as f64
        } else {
            rng.gen_range(self.min..=self.max)
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ParameterBands {
    pub speed_percent: Band,
    pub saturation: Band,
    pub brightness: Band,
    pub contrast: Band,
    pub fps_percent: Band,
    pub reverb: Band,
    pub delay: Band,
    pub pitch_semitones: Band,
    pub distortion: Band,
    pub noise_reduction: Band,
    pub eq: Band,
    pub compression: Band,
    pub de_essing: Band,
}

impl ParameterBands {
    pub const SUBTLE: ParameterBands = ParameterBands {
        speed_percent: Band::whole(-2.0, 2.0),
        saturation: Band::real(0.95, 1.05),
        brightness: Band::real(-0.05, 0.05),
        contrast: Band::real(0.95, 1.05),
        fps_percent: Band::real(-1.0, 1.0),
        reverb: Band::whole(0.0, 2.0),
        delay: Band::whole(0.0, 1.0),
        pitch_semitones: Band::real(-0.2, 0.2),
        distortion: Band::whole(0.0, 5.0),
        noise_reduction: Band::whole(0.0, 2.0),
        eq: Band::real(-0.5, 0.5),
        compression: Band::whole(0.0, 2.0),
        de_essing: Band::whole(0.0, 1.0),
    };

    pub const FULL: ParameterBands = ParameterBands {
        speed_percent: Band::real(-20.0, 20.0),
        saturation: Band::real(0.5, 1.5),
        brightness: Band::real(-0.5, 0.5),
        contrast: Band::real(0.5, 1.5),
        fps_percent: Band::real(-10.0, 10.0),
        reverb: Band::real(0.0, 20.0),
        delay: Band::real(0.0, 10.0),
        pitch_semitones: Band::real(-2.0, 2.0),
        distortion: Band::real(0.0, 50.0),
        noise_reduction: Band::real(0.0, 20.0),
        eq: Band::real(-5.0, 5.0),
        compression: Band::real(0.0, 20.0),
        de_essing: Band::real(0.0, 10.0),
    };

    pub fn for_mode(mode: ParameterMode) -> &'static ParameterBands {
        match mode {
            ParameterMode::Subtle => &Self::SUBTLE,
            ParameterMode::Full => &Self::FULL,
        }
    }
}
