use serde::{Deserialize, Serialize};

use super::sky::SkySignal;

/// Whether detector read noise or sky shot noise dominates a sub.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NoiseRegime {
    /// Read noise in electrons.
    pub read_noise: f64,
    /// Sky shot noise per pixel per sub, in electrons.
    pub sky_noise: f64,
    pub read_noise_dominant: bool,
    pub sky_rate_electrons_per_second: f64,
}

/// Compare read noise with the sky shot noise of the current sub.
///
/// A non-positive sky signal counts as read-noise dominated.
pub fn noise_regime(read_noise: f64, sky: &SkySignal) -> NoiseRegime {
    let sky_e = sky.electrons_per_pixel;
    let (sky_noise, read_noise_dominant) = if sky_e > 0.0 {
        let shot = sky_e.sqrt();
        (shot, read_noise > shot)
    } else {
        (0.0, true)
    };

    NoiseRegime {
        read_noise,
        sky_noise,
        read_noise_dominant,
        sky_rate_electrons_per_second: sky.electrons_per_second_per_pixel,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal(e: f64) -> SkySignal {
        SkySignal {
            electrons_per_pixel: e,
            electrons_per_second_per_pixel: e / 300.0,
        }
    }

    #[test]
    fn test_regimes() {
        assert!(noise_regime(10.0, &signal(50.0)).read_noise_dominant);
        assert!(!noise_regime(3.0, &signal(500.0)).read_noise_dominant);
        let dark = noise_regime(3.0, &signal(0.0));
        assert!(dark.read_noise_dominant);
        assert_eq!(dark.sky_noise, 0.0);
    }
}
