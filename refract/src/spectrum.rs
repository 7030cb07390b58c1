use super::*;

/// A band of visible light, and how strongly glass bends it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpectralBand {
    pub name: &'static str,
    /// In degrees, in `[0, 360)`
    pub hue: Float,
    /// Always greater than `1.0`, the higher it is, the more the band is bent.
    pub refractive_index: Float,
}

pub const BAND_COUNT: usize = 7;

/// The bands a prism splits sunlight into, ordered by hue.
pub const SPECTRUM: [SpectralBand; BAND_COUNT] = [
    SpectralBand::new("red", 0.0, 1.513),
    SpectralBand::new("orange", 30.0, 1.517),
    SpectralBand::new("yellow", 60.0, 1.519),
    SpectralBand::new("green", 120.0, 1.523),
    SpectralBand::new("blue", 240.0, 1.528),
    SpectralBand::new("indigo", 260.0, 1.532),
    SpectralBand::new("violet", 280.0, 1.538),
];

impl SpectralBand {
    #[inline]
    #[must_use]
    pub const fn new(name: &'static str, hue: Float, refractive_index: Float) -> Self {
        Self {
            name,
            hue,
            refractive_index,
        }
    }

    /// Refraction angle inside the glass for a ray entering it with the given
    /// incidence angle (both in degrees, relative to the face's normal).
    #[inline]
    #[must_use]
    pub fn refract_in(&self, incidence: Float) -> Option<Float> {
        snell(incidence.to_radians().sin() / self.refractive_index)
    }

    /// Refraction angle in the air for a ray leaving the glass with the given
    /// incidence angle (both in degrees, relative to the face's normal).
    ///
    /// Returns `None` when the ray is totally reflected back inside.
    #[inline]
    #[must_use]
    pub fn refract_out(&self, incidence: Float) -> Option<Float> {
        snell(self.refractive_index * incidence.to_radians().sin())
    }
}

/// `asin(sin_value)` in degrees, `None` if `|sin_value| > 1` (total internal reflection)
#[inline]
fn snell(sin_value: Float) -> Option<Float> {
    (sin_value.abs() <= 1.0).then(|| sin_value.asin().to_degrees())
}
