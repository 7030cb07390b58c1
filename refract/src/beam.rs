use super::*;

/// Length of the emerging beams when the sun is high in the sky.
pub const MIN_BEAM_LENGTH: Float = 100.0;

/// Below this elevation (in degrees), beams get their maximal length.
pub const LOW_SUN_ELEVATION: Float = 0.5;

/// Above this elevation (in degrees), beams get their minimal length.
pub const HIGH_SUN_ELEVATION: Float = 80.0;

/// Half-width of a beam's far end, relative to its length
pub const BEAM_SPREAD: Float = 0.015;

/// Length of the beams cast under a sun at `elevation` degrees, on a canvas
/// whose largest dimension is `canvas_extent`.
///
/// A sun close to the horizon casts long shadows, and long beams.
#[must_use]
pub fn beam_length(elevation: Float, canvas_extent: Float) -> Float {
    let max = canvas_extent * 2.0;

    if elevation < LOW_SUN_ELEVATION {
        max
    } else if elevation > HIGH_SUN_ELEVATION {
        MIN_BEAM_LENGTH
    } else {
        let t = (elevation - LOW_SUN_ELEVATION) / (HIGH_SUN_ELEVATION - LOW_SUN_ELEVATION);
        max + (MIN_BEAM_LENGTH - max) * t
    }
}

/// A triangle widening away from a prism's exit point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Wedge {
    pub apex: Point,
    pub left: Point,
    pub right: Point,
}

impl SpectralRay {
    /// The wedge this beam covers when it is `length` long.
    #[must_use]
    pub fn wedge(&self, length: Float) -> Wedge {
        let far = self.emerged().at(length);
        let half_width = direction(self.exit_angle + 90.0).into_inner() * (length * BEAM_SPREAD);

        Wedge {
            apex: self.exit,
            left: far + half_width,
            right: far - half_width,
        }
    }
}
