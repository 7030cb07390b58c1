use arrayvec::ArrayVec;
use tracing::trace;

use super::*;

/// A band of sunlight that made it through a prism.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpectralRay {
    pub band: SpectralBand,
    /// Where sunlight enters the prism, on the entry face
    pub entry: Point,
    /// Where this band leaves the prism, on the exit face
    pub exit: Point,
    /// Heading of the emerging beam, in degrees, in `(-180, 180]`
    pub exit_angle: Float,
}

impl SpectralRay {
    #[inline]
    #[must_use]
    pub fn hue(&self) -> Float {
        self.band.hue
    }

    /// The path this band travels inside the prism
    #[inline]
    #[must_use]
    pub fn internal_path(&self) -> Segment {
        Segment::new(self.entry, self.exit)
    }

    /// The beam emerging from the exit point
    #[inline]
    #[must_use]
    pub fn emerged(&self) -> Ray {
        Ray::from_angle(self.exit, self.exit_angle)
    }
}

/// The spectrum cast by a single prism: at most one ray per [`SpectralBand`].
pub type Dispersion = ArrayVec<SpectralRay, BAND_COUNT>;

/// Returns the index of the face most directly facing the sun (`sun_heading`
/// being the heading pointing towards the sun, in degrees).
///
/// Only faces whose normal is less than 90° away from the sun qualify. Ties
/// go to the lowest index.
#[must_use]
pub fn select_entry_face(faces: &[Face], sun_heading: Float) -> Option<usize> {
    let mut best = None;
    let mut min_diff = 90.0;

    for (i, face) in faces.iter().enumerate() {
        let diff = normalize_angle(sun_heading - face.normal_angle()).abs();

        if diff < min_diff {
            min_diff = diff;
            best = Some(i);
        }
    }

    best
}

/// Traces sunlight coming from `sun_heading` (in degrees, pointing towards
/// the sun) through `prism`, splitting it into its [`SPECTRUM`].
///
/// Each band is refracted at the face most directly facing the sun, travels
/// inside the prism to the first other face it meets, and is refracted again on
/// its way out. Bands that are totally reflected inside the prism are left out,
/// so the result may be empty: this is the normal state of a prism the sun
/// lights from an unfavorable angle.
///
/// This function is pure: the same inputs always yield the same output.
#[must_use]
pub fn dispersion(prism: &Prism, sun_heading: Float) -> Dispersion {
    let mut rays = Dispersion::new();

    let faces = prism.faces();

    let Some(entry_index) = select_entry_face(&faces, sun_heading) else {
        trace!(sun_heading, "no face is lit");
        return rays;
    };

    let entry_face = &faces[entry_index];
    let entry_normal = entry_face.normal_angle();

    // All rays from the sun are parallel, the one going through the center is as good as any
    let Some(entry) = intersect(sun_heading + 180.0, prism.center(), &entry_face.edge) else {
        trace!(sun_heading, entry_index, "sunlight misses the entry face");
        return rays;
    };

    let incidence = normalize_angle(sun_heading - entry_normal);

    for band in SPECTRUM {
        let Some(refracted) = band.refract_in(incidence) else {
            trace!(band = band.name, "total internal reflection at entry");
            continue;
        };

        let internal_angle = normalize_angle(entry_normal + refracted);

        let Some((exit, exit_face)) = faces
            .iter()
            .enumerate()
            .filter(|&(j, _)| j != entry_index)
            .find_map(|(_, face)| {
                intersect(internal_angle, entry, &face.edge).map(|p| (p, face))
            })
        else {
            trace!(band = band.name, "no exit face");
            continue;
        };

        let exit_normal = exit_face.normal_angle();

        let Some(emerged) = band.refract_out(normalize_angle(internal_angle - exit_normal)) else {
            trace!(band = band.name, "total internal reflection at exit");
            continue;
        };

        rays.push(SpectralRay {
            band,
            entry,
            exit,
            exit_angle: normalize_angle(exit_normal + emerged),
        });
    }

    rays
}

impl Prism {
    /// See [`dispersion`].
    #[inline]
    #[must_use]
    pub fn dispersion(&self, sun_heading: Float) -> Dispersion {
        dispersion(self, sun_heading)
    }
}
