use chrono::{DateTime, Utc};
use tracing::trace;

use super::{sun::SunPosition, *};

/// What a prism looks like at a given instant.
#[derive(Clone, Debug, PartialEq)]
pub enum Illumination {
    /// The prism has no [`GeoAnchor`], so no sun.
    Outline,
    /// The sun is below the prism's horizon.
    Night(SunPosition),
    /// The sun is up. `rays` may still be empty.
    Lit {
        sun: SunPosition,
        rays: Dispersion,
    },
}

impl Illumination {
    #[inline]
    #[must_use]
    pub fn sun(&self) -> Option<&SunPosition> {
        match self {
            Illumination::Outline => None,
            Illumination::Night(sun) | Illumination::Lit { sun, .. } => Some(sun),
        }
    }

    /// The rays to paint, empty unless the prism is lit.
    #[inline]
    #[must_use]
    pub fn rays(&self) -> &[SpectralRay] {
        match self {
            Illumination::Lit { rays, .. } => rays,
            _ => &[],
        }
    }
}

/// Evaluates `prism` under the sun of its own anchor at `instant`.
///
/// `prism` is expected to be a snapshot, not a prism someone is dragging around.
#[must_use]
pub fn illuminate(prism: &Prism, instant: &DateTime<Utc>) -> Illumination {
    let Some(anchor) = &prism.anchor else {
        return Illumination::Outline;
    };

    let sun = sun::position(anchor.latitude, anchor.longitude, instant);

    if !sun.is_up() {
        trace!(owner = %prism.owner, slot = %prism.slot, elevation = sun.elevation, "night");
        return Illumination::Night(sun);
    }

    Illumination::Lit {
        sun,
        rays: dispersion(prism, sun.canvas_heading()),
    }
}
