mod beam;
mod dispersion;
mod frame;
mod prism;
mod slots;
mod spectrum;
pub mod sun;

pub use beam::*;
pub use dispersion::*;
pub use frame::*;
pub use prism::*;
pub use slots::*;
pub use spectrum::*;

pub use arrayvec;
pub use chrono;
pub use nalgebra;

use nalgebra::{Matrix2, Unit, Vector2};

pub type Float = f64;

/// A point (or a displacement) in the render plane.
///
/// The render plane is a canvas: `x` grows to the right, `y` grows downwards,
/// and headings are measured in degrees from the `x` axis.
pub type Point = Vector2<Float>;

/// Rays and segments whose determinant is smaller than this (in magnitude)
/// are considered parallel.
pub const PARALLEL_TOLERANCE: Float = 1e-3;

/// Folds an angle, in degrees, into `(-180, 180]`.
///
/// Every signed angle difference in this crate goes through this function.
#[inline]
#[must_use]
pub fn normalize_angle(degrees: Float) -> Float {
    let a = degrees % 360.0;

    if a <= -180.0 {
        a + 360.0
    } else if a > 180.0 {
        a - 360.0
    } else {
        a
    }
}

/// The unit vector with the given heading, in degrees.
#[inline]
#[must_use]
pub fn direction(degrees: Float) -> Unit<Point> {
    let (sin, cos) = degrees.to_radians().sin_cos();
    // SAFETY: sin² + cos² = 1
    Unit::new_unchecked(Point::new(cos, sin))
}

/// The heading of `v`, in degrees, in `(-180, 180]`.
#[inline]
#[must_use]
pub fn heading(v: &Point) -> Float {
    v.y.atan2(v.x).to_degrees()
}

/// A light ray, represented as a whole line rather than a half-line.
///
/// The sun is modeled as a source at infinite distance, so a `Ray` stands for
/// one member of a family of parallel rays: intersections "behind" `origin`
/// are as valid as those in front of it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    /// A point the line goes through
    pub origin: Point,
    /// The direction of the line
    pub direction: Unit<Point>,
}

impl Ray {
    #[inline]
    #[must_use]
    pub fn new(origin: impl Into<Point>, direction: Unit<Point>) -> Self {
        Self {
            origin: origin.into(),
            direction,
        }
    }

    /// A ray going through `origin`, with the given heading in degrees.
    #[inline]
    #[must_use]
    pub fn from_angle(origin: impl Into<Point>, degrees: Float) -> Self {
        Self::new(origin, direction(degrees))
    }

    /// Get the point at distance `t` (can be negative) from the ray's origin
    #[inline]
    #[must_use]
    pub fn at(&self, t: Float) -> Point {
        self.origin + self.direction.as_ref() * t
    }

    #[inline]
    #[must_use]
    pub fn angle(&self) -> Float {
        heading(self.direction.as_ref())
    }
}

/// A finite line segment, from `start` to `end`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    pub start: Point,
    pub end: Point,
}

impl Segment {
    #[inline]
    #[must_use]
    pub fn new(start: impl Into<Point>, end: impl Into<Point>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// `end - start`, not normalized.
    #[inline]
    #[must_use]
    pub fn direction(&self) -> Point {
        self.end - self.start
    }

    #[inline]
    #[must_use]
    pub fn midpoint(&self) -> Point {
        (self.start + self.end) * 0.5
    }

    /// Returns a vector `[t, u]` such that:
    ///
    /// `ray.at(t) = self.start + u * self.direction()`
    ///
    /// Returns `None` if `ray` is (nearly) parallel to `self`, that is, if the
    /// determinant of the system is smaller than [`PARALLEL_TOLERANCE`].
    #[inline]
    #[must_use]
    pub fn intersection_coordinates(&self, ray: &Ray) -> Option<Point> {
        let a = Matrix2::from_columns(&[ray.direction.into_inner(), self.direction()]);

        if a.determinant().abs() < PARALLEL_TOLERANCE {
            return None;
        }

        a.try_inverse().map(|inv| {
            // inv * (origin - start) = [-t, u]
            let mut v = inv * (ray.origin - self.start);
            v.x = -v.x;
            v
        })
    }

    /// The point where `ray` crosses this segment, if any.
    #[inline]
    #[must_use]
    pub fn intersection(&self, ray: &Ray) -> Option<Point> {
        self.intersection_coordinates(ray)
            .filter(|v| (0.0..=1.0).contains(&v.y))
            .map(|v| ray.at(v.x))
    }
}

/// Intersects the line with heading `ray_angle` (in degrees) going through
/// `ray_origin` with `segment`.
///
/// See [`Segment::intersection`].
#[inline]
#[must_use]
pub fn intersect(ray_angle: Float, ray_origin: Point, segment: &Segment) -> Option<Point> {
    segment.intersection(&Ray::from_angle(ray_origin, ray_angle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_folds_into_half_open_range() {
        assert_eq!(normalize_angle(0.0), 0.0);
        assert_eq!(normalize_angle(180.0), 180.0);
        assert_eq!(normalize_angle(-180.0), 180.0);
        assert_eq!(normalize_angle(190.0), -170.0);
        assert_eq!(normalize_angle(-190.0), 170.0);
        assert_eq!(normalize_angle(540.0), 180.0);
        assert_eq!(normalize_angle(-721.0), -1.0);
        assert!((normalize_angle(359.5) + 0.5).abs() < 1e-12);
    }

    #[test]
    fn heading_and_direction_agree() {
        for deg in [-179.0, -90.0, -45.0, 0.0, 30.0, 90.0, 135.0, 180.0] {
            let d = direction(deg);
            assert!((d.norm() - 1.0).abs() < 1e-12);
            assert!(normalize_angle(heading(d.as_ref()) - deg).abs() < 1e-9);
        }
    }

    #[test]
    fn crosses_segment() {
        let segment = Segment::new([0.0, -1.0], [0.0, 1.0]);
        let p = intersect(0.0, Point::new(-5.0, 0.5), &segment).unwrap();
        assert!((p - Point::new(0.0, 0.5)).norm() < 1e-12);
    }

    #[test]
    fn intersection_behind_origin_counts() {
        let segment = Segment::new([0.0, -1.0], [0.0, 1.0]);
        let ray = Ray::from_angle([5.0, 0.0], 0.0);

        let coords = segment.intersection_coordinates(&ray).unwrap();
        assert!((coords.x + 5.0).abs() < 1e-12);
        assert!((coords.y - 0.5).abs() < 1e-12);

        let p = segment.intersection(&ray).unwrap();
        assert!(p.norm() < 1e-12);
    }

    #[test]
    fn misses_outside_segment_bounds() {
        let segment = Segment::new([0.0, -1.0], [0.0, 1.0]);
        assert_eq!(intersect(0.0, Point::new(-5.0, 1.5), &segment), None);
        assert_eq!(intersect(0.0, Point::new(-5.0, -1.01), &segment), None);
    }

    #[test]
    fn parallel_rays_never_intersect() {
        let segment = Segment::new([0.0, -1.0], [0.0, 1.0]);
        assert_eq!(intersect(90.0, Point::new(0.0, 0.0), &segment), None);
        assert_eq!(intersect(-90.0, Point::new(0.0, -3.0), &segment), None);
        // below the tolerance, even if not exactly parallel
        assert_eq!(intersect(90.02, Point::new(0.0, 0.0), &segment), None);
    }
}
