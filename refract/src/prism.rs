use core::array;

use nalgebra::Unit;

use super::*;

/// Distance between a new prism's center and its vertices.
pub const PRISM_SIZE: Float = 50.0;

/// Rotation, in degrees, of a newly placed prism (one vertex pointing up).
pub const DEFAULT_ROTATION: Float = -90.0;

/// A place on earth a prism takes its sunlight from.
#[derive(Clone, Debug, PartialEq)]
pub struct GeoAnchor {
    pub latitude: Float,
    pub longitude: Float,
    /// Display name of the city, may be empty.
    pub city: String,
}

impl GeoAnchor {
    #[inline]
    #[must_use]
    pub fn new(latitude: Float, longitude: Float) -> Self {
        Self {
            latitude,
            longitude,
            city: String::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn with_city(mut self, city: impl Into<String>) -> Self {
        self.city = city.into();
        self
    }
}

/// One side of a prism.
///
/// Faces are derived from a prism's pose every time they are needed, see [`Prism::faces`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Face {
    /// Points away from the prism's center
    pub normal: Unit<Point>,
    pub edge: Segment,
}

impl Face {
    /// Builds the face spanned by `edge`, `interior` being any point strictly inside the prism.
    ///
    /// The normal is the edge vector rotated by 90°, flipped if needed so that
    /// it points away from `interior`.
    #[inline]
    #[must_use]
    pub fn new(edge: Segment, interior: &Point) -> Self {
        let e = edge.direction();
        let perp = Point::new(-e.y, e.x);

        let normal = if perp.dot(&(edge.midpoint() - interior)) < 0.0 {
            -perp
        } else {
            perp
        };

        Self {
            normal: Unit::new_normalize(normal),
            edge,
        }
    }

    /// Heading of the outward normal, in degrees.
    #[inline]
    #[must_use]
    pub fn normal_angle(&self) -> Float {
        heading(self.normal.as_ref())
    }
}

/// An equilateral triangular prism, seen from above.
#[derive(Clone, Debug, PartialEq)]
pub struct Prism {
    pub position: Point,
    /// In degrees
    pub rotation: Float,
    size: Float,
    pub owner: OwnerId,
    pub slot: SlotId,
    pub is_selected: bool,
    /// `None` means the prism isn't lit by any sun, and is only drawn as an outline.
    pub anchor: Option<GeoAnchor>,
    pub user_name: String,
}

impl Prism {
    #[inline]
    #[must_use]
    pub fn new(position: impl Into<Point>, rotation: Float, owner: OwnerId, slot: SlotId) -> Self {
        Self {
            position: position.into(),
            rotation,
            size: PRISM_SIZE,
            owner,
            slot,
            is_selected: false,
            anchor: None,
            user_name: String::new(),
        }
    }

    /// Returns `None` unless `size` is finite and strictly positive.
    #[inline]
    #[must_use]
    pub fn with_size(mut self, size: Float) -> Option<Self> {
        (size.is_finite() && size > 0.0).then(|| {
            self.size = size;
            self
        })
    }

    #[inline]
    #[must_use]
    pub fn with_anchor(mut self, anchor: GeoAnchor) -> Self {
        self.anchor = Some(anchor);
        self
    }

    /// Distance from the center to each vertex.
    #[inline]
    #[must_use]
    pub fn size(&self) -> Float {
        self.size
    }

    #[inline]
    #[must_use]
    pub fn center(&self) -> Point {
        self.position
    }

    #[inline]
    pub fn move_to(&mut self, position: impl Into<Point>) {
        self.position = position.into();
    }

    #[inline]
    pub fn rotate_to(&mut self, degrees: Float) {
        self.rotation = degrees;
    }

    #[inline]
    pub fn rotate_by(&mut self, degrees: Float) {
        self.rotation += degrees;
    }

    #[inline]
    pub fn update(&mut self, position: impl Into<Point>, rotation: Float) {
        self.move_to(position);
        self.rotate_to(rotation);
    }

    /// Vertex `i` lies at heading `rotation + 120° * i`, `size` away from the center.
    #[inline]
    #[must_use]
    pub fn vertices(&self) -> [Point; 3] {
        array::from_fn(|i| {
            self.position + direction(self.rotation + i as Float * 120.0).into_inner() * self.size
        })
    }

    /// Edge `i` goes from vertex `i` to vertex `i + 1` (mod 3).
    #[inline]
    #[must_use]
    pub fn edges(&self) -> [Segment; 3] {
        let v = self.vertices();
        array::from_fn(|i| Segment::new(v[i], v[(i + 1) % 3]))
    }

    /// Face `i` is spanned by edge `i`, see [`Self::edges`].
    #[inline]
    #[must_use]
    pub fn faces(&self) -> [Face; 3] {
        let center = self.center();
        self.edges().map(|edge| Face::new(edge, &center))
    }

    /// Whether `p` lies inside this prism: the cross products of each edge
    /// with `p` must all have the same sign.
    #[must_use]
    pub fn contains_point(&self, p: &Point) -> bool {
        let mut side = None;

        for edge in self.edges() {
            let positive = edge.direction().perp(&(p - edge.start)) > 0.0;

            match side {
                None => side = Some(positive),
                Some(s) if s != positive => return false,
                Some(_) => {}
            }
        }

        true
    }
}
