use crate::{intersect_line, Float, Ray, Segment, Vector2D};

/// An axis aligned bounding box.
///
/// Starts empty (`min = +∞`, `max = −∞`) and only ever grows.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingVolume {
    min: Vector2D,
    max: Vector2D,
}

impl Default for BoundingVolume {
    #[inline]
    fn default() -> Self {
        Self::empty()
    }
}

impl BoundingVolume {
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self {
            min: Vector2D::repeat(Float::INFINITY),
            max: Vector2D::repeat(Float::NEG_INFINITY),
        }
    }

    /// The smallest box containing all of the given segments.
    #[must_use]
    pub fn around<'a>(segments: impl IntoIterator<Item = &'a Segment>) -> Self {
        let mut bounds = Self::empty();
        for segment in segments {
            bounds.grow_to_include(segment);
        }
        bounds
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y
    }

    #[inline]
    #[must_use]
    pub const fn min(&self) -> &Vector2D {
        &self.min
    }

    #[inline]
    #[must_use]
    pub const fn max(&self) -> &Vector2D {
        &self.max
    }

    #[inline]
    pub fn grow_to_include(&mut self, segment: &Segment) {
        for p in [segment.a(), segment.b()] {
            self.min = self.min.inf(p);
            self.max = self.max.sup(p);
        }
    }

    /// The union of `self` and `other`.
    #[inline]
    #[must_use]
    pub fn merged(&self, other: &Self) -> Self {
        Self {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, p: &Vector2D) -> bool {
        (self.min.x..=self.max.x).contains(&p.x) && (self.min.y..=self.max.y).contains(&p.y)
    }

    #[inline]
    #[must_use]
    pub fn encloses(&self, segment: &Segment) -> bool {
        self.contains(segment.a()) && self.contains(segment.b())
    }

    /// Bottom-left, bottom-right, top-right, top-left
    #[inline]
    #[must_use]
    pub fn corners(&self) -> [Vector2D; 4] {
        let (min, max) = (self.min, self.max);
        [
            min,
            Vector2D::new(max.x, min.y),
            max,
            Vector2D::new(min.x, max.y),
        ]
    }

    /// Bottom, right, top, left: counter-clockwise, starting from [`Self::min`].
    #[inline]
    #[must_use]
    pub fn edges(&self) -> [(Vector2D, Vector2D); 4] {
        let [c0, c1, c2, c3] = self.corners();
        [(c0, c1), (c1, c2), (c2, c3), (c3, c0)]
    }

    #[inline]
    #[must_use]
    pub fn center(&self) -> Vector2D {
        (self.min + self.max) * 0.5
    }

    /// `true` if the box is at least as wide as it is tall.
    #[inline]
    #[must_use]
    pub fn largest_dimension_is_x(&self) -> bool {
        let extent = self.max - self.min;
        extent.x >= extent.y
    }

    /// Whether `ray` crosses any of the four edges.
    ///
    /// A ray that starts inside the box always leaves it through an edge,
    /// so this is also true for those.
    #[inline]
    #[must_use]
    pub fn intersects(&self, ray: &Ray) -> bool {
        !self.is_empty()
            && self
                .edges()
                .iter()
                .any(|(a, b)| intersect_line(ray, a, b).is_some())
    }
}
