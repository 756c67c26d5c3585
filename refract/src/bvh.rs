//! Bounding volume hierarchy over the segments of a single [`Surface`](crate::Surface).
//!
//! Nodes split their box in half along it's longest dimension and partition
//! segments by centroid. Segments are referenced by their index in the owning
//! surface's segment list.

use crate::{BoundingVolume, Float, Ray, Segment};

/// The closest segment a ray runs into.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hit {
    /// Distance along the ray
    pub distance: Float,
    /// Index of the segment in it's surface
    pub segment: usize,
}

impl Hit {
    /// The closest of two optional hits. Ties go to `b`.
    #[inline]
    #[must_use]
    pub fn closest(a: Option<Self>, b: Option<Self>) -> Option<Self> {
        match (a, b) {
            (Some(a), Some(b)) => Some(if a.distance < b.distance { a } else { b }),
            (a, None) => a,
            (None, b) => b,
        }
    }
}

/// When to stop splitting nodes.
///
/// A node at depth `d` holding `n` segments becomes a leaf when
/// `d == max_depth` or `n <= d * leaf_growth`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BvhParams {
    pub max_depth: usize,
    pub leaf_growth: usize,
}

impl Default for BvhParams {
    #[inline]
    fn default() -> Self {
        Self {
            max_depth: 50,
            leaf_growth: 4,
        }
    }
}

impl BvhParams {
    #[inline]
    #[must_use]
    pub fn is_leaf(&self, depth: usize, count: usize) -> bool {
        depth >= self.max_depth || count <= depth.saturating_mul(self.leaf_growth)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum GeometryNode {
    Leaf {
        bounds: BoundingVolume,
        segments: Vec<usize>,
    },
    Internal {
        bounds: BoundingVolume,
        left: Box<GeometryNode>,
        right: Box<GeometryNode>,
    },
}

impl GeometryNode {
    /// Build a tree over every segment in `segments`.
    #[must_use]
    pub fn build(segments: &[Segment], params: &BvhParams) -> Self {
        let indices = (0..segments.len()).collect();
        let bounds = BoundingVolume::around(segments);
        build_node(segments, indices, bounds, 0, params)
    }

    #[inline]
    #[must_use]
    pub fn bounds(&self) -> &BoundingVolume {
        match self {
            Self::Leaf { bounds, .. } | Self::Internal { bounds, .. } => bounds,
        }
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        match self {
            Self::Leaf { .. } => 0,
            Self::Internal { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    /// Calls `f` with the segment indices of every leaf, left to right.
    pub fn for_each_leaf(&self, f: &mut impl FnMut(&BoundingVolume, &[usize])) {
        match self {
            Self::Leaf { bounds, segments } => f(bounds, segments),
            Self::Internal { left, right, .. } => {
                left.for_each_leaf(f);
                right.for_each_leaf(f);
            }
        }
    }

    /// The closest segment hit by `ray`, `segments` being the slice this tree was built from.
    #[must_use]
    pub fn intersect(&self, segments: &[Segment], ray: &Ray) -> Option<Hit> {
        if !self.bounds().intersects(ray) {
            return None;
        }

        match self {
            Self::Leaf { segments: ids, .. } => {
                closest_hit(ids.iter().map(|&i| (i, &segments[i])), ray)
            }
            Self::Internal { left, right, .. } => Hit::closest(
                left.intersect(segments, ray),
                right.intersect(segments, ray),
            ),
        }
    }
}

/// Linear scan over `(index, segment)` pairs.
#[must_use]
pub fn closest_hit<'a>(
    segments: impl IntoIterator<Item = (usize, &'a Segment)>,
    ray: &Ray,
) -> Option<Hit> {
    segments
        .into_iter()
        .filter_map(|(segment, s)| s.intersect(ray).map(|distance| Hit { distance, segment }))
        .fold(None, |closest, hit| match closest {
            Some(Hit { distance, .. }) if distance <= hit.distance => closest,
            _ => Some(hit),
        })
}

fn build_node(
    segments: &[Segment],
    indices: Vec<usize>,
    bounds: BoundingVolume,
    depth: usize,
    params: &BvhParams,
) -> GeometryNode {
    if params.is_leaf(depth, indices.len()) {
        return GeometryNode::Leaf {
            bounds,
            segments: indices,
        };
    }

    let split_x = bounds.largest_dimension_is_x();
    let center = bounds.center();
    let (center, axis) = if split_x { (center.x, 0) } else { (center.y, 1) };

    let (left, right): (Vec<_>, Vec<_>) = indices
        .iter()
        .copied()
        .partition(|&i| segments[i].centroid()[axis] <= center);

    if left.is_empty() || right.is_empty() {
        return GeometryNode::Leaf {
            bounds,
            segments: indices,
        };
    }

    let left_bounds = BoundingVolume::around(left.iter().map(|&i| &segments[i]));
    let right_bounds = BoundingVolume::around(right.iter().map(|&i| &segments[i]));

    GeometryNode::Internal {
        bounds,
        left: Box::new(build_node(segments, left, left_bounds, depth + 1, params)),
        right: Box::new(build_node(segments, right, right_bounds, depth + 1, params)),
    }
}
