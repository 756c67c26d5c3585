use arrayvec::ArrayVec;
use rand::{Rng, RngCore};

use crate::{
    closest_hit, fresnel, BvhParams, Float, GeometryNode, Hit, Ray, Segment, Side, Tally,
    Vector2D,
};

/// How a surface responds to the rays hitting it.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum SurfaceKind {
    /// A dielectric interface: every hit splits the ray in a reflected and a transmitted part.
    #[default]
    Generic,
    /// A perfect reflector.
    Mirror,
    /// An absorber counting the rays (and power) it receives.
    Target,
    /// Re-emits every ray it receives from a random point on it's outline,
    /// along the outward normal there. Used to model quantum dots.
    Scatterer { center: Vector2D, radius: Float },
}

impl SurfaceKind {
    /// A human readable name.
    #[inline]
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Generic => "Object",
            Self::Mirror => "Mirror",
            Self::Target => "Target",
            Self::Scatterer { .. } => "QuantumDot",
        }
    }
}

/// The outcome of a ray hitting a surface.
#[derive(Clone, Debug, PartialEq)]
pub enum Interaction {
    /// The rays that keep propagating (at most two).
    Continue(ArrayVec<Ray, 2>),
    /// The ray was absorbed, with the given power.
    Captured(Float),
}

/// A set of segments sharing a [`SurfaceKind`], with an optional acceleration structure.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Surface {
    kind: SurfaceKind,
    segments: Vec<Segment>,
    tree: Option<GeometryNode>,
    capture: Tally,
}

impl Surface {
    #[inline]
    #[must_use]
    pub fn new(kind: SurfaceKind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn with_segments(kind: SurfaceKind, segments: impl IntoIterator<Item = Segment>) -> Self {
        Self {
            kind,
            segments: segments.into_iter().collect(),
            ..Default::default()
        }
    }

    /// Appends `segment`. This drops the tree, if one was built.
    #[inline]
    pub fn add_segment(&mut self, segment: Segment) {
        self.tree = None;
        self.segments.push(segment);
    }

    #[inline]
    #[must_use]
    pub const fn kind(&self) -> &SurfaceKind {
        &self.kind
    }

    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    #[inline]
    #[must_use]
    pub const fn tree(&self) -> Option<&GeometryNode> {
        self.tree.as_ref()
    }

    /// What this surface received so far, for [targets](SurfaceKind::Target) only.
    #[inline]
    #[must_use]
    pub fn capture(&self) -> Option<&Tally> {
        matches!(self.kind, SurfaceKind::Target).then_some(&self.capture)
    }

    #[inline]
    pub fn record_capture(&mut self, power: Float) {
        self.capture.add(power);
    }

    #[inline]
    pub fn reset_capture(&mut self) {
        self.capture = Tally::default();
    }

    /// (Re)builds the tree over the current segments.
    pub fn build_bvh(&mut self, params: &BvhParams) {
        self.tree = Some(GeometryNode::build(&self.segments, params));
    }

    /// The closest segment of this surface hit by `ray`.
    ///
    /// Falls back to a linear scan if no tree was built.
    #[must_use]
    pub fn intersect(&self, ray: &Ray) -> Option<Hit> {
        match &self.tree {
            Some(tree) => tree.intersect(&self.segments, ray),
            None => closest_hit(self.segments.iter().enumerate(), ray),
        }
    }

    /// Have `ray` interact with the segment it hit.
    ///
    /// `hit` must come from [`Self::intersect`] on the same surface.
    pub fn interact(&self, hit: &Hit, mut ray: Ray, rng: &mut dyn RngCore) -> Interaction {
        let segment = &self.segments[hit.segment];
        let mut rays = ArrayVec::new();

        match self.kind {
            SurfaceKind::Generic => {
                let normal = segment.normal(Side::Left, rng);
                let n1 = ray.medium;
                let n2 = segment.refractive_index(ray.wavelength);
                let coefs = fresnel(n1, n2, &normal, ray.direction());

                let transmitted = (coefs.transmittance > 0.0).then(|| {
                    let mut clone = ray.clone();
                    clone.power *= coefs.transmittance;
                    segment.transmit(&mut clone, hit.distance, &normal);
                    clone.medium = n2;
                    clone.bounce = 0;
                    clone
                });

                if coefs.reflectance > 0.0 {
                    ray.power *= coefs.reflectance;
                    segment.reflect(&mut ray, hit.distance, &normal);
                    rays.push(ray);
                }

                rays.extend(transmitted);
            }
            SurfaceKind::Mirror => {
                let normal = segment.normal(Side::Left, rng);
                segment.reflect(&mut ray, hit.distance, &normal);
                rays.push(ray);
            }
            SurfaceKind::Target => return Interaction::Captured(ray.power),
            SurfaceKind::Scatterer { center, radius } => {
                let emitter = &self.segments[rng.gen_range(0..self.segments.len())];
                let mut normal = emitter.geometric_normal(Side::Left);
                if normal.dot(&(emitter.centroid() - center)) < 0.0 {
                    normal = -normal;
                }

                ray.origin = center + normal * (radius * 1.1);
                ray.set_direction(normal);
                rays.push(ray);
            }
        }

        Interaction::Continue(rays)
    }
}
