use rand::RngCore;

use crate::{
    refraction_sine, Float, GeometryError, Perturbance, Planar, Ray, RefractiveIndex, Side,
    Vector2D, EPSILON, SELF_HIT_TOLERANCE,
};

/// Returns the distance `t` such that [`ray.at(t)`](Ray::at) lies on the
/// line segment `[a, b]`, if any.
///
/// Parallel rays never intersect. Intersections closer than [`SELF_HIT_TOLERANCE`],
/// scaled by the magnitude of the coordinates involved, are discarded, so that a ray
/// leaving a segment does not hit it again immediately.
#[inline]
#[must_use]
pub fn intersect_line(ray: &Ray, a: &Vector2D, b: &Vector2D) -> Option<Float> {
    let segment = b - a;
    let dir = ray.direction();

    let denom = dir.perp_dot(&segment);

    if denom.abs() <= EPSILON {
        return None;
    }

    let inv_denom = denom.recip();
    let a_to_origin = a - ray.origin;

    let t = a_to_origin.perp_dot(&segment) * inv_denom;
    let s = a_to_origin.perp_dot(dir) * inv_denom;

    // the rounding error of `ray.at(t)` grows with the coordinates
    let scale = 1.0 + ray.origin.amax().max(a.amax()).max(b.amax());

    (t > SELF_HIT_TOLERANCE * scale && (0.0..=1.0).contains(&s)).then_some(t)
}

/// What happened to a ray sent through [`Segment::transmit`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Refraction {
    Refracted,
    TotalInternalReflection,
}

/// An oriented line segment, with the optical properties of the medium behind it.
#[derive(Clone, Debug, PartialEq)]
pub struct Segment {
    a: Vector2D,
    b: Vector2D,
    index: RefractiveIndex,
    perturbance: Perturbance,
}

impl Segment {
    /// An unperturbed segment, see [`Self::with_perturbance`].
    ///
    /// Fails if `a == b`.
    #[inline]
    pub fn new(
        a: impl Into<Vector2D>,
        b: impl Into<Vector2D>,
        index: impl Into<RefractiveIndex>,
    ) -> Result<Self, GeometryError> {
        let (a, b) = (a.into(), b.into());

        if a == b {
            return Err(GeometryError::DegenerateSegment(a));
        }

        Ok(Self {
            a,
            b,
            index: index.into(),
            perturbance: Perturbance::None,
        })
    }

    #[inline]
    #[must_use]
    pub fn with_perturbance(mut self, perturbance: Perturbance) -> Self {
        self.perturbance = perturbance;
        self
    }

    #[inline]
    #[must_use]
    pub const fn a(&self) -> &Vector2D {
        &self.a
    }

    #[inline]
    #[must_use]
    pub const fn b(&self) -> &Vector2D {
        &self.b
    }

    #[inline]
    #[must_use]
    pub const fn index(&self) -> &RefractiveIndex {
        &self.index
    }

    #[inline]
    #[must_use]
    pub const fn perturbance(&self) -> &Perturbance {
        &self.perturbance
    }

    #[inline]
    #[must_use]
    pub fn refractive_index(&self, wavelength: Float) -> Float {
        self.index.at(wavelength)
    }

    #[inline]
    #[must_use]
    pub fn centroid(&self) -> Vector2D {
        (self.a + self.b) * 0.5
    }

    /// The unperturbed unit normal on the given side of `b - a`.
    #[inline]
    #[must_use]
    pub fn geometric_normal(&self, side: Side) -> Vector2D {
        (self.b - self.a).normal(side)
    }

    /// The unit normal on the given side, rotated by an angle drawn from this segment's [`Perturbance`].
    #[inline]
    pub fn normal(&self, side: Side, rng: &mut dyn RngCore) -> Vector2D {
        let normal = self.geometric_normal(side);
        match self.perturbance {
            Perturbance::None => normal,
            p => normal.rotated(p.sample(rng)).normalized_guarded(),
        }
    }

    #[inline]
    #[must_use]
    pub fn intersect(&self, ray: &Ray) -> Option<Float> {
        intersect_line(ray, &self.a, &self.b)
    }

    /// Moves `ray` forward by `t`, onto this segment, and mirrors it's direction about `normal`.
    ///
    /// The side `normal` points to is irrelevant.
    #[inline]
    pub fn reflect(&self, ray: &mut Ray, t: Float, normal: &Vector2D) {
        ray.advance(t);
        let d = *ray.direction();
        ray.set_direction(d - normal * (2.0 * d.dot(normal)));
    }

    /// Moves `ray` forward by `t`, onto this segment, and refracts it from it's current
    /// medium into this segment's, following Snell's law.
    ///
    /// Falls back to [`Self::reflect`] at and past the critical angle.
    pub fn transmit(&self, ray: &mut Ray, t: Float, normal: &Vector2D) -> Refraction {
        let d = *ray.direction();
        let n1 = ray.medium;
        let n2 = self.refractive_index(ray.wavelength);

        let normal = if d.dot(normal) > 0.0 { -normal } else { *normal };

        let eta = n1 / n2;
        let cos_i = -normal.dot(&d);

        let Some(sin_t) = refraction_sine(n1, n2, cos_i) else {
            self.reflect(ray, t, &normal);
            return Refraction::TotalInternalReflection;
        };

        let cos_t = (1.0 - sin_t * sin_t).max(0.0).sqrt();

        ray.advance(t);
        ray.set_direction(d * eta + normal * (eta * cos_i - cos_t));

        Refraction::Refracted
    }
}
