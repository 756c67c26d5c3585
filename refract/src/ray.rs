use nalgebra::Unit;

use crate::{unit_guarded, Float, Vector2D};

/// Rays carrying less than this fraction of their spawn power are destroyed.
pub const MIN_POWER: Float = 0.005;

pub const DEFAULT_WAVELENGTH: Float = 500.0;

pub const DEFAULT_MAX_BOUNCES: u32 = 5000;

/// A light ray, represented as a half-line, with the physical state needed to propagate it.
#[derive(Clone, Debug, PartialEq)]
pub struct Ray {
    /// The starting point of the half-line
    pub origin: Vector2D,
    /// Private so that every mutation goes through [`Self::set_direction`]
    direction: Unit<Vector2D>,
    /// In nanometers
    pub wavelength: Float,
    /// Relative to the spawn power, in `(0, 1]` for rays emitted by sources
    pub power: Float,
    /// Refractive index of the medium the ray currently travels through
    pub medium: Float,
    pub bounce: u32,
    pub max_bounces: u32,
    /// Stable identifier assigned when the scene is initialized.
    /// Rays spawned by an interaction inherit the index of their parent.
    pub index: usize,
}

impl Ray {
    /// A ray with unit power, travelling through vacuum at the default wavelength.
    ///
    /// `direction` is normalized, see [`Self::set_direction`].
    #[inline]
    #[must_use]
    pub fn new(origin: impl Into<Vector2D>, direction: impl Into<Vector2D>) -> Self {
        Self {
            origin: origin.into(),
            direction: unit_guarded(direction.into()),
            wavelength: DEFAULT_WAVELENGTH,
            power: 1.0,
            medium: 1.0,
            bounce: 0,
            max_bounces: DEFAULT_MAX_BOUNCES,
            index: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_wavelength(mut self, wavelength: Float) -> Self {
        self.wavelength = wavelength;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_medium(mut self, medium: Float) -> Self {
        self.medium = medium;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_power(mut self, power: Float) -> Self {
        self.power = power;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_max_bounces(mut self, max_bounces: u32) -> Self {
        self.max_bounces = max_bounces;
        self
    }

    #[inline]
    #[must_use]
    pub fn direction(&self) -> &Vector2D {
        self.direction.as_ref()
    }

    /// Normalizes and stores `direction`.
    ///
    /// The length is floored at [`EPSILON`](crate::EPSILON), so a zero vector stays zero.
    #[inline]
    pub fn set_direction(&mut self, direction: Vector2D) {
        self.direction = unit_guarded(direction);
    }

    /// Get the point at distance `t` (can be negative) from the ray's origin
    #[inline]
    #[must_use]
    pub fn at(&self, t: Float) -> Vector2D {
        self.origin + self.direction.as_ref() * t
    }

    /// Move the ray's position forward (or backward if t < 0.0) by `t`
    #[inline]
    pub fn advance(&mut self, t: Float) {
        self.origin = self.at(t);
    }

    #[inline]
    pub fn bounce(&mut self) {
        self.bounce = self.bounce.saturating_add(1);
    }

    /// Whether this ray exhausted it's bounce or power budget.
    #[inline]
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.bounce > self.max_bounces || self.power < MIN_POWER
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn direction_is_normalized() {
        let mut ray = Ray::new([0.0, 0.0], [3.0, 4.0]);
        assert_relative_eq!(ray.direction().norm(), 1.0, epsilon = 1e-12);

        ray.set_direction(Vector2D::new(0.0, -7.0));
        assert_relative_eq!(*ray.direction(), Vector2D::new(0.0, -1.0));
    }

    #[test]
    fn advance_moves_along_direction() {
        let mut ray = Ray::new([1.0, 1.0], [1.0, 0.0]);
        ray.advance(2.5);
        assert_relative_eq!(ray.origin, Vector2D::new(3.5, 1.0));
    }

    #[test]
    fn termination_budget() {
        let mut ray = Ray::new([0.0, 0.0], [1.0, 0.0]).with_max_bounces(2);
        ray.bounce();
        ray.bounce();
        assert!(!ray.is_terminated());
        ray.bounce();
        assert!(ray.is_terminated());

        let dim = Ray::new([0.0, 0.0], [1.0, 0.0]).with_power(0.004);
        assert!(dim.is_terminated());
        let bright_enough = Ray::new([0.0, 0.0], [1.0, 0.0]).with_power(MIN_POWER);
        assert!(!bright_enough.is_terminated());
    }
}
