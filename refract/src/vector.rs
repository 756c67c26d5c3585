use nalgebra::{Rotation2, Unit, Vector2};

use crate::{Float, EPSILON};

pub type Vector2D = Vector2<Float>;

/// Which side of an oriented line a normal points to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Side {
    #[default]
    Left,
    Right,
}

/// 2D-only operations missing from nalgebra's generic vectors.
pub trait Planar: Sized {
    /// The z component of the 3D cross product of `self` and `other`
    fn perp_dot(&self, other: &Self) -> Float;

    /// Divides `self` by it's length, which is floored at [`EPSILON`]
    /// so that (near) zero vectors don't blow up into NaNs.
    fn normalized_guarded(&self) -> Self;

    /// Counter-clockwise rotation by `degrees`
    fn rotated(&self, degrees: Float) -> Self;

    /// The unit vector perpendicular to `self`, on the requested side.
    ///
    /// `Left` is `(-y, x)`, `Right` is `(y, -x)`.
    fn normal(&self, side: Side) -> Self;
}

impl Planar for Vector2D {
    #[inline]
    fn perp_dot(&self, other: &Self) -> Float {
        self.perp(other)
    }

    #[inline]
    fn normalized_guarded(&self) -> Self {
        self.unscale(self.norm().max(EPSILON))
    }

    #[inline]
    fn rotated(&self, degrees: Float) -> Self {
        Rotation2::new(degrees.to_radians()) * self
    }

    #[inline]
    fn normal(&self, side: Side) -> Self {
        let n = match side {
            Side::Left => Vector2D::new(-self.y, self.x),
            Side::Right => Vector2D::new(self.y, -self.x),
        };
        n.normalized_guarded()
    }
}

/// Builds a unit vector out of `v` using [`Planar::normalized_guarded`].
///
/// A zero vector stays zero, which callers treat as a dead direction.
#[inline]
#[must_use]
pub fn unit_guarded(v: Vector2D) -> Unit<Vector2D> {
    Unit::new_unchecked(v.normalized_guarded())
}
