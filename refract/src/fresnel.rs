use tracing::warn;

use crate::{Float, Vector2D, EPSILON};

/// The fractions of power reflected and transmitted at an interface.
///
/// Always sums to `1.0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FresnelCoefficients {
    pub reflectance: Float,
    pub transmittance: Float,
}

impl FresnelCoefficients {
    pub const TOTAL_INTERNAL_REFLECTION: Self = Self {
        reflectance: 1.0,
        transmittance: 0.0,
    };

    #[inline]
    #[must_use]
    pub fn is_total_internal_reflection(&self) -> bool {
        self.transmittance == 0.0
    }
}

#[inline]
fn clamp_away_from_zero(x: Float) -> Float {
    if x.abs() < EPSILON {
        EPSILON.copysign(x)
    } else {
        x
    }
}

/// Sine of the refraction angle given by Snell's law, for light going from a medium of
/// index `n1` into one of index `n2`, with an angle of incidence of cosine `cos_i`.
///
/// `None` at or past the critical angle. Incidence within [`EPSILON`] of it
/// counts as total internal reflection.
#[inline]
#[must_use]
pub fn refraction_sine(n1: Float, n2: Float, cos_i: Float) -> Option<Float> {
    let sin_i = (1.0 - cos_i * cos_i).max(0.0).sqrt();
    let sin_t = n1 / n2 * sin_i;

    (sin_t < 1.0 - EPSILON).then_some(sin_t)
}

/// Unpolarized Fresnel coefficients for light travelling along `direction`,
/// going from a medium of index `n1` into one of index `n2`, through an
/// interface with the given unit `normal` (which may face either way).
#[must_use]
pub fn fresnel(
    n1: Float,
    n2: Float,
    normal: &Vector2D,
    direction: &Vector2D,
) -> FresnelCoefficients {
    let cos_i = normal.dot(direction).abs();

    let Some(sin_t) = refraction_sine(n1, n2, cos_i) else {
        return FresnelCoefficients::TOTAL_INTERNAL_REFLECTION;
    };

    let cos_t = (1.0 - sin_t * sin_t).max(0.0).sqrt();

    let n1_cos_i = n1 * cos_i;
    let n2_cos_t = n2 * cos_t;
    let n1_cos_t = n1 * cos_t;
    let n2_cos_i = n2 * cos_i;

    let rs = (n1_cos_i - n2_cos_t) / clamp_away_from_zero(n1_cos_i + n2_cos_t);
    let rp = (n2_cos_i - n1_cos_t) / clamp_away_from_zero(n2_cos_i + n1_cos_t);

    let reflectance = 0.5 * (rs * rs + rp * rp);
    let transmittance = 1.0 - reflectance;

    if reflectance > 1.0 {
        warn!(reflectance, n1, n2, "reflectance above 1");
    }

    if transmittance < 0.0 {
        warn!(transmittance, n1, n2, "negative transmittance");
    }

    FresnelCoefficients {
        reflectance,
        transmittance,
    }
}
