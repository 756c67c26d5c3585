use core::f64::consts::PI;

use refract::{Float, RefractiveIndex};

/// Exponent of the power-law mixing rule used for moth-eye textures.
pub const MIXING_EXPONENT: Float = 2.0 / 3.0;

/// Polydimethylsiloxane, single term Sellmeier fit (wavelength in nanometers).
#[inline]
#[must_use]
pub fn pdms() -> RefractiveIndex {
    RefractiveIndex::Sellmeier(vec![(1.0093, 13185.0)])
}

#[inline]
#[must_use]
pub fn air() -> RefractiveIndex {
    RefractiveIndex::Air
}

/// Fitted refractive index of a PDMS moth-eye texture, `height` nanometers
/// above the base of the bumps (the texture is 250nm tall).
#[must_use]
pub fn moth_eye_index(height: Float) -> Float {
    const COEFFS: [Float; 6] = [
        1.41225607,
        -0.00122535861,
        0.0000549792342,
        -0.000000982578598,
        0.00000000532593744,
        -0.00000000000920959868,
    ];

    // horner
    COEFFS.iter().rev().fold(0.0, |acc, c| acc.mul_add(height, *c))
}

/// Share of a hexagonal unit cell covered by hemispherical bumps, cut at
/// `height_fraction` of their radius (`0` at the tip, `1` at the base).
///
/// This is the area ratio: a cut `h` below the tip of a unit hemisphere is a disk
/// of area `π(2h - h²)`, over the `2√3` of the hexagon the bump sits in. It grows
/// from `0` to the close packing density `π / (2√3)`.
#[must_use]
pub fn fill_factor(height_fraction: Float) -> Float {
    let h = height_fraction.clamp(0.0, 1.0);

    // unit radius, the hexagon's apothem matches the bump's radius
    let hexagon_area = 2.0 * Float::sqrt(3.0);
    let disk_area = PI * (2.0 * h - h * h);

    disk_area / hexagon_area
}

/// The effective medium of a moth-eye texture (PDMS bumps in air)
/// at `height_fraction` of the bump's height, see [`fill_factor`].
#[must_use]
pub fn effective_index(height_fraction: Float) -> RefractiveIndex {
    RefractiveIndex::EffectiveMedium {
        fill_factor: fill_factor(height_fraction),
        inclusion: Box::new(pdms()),
        host: Box::new(air()),
        exponent: MIXING_EXPONENT,
    }
}

/// A linear ramp from vacuum (`0`) to bulk PDMS (`1`).
#[must_use]
pub fn graded_pdms(fraction: Float) -> RefractiveIndex {
    RefractiveIndex::EffectiveMedium {
        fill_factor: fraction.clamp(0.0, 1.0),
        inclusion: Box::new(pdms()),
        host: Box::new(1.0.into()),
        exponent: 1.0,
    }
}
