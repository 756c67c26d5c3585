use rand::RngCore;
use rand_distr::{Distribution, Normal};

use crate::{Float, GeometryError};

/// The refractive index of the medium behind a segment, as a function of wavelength (in nanometers).
#[derive(Clone, Debug, PartialEq)]
pub enum RefractiveIndex {
    /// Non-dispersive medium
    Constant(Float),
    /// `n² = 1 + Σ bᵢ λ² / (λ² - cᵢ)`, `λ` in nanometers, `cᵢ` in nm².
    Sellmeier(Vec<(Float, Float)>),
    /// Dry air at standard conditions (Ciddor's two term dispersion formula).
    Air,
    /// Piecewise linear interpolation between tabulated samples,
    /// clamped to the first and last entries outside the table.
    ///
    /// `wavelengths` must be sorted and have the same length as `indices`.
    Table {
        wavelengths: Vec<Float>,
        indices: Vec<Float>,
    },
    /// Power-law mixing of two media:
    /// `n = (f nᵢ^q + (1 - f) nₕ^q)^(1/q)`
    EffectiveMedium {
        fill_factor: Float,
        inclusion: Box<RefractiveIndex>,
        host: Box<RefractiveIndex>,
        exponent: Float,
    },
}

impl Default for RefractiveIndex {
    #[inline]
    fn default() -> Self {
        Self::Constant(1.0)
    }
}

impl From<Float> for RefractiveIndex {
    #[inline]
    fn from(n: Float) -> Self {
        Self::Constant(n)
    }
}

impl RefractiveIndex {
    /// Evaluate this index at `wavelength` (in nanometers).
    #[must_use]
    pub fn at(&self, wavelength: Float) -> Float {
        match self {
            Self::Constant(n) => *n,
            Self::Sellmeier(terms) => {
                let l2 = wavelength * wavelength;
                let sum: Float = terms.iter().map(|(b, c)| b * l2 / (l2 - c)).sum();
                (1.0 + sum).sqrt()
            }
            Self::Air => {
                let um = wavelength * 1e-3;
                let inv_l2 = 1.0 / (um * um);
                1.0 + 0.05792105 / (238.0185 - inv_l2) + 0.00167917 / (57.362 - inv_l2)
            }
            Self::Table {
                wavelengths,
                indices,
            } => interpolate(wavelengths, indices, wavelength),
            Self::EffectiveMedium {
                fill_factor,
                inclusion,
                host,
                exponent,
            } => {
                let q = *exponent;
                let f = *fill_factor;
                (f * inclusion.at(wavelength).powf(q) + (1.0 - f) * host.at(wavelength).powf(q))
                    .powf(q.recip())
            }
        }
    }
}

fn interpolate(xs: &[Float], ys: &[Float], x: Float) -> Float {
    let n = xs.len().min(ys.len());
    match n {
        0 => 1.0,
        1 => ys[0],
        _ if x <= xs[0] => ys[0],
        _ if x >= xs[n - 1] => ys[n - 1],
        _ => {
            // first sample strictly greater than `x`, never 0 thanks to the guards above
            let i = xs[..n].partition_point(|&v| v <= x);
            let (x0, x1) = (xs[i - 1], xs[i]);
            let (y0, y1) = (ys[i - 1], ys[i]);
            let t = (x - x0) / (x1 - x0);
            y0 + t * (y1 - y0)
        }
    }
}

/// Angular jitter, in degrees, applied to a segment's normal every time it is queried.
///
/// This is how surface roughness is modeled.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Perturbance {
    #[default]
    None,
    Constant(Float),
    /// Build with [`Perturbance::gaussian`], which validates the parameters
    Gaussian { mean: Float, std_dev: Float },
}

impl Perturbance {
    /// A normally distributed jitter.
    ///
    /// Fails if `std_dev` is negative or not finite.
    pub fn gaussian(mean: Float, std_dev: Float) -> Result<Self, GeometryError> {
        if !mean.is_finite() || Normal::new(mean, std_dev).is_err() {
            return Err(GeometryError::InvalidPerturbance { mean, std_dev });
        }
        Ok(Self::Gaussian { mean, std_dev })
    }

    #[inline]
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        !matches!(self, Self::Gaussian { .. })
    }

    /// Draw an angle in degrees.
    #[inline]
    pub fn sample(&self, rng: &mut dyn RngCore) -> Float {
        match self {
            Self::None => 0.0,
            Self::Constant(angle) => *angle,
            Self::Gaussian { mean, std_dev } => {
                Normal::new(*mean, *std_dev).map_or(*mean, |normal| normal.sample(rng))
            }
        }
    }
}
