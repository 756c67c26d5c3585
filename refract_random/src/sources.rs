use core::f64::consts::TAU;

use rand::RngCore;
use refract::{Float, Planar, Ray, RaySource, Side, Vector2D, EPSILON};
use refract_shapes::linspace;

use crate::{SampleTable, WavelengthSampler};

/// Emits `count` rays in every direction, evenly spread around `origin`.
#[derive(Clone, Debug)]
pub struct PointSource {
    pub origin: Vector2D,
    pub count: usize,
    pub wavelengths: WavelengthSampler,
    /// Refractive index of the medium the source sits in
    pub medium: Float,
}

impl PointSource {
    #[must_use]
    pub fn new(origin: impl Into<Vector2D>, count: usize) -> Self {
        Self {
            origin: origin.into(),
            count,
            wavelengths: WavelengthSampler::default(),
            medium: 1.0,
        }
    }
}

impl RaySource for PointSource {
    fn generate_rays(&mut self, rng: &mut dyn RngCore) -> Vec<Ray> {
        (0..self.count)
            .map(|i| {
                let angle = TAU * i as Float / self.count as Float;
                Ray::new(self.origin, [angle.cos(), angle.sin()])
                    .with_wavelength(self.wavelengths.sample(rng))
                    .with_medium(self.medium)
            })
            .collect()
    }
}

/// Emits `count` rays from `origin`, aimed at evenly spaced points of the segment `[a, b]`.
#[derive(Clone, Debug)]
pub struct ConeLight {
    pub origin: Vector2D,
    pub a: Vector2D,
    pub b: Vector2D,
    pub count: usize,
    pub wavelengths: WavelengthSampler,
    pub medium: Float,
}

impl ConeLight {
    #[must_use]
    pub fn new(
        origin: impl Into<Vector2D>,
        a: impl Into<Vector2D>,
        b: impl Into<Vector2D>,
        count: usize,
        wavelengths: WavelengthSampler,
    ) -> Self {
        Self {
            origin: origin.into(),
            a: a.into(),
            b: b.into(),
            count,
            wavelengths,
            medium: 1.0,
        }
    }
}

impl RaySource for ConeLight {
    fn generate_rays(&mut self, rng: &mut dyn RngCore) -> Vec<Ray> {
        let ab = self.b - self.a;
        let degenerate = ab.norm() < EPSILON;

        linspace(0.0, 1.0, self.count)
            .into_iter()
            .map(|t| {
                let target = if degenerate { self.a } else { self.a + ab * t };
                Ray::new(self.origin, target - self.origin)
                    .with_wavelength(self.wavelengths.sample(rng))
                    .with_medium(self.medium)
            })
            .collect()
    }
}

/// Emits `count` parallel rays from evenly spaced points of the segment `[a, b]`,
/// travelling along it's left normal.
#[derive(Clone, Debug)]
pub struct DirectionalLight {
    pub a: Vector2D,
    pub b: Vector2D,
    pub count: usize,
    pub wavelengths: WavelengthSampler,
    /// Flip the direction if it points upwards.
    pub down: bool,
    pub medium: Float,
}

impl DirectionalLight {
    #[must_use]
    pub fn new(
        a: impl Into<Vector2D>,
        b: impl Into<Vector2D>,
        count: usize,
        wavelengths: WavelengthSampler,
    ) -> Self {
        Self {
            a: a.into(),
            b: b.into(),
            count,
            wavelengths,
            down: true,
            medium: 1.0,
        }
    }

    #[must_use]
    pub fn direction(&self) -> Vector2D {
        let direction = (self.b - self.a).normal(Side::Left);
        if self.down && direction.y > 0.0 {
            -direction
        } else {
            direction
        }
    }
}

impl RaySource for DirectionalLight {
    fn generate_rays(&mut self, rng: &mut dyn RngCore) -> Vec<Ray> {
        let direction = self.direction();

        linspace(0.0, 1.0, self.count)
            .into_iter()
            .map(|t| {
                Ray::new(self.a.lerp(&self.b, t), direction)
                    .with_wavelength(self.wavelengths.sample(rng))
                    .with_medium(self.medium)
            })
            .collect()
    }
}

/// Sunlight: `count` rays from `origin`, along `direction` rotated by an angle
/// (in degrees) drawn from `angles`, with wavelengths drawn from `wavelengths`.
#[derive(Clone, Debug)]
pub struct SolarSource {
    pub origin: Vector2D,
    pub direction: Vector2D,
    pub count: usize,
    pub wavelengths: WavelengthSampler,
    pub angles: SampleTable,
    pub medium: Float,
}

impl SolarSource {
    #[must_use]
    pub fn new(
        origin: impl Into<Vector2D>,
        direction: impl Into<Vector2D>,
        count: usize,
        wavelengths: WavelengthSampler,
        angles: SampleTable,
    ) -> Self {
        Self {
            origin: origin.into(),
            direction: direction.into(),
            count,
            wavelengths,
            angles,
            medium: 1.0,
        }
    }
}

impl RaySource for SolarSource {
    fn generate_rays(&mut self, rng: &mut dyn RngCore) -> Vec<Ray> {
        (0..self.count)
            .map(|_| {
                let wavelength = self.wavelengths.sample(rng);
                let angle = self.angles.sample(rng);
                Ray::new(self.origin, self.direction.rotated(angle))
                    .with_wavelength(wavelength)
                    .with_medium(self.medium)
            })
            .collect()
    }
}
