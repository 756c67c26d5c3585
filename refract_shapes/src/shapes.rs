use core::f64::consts::TAU;

use refract::{Float, GeometryError, RefractiveIndex, Segment, Surface, SurfaceKind, Vector2D};

use crate::linspace;

fn single(
    kind: SurfaceKind,
    a: impl Into<Vector2D>,
    b: impl Into<Vector2D>,
    index: impl Into<RefractiveIndex>,
) -> Result<Surface, GeometryError> {
    Segment::new(a, b, index).map(|s| Surface::with_segments(kind, [s]))
}

/// A perfectly reflecting wall from `a` to `b`.
#[inline]
pub fn mirror(a: impl Into<Vector2D>, b: impl Into<Vector2D>) -> Result<Surface, GeometryError> {
    single(SurfaceKind::Mirror, a, b, 1.0)
}

/// An absorber from `a` to `b`, counting what reaches it.
#[inline]
pub fn target(a: impl Into<Vector2D>, b: impl Into<Vector2D>) -> Result<Surface, GeometryError> {
    single(SurfaceKind::Target, a, b, 1.0)
}

/// A flat interface from `a` to `b`, rays crossing it enter a medium of the given `index`.
#[inline]
pub fn layer(
    a: impl Into<Vector2D>,
    b: impl Into<Vector2D>,
    index: impl Into<RefractiveIndex>,
) -> Result<Surface, GeometryError> {
    single(SurfaceKind::Generic, a, b, index)
}

/// The sinusoidal offset `amplitude * sin(frequency * (x - phase)) + offset`
/// added to the height of a [`wave`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WaveProfile {
    pub amplitude: Float,
    pub frequency: Float,
    pub phase: Float,
    pub offset: Float,
}

impl WaveProfile {
    #[inline]
    #[must_use]
    pub const fn new(amplitude: Float, frequency: Float, phase: Float, offset: Float) -> Self {
        Self {
            amplitude,
            frequency,
            phase,
            offset,
        }
    }

    /// One period of moth-eye bumps, `height` tall and `height` wide,
    /// sitting on the baseline with it's crest at `x = height / 2`.
    #[must_use]
    pub fn moth_eye(height: Float) -> Self {
        Self::new(height / 2.0, TAU / height, height / 4.0, height / 2.0)
    }

    #[inline]
    #[must_use]
    pub fn height_at(&self, x: Float) -> Float {
        self.amplitude * (self.frequency * (x - self.phase)).sin() + self.offset
    }
}

/// The baseline `[a, b]` displaced by `profile`, sampled at `resolution` points.
///
/// Each of the `resolution - 1` segments gets it's refractive index from
/// `index`, evaluated at the segment's first point.
pub fn wave(
    a: impl Into<Vector2D>,
    b: impl Into<Vector2D>,
    resolution: usize,
    profile: &WaveProfile,
    mut index: impl FnMut(Vector2D) -> RefractiveIndex,
) -> Result<Surface, GeometryError> {
    if resolution < 2 {
        return Err(GeometryError::Resolution {
            shape: "wave",
            min: 2,
            got: resolution,
        });
    }

    let (a, b) = (a.into(), b.into());

    let points: Vec<_> = linspace(a.x, b.x, resolution)
        .into_iter()
        .zip(linspace(a.y, b.y, resolution))
        .map(|(x, y)| Vector2D::new(x, y + profile.height_at(x)))
        .collect();

    let segments = points
        .windows(2)
        .map(|w| Segment::new(w[0], w[1], index(w[0])))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Surface::with_segments(SurfaceKind::Generic, segments))
}

/// A regular polygon with `resolution` vertices inscribed in the circle of the given
/// `center` and `radius`, that re-emits every ray hitting it.
pub fn quantum_dot(
    center: impl Into<Vector2D>,
    radius: Float,
    resolution: usize,
) -> Result<Surface, GeometryError> {
    if resolution < 3 {
        return Err(GeometryError::Resolution {
            shape: "quantum dot",
            min: 3,
            got: resolution,
        });
    }

    let center = center.into();
    let vertex = |i: usize| {
        let angle = TAU * i as Float / resolution as Float;
        center + Vector2D::new(angle.cos(), angle.sin()) * radius
    };

    let segments = (0..resolution)
        .map(|i| Segment::new(vertex(i), vertex(i + 1), 1.0))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Surface::with_segments(
        SurfaceKind::Scatterer { center, radius },
        segments,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moth_eye_index;
    use approx::assert_relative_eq;
    use refract::rand::SeedableRng;
    use refract::rand_chacha::ChaCha8Rng;
    use refract::{Interaction, Ray};

    #[test]
    fn single_segment_surfaces() {
        let m = mirror([0.0, 250.0], [0.0, -200.0]).unwrap();
        assert_eq!(*m.kind(), SurfaceKind::Mirror);
        assert_eq!(m.segments().len(), 1);

        let t = target([-10.0, -200.0], [10.0, -200.0]).unwrap();
        assert!(t.capture().is_some());

        let l = layer([-10.0, 0.0], [10.0, 0.0], 1.41).unwrap();
        assert_eq!(l.segments()[0].refractive_index(500.0), 1.41);

        assert!(matches!(
            layer([1.0, 1.0], [1.0, 1.0], 1.5),
            Err(GeometryError::DegenerateSegment(_))
        ));
    }

    #[test]
    fn moth_eye_wave_spans_its_height() {
        let profile = WaveProfile::moth_eye(250.0);
        assert_relative_eq!(profile.height_at(0.0), 0.0, epsilon = 1e-9);
        assert_relative_eq!(profile.height_at(125.0), 250.0, epsilon = 1e-9);
        assert_relative_eq!(profile.height_at(250.0), 0.0, epsilon = 1e-9);

        let wave = wave([0.0, 0.0], [250.0, 0.0], 101, &profile, |p| {
            moth_eye_index(p.y).into()
        })
        .unwrap();

        let segments = wave.segments();
        assert_eq!(segments.len(), 100);
        assert_relative_eq!(*segments[50].a(), Vector2D::new(125.0, 250.0), epsilon = 1e-9);
        // contiguous
        assert!(segments.windows(2).all(|w| w[0].b() == w[1].a()));
        assert_relative_eq!(
            segments[0].refractive_index(550.0),
            moth_eye_index(0.0),
            epsilon = 1e-9
        );
    }

    #[test]
    fn wave_needs_two_points() {
        let err = wave([0.0, 0.0], [1.0, 0.0], 1, &WaveProfile::default(), |_| {
            RefractiveIndex::default()
        });
        assert_eq!(
            err.unwrap_err(),
            GeometryError::Resolution {
                shape: "wave",
                min: 2,
                got: 1
            }
        );
    }

    #[test]
    fn quantum_dot_is_a_closed_polygon() {
        let dot = quantum_dot([3.0, -100.0], 5.0, 8).unwrap();
        let segments = dot.segments();

        assert_eq!(segments.len(), 8);
        assert_relative_eq!(*segments[7].b(), *segments[0].a(), epsilon = 1e-12);
        for s in segments {
            assert_relative_eq!((s.a() - Vector2D::new(3.0, -100.0)).norm(), 5.0, epsilon = 1e-12);
        }

        assert!(quantum_dot([0.0, 0.0], 5.0, 2).is_err());
        assert!(quantum_dot([0.0, 0.0], 0.0, 6).is_err());
    }

    #[test]
    fn quantum_dot_reemits_outwards() {
        let dot = quantum_dot([0.0, 0.0], 5.0, 64).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(4);

        for _ in 0..50 {
            let ray = Ray::new([-20.0, 0.0], [1.0, 0.0]);
            let hit = dot.intersect(&ray).unwrap();

            match dot.interact(&hit, ray, &mut rng) {
                Interaction::Continue(rays) => {
                    let r = &rays[0];
                    assert_relative_eq!(r.origin.norm(), 5.5, epsilon = 1e-9);
                    assert!(r.direction().dot(&r.origin) > 0.0);
                }
                Interaction::Captured(_) => panic!("quantum dots never absorb"),
            }
        }
    }
}
