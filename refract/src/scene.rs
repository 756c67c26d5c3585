use std::time::{Duration, Instant};

use arrayvec::ArrayVec;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::{
    BvhParams, Float, Frame, FrameRecording, Hit, Interaction, Ray, RaySource, SceneError, Surface,
    Tally,
};

/// Sources draw from streams with this bit set, rays from streams without it.
const SOURCE_STREAMS: u64 = 1 << 63;

/// When to give up on a bake that takes too long.
///
/// Limits are only checked between frames.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BakeLimits {
    pub max_frames: Option<usize>,
    pub time_budget: Option<Duration>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SceneConfig {
    /// Every random draw of a simulation derives from this.
    pub seed: u64,
    /// Propagate the rays of a frame on the rayon thread pool.
    /// Ignored without the `parallel` feature.
    pub parallel: bool,
    pub recording: FrameRecording,
    pub limits: BakeLimits,
    pub bvh: BvhParams,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            parallel: true,
            recording: FrameRecording::default(),
            limits: BakeLimits::default(),
            bvh: BvhParams::default(),
        }
    }
}

impl SceneConfig {
    #[inline]
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_recording(mut self, recording: FrameRecording) -> Self {
        self.recording = recording;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_max_frames(mut self, max_frames: usize) -> Self {
        self.limits.max_frames = Some(max_frames);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.limits.time_budget = Some(budget);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_bvh(mut self, bvh: BvhParams) -> Self {
        self.bvh = bvh;
        self
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SceneState {
    #[default]
    Uninitialized,
    Initialized,
    /// Baking, the value is the frame being propagated.
    Propagating(usize),
    Finalized,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BakeOutcome {
    /// Every ray terminated.
    Completed { frames: usize },
    /// A [`BakeLimits`] was hit, `remaining` rays were still propagating.
    Aborted { frames: usize, remaining: usize },
}

/// What became of a single ray during a frame.
#[derive(Clone, Debug, PartialEq)]
pub enum Fate {
    /// Out of bounces or power.
    Destroyed(Float),
    /// Hit nothing.
    Lost(Float),
    Captured { surface: usize, power: Float },
    Continued(ArrayVec<Ray, 2>),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SceneStats {
    pub name: String,
    pub start_rays: usize,
    pub start_power: Float,
    pub lost: Tally,
    pub destroyed: Tally,
    pub captured: Tally,
    /// Rays still propagating when the bake was aborted.
    pub remaining: Tally,
    pub frames: usize,
    pub segments: usize,
    pub initialization_time: Duration,
    pub render_time: Duration,
    pub accumulation_time: Duration,
    pub save_time: Duration,
}

impl SceneStats {
    /// Every ray that stopped propagating, one way or another.
    #[inline]
    #[must_use]
    pub fn terminated_rays(&self) -> usize {
        self.lost.rays + self.destroyed.rays + self.captured.rays
    }

    #[inline]
    #[must_use]
    pub fn total_time(&self) -> Duration {
        self.initialization_time + self.render_time + self.accumulation_time + self.save_time
    }
}

/// A simulation: surfaces, the sources lighting them, and the ray population evolving between them.
pub struct Scene {
    name: String,
    config: SceneConfig,
    surfaces: Vec<Surface>,
    sources: Vec<Box<dyn RaySource>>,
    rays: Vec<Ray>,
    frames: Vec<Frame>,
    state: SceneState,
    stats: SceneStats,
}

impl Scene {
    #[must_use]
    pub fn new(name: impl Into<String>, config: SceneConfig) -> Self {
        Self {
            name: name.into(),
            config,
            surfaces: Vec::new(),
            sources: Vec::new(),
            rays: Vec::new(),
            frames: Vec::new(),
            state: SceneState::default(),
            stats: SceneStats::default(),
        }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub const fn config(&self) -> &SceneConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub const fn state(&self) -> SceneState {
        self.state
    }

    /// Returns the index of the surface.
    pub fn add_surface(&mut self, surface: Surface) -> usize {
        self.surfaces.push(surface);
        self.surfaces.len() - 1
    }

    pub fn add_source(&mut self, source: impl RaySource + 'static) {
        self.sources.push(Box::new(source));
    }

    /// Adds a ray to the initial population, alongside the ones generated by sources.
    pub fn add_ray(&mut self, ray: Ray) {
        self.rays.push(ray);
    }

    #[inline]
    #[must_use]
    pub fn surfaces(&self) -> &[Surface] {
        &self.surfaces
    }

    /// The current ray population.
    #[inline]
    #[must_use]
    pub fn rays(&self) -> &[Ray] {
        &self.rays
    }

    #[inline]
    #[must_use]
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    #[inline]
    #[must_use]
    pub const fn stats(&self) -> &SceneStats {
        &self.stats
    }

    #[inline]
    pub fn record_save_time(&mut self, time: Duration) {
        self.stats.save_time = time;
    }

    /// Generate rays from every source, build every surface's tree and index the rays.
    pub fn initialize(&mut self) -> Result<(), SceneError> {
        match self.state {
            SceneState::Uninitialized => {}
            SceneState::Finalized => return Err(SceneError::AlreadyFinalized),
            _ => return Err(SceneError::AlreadyInitialized),
        }

        let start = Instant::now();
        info!(scene = %self.name, "initializing");

        for (i, source) in self.sources.iter_mut().enumerate() {
            let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
            rng.set_stream(SOURCE_STREAMS | i as u64);

            let rays = source.generate_rays(&mut rng);
            debug!(source = i, rays = rays.len(), "generated rays");
            self.rays.extend(rays);
        }

        for (i, surface) in self.surfaces.iter_mut().enumerate() {
            debug!(surface = i, segments = surface.segments().len(), "building bvh");
            surface.build_bvh(&self.config.bvh);
            surface.reset_capture();
        }

        for (i, ray) in self.rays.iter_mut().enumerate() {
            ray.index = i;
        }

        self.stats.start_rays = self.rays.len();
        self.stats.start_power = self.rays.iter().map(|r| r.power).sum();
        self.stats.initialization_time = start.elapsed();
        self.state = SceneState::Initialized;

        info!(
            rays = self.stats.start_rays,
            power = self.stats.start_power,
            elapsed = ?self.stats.initialization_time,
            "initialized"
        );

        Ok(())
    }

    /// Propagate rays, frame by frame, until they all terminate or a [`BakeLimits`] is hit.
    pub fn bake(&mut self) -> Result<BakeOutcome, SceneError> {
        match self.state {
            SceneState::Initialized => {}
            SceneState::Uninitialized => return Err(SceneError::NotInitialized),
            SceneState::Propagating(_) | SceneState::Finalized => {
                return Err(SceneError::AlreadyFinalized)
            }
        }

        let start = Instant::now();
        let base_seed = ChaCha8Rng::seed_from_u64(self.config.seed).get_seed();
        let limits = self.config.limits;
        let mut number = 0;

        let outcome = loop {
            if self.rays.is_empty() {
                self.frames.push(Frame::empty(number));
                break BakeOutcome::Completed {
                    frames: self.frames.len(),
                };
            }

            let out_of_frames = limits.max_frames.is_some_and(|max| number >= max);
            let out_of_time = limits.time_budget.is_some_and(|t| start.elapsed() >= t);

            if out_of_frames || out_of_time {
                warn!(
                    frame = number,
                    remaining = self.rays.len(),
                    "bake aborted"
                );
                break BakeOutcome::Aborted {
                    frames: self.frames.len(),
                    remaining: self.rays.len(),
                };
            }

            self.state = SceneState::Propagating(number);

            let mut frame = Frame::new(number, &self.rays, self.config.recording);
            let rays = std::mem::take(&mut self.rays);
            let fates = self.propagate(rays, number, &base_seed);

            let mut next = Vec::with_capacity(fates.len());

            for fate in fates {
                match fate {
                    Fate::Destroyed(power) => frame.destroyed.add(power),
                    Fate::Lost(power) => frame.lost.add(power),
                    Fate::Captured { surface, power } => {
                        self.surfaces[surface].record_capture(power);
                        frame.captured.add(power);
                    }
                    Fate::Continued(rays) => next.extend(rays),
                }
            }

            debug!(
                frame = number,
                rays = frame.ray_count,
                destroyed = frame.destroyed.rays,
                lost = frame.lost.rays,
                captured = frame.captured.rays,
                "frame done"
            );

            self.frames.push(frame);
            self.rays = next;
            number += 1;
        };

        self.stats.render_time = start.elapsed();
        self.state = SceneState::Finalized;

        info!(?outcome, elapsed = ?self.stats.render_time, "bake finished");

        Ok(outcome)
    }

    fn propagate(&self, rays: Vec<Ray>, frame: usize, seed: &[u8; 32]) -> Vec<Fate> {
        let surfaces = self.surfaces.as_slice();
        let step = |(slot, ray): (usize, Ray)| {
            let mut rng = ChaCha8Rng::from_seed(*seed);
            rng.set_stream(((frame as u64) << 32) | slot as u64);
            travel(surfaces, ray, &mut rng)
        };

        #[cfg(feature = "parallel")]
        if self.config.parallel {
            return rays.into_par_iter().enumerate().map(step).collect();
        }

        rays.into_iter().enumerate().map(step).collect()
    }

    /// Sum up what happened to every ray.
    ///
    /// Can be called again, the statistics are recomputed from scratch.
    pub fn accumulate_stats(&mut self) -> Result<&SceneStats, SceneError> {
        match self.state {
            SceneState::Finalized => {}
            SceneState::Uninitialized => return Err(SceneError::NotInitialized),
            _ => return Err(SceneError::NotBaked),
        }

        let start = Instant::now();
        let stats = &mut self.stats;

        stats.name.clone_from(&self.name);
        stats.frames = self.frames.len();
        stats.lost = self.frames.iter().map(|f| f.lost).sum();
        stats.destroyed = self.frames.iter().map(|f| f.destroyed).sum();
        stats.captured = self.surfaces.iter().filter_map(Surface::capture).copied().sum();
        stats.remaining = self.rays.iter().map(|r| Tally { rays: 1, power: r.power }).sum();
        stats.segments = self.surfaces.iter().map(|s| s.segments().len()).sum();
        stats.accumulation_time = start.elapsed();

        Ok(stats)
    }

    /// [`initialize`](Self::initialize), [`bake`](Self::bake) and [`accumulate_stats`](Self::accumulate_stats).
    pub fn render(&mut self) -> Result<BakeOutcome, SceneError> {
        self.initialize()?;
        let outcome = self.bake()?;
        self.accumulate_stats()?;
        Ok(outcome)
    }
}

/// Move `ray` one step forward: to the nearest segment over all `surfaces`.
pub fn travel(surfaces: &[Surface], mut ray: Ray, rng: &mut dyn RngCore) -> Fate {
    ray.bounce();

    if ray.is_terminated() {
        return Fate::Destroyed(ray.power);
    }

    let nearest = surfaces
        .iter()
        .enumerate()
        .filter_map(|(i, s)| s.intersect(&ray).map(|hit| (i, hit)))
        .fold(None, |nearest: Option<(usize, Hit)>, (i, hit)| match nearest {
            Some((_, best)) if best.distance <= hit.distance => nearest,
            _ => Some((i, hit)),
        });

    let Some((surface, hit)) = nearest else {
        return Fate::Lost(ray.power);
    };

    match surfaces[surface].interact(&hit, ray, rng) {
        Interaction::Captured(power) => Fate::Captured { surface, power },
        Interaction::Continue(rays) => Fate::Continued(rays),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Perturbance, Planar, Segment, SurfaceKind, Vector2D};
    use approx::assert_relative_eq;

    fn mirror(a: [Float; 2], b: [Float; 2]) -> Surface {
        Surface::with_segments(SurfaceKind::Mirror, [Segment::new(a, b, 1.0).unwrap()])
    }

    fn target(a: [Float; 2], b: [Float; 2]) -> Surface {
        Surface::with_segments(SurfaceKind::Target, [Segment::new(a, b, 1.0).unwrap()])
    }

    #[test]
    fn mirror_to_target_captures_everything() {
        let mut scene = Scene::new("mirror", SceneConfig::default());
        // 45° tilt, centered 10 units along the ray
        scene.add_surface(mirror([9.0, -1.0], [11.0, 1.0]));
        let t = scene.add_surface(target([8.0, 5.0], [12.0, 5.0]));
        scene.add_ray(Ray::new([0.0, 0.0], [1.0, 0.0]));

        let outcome = scene.render().unwrap();
        assert_eq!(outcome, BakeOutcome::Completed { frames: 3 });

        let stats = scene.stats();
        assert_eq!(stats.start_rays, 1);
        assert_eq!(stats.captured.rays, 1);
        assert_eq!(stats.captured.power, 1.0);
        assert_eq!(stats.lost, Tally::default());
        assert_eq!(stats.destroyed, Tally::default());
        assert_eq!(stats.segments, 2);
        assert_eq!(stats.frames, 3);
        assert_eq!(scene.surfaces()[t].capture().unwrap().rays, 1);

        let frames = scene.frames();
        assert_eq!(frames[0].rays.as_ref().unwrap()[0].index, 0);

        // reflected at the mirror's center, now travelling vertically
        let reflected = &frames[1].rays.as_ref().unwrap()[0];
        assert_relative_eq!(reflected.origin, Vector2D::new(10.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(*reflected.direction(), Vector2D::y(), epsilon = 1e-12);
        assert_eq!(reflected.power, 1.0);

        let arrival = scene.surfaces()[t].intersect(reflected).unwrap();
        assert_relative_eq!(
            reflected.at(arrival.distance),
            Vector2D::new(10.0, 5.0),
            epsilon = 1e-12
        );

        assert_eq!(frames[1].captured.rays, 1);
        assert_eq!(frames[2].ray_count, 0);
    }

    #[test]
    fn mirrors_hold_rays_far_from_the_origin() {
        let config = SceneConfig::default().with_parallel(false);
        let mut scene = Scene::new("mirror box", config);
        scene.add_surface(mirror([-10000.0, 250.0], [-10000.0, -200.0]));
        scene.add_surface(mirror([10000.0, 250.0], [10000.0, -200.0]));
        scene.add_surface(mirror([-10000.0, 250.0], [10000.0, 250.0]));
        scene.add_surface(target([-10000.0, -200.0], [10000.0, -200.0]));

        for i in 0..500 {
            let d = Vector2D::new(1.0, 0.0).rotated(-0.5 - (i % 7) as Float * 0.1);
            scene.add_ray(Ray::new([i as Float * 3.1, 200.0], d).with_max_bounces(1000));
        }

        scene.render().unwrap();

        let stats = scene.stats();
        assert_eq!(stats.lost, Tally::default());
        assert_eq!(stats.destroyed, Tally::default());
        assert_eq!(stats.captured.rays, 500);
    }

    #[test]
    fn rays_hitting_nothing_are_lost() {
        let mut scene = Scene::new("void", SceneConfig::default());
        scene.add_surface(target([0.0, 5.0], [1.0, 5.0]));
        scene.add_ray(Ray::new([0.0, 0.0], [0.0, -1.0]).with_power(0.5));

        scene.render().unwrap();
        assert_eq!(scene.stats().lost, Tally { rays: 1, power: 0.5 });
        assert_eq!(scene.stats().captured, Tally::default());
    }

    #[test]
    fn termination_within_bounce_budget() {
        let max_bounces = 10;
        let mut scene = Scene::new("cavity", SceneConfig::default());
        scene.add_surface(mirror([-1.0, -1.0], [-1.0, 1.0]));
        scene.add_surface(mirror([1.0, -1.0], [1.0, 1.0]));
        scene.add_ray(Ray::new([0.0, 0.0], [1.0, 0.0]).with_max_bounces(max_bounces));

        scene.render().unwrap();

        let non_empty = scene.frames().iter().filter(|f| f.ray_count > 0).count();
        assert_eq!(non_empty, max_bounces as usize + 1);
        assert_eq!(scene.stats().destroyed.rays, 1);
        assert_eq!(scene.frames().last().unwrap().ray_count, 0);
    }

    fn slab_scene(parallel: bool) -> Scene {
        let config = SceneConfig::default().with_seed(9).with_parallel(parallel);
        let mut scene = Scene::new("slab", config);

        let rough = Perturbance::gaussian(0.0, 10.0).unwrap();
        let mut slab = Surface::new(SurfaceKind::Generic);
        for i in 0..20 {
            let x = i as Float - 10.0;
            let top = Segment::new([x, 0.0], [x + 1.0, 0.0], 1.5).unwrap();
            let bottom = Segment::new([x, -1.0], [x + 1.0, -1.0], 1.0).unwrap();
            slab.add_segment(top.with_perturbance(rough));
            slab.add_segment(bottom.with_perturbance(rough));
        }
        scene.add_surface(slab);
        scene.add_surface(target([-20.0, -3.0], [20.0, -3.0]));

        for i in 0..64 {
            let angle = -60.0 + i as Float * 2.0;
            let d = Vector2D::new(0.0, -1.0).rotated(angle);
            scene.add_ray(Ray::new([0.0, 2.0], d));
        }
        scene
    }

    #[test]
    fn serial_and_parallel_bakes_agree() {
        let mut serial = slab_scene(false);
        let mut parallel = slab_scene(true);
        serial.render().unwrap();
        parallel.render().unwrap();

        let (s, p) = (serial.stats(), parallel.stats());
        assert_eq!(s.lost, p.lost);
        assert_eq!(s.destroyed, p.destroyed);
        assert_eq!(s.captured, p.captured);
        assert_eq!(s.frames, p.frames);
        assert_eq!(serial.frames(), parallel.frames());
    }

    #[test]
    fn power_is_accounted_for() {
        let mut scene = slab_scene(true);
        scene.render().unwrap();
        let s = scene.stats();

        let accounted = s.lost.power + s.destroyed.power + s.captured.power;
        assert_relative_eq!(accounted, s.start_power, epsilon = 1e-9);
        assert!(s.captured.power > 0.0);
    }

    #[test]
    fn aborted_bakes_report_remaining_rays() {
        let config = SceneConfig::default().with_max_frames(3);
        let mut scene = Scene::new("aborted", config);
        scene.add_surface(mirror([-1.0, -1.0], [-1.0, 1.0]));
        scene.add_surface(mirror([1.0, -1.0], [1.0, 1.0]));
        scene.add_ray(Ray::new([0.0, 0.0], [1.0, 0.0]).with_power(0.7));

        let outcome = scene.render().unwrap();
        assert_eq!(
            outcome,
            BakeOutcome::Aborted {
                frames: 3,
                remaining: 1
            }
        );
        assert_eq!(scene.stats().remaining, Tally { rays: 1, power: 0.7 });
        assert_eq!(scene.state(), SceneState::Finalized);
    }

    #[test]
    fn lifecycle_is_enforced() {
        let mut scene = Scene::new("lifecycle", SceneConfig::default());
        assert_eq!(scene.bake(), Err(SceneError::NotInitialized));
        assert_eq!(scene.accumulate_stats().err(), Some(SceneError::NotInitialized));

        scene.initialize().unwrap();
        assert_eq!(scene.initialize(), Err(SceneError::AlreadyInitialized));
        assert_eq!(scene.accumulate_stats().err(), Some(SceneError::NotBaked));

        assert_eq!(scene.bake(), Ok(BakeOutcome::Completed { frames: 1 }));
        assert_eq!(scene.bake(), Err(SceneError::AlreadyFinalized));
        assert!(scene.accumulate_stats().is_ok());
    }

    #[test]
    fn sources_are_polled_on_initialization() {
        let mut scene = Scene::new("sources", SceneConfig::default());
        scene.add_source(Ray::new([0.0, 0.0], [1.0, 0.0]).with_power(0.5));
        scene.add_ray(Ray::new([0.0, 0.0], [0.0, 1.0]));

        scene.initialize().unwrap();
        assert_eq!(scene.stats().start_rays, 2);
        assert_relative_eq!(scene.stats().start_power, 1.5);
        let indices: Vec<_> = scene.rays().iter().map(|r| r.index).collect();
        assert_eq!(indices, [0, 1]);
    }
}
