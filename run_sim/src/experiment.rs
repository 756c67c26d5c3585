use std::{
    fs,
    path::{Path, PathBuf},
    time::Instant,
};

use anyhow::{ensure, Context, Result};
use refract::{BakeOutcome, Float, Scene, SceneConfig, SceneStats, Vector2D};
use refract_random::{
    ConeLight, DirectionalLight, PointSource, SampleTable, SolarSource, WavelengthSampler,
};
use refract_shapes::{
    layer, linspace, mirror, moth_eye_index, quantum_dot, target, wave, WaveProfile,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

/// Height of the moth-eye texture, and of the layer stack emulating it, in nanometers.
const TEXTURE_HEIGHT: Float = 250.0;
/// Where the absorber sits, below the texture.
const TARGET_Y: Float = -200.0;
/// Index of the bulk the emitters are embedded in.
const BULK_INDEX: Float = 1.41;
/// Emitters are buried this deep.
const EMITTER_Y: Float = -100.0;

fn default_span() -> [Float; 2] {
    [-10000.0, 10000.0]
}

fn default_emitter_span() -> [Float; 2] {
    [-125.0, 125.0]
}

const fn default_dot_radius() -> Float {
    5.0
}

const fn default_dot_resolution() -> usize {
    500
}

const fn default_passive_dot_resolution() -> usize {
    250
}

const fn default_wave_resolution() -> usize {
    10000
}

const fn default_texture_height() -> Float {
    TEXTURE_HEIGHT
}

const fn default_sun_height() -> Float {
    1000.0
}

const fn default_sweep_rays() -> usize {
    1
}

const fn default_demo_rays() -> usize {
    16
}

/// Quantum dots of the given `radius` and `resolution`, evenly spread along
/// `[start, end]` (endpoints excluded), returns their centers.
fn embed_dots(
    scene: &mut Scene,
    count: usize,
    [start, end]: [Float; 2],
    radius: Float,
    resolution: usize,
) -> Result<Vec<Vector2D>> {
    let xs = linspace(start, end, count + 2);
    let mut centers = Vec::with_capacity(count);

    for &x in &xs[1..=count] {
        let center = Vector2D::new(x, EMITTER_Y);
        scene.add_surface(quantum_dot(center, radius, resolution)?);
        centers.push(center);
    }

    Ok(centers)
}

/// Where the wavelengths of emitted rays come from.
///
/// ```json
/// 550.0
/// { "mean": 550.0, "std_dev": 20.0 }
/// { "table": "AM15G.json" }
/// ```
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Spectrum {
    Constant(Float),
    Gaussian { mean: Float, std_dev: Float },
    Table { table: PathBuf },
}

impl Default for Spectrum {
    fn default() -> Self {
        Self::Constant(550.0)
    }
}

impl Spectrum {
    pub fn sampler(&self) -> Result<WavelengthSampler> {
        Ok(match self {
            Self::Constant(wavelength) => WavelengthSampler::Constant(*wavelength),
            Self::Gaussian { mean, std_dev } => WavelengthSampler::gaussian(*mean, *std_dev)?,
            Self::Table { table } => WavelengthSampler::load(table)
                .with_context(|| format!("failed to load spectrum {}", table.display()))?,
        })
    }
}

/// What lights a structure up.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Emitters {
    /// Quantum dots, evenly spread along `span`, each re-emitting what hits it.
    QuantumDots {
        count: usize,
        rays: usize,
        span: Option<[Float; 2]>,
        #[serde(default = "default_dot_radius")]
        radius: Float,
        #[serde(default = "default_dot_resolution")]
        resolution: usize,
        #[serde(default)]
        spectrum: Spectrum,
    },
    /// Cone lights, evenly spread along `span`, aimed at the texture.
    Cones {
        count: usize,
        rays: usize,
        span: Option<[Float; 2]>,
        #[serde(default)]
        spectrum: Spectrum,
    },
    /// Sunlight falling from `height`, with it's angular spread read from `angles`.
    Sun {
        rays: usize,
        spectrum: Spectrum,
        angles: PathBuf,
        #[serde(default = "default_sun_height")]
        height: Float,
    },
}

impl Emitters {
    fn prefix(&self) -> String {
        match self {
            Self::QuantumDots { count, .. } => format!("QD{count}"),
            Self::Cones { count, .. } => format!("Cone{count}"),
            Self::Sun { .. } => "Sun".into(),
        }
    }

    /// Add these emitters to `scene`, `aperture` being the segment cones aim at
    /// and the sun shines over.
    fn add_to(
        &self,
        scene: &mut Scene,
        default_span: [Float; 2],
        aperture: [Vector2D; 2],
    ) -> Result<()> {
        match self {
            Self::QuantumDots {
                count,
                rays,
                span,
                radius,
                resolution,
                spectrum,
            } => {
                let wavelengths = spectrum.sampler()?;
                let span = span.unwrap_or(default_span);
                for center in embed_dots(scene, *count, span, *radius, *resolution)? {
                    let mut source = PointSource::new(center, *rays);
                    source.wavelengths = wavelengths.clone();
                    source.medium = BULK_INDEX;
                    scene.add_source(source);
                }
            }
            Self::Cones {
                count,
                rays,
                span,
                spectrum,
            } => {
                let wavelengths = spectrum.sampler()?;
                let [a, b] = aperture;
                let [start, end] = span.unwrap_or(default_span);
                let xs = linspace(start, end, count + 2);
                for &x in &xs[1..=*count] {
                    let mut cone =
                        ConeLight::new([x, EMITTER_Y], a, b, *rays, wavelengths.clone());
                    cone.medium = BULK_INDEX;
                    scene.add_source(cone);
                }
            }
            Self::Sun {
                rays,
                spectrum,
                angles,
                height,
            } => {
                let angles = SampleTable::load(angles)
                    .with_context(|| format!("failed to load angles {}", angles.display()))?;
                let [a, b] = aperture;
                let origin = Vector2D::new((a.x + b.x) / 2.0, *height);

                scene.add_source(SolarSource::new(
                    origin,
                    [0.0, -1.0],
                    *rays,
                    spectrum.sampler()?,
                    angles,
                ));
            }
        }

        Ok(())
    }
}

/// A wide slab of layers grading from air to the bulk, walled by mirrors,
/// with an absorber underneath.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Waveguide {
    pub name: Option<String>,
    pub layers: usize,
    #[serde(default = "default_span")]
    pub span: [Float; 2],
    /// Grade the layers along the moth-eye index profile instead of linearly.
    ///
    /// The profile is measured from the top of the block.
    #[serde(default)]
    pub moth_eye: bool,
    pub emitters: Emitters,
}

/// One period of a moth-eye texture above a bulk holding the emitters.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct WaveCell {
    pub name: Option<String>,
    #[serde(default = "default_wave_resolution")]
    pub resolution: usize,
    /// Also the width of the cell.
    #[serde(default = "default_texture_height")]
    pub height: Float,
    pub emitters: Emitters,
}

/// How much of a collimated beam hitting a waveguide reaches it's absorber,
/// for angles of incidence evenly spread from `0` to `max_angle` degrees.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct CaptureAngleSweep {
    pub name: Option<String>,
    pub layers: usize,
    #[serde(default)]
    pub moth_eye: bool,
    pub angles: usize,
    pub max_angle: Float,
    #[serde(default = "default_span")]
    pub span: [Float; 2],
    #[serde(default = "default_sweep_rays")]
    pub rays: usize,
    #[serde(default)]
    pub spectrum: Spectrum,
}

/// A waveguide holding passive quantum dots, lit by a collimated beam coming in at
/// `angle` degrees off the horizontal.
///
/// The unit cell variant is 250nm wide instead of 20µm.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct IlluminatedWaveguide {
    pub name: Option<String>,
    pub layers: usize,
    pub dots: usize,
    pub angle: Float,
    pub rays: usize,
    #[serde(default)]
    pub unit_cell: bool,
    #[serde(default)]
    pub moth_eye: bool,
    #[serde(default = "default_dot_radius")]
    pub dot_radius: Float,
    #[serde(default = "default_passive_dot_resolution")]
    pub dot_resolution: usize,
    #[serde(default)]
    pub spectrum: Spectrum,
}

/// A beam folded by a 45° mirror onto an absorber.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct MirrorDemo {
    pub name: Option<String>,
    #[serde(default = "default_demo_rays")]
    pub rays: usize,
    #[serde(default)]
    pub spectrum: Spectrum,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Experiment {
    Waveguide(Waveguide),
    WaveCell(WaveCell),
    CaptureAngleSweep(CaptureAngleSweep),
    IlluminatedWaveguide(IlluminatedWaveguide),
    MirrorDemo(MirrorDemo),
}

/// The contents of an experiment file: one experiment, or a list of them.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ExperimentFile {
    One(Experiment),
    Many(Vec<Experiment>),
}

impl ExperimentFile {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read experiment file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("invalid experiment file {}", path.display()))
    }

    #[must_use]
    pub fn experiments(&self) -> &[Experiment] {
        match self {
            Self::One(experiment) => core::slice::from_ref(experiment),
            Self::Many(experiments) => experiments,
        }
    }
}

/// Shared by every experiment of a run.
#[derive(Clone, Debug)]
pub struct Settings {
    pub config: SceneConfig,
    pub out_dir: PathBuf,
}

/// The layered block every waveguide experiment starts from.
fn waveguide_block(
    name: String,
    config: SceneConfig,
    layers: usize,
    [start, end]: [Float; 2],
    moth_eye: bool,
) -> Result<Scene> {
    let mut scene = Scene::new(name, config);

    scene.add_surface(mirror([start, TEXTURE_HEIGHT], [start, TARGET_Y])?);
    scene.add_surface(mirror([end, TEXTURE_HEIGHT], [end, TARGET_Y])?);
    scene.add_surface(target([start, TARGET_Y], [end, TARGET_Y])?);

    let heights = linspace(TEXTURE_HEIGHT, 0.0, layers);
    let indices = linspace(1.0, BULK_INDEX, layers);

    for (y, n) in heights.into_iter().zip(indices) {
        let n = if moth_eye {
            moth_eye_index(TEXTURE_HEIGHT - y)
        } else {
            n
        };
        scene.add_surface(layer([start, y], [end, y], n)?);
    }

    Ok(scene)
}

fn with_suffix(mut name: String, moth_eye: bool) -> String {
    if moth_eye {
        name.push_str("_MothEye");
    }
    name
}

impl Waveguide {
    pub fn build(&self, config: SceneConfig) -> Result<Scene> {
        let name = self.name.clone().unwrap_or_else(|| {
            let name = format!("{}Waveguide{}", self.emitters.prefix(), self.layers);
            with_suffix(name, self.moth_eye)
        });

        let mut scene = waveguide_block(name, config, self.layers, self.span, self.moth_eye)?;
        let [start, end] = self.span;
        self.emitters.add_to(
            &mut scene,
            default_emitter_span(),
            [Vector2D::new(start, 0.0), Vector2D::new(end, 0.0)],
        )?;

        Ok(scene)
    }
}

impl WaveCell {
    pub fn build(&self, config: SceneConfig) -> Result<Scene> {
        let name = self
            .name
            .clone()
            .unwrap_or_else(|| format!("{}WaveUnitCell", self.emitters.prefix()));
        let width = self.height;
        let mut scene = Scene::new(name, config);

        // the index fit is for a texture of the default height
        let scale = TEXTURE_HEIGHT / self.height;
        scene.add_surface(wave(
            [0.0, 0.0],
            [width, 0.0],
            self.resolution,
            &WaveProfile::moth_eye(self.height),
            |p| moth_eye_index(p.y * scale).into(),
        )?);
        scene.add_surface(mirror([0.0, 0.0], [0.0, TARGET_Y])?);
        scene.add_surface(mirror([width, 0.0], [width, TARGET_Y])?);
        scene.add_surface(target([0.0, TARGET_Y], [width, TARGET_Y])?);

        self.emitters.add_to(
            &mut scene,
            [0.0, width],
            [Vector2D::new(0.0, 0.0), Vector2D::new(width, 0.0)],
        )?;

        Ok(scene)
    }
}

impl CaptureAngleSweep {
    #[must_use]
    pub fn name(&self) -> String {
        self.name.clone().unwrap_or_else(|| {
            let name = format!("MaxCaptureAngleWaveguide{}MaxAngle{}", self.layers, self.max_angle);
            with_suffix(name, self.moth_eye)
        })
    }

    /// The scene lit at `angle` degrees off the vertical.
    pub fn build(&self, config: SceneConfig, angle: Float) -> Result<Scene> {
        const EMITTER_LENGTH: Float = 1000.0;
        const WALL_HEIGHT: Float = 1400.0;
        const BEAM_HEIGHT: Float = 300.0;

        let [start, end] = self.span;
        let name = format!("{}Angle{angle}", self.name());
        let mut scene = waveguide_block(name, config, self.layers, self.span, self.moth_eye)?;

        // keep the beam inside above the block
        scene.add_surface(mirror([start, WALL_HEIGHT], [start, 0.0])?);
        scene.add_surface(mirror([end, WALL_HEIGHT], [end, 0.0])?);

        let anchor = Vector2D::new(end - 100.0, BEAM_HEIGHT);
        let radians = angle.to_radians();
        let tail = anchor + Vector2D::new(-radians.cos(), radians.sin()) * EMITTER_LENGTH;

        scene.add_source(DirectionalLight::new(
            tail,
            anchor,
            self.rays,
            self.spectrum.sampler()?,
        ));

        Ok(scene)
    }

    /// Returns the swept angles, and the share of the emitted power captured at each of them.
    pub fn sweep(&self, config: SceneConfig) -> Result<(Vec<Float>, Vec<Float>)> {
        let angles = linspace(0.0, self.max_angle, self.angles);

        let captured = angles
            .iter()
            .map(|&angle| {
                let mut scene = self.build(config, angle)?;
                render(&mut scene)?;
                Ok(captured_share(scene.stats()))
            })
            .collect::<Result<_>>()?;

        Ok((angles, captured))
    }
}

impl IlluminatedWaveguide {
    #[must_use]
    pub fn name(&self) -> String {
        self.name.clone().unwrap_or_else(|| {
            let mut name = format!(
                "RealLifeQD{}Waveguide{}Angle{}",
                self.dots, self.layers, self.angle
            );
            if self.unit_cell {
                name.push_str("UnitCell");
            }
            with_suffix(name, self.moth_eye)
        })
    }

    pub fn build(&self, config: SceneConfig) -> Result<Scene> {
        const BEAM_HEIGHT: Float = 300.0;

        let (span, wall_height) = if self.unit_cell {
            ([-125.0, 125.0], 1000.0)
        } else {
            ([-10000.0, 10000.0], 20000.0)
        };
        let [start, end] = span;

        let mut scene = waveguide_block(self.name(), config, self.layers, span, self.moth_eye)?;

        scene.add_surface(mirror([start, wall_height], [start, 0.0])?);
        scene.add_surface(mirror([end, wall_height], [end, 0.0])?);

        embed_dots(&mut scene, self.dots, span, self.dot_radius, self.dot_resolution)?;

        let length = (end - start) * 0.95;
        let anchor = Vector2D::new(end * 0.95, BEAM_HEIGHT);
        let radians = self.angle.to_radians();
        let tail = anchor + Vector2D::new(-radians.cos(), radians.sin()) * length;

        scene.add_source(DirectionalLight::new(
            tail,
            anchor,
            self.rays,
            self.spectrum.sampler()?,
        ));

        Ok(scene)
    }
}

impl MirrorDemo {
    pub fn build(&self, config: SceneConfig) -> Result<Scene> {
        let name = self.name.clone().unwrap_or_else(|| "MirrorDemo".into());
        let mut scene = Scene::new(name, config);

        // rays falling down are sent towards -x
        scene.add_surface(mirror([-10.0, -10.0], [10.0, 10.0])?);
        scene.add_surface(target([-20.0, -20.0], [-20.0, 20.0])?);
        scene.add_source(DirectionalLight::new(
            [-1.0, 10.0],
            [1.0, 10.0],
            self.rays,
            self.spectrum.sampler()?,
        ));

        Ok(scene)
    }
}

fn captured_share(stats: &SceneStats) -> Float {
    if stats.start_power > 0.0 {
        stats.captured.power / stats.start_power
    } else {
        0.0
    }
}

fn render(scene: &mut Scene) -> Result<BakeOutcome> {
    let outcome = scene
        .render()
        .with_context(|| format!("failed to render {}", scene.name()))?;

    let stats = scene.stats();
    if let BakeOutcome::Aborted { frames, remaining } = outcome {
        warn!(scene = %stats.name, frames, remaining, "scene did not run to completion");
    }

    info!(
        scene = %stats.name,
        rays = stats.start_rays,
        frames = stats.frames,
        captured = captured_share(stats),
        lost = stats.lost.rays,
        destroyed = stats.destroyed.rays,
        time_ms = stats.render_time.as_millis() as u64,
        "rendered",
    );

    Ok(outcome)
}

fn report_path(out_dir: &Path, name: &str) -> PathBuf {
    out_dir.join(format!("{name}.json"))
}

fn render_and_save(mut scene: Scene, settings: &Settings) -> Result<PathBuf> {
    render(&mut scene)?;

    let path = report_path(&settings.out_dir, scene.name());
    refract_json::write_report(&mut scene, &path)
        .with_context(|| format!("failed to write report for {}", scene.name()))?;

    Ok(path)
}

impl Experiment {
    /// Run this experiment, returns the paths of the reports written.
    pub fn run(&self, settings: &Settings) -> Result<Vec<PathBuf>> {
        let config = settings.config;

        let path = match self {
            Self::Waveguide(w) => render_and_save(w.build(config)?, settings)?,
            Self::WaveCell(w) => render_and_save(w.build(config)?, settings)?,
            Self::IlluminatedWaveguide(w) => render_and_save(w.build(config)?, settings)?,
            Self::MirrorDemo(m) => render_and_save(m.build(config)?, settings)?,
            Self::CaptureAngleSweep(sweep) => {
                ensure!(sweep.angles > 0, "a capture angle sweep needs at least one angle");

                let start = Instant::now();
                let (angles, power) = sweep.sweep(config)?;
                let path = report_path(&settings.out_dir, &sweep.name());

                let report = json!({ "Angle": angles, "Power": power });
                fs::write(&path, serde_json::to_string_pretty(&report)?)
                    .with_context(|| format!("failed to write {}", path.display()))?;

                info!(
                    sweep = %sweep.name(),
                    angles = sweep.angles,
                    time_ms = start.elapsed().as_millis() as u64,
                    "sweep done",
                );

                path
            }
        };

        Ok(vec![path])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use refract::{FrameRecording, SurfaceKind};

    fn config() -> SceneConfig {
        SceneConfig::default()
            .with_seed(11)
            .with_recording(FrameRecording::Summary)
    }

    fn parse(json: &str) -> Experiment {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn experiment_files() {
        let one: ExperimentFile = serde_json::from_str(
            r#"{ "kind": "mirror_demo", "rays": 4, "spectrum": { "mean": 550.0, "std_dev": 10.0 } }"#,
        )
        .unwrap();
        assert_eq!(
            one.experiments(),
            [Experiment::MirrorDemo(MirrorDemo {
                name: None,
                rays: 4,
                spectrum: Spectrum::Gaussian {
                    mean: 550.0,
                    std_dev: 10.0
                },
            })]
        );

        let many: ExperimentFile = serde_json::from_str(
            r#"[
                { "kind": "mirror_demo" },
                {
                    "kind": "waveguide",
                    "layers": 3,
                    "moth_eye": true,
                    "emitters": { "type": "cones", "count": 2, "rays": 10 }
                }
            ]"#,
        )
        .unwrap();
        assert_eq!(many.experiments().len(), 2);

        let Experiment::Waveguide(waveguide) = &many.experiments()[1] else {
            panic!("expected a waveguide");
        };
        assert_eq!(waveguide.span, [-10000.0, 10000.0]);
        assert_eq!(
            waveguide.emitters,
            Emitters::Cones {
                count: 2,
                rays: 10,
                span: None,
                spectrum: Spectrum::Constant(550.0)
            }
        );
    }

    #[test]
    fn bundled_experiments_parse() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("experiments");
        for name in [
            "mirror_demo.json",
            "waveguides.json",
            "wave_cell.json",
            "capture_angle_sweep.json",
            "illuminated_waveguides.json",
        ] {
            let file = ExperimentFile::load(&dir.join(name)).unwrap();
            assert!(!file.experiments().is_empty(), "{name}");
        }
    }

    #[test]
    fn unknown_experiment_kind() {
        assert!(serde_json::from_str::<Experiment>(r#"{ "kind": "teapot" }"#).is_err());
    }

    #[test]
    fn waveguide_layout() {
        let Experiment::Waveguide(waveguide) = parse(
            r#"{
                "kind": "waveguide",
                "layers": 4,
                "emitters": { "type": "quantum_dots", "count": 3, "rays": 8, "resolution": 16 }
            }"#,
        ) else {
            panic!("expected a waveguide");
        };

        let scene = waveguide.build(config()).unwrap();
        assert_eq!(scene.name(), "QD3Waveguide4");

        let kinds: Vec<_> = scene.surfaces().iter().map(|s| s.kind().name()).collect();
        assert_eq!(
            kinds,
            [
                "Mirror", "Mirror", "Target", "Object", "Object", "Object", "Object",
                "QuantumDot", "QuantumDot", "QuantumDot",
            ]
        );

        // index ramp from air at the top to the bulk at the bottom
        let layers = &scene.surfaces()[3..7];
        assert_eq!(layers[0].segments()[0].a().y, 250.0);
        assert_eq!(layers[0].segments()[0].refractive_index(550.0), 1.0);
        assert_relative_eq!(layers[3].segments()[0].a().y, 0.0, epsilon = 1e-9);
        assert_relative_eq!(layers[3].segments()[0].refractive_index(550.0), 1.41);

        // dots sit between the ends of their span
        let SurfaceKind::Scatterer { center, .. } = scene.surfaces()[8].kind() else {
            panic!("expected a quantum dot");
        };
        assert_eq!(*center, Vector2D::new(0.0, EMITTER_Y));
    }

    #[test]
    fn moth_eye_waveguide_follows_the_texture_from_the_top() {
        let waveguide = Waveguide {
            name: None,
            layers: 3,
            span: [-125.0, 125.0],
            moth_eye: true,
            emitters: Emitters::Cones {
                count: 1,
                rays: 4,
                span: None,
                spectrum: Spectrum::default(),
            },
        };

        let scene = waveguide.build(config()).unwrap();
        assert_eq!(scene.name(), "Cone1Waveguide3_MothEye");

        let index = |i: usize| scene.surfaces()[i].segments()[0].refractive_index(550.0);
        assert_relative_eq!(index(3), moth_eye_index(0.0));
        assert_relative_eq!(index(4), moth_eye_index(125.0));
        assert_relative_eq!(index(5), moth_eye_index(250.0));
        assert!(index(3) > index(4) && index(4) > index(5));
    }

    #[test]
    fn cone_waveguide_runs() {
        let waveguide = Waveguide {
            name: Some("SmallCones".into()),
            layers: 3,
            span: [-125.0, 125.0],
            moth_eye: false,
            emitters: Emitters::Cones {
                count: 2,
                rays: 20,
                span: None,
                spectrum: Spectrum::default(),
            },
        };

        let mut scene = waveguide.build(config().with_max_frames(200)).unwrap();
        render(&mut scene).unwrap();

        let stats = scene.stats();
        assert_eq!(stats.start_rays, 40);
        let accounted = stats.captured.power
            + stats.lost.power
            + stats.destroyed.power
            + stats.remaining.power;
        assert_relative_eq!(accounted, stats.start_power, epsilon = 1e-9);
    }

    #[test]
    fn wave_cell_layout() {
        let cell = WaveCell {
            name: None,
            resolution: 200,
            height: 250.0,
            emitters: Emitters::QuantumDots {
                count: 2,
                rays: 4,
                span: None,
                radius: 5.0,
                resolution: 12,
                spectrum: Spectrum::default(),
            },
        };

        let scene = cell.build(config()).unwrap();
        assert_eq!(scene.name(), "QD2WaveUnitCell");
        assert_eq!(scene.surfaces()[0].segments().len(), 199);
        assert_eq!(scene.surfaces().len(), 4 + 2);

        let SurfaceKind::Scatterer { center, .. } = scene.surfaces()[4].kind() else {
            panic!("expected a quantum dot");
        };
        assert_relative_eq!(center.x, 250.0 / 3.0, epsilon = 1e-9);
    }

    #[test]
    fn illuminated_waveguide_layout() {
        let Experiment::IlluminatedWaveguide(waveguide) = parse(
            r#"{
                "kind": "illuminated_waveguide",
                "layers": 3,
                "dots": 2,
                "angle": 0.0,
                "rays": 10,
                "unit_cell": true,
                "moth_eye": true
            }"#,
        ) else {
            panic!("expected an illuminated waveguide");
        };
        assert_eq!(waveguide.dot_resolution, 250);

        let scene = waveguide.build(config()).unwrap();
        assert_eq!(scene.name(), "RealLifeQD2Waveguide3Angle0UnitCell_MothEye");

        let kinds: Vec<_> = scene.surfaces().iter().map(|s| s.kind().name()).collect();
        assert_eq!(
            kinds,
            [
                "Mirror", "Mirror", "Target", "Object", "Object", "Object", "Mirror", "Mirror",
                "QuantumDot", "QuantumDot",
            ]
        );

        // the walls rise above the block, up to the beam
        let wall = &scene.surfaces()[7].segments()[0];
        assert_eq!(*wall.a(), Vector2D::new(125.0, 1000.0));
        assert_eq!(*wall.b(), Vector2D::new(125.0, 0.0));

        let SurfaceKind::Scatterer { center, radius } = scene.surfaces()[8].kind() else {
            panic!("expected a quantum dot");
        };
        assert_relative_eq!(*center, Vector2D::new(-250.0 / 6.0, EMITTER_Y), epsilon = 1e-9);
        assert_eq!(*radius, 5.0);
        assert_eq!(scene.surfaces()[8].segments().len(), 250);
    }

    #[test]
    fn illuminated_dots_only_scatter() {
        let waveguide = IlluminatedWaveguide {
            name: None,
            layers: 2,
            dots: 3,
            angle: 30.0,
            rays: 25,
            unit_cell: true,
            moth_eye: false,
            dot_radius: 5.0,
            dot_resolution: 16,
            spectrum: Spectrum::default(),
        };
        assert_eq!(waveguide.name(), "RealLifeQD3Waveguide2Angle30UnitCell");

        let mut scene = waveguide.build(config().with_max_frames(500)).unwrap();
        render(&mut scene).unwrap();

        // the beam is the only source, the dots add no rays of their own
        let stats = scene.stats();
        assert_eq!(stats.start_rays, 25);
        let accounted = stats.captured.power
            + stats.lost.power
            + stats.destroyed.power
            + stats.remaining.power;
        assert_relative_eq!(accounted, stats.start_power, epsilon = 1e-9);
        assert!(stats.captured.rays > 0);
    }

    #[test]
    fn mirror_demo_captures_everything() {
        let demo = MirrorDemo {
            name: None,
            rays: 8,
            spectrum: Spectrum::default(),
        };

        let mut scene = demo.build(config()).unwrap();
        render(&mut scene).unwrap();

        let stats = scene.stats();
        assert_eq!(stats.captured.rays, 8);
        assert_relative_eq!(captured_share(stats), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn vertical_beam_sweep() {
        let sweep = CaptureAngleSweep {
            name: None,
            layers: 2,
            moth_eye: false,
            angles: 3,
            max_angle: 60.0,
            span: [-2000.0, 2000.0],
            rays: 1,
            spectrum: Spectrum::default(),
        };
        assert_eq!(sweep.name(), "MaxCaptureAngleWaveguide2MaxAngle60");

        let (angles, captured) = sweep.sweep(config().with_max_frames(500)).unwrap();
        assert_eq!(angles, [0.0, 30.0, 60.0]);
        assert_eq!(captured.len(), 3);
        assert!(captured.iter().all(|&c| (0.0..=1.0 + 1e-9).contains(&c)));
    }

    #[test]
    fn missing_tables_fail_before_rendering() {
        let sun = Emitters::Sun {
            rays: 10,
            spectrum: Spectrum::Table {
                table: "/no/such/AM15G.json".into(),
            },
            angles: "/no/such/angles.json".into(),
            height: 1000.0,
        };
        let mut scene = Scene::new("Sun", config());
        let aperture = [Vector2D::new(-1.0, 0.0), Vector2D::new(1.0, 0.0)];

        assert!(sun.add_to(&mut scene, [-1.0, 1.0], aperture).is_err());
        assert!(Spectrum::Table {
            table: "/no/such/AM15G.json".into()
        }
        .sampler()
        .is_err());
    }

    #[test]
    fn reports_land_in_the_output_directory() {
        let out_dir = std::env::temp_dir().join(format!("run_sim_reports_{}", std::process::id()));
        fs::create_dir_all(&out_dir).unwrap();

        let settings = Settings {
            config: config(),
            out_dir: out_dir.clone(),
        };
        let demo = parse(r#"{ "kind": "mirror_demo", "name": "Demo", "rays": 2 }"#);
        let paths = demo.run(&settings).unwrap();

        assert_eq!(paths, [out_dir.join("Demo.json")]);
        let report: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&paths[0]).unwrap()).unwrap();
        assert!(report.get("Stats").is_some());

        fs::remove_dir_all(&out_dir).unwrap();
    }
}
