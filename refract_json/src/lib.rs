use std::{
    fs,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use refract::*;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::info;

pub use serde_json;

#[derive(Error, Debug)]
pub enum JsonError {
    /// Reading or writing a file failed.
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The input is not valid JSON.
    #[error(transparent)]
    Syntax(#[from] serde_json::Error),

    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` must be {expected}")]
    InvalidField {
        field: &'static str,
        expected: &'static str,
    },
}

/// Read and parse the JSON file at `path`.
pub fn read_json(path: impl AsRef<Path>) -> Result<Value, JsonError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| JsonError::Io {
        path: path.to_owned(),
        source,
    })?;
    Ok(serde_json::from_str(&text)?)
}

pub fn field<'a>(json: &'a Value, name: &'static str) -> Result<&'a Value, JsonError> {
    json.get(name).ok_or(JsonError::MissingField(name))
}

pub fn float_field(json: &Value, name: &'static str) -> Result<Float, JsonError> {
    field(json, name)?.as_f64().ok_or(JsonError::InvalidField {
        field: name,
        expected: "a number",
    })
}

/// Like [`float_field`], but `default` if the field is absent.
pub fn float_field_or(json: &Value, name: &'static str, default: Float) -> Result<Float, JsonError> {
    match json.get(name) {
        None => Ok(default),
        Some(_) => float_field(json, name),
    }
}

pub fn float_array(json: &Value, name: &'static str) -> Result<Vec<Float>, JsonError> {
    let invalid = || JsonError::InvalidField {
        field: name,
        expected: "an array of numbers",
    };

    field(json, name)?
        .as_array()
        .ok_or_else(invalid)?
        .iter()
        .map(Value::as_f64)
        .collect::<Option<_>>()
        .ok_or_else(invalid)
}

pub trait JsonSer {
    /// Serialize `self` into a JSON object.
    fn to_json(&self) -> Value;
}

impl<T: JsonSer> JsonSer for [T] {
    fn to_json(&self) -> Value {
        Value::Array(Vec::from_iter(self.iter().map(T::to_json)))
    }
}

impl<T: JsonSer> JsonSer for Vec<T> {
    fn to_json(&self) -> Value {
        self.as_slice().to_json()
    }
}

impl<T: JsonSer + ?Sized> JsonSer for Box<T> {
    fn to_json(&self) -> Value {
        self.as_ref().to_json()
    }
}

impl<T: JsonSer + ?Sized> JsonSer for &T {
    fn to_json(&self) -> Value {
        (*self).to_json()
    }
}

impl JsonSer for Vector2D {
    fn to_json(&self) -> Value {
        json!({ "X": self.x, "Y": self.y })
    }
}

impl JsonSer for Ray {
    /// The format of the returned object is explained in [`JsonDes::from_json`]
    fn to_json(&self) -> Value {
        json!({
            "Origin": self.origin.to_json(),
            "Direction": self.direction().to_json(),
            "CurrentBounce": self.bounce,
            "MaxBounce": self.max_bounces,
            "Power": self.power,
            "Wavelength": self.wavelength,
            "CurrentMedium": self.medium,
            "Index": self.index,
        })
    }
}

impl JsonSer for Segment {
    /// The refractive index is evaluated at the default wavelength.
    fn to_json(&self) -> Value {
        json!({
            "A": self.a().to_json(),
            "B": self.b().to_json(),
            "RefractiveIndex": self.refractive_index(DEFAULT_WAVELENGTH),
        })
    }
}

impl JsonSer for Surface {
    fn to_json(&self) -> Value {
        let mut json = json!({ "Type": self.kind().name() });

        if !self.segments().is_empty() {
            json["SegmentCount"] = self.segments().len().into();
            json["Segments"] = self.segments().to_json();
        }

        if let SurfaceKind::Scatterer { center, radius } = self.kind() {
            json["Center"] = center.to_json();
            json["Radius"] = (*radius).into();
        }

        if let Some(capture) = self.capture() {
            json["CapturedRays"] = capture.rays.into();
            json["CapturedPower"] = capture.power.into();
        }

        json
    }
}

impl JsonSer for Frame {
    fn to_json(&self) -> Value {
        json!({
            "FrameNumber": self.number,
            "RayCount": self.ray_count,
            "LostRays": self.lost.rays,
            "LostPower": self.lost.power,
            "DestroyedRays": self.destroyed.rays,
            "DestroyedPower": self.destroyed.power,
            "CapturedRays": self.captured.rays,
            "CapturedPower": self.captured.power,
            "Rays": self.rays.as_deref().unwrap_or_default().to_json(),
        })
    }
}

fn millis(d: Duration) -> Float {
    d.as_secs_f64() * 1e3
}

impl JsonSer for SceneStats {
    fn to_json(&self) -> Value {
        json!({
            "Name": self.name,
            "StartRays": self.start_rays,
            "StartPower": self.start_power,
            "LostRays": self.lost.rays,
            "LostPower": self.lost.power,
            "DestroyedRays": self.destroyed.rays,
            "DestroyedPower": self.destroyed.power,
            "CapturedRays": self.captured.rays,
            "CapturedPower": self.captured.power,
            "RemainingRays": self.remaining.rays,
            "RemainingPower": self.remaining.power,
            "TotalNumberOfRays": self.terminated_rays(),
            "NumberOfFrames": self.frames,
            "NumberOfSegments": self.segments,
            "InitializationTimeMS": millis(self.initialization_time),
            "RenderTimeMS": millis(self.render_time),
            "AccumulationTimeMS": millis(self.accumulation_time),
            "SaveTimeMS": millis(self.save_time),
            "TotalSimTimeMS": millis(self.total_time()),
        })
    }
}

fn serialize_geometry_and_frames(scene: &Scene) -> Value {
    json!({
        "Geometry": scene.surfaces().to_json(),
        "Frames": scene.frames().to_json(),
    })
}

/// The whole simulation: it's geometry, every frame, and the statistics.
///
/// ```json
/// {
///     "Geometry": [ /* one object per surface */ ],
///     "Frames": [ /* one object per frame */ ],
///     "Stats": { /* ... */ }
/// }
/// ```
pub fn serialize_scene(scene: &Scene) -> Value {
    let mut json = serialize_geometry_and_frames(scene);
    json["Stats"] = scene.stats().to_json();
    json
}

/// Serialize `scene` and write it, pretty printed, to `path`.
///
/// The time spent serializing is recorded in the scene's statistics.
pub fn write_report(scene: &mut Scene, path: impl AsRef<Path>) -> Result<(), JsonError> {
    let path = path.as_ref();
    let start = Instant::now();

    let mut json = serialize_geometry_and_frames(scene);
    scene.record_save_time(start.elapsed());
    json["Stats"] = scene.stats().to_json();

    let text = serde_json::to_string_pretty(&json)?;
    fs::write(path, text).map_err(|source| JsonError::Io {
        path: path.to_owned(),
        source,
    })?;

    info!(path = %path.display(), "report written");

    Ok(())
}

pub trait JsonDes {
    /// Deserialize from a JSON object.
    ///
    /// Returns an error if `json`'s format or values are invalid.
    fn from_json(json: &Value) -> Result<Self, JsonError>
    where
        Self: Sized;
}

impl<T: JsonDes> JsonDes for Vec<T> {
    fn from_json(json: &Value) -> Result<Self, JsonError> {
        json.as_array()
            .ok_or(JsonError::InvalidField {
                field: "[]",
                expected: "an array",
            })?
            .iter()
            .map(T::from_json)
            .collect()
    }
}

impl JsonDes for Vector2D {
    /// ```json
    /// { "X": 1.0, "Y": 2.0 }
    /// ```
    fn from_json(json: &Value) -> Result<Self, JsonError> {
        Ok(Self::new(float_field(json, "X")?, float_field(json, "Y")?))
    }
}

impl JsonDes for Ray {
    /// Deserialize a new ray from a JSON object.
    ///
    /// The JSON object must follow the following format:
    ///
    /// ```json
    /// {
    ///     "Origin": { "X": 0.0, "Y": 0.0 },
    ///     "Direction": { "X": 1.0, "Y": 0.0 }, // must not be zero
    ///     "Wavelength": 500.0,                 // optional
    ///     "Power": 1.0,                        // optional
    ///     "CurrentMedium": 1.0,                // optional
    /// }
    /// ```
    fn from_json(json: &Value) -> Result<Self, JsonError> {
        let origin = Vector2D::from_json(field(json, "Origin")?)?;
        let direction = Vector2D::from_json(field(json, "Direction")?)?;

        if direction.norm() <= EPSILON {
            return Err(JsonError::InvalidField {
                field: "Direction",
                expected: "a non-zero vector",
            });
        }

        Ok(Ray::new(origin, direction)
            .with_wavelength(float_field_or(json, "Wavelength", DEFAULT_WAVELENGTH)?)
            .with_power(float_field_or(json, "Power", 1.0)?)
            .with_medium(float_field_or(json, "CurrentMedium", 1.0)?))
    }
}
