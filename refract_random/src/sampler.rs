use std::path::Path;

use rand::Rng;
use rand_distr::{Distribution, Normal, WeightedIndex};
use refract::Float;
use refract_json::{float_array, read_json, serde_json::Value, JsonDes, JsonError};
use tracing::debug;

use crate::SourceError;

/// A discrete distribution over tabulated values.
#[derive(Clone, Debug)]
pub struct SampleTable {
    values: Vec<Float>,
    index: WeightedIndex<Float>,
}

impl SampleTable {
    /// `probabilities` need not be normalized.
    pub fn new(values: Vec<Float>, probabilities: &[Float]) -> Result<Self, SourceError> {
        if values.len() != probabilities.len() {
            return Err(SourceError::LengthMismatch {
                values: values.len(),
                probabilities: probabilities.len(),
            });
        }

        Ok(Self {
            index: WeightedIndex::new(probabilities)?,
            values,
        })
    }

    /// Build a table out of the `key` and `"Probability"` arrays of a JSON object.
    pub fn from_json_key(json: &Value, key: &'static str) -> Result<Self, SourceError> {
        let values = float_array(json, key)?;
        let probabilities = float_array(json, "Probability")?;
        Self::new(values, &probabilities)
    }

    /// Load a table from a JSON file, see [`Self::from_json`] for the format.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let json = read_json(path)?;
        let table = Self::from_json_key(&json, table_key(&json))?;

        debug!(path = %path.display(), entries = table.len(), "loaded sampling table");

        Ok(table)
    }

    #[inline]
    #[must_use]
    pub fn values(&self) -> &[Float] {
        &self.values
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn sample(&self, rng: &mut (impl Rng + ?Sized)) -> Float {
        self.values[self.index.sample(rng)]
    }
}

fn table_key(json: &Value) -> &'static str {
    if json.get("Angle").is_some() {
        "Angle"
    } else {
        "Wavelength"
    }
}

impl JsonDes for SampleTable {
    /// ```json
    /// {
    ///     "Wavelength": [300.0, 310.0, ...], // or "Angle"
    ///     "Probability": [0.01, 0.02, ...]
    /// }
    /// ```
    fn from_json(json: &Value) -> Result<Self, JsonError> {
        Self::from_json_key(json, table_key(json)).map_err(|e| match e {
            SourceError::Table(e) => e,
            _ => JsonError::InvalidField {
                field: "Probability",
                expected: "as many non-negative weights as values",
            },
        })
    }
}

/// Where the wavelengths (in nanometers) of emitted rays come from.
#[derive(Clone, Debug)]
pub enum WavelengthSampler {
    Constant(Float),
    Gaussian(Normal<Float>),
    Table(SampleTable),
}

impl Default for WavelengthSampler {
    #[inline]
    fn default() -> Self {
        Self::Constant(refract::DEFAULT_WAVELENGTH)
    }
}

impl WavelengthSampler {
    pub fn gaussian(mean: Float, std_dev: Float) -> Result<Self, SourceError> {
        Normal::new(mean, std_dev)
            .map(Self::Gaussian)
            .map_err(|_| SourceError::Distribution { mean, std_dev })
    }

    /// The AM1.5G solar spectrum, or any other table of wavelengths.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        SampleTable::load(path).map(Self::Table)
    }

    #[inline]
    pub fn sample(&self, rng: &mut (impl Rng + ?Sized)) -> Float {
        match self {
            Self::Constant(wavelength) => *wavelength,
            Self::Gaussian(normal) => normal.sample(rng),
            Self::Table(table) => table.sample(rng),
        }
    }
}
