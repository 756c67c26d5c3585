//! Ready-made geometry and materials for layered optical structures:
//! walls, absorbers, index layers, moth-eye profiles and quantum dots.

use refract::Float;

mod materials;
mod shapes;

pub use materials::*;
pub use shapes::*;

/// `count` evenly spaced values from `start` to `end`, both included.
///
/// Returns `[start]` if `count == 1`, and nothing if `count == 0`.
#[must_use]
pub fn linspace(start: Float, end: Float, count: usize) -> Vec<Float> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (count - 1) as Float;
            (0..count).map(|i| start + step * i as Float).collect()
        }
    }
}
