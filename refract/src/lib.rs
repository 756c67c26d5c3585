//! A 2D physical ray-tracer for layered optical structures.
//!
//! Geometry is made of [`Segment`]s grouped into [`Surface`]s, each of which owns
//! a bounding volume hierarchy ([`GeometryNode`]) over its segments. A [`Scene`]
//! evolves a population of [`Ray`]s frame by frame: every ray travels to the
//! nearest segment and the owning surface decides what comes out of the
//! interaction (a Fresnel split, a mirror bounce, a capture, a re-emission).

pub use nalgebra;
pub use rand;
pub use rand_chacha;

mod bounds;
mod bvh;
mod error;
mod frame;
mod fresnel;
mod material;
mod ray;
mod scene;
mod segment;
mod source;
mod surface;
mod vector;

pub use bounds::*;
pub use bvh::*;
pub use error::*;
pub use frame::*;
pub use fresnel::*;
pub use material::*;
pub use ray::*;
pub use scene::*;
pub use segment::*;
pub use source::*;
pub use surface::*;
pub use vector::*;

pub type Float = f64;

/// Tolerance used for parallelism tests, the critical angle
/// and as the floor of vector lengths.
pub const EPSILON: Float = 1e-12;

/// Shortest distance, relative to the magnitude of the coordinates involved,
/// a ray must travel before it can hit anything.
pub const SELF_HIT_TOLERANCE: Float = 1e-9;
