//! Error types for scene construction and the simulation lifecycle.
//!
//! Nothing in here is ever produced while rays are propagating: per-ray
//! outcomes are reported through [`Interaction`](crate::Interaction) and
//! [`Fate`](crate::Fate) instead.

use thiserror::Error;

use crate::{Float, Vector2D};

/// Errors that can occur while building geometry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// Both endpoints of a segment are the same point.
    #[error("degenerate segment: both endpoints are ({}, {})", .0.x, .0.y)]
    DegenerateSegment(Vector2D),

    /// A Gaussian perturbance with unusable parameters.
    #[error("invalid perturbance distribution: mean {mean}, standard deviation {std_dev}")]
    InvalidPerturbance { mean: Float, std_dev: Float },

    /// A shape was asked for fewer vertices than it needs.
    #[error("a {shape} needs at least {min} points, got {got}")]
    Resolution {
        shape: &'static str,
        min: usize,
        got: usize,
    },
}

/// Errors caused by driving a [`Scene`](crate::Scene) out of order.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneError {
    /// `bake` or `accumulate_stats` was called before `initialize`.
    #[error("the scene must be initialized first")]
    NotInitialized,

    /// `initialize` was called twice.
    #[error("the scene is already initialized")]
    AlreadyInitialized,

    /// `accumulate_stats` was called before `bake`.
    #[error("the scene has not been baked yet")]
    NotBaked,

    /// The scene already ran to completion.
    #[error("the scene has already been finalized")]
    AlreadyFinalized,
}
