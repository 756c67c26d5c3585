use crate::{Float, Ray};

/// A number of rays, and the power they carried.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Tally {
    pub rays: usize,
    pub power: Float,
}

impl Tally {
    #[inline]
    pub fn add(&mut self, power: Float) {
        self.rays += 1;
        self.power += power;
    }

    #[inline]
    #[must_use]
    pub fn merged(self, other: Self) -> Self {
        Self {
            rays: self.rays + other.rays,
            power: self.power + other.power,
        }
    }
}

impl std::iter::Sum for Tally {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Self::merged)
    }
}

/// How much of the ray population every [`Frame`] keeps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FrameRecording {
    /// Every ray of every frame, enough to animate the whole simulation.
    #[default]
    Full,
    /// Counts only.
    Summary,
}

/// A snapshot of the ray population at the start of one propagation step,
/// and what happened to it during that step.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Frame {
    pub number: usize,
    pub ray_count: usize,
    /// `Some` only when recording with [`FrameRecording::Full`]
    pub rays: Option<Vec<Ray>>,
    pub lost: Tally,
    pub destroyed: Tally,
    pub captured: Tally,
}

impl Frame {
    #[must_use]
    pub fn new(number: usize, rays: &[Ray], recording: FrameRecording) -> Self {
        Self {
            number,
            ray_count: rays.len(),
            rays: matches!(recording, FrameRecording::Full).then(|| rays.to_vec()),
            ..Default::default()
        }
    }

    /// The frame recorded once every ray has terminated.
    #[inline]
    #[must_use]
    pub fn empty(number: usize) -> Self {
        Self {
            number,
            ..Default::default()
        }
    }

    /// Number of rays that stopped propagating during this frame.
    #[inline]
    #[must_use]
    pub fn terminated(&self) -> usize {
        self.lost.rays + self.destroyed.rays + self.captured.rays
    }
}
