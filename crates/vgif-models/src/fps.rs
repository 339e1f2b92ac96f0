//! Frame sampling rate.

use std::fmt;
use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sampling rate used when a submission does not specify one.
pub const DEFAULT_FPS: u32 = 10;

/// Rejected frame rate value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("fps must be a positive integer")]
pub struct InvalidFps;

/// A positive frame sampling rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u32")]
pub struct Fps(NonZeroU32);

impl Fps {
    /// Get the rate as a plain integer.
    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl Default for Fps {
    fn default() -> Self {
        Self(NonZeroU32::new(DEFAULT_FPS).unwrap_or(NonZeroU32::MIN))
    }
}

impl TryFrom<i64> for Fps {
    type Error = InvalidFps;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u32::try_from(value)
            .ok()
            .and_then(NonZeroU32::new)
            .map(Self)
            .ok_or(InvalidFps)
    }
}

impl From<Fps> for u32 {
    fn from(fps: Fps) -> Self {
        fps.get()
    }
}

impl fmt::Display for Fps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
