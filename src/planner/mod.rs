//! # Planner Module
//!
//! Funzioni pure che calcolano il piano di encoding:
//! - `dimensions`: Downscaling uniforme a step di 0.25
//! - `bitrate`: Sequenza di bitrate candidati prima del fallback al target

pub mod bitrate;
pub mod dimensions;

pub use dimensions::{DimensionBounds, Dimensions};

/// Parameters of one encode attempt. Built fresh for every attempt and never
/// mutated; a retry supersedes it with a new plan.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct EncodePlan {
    pub target_bitrate_kbps: f64,
    pub dimensions: Dimensions,
    pub two_pass: bool,
    pub turbo: bool,
}

impl std::fmt::Display for EncodePlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:.2} kbps @ {:.2}x{:.2} (two-pass: {}, turbo: {})",
            self.target_bitrate_kbps, self.dimensions.width, self.dimensions.height, self.two_pass, self.turbo
        )
    }
}
