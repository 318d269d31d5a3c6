//! # Dimension Planner
//!
//! Calcola una nuova risoluzione tramite downscaling uniforme.
//!
//! ## Algoritmo:
//! - Sceglie l'asse "governante": larghezza se sopra `min_width`, altrimenti altezza
//!   se sopra `min_height`, altrimenti nessun ridimensionamento
//! - Incrementa il divisore di 0.25 finché `asse / divisore` supera ancora il target
//! - Tiene l'ultimo divisore che soddisfaceva la condizione
//!
//! Le dimensioni risultanti possono essere frazionarie: l'arrotondamento a pixel
//! interi (pari) avviene al confine con l'encoder, vedi `Dimensions::to_even_pixels`.

use serde::{Deserialize, Serialize};

const DIVISOR_STEP: f64 = 0.25;

/// Width/height pair, possibly fractional after planning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
}

/// Bounds that drive the resolution-reduction loop
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DimensionBounds {
    pub min_width: u32,
    pub min_height: u32,
    pub target_width: u32,
    pub target_height: u32,
}

impl Dimensions {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Integral pixel size for encoders: each axis rounded to the nearest even
    /// integer, never below 2.
    pub fn to_even_pixels(&self) -> (u32, u32) {
        (round_to_even(self.width), round_to_even(self.height))
    }
}

impl From<(u32, u32)> for Dimensions {
    fn from((width, height): (u32, u32)) -> Self {
        Self::new(f64::from(width), f64::from(height))
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

fn round_to_even(value: f64) -> u32 {
    let even = (value / 2.0).round() * 2.0;
    if even.is_finite() && even >= 2.0 {
        even as u32
    } else {
        2
    }
}

/// Plan a uniform downscale of `current`, or `None` when no scaling applies.
pub fn plan(current: Dimensions, bounds: &DimensionBounds) -> Option<Dimensions> {
    let (axis, target) = if current.width > f64::from(bounds.min_width) {
        (current.width, f64::from(bounds.target_width))
    } else if current.height > f64::from(bounds.min_height) {
        (current.height, f64::from(bounds.target_height))
    } else {
        return None;
    };

    let mut divisor = None;
    let mut candidate = 1.0;
    while axis / candidate > target {
        divisor = Some(candidate);
        candidate += DIVISOR_STEP;
    }

    divisor.map(|d| Dimensions::new(current.width / d, current.height / d))
}
