//! # Bitrate Planner
//!
//! Genera la sequenza ordinata di bitrate da provare prima di scendere al bitrate
//! target "puro". Il primo candidato è il meno aggressivo (qualità più alta),
//! gli ultimi convergono verso il target.

/// Ratio below which the target bitrate is considered far from the actual one
const DEGRADE_TRIGGER_RATIO: f64 = 3.0;

/// Whether the target bitrate is far enough below the actual one to start
/// degrading (bitrate candidates plus resolution reduction).
pub fn needs_degrade(actual_kbps: f64, target_kbps: f64) -> bool {
    target_kbps < actual_kbps / DEGRADE_TRIGGER_RATIO
}

/// Candidate bitrates for the retry sequence, `max_attempts` long.
///
/// Candidate `i` (1-based) is `(actual - target) / i + target`, so the sequence
/// strictly decreases toward `target_kbps` when `actual_kbps > target_kbps`.
pub fn plan(actual_kbps: f64, target_kbps: f64, max_attempts: u32) -> Vec<f64> {
    let diff = actual_kbps - target_kbps;
    (1..=max_attempts)
        .map(|i| diff / f64::from(i) + target_kbps)
        .collect()
}
