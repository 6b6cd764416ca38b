//! Random sampling primitives behind all pacing and jitter decisions.

use rand::Rng;
use std::time::Duration;

/// Uniform draw in [min, max). Degenerate ranges collapse to `min`.
pub fn uniform(min: f64, max: f64) -> f64 {
    let r: f64 = rand::thread_rng().gen_range(0.0..1.0);
    min + (max - min) * r
}

/// Roll a percentage chance (0..=100)
pub fn percent_roll(chance_pct: f64) -> bool {
    uniform(0.0, 100.0) < chance_pct
}

/// Log-normally distributed delay in milliseconds.
///
/// mu = ln(min), sigma = (ln(max) - ln(min)) / 4, with a Box-Muller
/// standard-normal deviate. Clusters near `min` with an occasional long
/// tail past `max`, which reads far more human than a uniform draw.
/// `scale` is the persona delay factor. Caller contract: `min_ms` > 0.
pub fn log_normal_delay_ms(min_ms: f64, max_ms: f64, scale: f64) -> f64 {
    let mu = min_ms.ln();
    let sigma = (max_ms.ln() - min_ms.ln()) / 4.0;

    let mut rng = rand::thread_rng();
    let u1: f64 = rng.gen_range(f64::MIN_POSITIVE..1.0);
    let u2: f64 = rng.gen_range(0.0..1.0);
    let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();

    (mu + sigma * z0).exp() * scale
}

/// Same draw, as a ready-to-sleep `Duration`
pub fn log_normal_delay(min_ms: u64, max_ms: u64, scale: f64) -> Duration {
    let ms = log_normal_delay_ms(min_ms as f64, max_ms as f64, scale);
    Duration::from_millis(ms.max(0.0) as u64)
}
