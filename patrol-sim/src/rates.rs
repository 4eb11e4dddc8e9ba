//! Comfort-driven event rates.
//!
//! Each patrol is checked once per step for death, reproduction and
//! mutation. The rates follow the same shape, `exp(-k * (1 - ln x))`:
//!
//! - death:        `x = 1 - comfort`, coefficient `mu`
//! - reproduction: `x = comfort`,     coefficient `rho`
//! - mutation:     `x = comfort`,     coefficient `delta`
//!
//! Comfort at or above 1.0 puts `ln(1 - comfort)` outside its domain. Such a
//! patrol has reached the goal and is never killed: its death rate is 0.
//! A NaN comfort can only come from a broken baseline; it is logged at
//! `warn` and also yields 0.
//! Every rate returned here is finite and inside `[0, 1]`.

use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

/// Coefficients for the three per-step events.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct Rates {
    /// Death coefficient
    pub mu: f64,
    /// Reproduction coefficient
    pub rho: f64,
    /// Mutation coefficient
    pub delta: f64,
}

impl Rates {
    pub fn new(mu: f64, rho: f64, delta: f64) -> Self {
        Self { mu, rho, delta }
    }
}

impl Default for Rates {
    fn default() -> Self {
        Self {
            mu: 0.01,
            rho: 0.5,
            delta: 0.02,
        }
    }
}

/// `exp(-k * (1 - ln x))`, or `None` when `ln x` is undefined.
fn log_rate(k: f64, x: f64) -> Option<f64> {
    if x.is_nan() || x <= 0.0 {
        return None;
    }
    Some(clamp_probability((-k * (1.0 - x.ln())).exp()))
}

fn clamp_probability(p: f64) -> f64 {
    if p.is_nan() {
        #[cfg(feature = "instrument")]
        tracing::warn!("rate evaluated to NaN, treating as 0");
        return 0.0;
    }
    p.clamp(0.0, 1.0)
}

/// Probability that a patrol with the given comfort dies this step.
pub fn death_rate(mu: f64, comfort: f64) -> f64 {
    if comfort.is_nan() {
        #[cfg(feature = "instrument")]
        tracing::warn!("comfort is NaN, death rate treated as 0");
        return 0.0;
    }
    match log_rate(mu, 1.0 - comfort) {
        Some(p) => p,
        None => {
            #[cfg(feature = "instrument")]
            tracing::debug!(comfort, "death rate outside log domain, patrol is spared");
            0.0
        }
    }
}

/// Probability that a patrol with the given comfort attempts to reproduce.
pub fn reproduction_rate(rho: f64, comfort: f64) -> f64 {
    log_rate(rho, comfort).unwrap_or(0.0)
}

/// Probability that a patrol with the given comfort hands one system away.
pub fn mutation_rate(delta: f64, comfort: f64) -> f64 {
    log_rate(delta, comfort).unwrap_or(0.0)
}

/// Number of systems a newborn sheds to its peers: `floor((1 - comfort) * len)`,
/// never negative and never more than `len`.
pub fn shed_count(comfort: f64, len: usize) -> usize {
    let k = ((1.0 - comfort) * len as f64).floor();
    if k.is_nan() || k <= 0.0 {
        0
    } else {
        (k as usize).min(len)
    }
}
