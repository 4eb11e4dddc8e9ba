//! Simulation configuration.
//!
//! A configuration comes either from eight positional values
//! (`n m tau v vmax mu rho delta`) or from a whitespace-separated file holding
//! the same eight values followed by the n×m cost matrix. When a matrix is
//! present it replaces random initialization.

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::costs::{CostMatrix, CostRange};
use crate::error::{Result, SimError};
use crate::rates::Rates;
use crate::types::Time;
use crate::world::{Parameters, World};

/// Field names in the order they appear on the command line and in files
pub const FIELD_NAMES: [&str; 8] = ["n", "m", "tau", "v", "vmax", "mu", "rho", "delta"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Number of patrols seeded at start (n)
    pub patrols: usize,
    /// Number of planetary systems (m)
    pub systems: usize,
    /// Final observation instant (tau)
    pub final_time: f64,
    /// Initial population (v), reported only
    pub initial_population: usize,
    /// Population cap that triggers an epidemic (vmax)
    pub max_population: usize,
    pub rates: Rates,
    /// Explicit n×m costs; `None` means draw them at random
    pub costs: Option<CostMatrix>,
}

impl SimulationConfig {
    /// Parse the eight positional values of the `-r` mode.
    pub fn from_values<S: AsRef<str>>(values: &[S]) -> Result<Self> {
        if values.len() != FIELD_NAMES.len() {
            return Err(SimError::Usage(format!(
                "expected {} values ({}), got {}",
                FIELD_NAMES.len(),
                FIELD_NAMES.join(" "),
                values.len()
            )));
        }
        let mut tokens = Tokens::new(values.iter().map(|v| v.as_ref()));
        let config = tokens.header()?;
        config.validate()?;
        Ok(config)
    }

    /// Read a configuration file (`-f` mode).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Parse configuration text: the eight header values, then n×m costs.
    pub fn parse(text: &str) -> Result<Self> {
        let mut tokens = Tokens::new(text.split_whitespace());
        let mut config = tokens.header()?;

        let mut rows = Vec::with_capacity(config.patrols);
        for i in 0..config.patrols {
            let mut row = Vec::with_capacity(config.systems);
            for j in 0..config.systems {
                row.push(tokens.next::<Time>(&format!("cost[{i}][{j}]"))?);
            }
            rows.push(row);
        }
        config.costs = Some(CostMatrix::from_rows(rows)?);

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.patrols == 0 {
            return Err(SimError::invalid("n", "need at least one patrol"));
        }
        if self.systems == 0 {
            return Err(SimError::invalid("m", "need at least one planetary system"));
        }
        if !(self.final_time.is_finite() && self.final_time > 0.0) {
            return Err(SimError::invalid(
                "tau",
                format!("must be positive, got {}", self.final_time),
            ));
        }
        if self.max_population == 0 {
            return Err(SimError::invalid("vmax", "must be at least 1"));
        }
        for (name, value) in [
            ("mu", self.rates.mu),
            ("rho", self.rates.rho),
            ("delta", self.rates.delta),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(SimError::invalid(
                    name,
                    format!("must be finite and non-negative, got {value}"),
                ));
            }
        }
        if let Some(costs) = &self.costs {
            if costs.patrols() != self.patrols || costs.systems() != self.systems {
                return Err(SimError::invalid(
                    "cost matrix",
                    format!(
                        "is {}x{}, expected {}x{}",
                        costs.patrols(),
                        costs.systems(),
                        self.patrols,
                        self.systems
                    ),
                ));
            }
        }
        Ok(())
    }

    /// Engine parameters for a run bounded by `max_steps`
    pub fn parameters(&self, max_steps: u64) -> Parameters {
        Parameters::default()
            .with_max_steps(max_steps)
            .with_max_population(self.max_population)
            .with_rates(self.rates)
    }

    /// Build the world, from the explicit matrix when there is one.
    pub fn build_world(&self, max_steps: u64, range: CostRange, seed: u64) -> Result<World> {
        let params = self.parameters(max_steps);
        match &self.costs {
            Some(costs) => Ok(World::from_cost_matrix(costs, params, seed)),
            None => World::initialize(self.patrols, self.systems, range, params, seed),
        }
    }
}

/// Named-field reader over whitespace tokens
struct Tokens<I> {
    inner: I,
}

impl<'a, I: Iterator<Item = &'a str>> Tokens<I> {
    fn new(inner: I) -> Self {
        Self { inner }
    }

    fn next<T: FromStr>(&mut self, field: &str) -> Result<T> {
        let raw = self
            .inner
            .next()
            .ok_or_else(|| SimError::MissingValue(field.to_string()))?;
        raw.parse().map_err(|_| SimError::Parse {
            field: field.to_string(),
            value: raw.to_string(),
        })
    }

    fn header(&mut self) -> Result<SimulationConfig> {
        let [n, m, tau, v, vmax, mu, rho, delta] = FIELD_NAMES;
        Ok(SimulationConfig {
            patrols: self.next(n)?,
            systems: self.next(m)?,
            final_time: self.next(tau)?,
            initial_population: self.next(v)?,
            max_population: self.next(vmax)?,
            rates: Rates {
                mu: self.next(mu)?,
                rho: self.next(rho)?,
                delta: self.next(delta)?,
            },
            costs: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_values() {
        let config =
            SimulationConfig::from_values(&["100", "50", "200.0", "10", "5000", "0.01", "0.5", "0.02"])
                .unwrap();
        assert_eq!(config.patrols, 100);
        assert_eq!(config.systems, 50);
        assert_eq!(config.final_time, 200.0);
        assert_eq!(config.initial_population, 10);
        assert_eq!(config.max_population, 5000);
        assert_eq!(config.rates, Rates::new(0.01, 0.5, 0.02));
        assert!(config.costs.is_none());
    }

    #[test]
    fn test_from_values_wrong_count() {
        let err = SimulationConfig::from_values(&["1", "2"]).unwrap_err();
        assert!(matches!(err, SimError::Usage(_)));
    }

    #[test]
    fn test_from_values_bad_number() {
        let err = SimulationConfig::from_values(&["3", "x", "10", "1", "5", "0.1", "0.1", "0.1"])
            .unwrap_err();
        match err {
            SimError::Parse { field, value } => {
                assert_eq!(field, "m");
                assert_eq!(value, "x");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_file_text() {
        let text = "3 2\n100.0 3 50\n0.1 0.5 0.2\n100 100\n50 200\n300 10\n";
        let config = SimulationConfig::parse(text).unwrap();
        let costs = config.costs.as_ref().unwrap();
        assert_eq!(costs.patrols(), 3);
        assert_eq!(costs.row(2), Some(&[300, 10][..]));
        assert!((costs.tmin() - 30.0).abs() < 1e-12);
    }

    #[test]
    fn test_parse_truncated_matrix() {
        let text = "2 2 10 2 50 0.1 0.5 0.2 1 2 3";
        let err = SimulationConfig::parse(text).unwrap_err();
        assert!(matches!(err, SimError::MissingValue(ref f) if f == "cost[1][1]"));
    }

    #[test]
    fn test_validation() {
        let base = || {
            SimulationConfig::from_values(&["4", "3", "10", "4", "50", "0.1", "0.5", "0.2"])
                .unwrap()
        };
        let mut config = base();
        config.final_time = 0.0;
        assert!(config.validate().is_err());

        let mut config = base();
        config.rates.rho = -1.0;
        assert!(config.validate().is_err());

        let mut config = base();
        config.costs = Some(CostMatrix::from_rows(vec![vec![1, 2, 3]]).unwrap());
        assert!(config.validate().is_err());

        assert!(SimulationConfig::from_values(&["0", "3", "10", "4", "50", "0.1", "0.5", "0.2"]).is_err());
        assert!(SimulationConfig::from_values(&["4", "3", "10", "4", "0", "0.1", "0.5", "0.2"]).is_err());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = SimulationConfig::from_file("/definitely/not/here.cfg").unwrap_err();
        assert!(matches!(err, SimError::Io(_)));
    }

    #[test]
    fn test_build_world_uses_explicit_costs() {
        let text = "3 2 100 3 50 0.1 0.5 0.2 100 100 50 200 300 10";
        let config = SimulationConfig::parse(text).unwrap();
        let world = config.build_world(10, CostRange::default(), 1).unwrap();
        let totals: Vec<u64> = world.patrols().map(|(_, p)| p.total_time()).collect();
        assert_eq!(totals, vec![200, 250, 310]);
        assert_eq!(world.params().max_population, 50);
    }
}
