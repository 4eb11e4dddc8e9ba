//! Run controller and observation reports.
//!
//! The final time `tau` is split into `OBSERVATIONS` equal windows.
//! Observation `k` is taken at instant `k * tau / OBSERVATIONS`, once the
//! world has stepped up to `ceil(instant)` or stopped, whichever is first.
//! Steps are the unit of simulated time.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::SimulationConfig;
use crate::costs::CostRange;
use crate::error::Result;
use crate::types::{KeyToU64, Time};
use crate::world::{RunState, World};

/// Number of observations printed over a run
pub const OBSERVATIONS: u32 = 20;

/// Candidate patrols listed after the best one
pub const OTHER_CANDIDATES: usize = 5;

/// A patrol as it appears in a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: u64,
    pub comfort: f64,
    pub total_time: u64,
    /// Pacification times of the systems it owns
    pub distribution: Vec<Time>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub index: u32,
    pub instant: f64,
    pub step: u64,
    pub realized_events: u64,
    pub population: usize,
    pub epidemics: u64,
    pub best: Option<Candidate>,
    /// Largest total time over all patrols: when the last system is pacified
    pub policing_time: u64,
    pub comfort: f64,
    pub others: Vec<Candidate>,
    pub state: RunState,
}

impl Observation {
    /// Capture the current state of `world`.
    pub fn capture(world: &World, index: u32, instant: f64) -> Self {
        let tmin = world.tmin();
        let mut ranked: Vec<Candidate> = world
            .patrols()
            .map(|(id, p)| Candidate {
                id: id.to_u64(),
                comfort: p.comfort(tmin),
                total_time: p.total_time(),
                distribution: p.systems().iter().map(|s| s.pacification_time()).collect(),
            })
            .collect();
        ranked.sort_by(|a, b| b.comfort.total_cmp(&a.comfort));

        let policing_time = ranked.iter().map(|c| c.total_time).max().unwrap_or(0);
        let comfort = ranked.first().map(|c| c.comfort).unwrap_or(0.0);
        let mut rest = ranked.into_iter();
        let best = rest.next();
        let others = rest.take(OTHER_CANDIDATES).collect();

        Self {
            index,
            instant,
            step: world.current_step(),
            realized_events: world.stats().realized_events(),
            population: world.population(),
            epidemics: world.stats().epidemics,
            best,
            policing_time,
            comfort,
            others,
            state: world.state(),
        }
    }
}

fn write_distribution(f: &mut fmt::Formatter<'_>, c: &Candidate) -> fmt::Result {
    write!(f, "patrol {} {{", c.id)?;
    for (i, t) in c.distribution.iter().enumerate() {
        if i > 0 {
            write!(f, ",")?;
        }
        write!(f, "{t}")?;
    }
    write!(f, "}}")
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Observation {}:", self.index)?;
        writeln!(f, "\t\tPresent instant:                   {:.2}", self.instant)?;
        writeln!(f, "\t\tNumber of realized events:         {}", self.realized_events)?;
        writeln!(f, "\t\tPopulation size:                   {}", self.population)?;
        writeln!(f, "\t\tNumber of epidemics:               {}", self.epidemics)?;
        write!(f, "\t\tBest distribution of the patrols:  ")?;
        match &self.best {
            Some(best) => write_distribution(f, best)?,
            None => write!(f, "none")?,
        }
        writeln!(f)?;
        writeln!(f, "\t\tEmpire policing time:              {}", self.policing_time)?;
        writeln!(f, "\t\tComfort:                           {:.4}", self.comfort)?;
        writeln!(f, "\t\tOther candidate distributions:")?;
        for other in &self.others {
            write!(f, "\t\t\t")?;
            write_distribution(f, other)?;
            writeln!(f, " : {} : {:.4}", other.total_time, other.comfort)?;
        }
        Ok(())
    }
}

/// Drives a world through the observation windows of one configuration.
pub struct Controller {
    world: World,
    final_time: f64,
}

impl Controller {
    pub fn new(world: World, final_time: f64) -> Self {
        Self { world, final_time }
    }

    pub fn from_config(
        config: &SimulationConfig,
        max_steps: u64,
        range: CostRange,
        seed: u64,
    ) -> Result<Self> {
        let world = config.build_world(max_steps, range, seed)?;
        Ok(Self::new(world, config.final_time))
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn into_world(self) -> World {
        self.world
    }

    /// Step to observation `index` (1-based) and capture it.
    pub fn observe(&mut self, index: u32) -> Observation {
        let instant = self.final_time * f64::from(index) / f64::from(OBSERVATIONS);
        let target = instant.ceil().max(0.0) as u64;
        self.world.run_until(target);

        let observation = Observation::capture(&self.world, index, instant);

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "observation",
            index = index,
            instant = instant,
            step = observation.step,
            population = observation.population as u64,
            realized_events = observation.realized_events,
            epidemics = observation.epidemics,
            policing_time = observation.policing_time,
            comfort = observation.comfort,
        );

        observation
    }

    /// Take every observation in order, calling `sink` on each one.
    pub fn run(&mut self, mut sink: impl FnMut(&Observation)) -> RunState {
        for index in 1..=OBSERVATIONS {
            let observation = self.observe(index);
            sink(&observation);
        }
        self.world.state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::costs::CostMatrix;
    use crate::rates::Rates;
    use crate::world::Parameters;

    fn quiet_world(max_steps: u64) -> World {
        // Huge coefficients make every event practically impossible
        let params = Parameters::default()
            .with_rates(Rates::new(60.0, 60.0, 60.0))
            .with_max_steps(max_steps);
        let costs =
            CostMatrix::from_rows(vec![vec![100, 100], vec![50, 200], vec![300, 10]]).unwrap();
        World::from_cost_matrix(&costs, params, 3)
    }

    #[test]
    fn test_capture_ranks_by_comfort() {
        let world = quiet_world(10);
        let observation = Observation::capture(&world, 1, 0.5);

        let best = observation.best.as_ref().unwrap();
        assert_eq!(best.total_time, 200);
        assert_eq!(best.distribution, vec![100, 100]);
        assert!((observation.comfort - 0.15).abs() < 1e-12);
        assert_eq!(observation.policing_time, 310);
        assert_eq!(observation.population, 3);

        let other_totals: Vec<u64> = observation.others.iter().map(|c| c.total_time).collect();
        assert_eq!(other_totals, vec![250, 310]);
    }

    #[test]
    fn test_observations_follow_instants() {
        let mut controller = Controller::new(quiet_world(1000), 40.0);
        let mut steps = Vec::new();
        controller.run(|o| steps.push(o.step));

        let expected: Vec<u64> = (1..=20).map(|k| 2 * k).collect();
        assert_eq!(steps, expected);
    }

    #[test]
    fn test_observations_stop_at_step_limit() {
        let mut controller = Controller::new(quiet_world(7), 40.0);
        let mut steps = Vec::new();
        let state = controller.run(|o| steps.push(o.step));

        assert!(state.is_terminated());
        assert_eq!(steps.len(), 20);
        assert_eq!(*steps.last().unwrap(), 7);
        assert!(steps.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_display_block() {
        let world = quiet_world(10);
        let text = Observation::capture(&world, 3, 1.5).to_string();
        assert!(text.starts_with("Observation 3:"));
        assert!(text.contains("Population size:                   3"));
        assert!(text.contains("Empire policing time:              310"));
        assert!(text.contains("{100,100}"));
    }
}
