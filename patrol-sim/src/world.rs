//! World state for the patrol population simulation.
//!
//! The world owns every patrol, the frozen baseline `tmin`, the parameters
//! and the single random source. Runs are reproducible: for a fixed seed
//! and cost matrix the draws happen in this order:
//!
//! 1. Random initialization draws one cost per (patrol, system), row-major.
//! 2. Each step visits a snapshot of the live order. For every visited patrol
//!    still alive, `u1, u2, u3` are drawn first, then any draws made by
//!    reproduction (shed indices, then one target per shed system, resampling
//!    on the parent) and mutation (one index, then target resampling).
//! 3. Epidemics make no draws; ties in comfort keep live order.

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use tsify_next::Tsify;

use crate::costs::{CostMatrix, CostRange};
use crate::error::Result;
use crate::patrol::Patrol;
use crate::rates::Rates;
use crate::system::PlanetarySystem;
use crate::types::{KeyToU64, PatrolId, SystemIdAllocator};

/// Patrols kept alive by an epidemic
pub const EPIDEMIC_SURVIVORS: usize = 5;

/// Fixed parameters of a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct Parameters {
    pub max_steps: u64,
    /// Population above which an epidemic strikes
    pub max_population: usize,
    pub rates: Rates,
    pub epidemic_survivors: usize,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            max_steps: 1000,
            max_population: 5000,
            rates: Rates::default(),
            epidemic_survivors: EPIDEMIC_SURVIVORS,
        }
    }
}

impl Parameters {
    pub fn with_max_steps(mut self, max_steps: u64) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_max_population(mut self, max_population: usize) -> Self {
        self.max_population = max_population;
        self
    }

    pub fn with_rates(mut self, rates: Rates) -> Self {
        self.rates = rates;
        self
    }

    pub fn with_epidemic_survivors(mut self, survivors: usize) -> Self {
        self.epidemic_survivors = survivors;
        self
    }
}

/// Why a run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub enum TerminationReason {
    StepLimit,
    Extinction,
    ComfortReached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub enum RunState {
    Running,
    Terminated(TerminationReason),
}

impl RunState {
    pub fn is_terminated(&self) -> bool {
        matches!(self, RunState::Terminated(_))
    }
}

/// Counters of events realized so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct RunStats {
    pub deaths: u64,
    pub births: u64,
    /// Reproduction attempts that shed nothing and were dropped
    pub abandoned_births: u64,
    pub mutations: u64,
    pub epidemics: u64,
}

impl RunStats {
    /// Every event that changed the population or an assignment
    pub fn realized_events(&self) -> u64 {
        self.deaths + self.births + self.mutations + self.epidemics
    }
}

// ============================================================================
// Snapshots for reporting
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct PatrolSnapshot {
    pub id: u64,
    pub total_time: u64,
    pub comfort: f64,
    pub systems: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct WorldSnapshot {
    pub step: u64,
    pub tmin: f64,
    pub state: RunState,
    pub stats: RunStats,
    pub patrols: Vec<PatrolSnapshot>,
}

// ============================================================================
// World
// ============================================================================

/// The population engine: every live patrol plus the state needed to step them.
#[derive(Debug, Clone)]
pub struct World {
    pub(crate) patrols: SlotMap<PatrolId, Patrol>,
    /// Live patrols in insertion order
    pub(crate) order: Vec<PatrolId>,
    pub(crate) tmin: f64,
    pub(crate) params: Parameters,
    pub(crate) rng: StdRng,
    pub(crate) system_ids: SystemIdAllocator,
    pub(crate) current_step: u64,
    pub(crate) state: RunState,
    pub(crate) stats: RunStats,
}

impl World {
    /// Seed `patrols` patrols with `systems` random systems each.
    pub fn initialize(
        patrols: usize,
        systems: usize,
        range: CostRange,
        params: Parameters,
        seed: u64,
    ) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        let costs = CostMatrix::random(patrols, systems, range, &mut rng)?;
        Ok(Self::build(&costs, params, rng))
    }

    /// Seed one patrol per matrix row, taking the costs as given.
    pub fn from_cost_matrix(costs: &CostMatrix, params: Parameters, seed: u64) -> Self {
        Self::build(costs, params, StdRng::seed_from_u64(seed))
    }

    fn build(costs: &CostMatrix, params: Parameters, rng: StdRng) -> Self {
        let mut world = Self {
            patrols: SlotMap::with_key(),
            order: Vec::with_capacity(costs.patrols()),
            tmin: costs.tmin(),
            params,
            rng,
            system_ids: SystemIdAllocator::new(),
            current_step: 0,
            state: RunState::Running,
            stats: RunStats::default(),
        };

        for row in costs.rows() {
            let mut patrol = Patrol::new();
            for &time in row {
                patrol.add_system(PlanetarySystem::new(world.system_ids.next_id(), time));
            }
            world.insert_patrol(patrol);
        }

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "init",
            patrols = costs.patrols() as u64,
            systems = costs.systems() as u64,
            tmin = world.tmin,
        );

        world
    }

    // === Accessors ===

    /// Frozen baseline all comforts are measured against
    pub fn tmin(&self) -> f64 {
        self.tmin
    }

    pub fn params(&self) -> &Parameters {
        &self.params
    }

    pub fn current_step(&self) -> u64 {
        self.current_step
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn is_terminated(&self) -> bool {
        self.state.is_terminated()
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn population(&self) -> usize {
        self.order.len()
    }

    pub fn get_patrol(&self, id: PatrolId) -> Option<&Patrol> {
        self.patrols.get(id)
    }

    pub fn contains(&self, id: PatrolId) -> bool {
        self.patrols.contains_key(id)
    }

    /// Live patrols in insertion order
    pub fn patrols(&self) -> impl Iterator<Item = (PatrolId, &Patrol)> {
        self.order
            .iter()
            .filter_map(|&id| self.patrols.get(id).map(|p| (id, p)))
    }

    pub fn patrol_ids(&self) -> &[PatrolId] {
        &self.order
    }

    pub fn comfort_of(&self, id: PatrolId) -> Option<f64> {
        self.patrols.get(id).map(|p| p.comfort(self.tmin))
    }

    /// Sum of every live patrol's total time
    pub fn total_assigned_time(&self) -> u64 {
        self.patrols().map(|(_, p)| p.total_time()).sum()
    }

    /// Read-only view of the live population for reporting
    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            step: self.current_step,
            tmin: self.tmin,
            state: self.state,
            stats: self.stats,
            patrols: self
                .patrols()
                .map(|(id, p)| PatrolSnapshot {
                    id: id.to_u64(),
                    total_time: p.total_time(),
                    comfort: p.comfort(self.tmin),
                    systems: p.len(),
                })
                .collect(),
        }
    }

    // === Patrol Management ===

    pub(crate) fn insert_patrol(&mut self, patrol: Patrol) -> PatrolId {
        let id = self.patrols.insert(patrol);
        self.order.push(id);
        id
    }

    pub(crate) fn remove_patrol(&mut self, id: PatrolId) -> Option<Patrol> {
        let patrol = self.patrols.remove(id)?;
        if let Some(pos) = self.order.iter().position(|&p| p == id) {
            self.order.remove(pos);
        }
        Some(patrol)
    }
}
