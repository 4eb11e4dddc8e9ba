use wasm_bindgen::prelude::*;

pub mod config;
pub mod costs;
pub mod error;
pub mod patrol;
pub mod rates;
pub mod report;
pub mod step;
pub mod system;
pub mod types;
pub mod world;

#[cfg(feature = "instrument")]
pub use instrument;

pub use config::SimulationConfig;
pub use costs::{CostMatrix, CostRange};
pub use error::{Result, SimError};
pub use patrol::Patrol;
pub use rates::{Rates, death_rate, mutation_rate, reproduction_rate, shed_count};
pub use report::{Candidate, Controller, OBSERVATIONS, Observation};
pub use step::StepOutcome;
pub use system::PlanetarySystem;
pub use types::{KeyToU64, PatrolId, SystemId, SystemIdAllocator, Time};
pub use world::{
    EPIDEMIC_SURVIVORS, Parameters, PatrolSnapshot, RunState, RunStats, TerminationReason, World,
    WorldSnapshot,
};

// ============================================================================
// WASM API - Simulation
// ============================================================================

#[wasm_bindgen]
pub struct Simulation {
    world: World,
}

#[wasm_bindgen]
impl Simulation {
    /// Seed a random world. Without a seed one is drawn from `Math.random`.
    #[wasm_bindgen(constructor)]
    pub fn new(
        patrols: usize,
        systems: usize,
        params: Parameters,
        seed: Option<u64>,
    ) -> std::result::Result<Simulation, JsError> {
        // Better panic messages in browser console
        console_error_panic_hook::set_once();

        let seed = seed.unwrap_or_else(|| (js_sys::Math::random() * u64::MAX as f64) as u64);
        let world = World::initialize(patrols, systems, CostRange::default(), params, seed)?;
        Ok(Self { world })
    }

    /// Build from an explicit cost matrix given as a JS array of arrays.
    #[wasm_bindgen]
    pub fn with_costs(
        costs: JsValue,
        params: Parameters,
        seed: u64,
    ) -> std::result::Result<Simulation, JsError> {
        console_error_panic_hook::set_once();

        let rows: Vec<Vec<Time>> = serde_wasm_bindgen::from_value(costs)?;
        let costs = CostMatrix::from_rows(rows)?;
        Ok(Self {
            world: World::from_cost_matrix(&costs, params, seed),
        })
    }

    /// Advance the simulation by one step; a no-op once terminated
    #[wasm_bindgen]
    pub fn step(&mut self) -> RunState {
        self.world.step()
    }

    /// Step until a stop condition holds
    #[wasm_bindgen]
    pub fn run(&mut self) -> RunState {
        self.world.run()
    }

    #[wasm_bindgen]
    pub fn is_terminated(&self) -> bool {
        self.world.is_terminated()
    }

    #[wasm_bindgen]
    pub fn get_step(&self) -> u64 {
        self.world.current_step()
    }

    #[wasm_bindgen]
    pub fn get_tmin(&self) -> f64 {
        self.world.tmin()
    }

    /// Get a snapshot of the live population for rendering
    #[wasm_bindgen]
    pub fn get_snapshot(&self) -> WorldSnapshot {
        self.world.snapshot()
    }

    /// Snapshot as a JSON string, for hosts without the generated typings
    #[wasm_bindgen]
    pub fn get_snapshot_json(&self) -> std::result::Result<String, JsError> {
        Ok(serde_json::to_string(&self.world.snapshot())?)
    }
}

impl Simulation {
    pub fn world(&self) -> &World {
        &self.world
    }
}
