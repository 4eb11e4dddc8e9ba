// Step function for the patrol population.
//
// Step sequence:
// 1. Epidemic, if the population is above the cap
// 2. Visit a frozen copy of the live order; for each patrol still alive:
//    death, then reproduction, then mutation (a dead patrol skips the rest)
// 3. Advance the step counter and evaluate termination

use rand::Rng;

use crate::patrol::Patrol;
use crate::rates::{death_rate, mutation_rate, reproduction_rate, shed_count};
#[cfg(feature = "instrument")]
use crate::types::KeyToU64;
use crate::types::PatrolId;
use crate::world::{RunState, TerminationReason, World};

/// Events realized during a single step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepOutcome {
    pub epidemic: bool,
    pub deaths: u64,
    pub births: u64,
    pub mutations: u64,
}

impl World {
    /// Advance exactly one step. Does nothing once the run has terminated.
    pub fn step(&mut self) -> RunState {
        if self.state.is_terminated() {
            return self.state;
        }

        let mut outcome = StepOutcome::default();

        if self.order.len() > self.params.max_population {
            self.epidemic();
            outcome.epidemic = true;
        }

        let visit: Vec<PatrolId> = self.order.clone();
        for id in visit {
            let Some(patrol) = self.patrols.get(id) else {
                continue;
            };
            let comfort = patrol.comfort(self.tmin);

            let u_death: f64 = self.rng.random();
            let u_birth: f64 = self.rng.random();
            let u_mutation: f64 = self.rng.random();

            let rates = self.params.rates;
            if u_death < death_rate(rates.mu, comfort) {
                self.kill(id, comfort);
                outcome.deaths += 1;
                continue;
            }
            if u_birth < reproduction_rate(rates.rho, comfort) && self.reproduce(id).is_some() {
                outcome.births += 1;
            }
            if u_mutation < mutation_rate(rates.delta, comfort) && self.mutate(id) {
                outcome.mutations += 1;
            }
        }

        self.current_step += 1;

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "step",
            step = self.current_step,
            population = self.order.len() as u64,
            deaths = outcome.deaths,
            births = outcome.births,
            mutations = outcome.mutations,
            epidemic = outcome.epidemic,
            best_comfort = self.best_comfort().unwrap_or(0.0),
        );

        self.evaluate_termination()
    }

    /// Step until the run terminates. Never takes more than `max_steps` steps.
    ///
    /// Stop conditions are checked before the first step as well as after
    /// every step. A world built with `max_steps == 0`, or with a patrol
    /// already at comfort 1, therefore takes no step at all rather than one.
    pub fn run(&mut self) -> RunState {
        self.evaluate_termination();
        while !self.state.is_terminated() {
            self.step();
        }
        self.state
    }

    /// Step until `target` steps have been taken or the run terminates.
    pub fn run_until(&mut self, target: u64) -> RunState {
        self.evaluate_termination();
        while !self.state.is_terminated() && self.current_step < target {
            self.step();
        }
        self.state
    }

    /// Hand over the final population, in live order.
    pub fn into_patrols(mut self) -> Vec<Patrol> {
        let order = std::mem::take(&mut self.order);
        order
            .into_iter()
            .filter_map(|id| self.patrols.remove(id))
            .collect()
    }

    /// Highest comfort in the live population
    pub fn best_comfort(&self) -> Option<f64> {
        self.patrols()
            .map(|(_, p)| p.comfort(self.tmin))
            .max_by(f64::total_cmp)
    }

    /// Check the stop conditions and latch the first one that holds.
    pub fn evaluate_termination(&mut self) -> RunState {
        if self.state.is_terminated() {
            return self.state;
        }

        let reason = if self.current_step >= self.params.max_steps {
            Some(TerminationReason::StepLimit)
        } else if self.order.is_empty() {
            Some(TerminationReason::Extinction)
        } else if self.patrols().any(|(_, p)| p.comfort(self.tmin) >= 1.0) {
            Some(TerminationReason::ComfortReached)
        } else {
            None
        };

        if let Some(reason) = reason {
            self.state = RunState::Terminated(reason);

            #[cfg(feature = "instrument")]
            tracing::info!(
                target: "termination",
                step = self.current_step,
                reason = ?reason,
                population = self.order.len() as u64,
            );
        }
        self.state
    }

    // === Events ===

    fn kill(&mut self, id: PatrolId, comfort: f64) {
        let Some(patrol) = self.remove_patrol(id) else {
            return;
        };
        self.stats.deaths += 1;

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "death",
            step = self.current_step,
            patrol_id = id.to_u64(),
            comfort = comfort,
            total_time = patrol.total_time(),
        );
        let _ = (patrol, comfort); // Suppress unused warnings
    }

    /// Keep only the most comfortable patrols. Ties keep live order.
    pub(crate) fn epidemic(&mut self) {
        let before = self.order.len();
        let tmin = self.tmin;

        let mut ranked: Vec<(PatrolId, f64)> = self
            .order
            .iter()
            .filter_map(|&id| self.patrols.get(id).map(|p| (id, p.comfort(tmin))))
            .collect();
        // Stable sort: equal comforts stay in live order
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        let keep = self.params.epidemic_survivors.min(ranked.len());
        for &(id, _) in &ranked[keep..] {
            self.patrols.remove(id);
        }
        self.order = ranked[..keep].iter().map(|&(id, _)| id).collect();
        self.stats.epidemics += 1;

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "epidemic",
            step = self.current_step,
            before = before as u64,
            after = self.order.len() as u64,
        );
        let _ = before;
    }

    /// Clone `parent` and have the newborn shed part of its load onto other
    /// patrols. Returns the newborn's id, or `None` if the attempt was
    /// abandoned because nothing could be shed.
    pub(crate) fn reproduce(&mut self, parent: PatrolId) -> Option<PatrolId> {
        let source = self.patrols.get(parent)?;
        let comfort = source.comfort(self.tmin);

        let mut child = Patrol::new();
        child.clone_systems_from(source, &mut self.system_ids);

        let shed = shed_count(comfort, child.len());
        if shed == 0 || self.order.len() <= 1 {
            self.stats.abandoned_births += 1;
            #[cfg(feature = "instrument")]
            tracing::debug!(
                patrol_id = parent.to_u64(),
                comfort,
                "reproduction abandoned"
            );
            return None;
        }

        for system in child.remove_random_systems(&mut self.rng, shed) {
            let target = self.random_other(parent);
            match target.and_then(|t| self.patrols.get_mut(t)) {
                Some(peer) => peer.add_system(system),
                None => child.add_system(system),
            }
        }

        #[cfg(feature = "instrument")]
        let child_total = child.total_time();
        let child_id = self.insert_patrol(child);
        self.stats.births += 1;

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "birth",
            step = self.current_step,
            parent_id = parent.to_u64(),
            child_id = child_id.to_u64(),
            shed = shed as u64,
            child_total_time = child_total,
        );

        Some(child_id)
    }

    /// Hand one random system of `id` to another random patrol. Returns
    /// whether anything moved.
    pub(crate) fn mutate(&mut self, id: PatrolId) -> bool {
        if self.order.len() < 2 {
            return false;
        }
        let Some(patrol) = self.patrols.get_mut(id) else {
            return false;
        };
        let Some(system) = patrol.remove_random_system(&mut self.rng) else {
            return false;
        };

        let target = self.random_other(id);
        let Some(peer) = target.and_then(|t| self.patrols.get_mut(t)) else {
            // Nobody to receive it; give it back
            if let Some(patrol) = self.patrols.get_mut(id) {
                patrol.add_system(system);
            }
            return false;
        };
        peer.add_system(system);
        self.stats.mutations += 1;

        #[cfg(feature = "instrument")]
        if let Some(to) = target {
            tracing::info!(
                target: "mutation",
                step = self.current_step,
                from_id = id.to_u64(),
                to_id = to.to_u64(),
                pacification_time = system.pacification_time(),
            );
        }

        true
    }

    /// Uniformly pick a live patrol other than `excluded`, redrawing whenever
    /// the draw lands on it.
    fn random_other(&mut self, excluded: PatrolId) -> Option<PatrolId> {
        if !self.order.iter().any(|&id| id != excluded) {
            return None;
        }
        loop {
            let idx = self.rng.random_range(0..self.order.len());
            let candidate = self.order[idx];
            if candidate != excluded {
                return Some(candidate);
            }
        }
    }
}
