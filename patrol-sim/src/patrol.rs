//! Patrols and the systems they are responsible for.
//!
//! A patrol's total time is cached and only ever changed through the
//! add/remove methods below, so it always equals the sum of its systems'
//! pacification times.

use rand::Rng;

use crate::system::PlanetarySystem;
use crate::types::{SystemId, SystemIdAllocator};

/// A patrol unit holding a set of planetary systems to pacify.
#[derive(Debug, Clone, Default)]
pub struct Patrol {
    systems: Vec<PlanetarySystem>,
    total_time: u64,
}

impl Patrol {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_systems(systems: impl IntoIterator<Item = PlanetarySystem>) -> Self {
        let mut patrol = Self::new();
        for system in systems {
            patrol.add_system(system);
        }
        patrol
    }

    /// Systems currently owned, in storage order
    pub fn systems(&self) -> &[PlanetarySystem] {
        &self.systems
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    /// Sum of the pacification times of every owned system
    pub fn total_time(&self) -> u64 {
        self.total_time
    }

    pub fn add_system(&mut self, system: PlanetarySystem) {
        self.total_time += u64::from(system.pacification_time());
        self.systems.push(system);
    }

    /// Remove the system with the given identity. Returns `None` when this
    /// patrol does not own it.
    pub fn remove_system(&mut self, id: SystemId) -> Option<PlanetarySystem> {
        let idx = self.systems.iter().position(|s| s.id() == id)?;
        Some(self.take_at(idx))
    }

    /// Remove a uniformly random system (swap-remove of a drawn index).
    pub fn remove_random_system<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<PlanetarySystem> {
        if self.systems.is_empty() {
            return None;
        }
        let idx = rng.random_range(0..self.systems.len());
        Some(self.take_at(idx))
    }

    /// Remove up to `count` random systems, stopping early once the patrol
    /// runs out.
    pub fn remove_random_systems<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        count: usize,
    ) -> Vec<PlanetarySystem> {
        let mut removed = Vec::with_capacity(count.min(self.systems.len()));
        for _ in 0..count {
            match self.remove_random_system(rng) {
                Some(system) => removed.push(system),
                None => break,
            }
        }
        removed
    }

    /// Comfort relative to the world's baseline `tmin`.
    ///
    /// A patrol with nothing to do is maximally comfortable (1.0).
    pub fn comfort(&self, tmin: f64) -> f64 {
        if self.total_time == 0 {
            return 1.0;
        }
        tmin / self.total_time as f64
    }

    /// Append fresh copies of `other`'s systems. Copies keep the pacification
    /// times but get new identities, so nothing is shared between patrols.
    pub fn clone_systems_from(&mut self, other: &Patrol, ids: &mut SystemIdAllocator) {
        self.systems.reserve(other.systems.len());
        for system in &other.systems {
            self.add_system(PlanetarySystem::new(ids.next_id(), system.pacification_time()));
        }
    }

    fn take_at(&mut self, idx: usize) -> PlanetarySystem {
        let system = self.systems.swap_remove(idx);
        self.total_time -= u64::from(system.pacification_time());
        system
    }
}
