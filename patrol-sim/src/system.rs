use serde::{Deserialize, Serialize};

use crate::types::{SystemId, Time};

/// A planetary system assigned to a patrol.
///
/// Immutable once created: a system only ever changes owner, never its
/// pacification time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanetarySystem {
    id: SystemId,
    pacification_time: Time,
}

impl PlanetarySystem {
    pub fn new(id: SystemId, pacification_time: Time) -> Self {
        Self {
            id,
            pacification_time,
        }
    }

    pub fn id(&self) -> SystemId {
        self.id
    }

    pub fn pacification_time(&self) -> Time {
        self.pacification_time
    }
}
