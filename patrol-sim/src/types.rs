use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

// ============================================================================
// IDs - Patrols use slotmap generational keys, systems a plain counter
// ============================================================================

new_key_type! {
    pub struct PatrolId;
}

/// Trait for converting SlotMap keys to u64 for the WASM boundary
pub trait KeyToU64 {
    fn to_u64(self) -> u64;
}

impl KeyToU64 for PatrolId {
    fn to_u64(self) -> u64 {
        self.0.as_ffi()
    }
}

/// Time units needed to pacify one planetary system.
pub type Time = u32;

/// Identity of a planetary system. Two systems with the same pacification
/// time are still distinct systems.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct SystemId(pub u64);

impl SystemId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

/// Hands out fresh `SystemId`s. Owned by the world so cloned systems never
/// share an identity with their originals.
#[derive(Debug, Clone, Default)]
pub struct SystemIdAllocator {
    next: u64,
}

impl SystemIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> SystemId {
        let id = SystemId::new(self.next);
        self.next += 1;
        id
    }

    /// Number of ids handed out so far
    pub fn issued(&self) -> u64 {
        self.next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocator_is_monotonic() {
        let mut ids = SystemIdAllocator::new();
        let a = ids.next_id();
        let b = ids.next_id();
        let c = ids.next_id();
        assert!(a < b && b < c);
        assert_eq!(ids.issued(), 3);
    }
}
