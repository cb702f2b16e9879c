// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Tunables for a [crate::BindingContext].
*/

/**
Configuration for the binding subsystem.

```
use bindings_and_pools::BindingConfig;
let config = BindingConfig::default().with_frames_in_flight(2);
assert_eq!(config.frames_in_flight(), 2);
assert_eq!(config.pool_capacity(), 1024);
```
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingConfig {
    frames_in_flight: usize,
    pool_capacity: u32,
    dynamic_slots_per_buffer: u32,
    uniform_offset_alignment: Option<u64>,
}

impl Default for BindingConfig {
    fn default() -> Self {
        BindingConfig {
            frames_in_flight: 3,
            pool_capacity: 1024,
            dynamic_slots_per_buffer: 1024,
            uniform_offset_alignment: None,
        }
    }
}

impl BindingConfig {
    /**
    Number of frame slots whose GPU work may still be running while the CPU records the next one.

    Every value store keeps one resource group per slot.

    # Panics
    If `frames` is 0.
    */
    pub fn with_frames_in_flight(mut self, frames: usize) -> Self {
        assert!(frames > 0, "frames_in_flight must be at least 1");
        self.frames_in_flight = frames;
        self
    }

    /**
    Maximum number of groups carved from one pool.

    Pools never shrink; a full pool causes a new one to be created.

    # Panics
    If `capacity` is 0.
    */
    pub fn with_pool_capacity(mut self, capacity: u32) -> Self {
        assert!(capacity > 0, "pool_capacity must be at least 1");
        self.pool_capacity = capacity;
        self
    }

    /**
    Slots per shared dynamic buffer, for every dynamic binding.

    # Panics
    If `slots` is 0.
    */
    pub fn with_dynamic_slots_per_buffer(mut self, slots: u32) -> Self {
        assert!(slots > 0, "dynamic_slots_per_buffer must be at least 1");
        self.dynamic_slots_per_buffer = slots;
        self
    }

    /// Overrides the alignment reported by the backend.
    pub fn with_uniform_offset_alignment(mut self, alignment: u64) -> Self {
        self.uniform_offset_alignment = Some(alignment);
        self
    }

    pub fn frames_in_flight(&self) -> usize {
        self.frames_in_flight
    }
    pub fn pool_capacity(&self) -> u32 {
        self.pool_capacity
    }
    pub fn dynamic_slots_per_buffer(&self) -> u32 {
        self.dynamic_slots_per_buffer
    }
    pub fn uniform_offset_alignment(&self) -> Option<u64> {
        self.uniform_offset_alignment
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = BindingConfig::default();
        assert_eq!(config.frames_in_flight(), 3);
        assert_eq!(config.pool_capacity(), 1024);
        assert_eq!(config.dynamic_slots_per_buffer(), 1024);
        assert_eq!(config.uniform_offset_alignment(), None);
    }

    #[test]
    #[should_panic(expected = "pool_capacity")]
    fn zero_capacity() {
        let _ = BindingConfig::default().with_pool_capacity(0);
    }
}
