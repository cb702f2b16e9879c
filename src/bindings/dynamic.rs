// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Sub-allocation of dynamic uniform buffers.

Dynamic bindings do not get a buffer per group.  Instead, many groups share one large buffer and
each group remembers the offset of its slot, which is supplied when the group is bound.

Slots are sized to the backend's uniform offset alignment.  When a buffer runs out of slots the
allocator starts a new one; the old buffer stays alive for as long as any group refers to it.
*/

use crate::bindings::descriptor::BindingDescriptor;
use crate::bindings::layout::{LayoutHash, ResourceLayout};
use crate::bittricks::align_up;
use crate::imp::Backend;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/**
One backing buffer divided into equally-sized, aligned slots.
*/
#[derive(Debug)]
pub struct SharedDynamicBuffer<B: Backend> {
    backing: B::Buffer,
    aligned_slot_size: u64,
    max_slots: u32,
    used_slots: AtomicU32,
}

impl<B: Backend> SharedDynamicBuffer<B> {
    /**
    # Panics
    If the offset of the last slot does not fit the `u32` dynamic offsets are bound with.
    */
    fn new(device: &B, aligned_slot_size: u64, max_slots: u32, debug_name: &str) -> Self {
        let last_offset = (max_slots as u64 - 1) * aligned_slot_size;
        assert!(
            u32::try_from(last_offset).is_ok(),
            "{debug_name}: {max_slots} slots of {aligned_slot_size} bytes need offsets past u32::MAX"
        );
        SharedDynamicBuffer {
            backing: device.create_buffer(aligned_slot_size * max_slots as u64, debug_name),
            aligned_slot_size,
            max_slots,
            used_slots: AtomicU32::new(0),
        }
    }

    /// Takes the next slot and returns its byte offset, or `None` when every slot is taken.
    fn claim_slot(&self) -> Option<u32> {
        let max_slots = self.max_slots;
        let used = self
            .used_slots
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |used| {
                (used < max_slots).then_some(used + 1)
            })
            .ok()?;
        Some(self.slot_offset(used))
    }

    /// Byte offset of slot `index`.
    fn slot_offset(&self, index: u32) -> u32 {
        let offset = index as u64 * self.aligned_slot_size;
        match u32::try_from(offset) {
            Ok(offset) => offset,
            Err(_) => panic!("dynamic slot offset {offset} does not fit in u32"),
        }
    }

    pub fn backing(&self) -> &B::Buffer {
        &self.backing
    }
    pub fn aligned_slot_size(&self) -> u64 {
        self.aligned_slot_size
    }
    pub fn max_slots(&self) -> u32 {
        self.max_slots
    }
    pub fn used_slots(&self) -> u32 {
        self.used_slots.load(Ordering::Relaxed)
    }
    pub fn is_exhausted(&self) -> bool {
        self.used_slots() >= self.max_slots
    }
}

/// A group's slot inside a [SharedDynamicBuffer].
#[derive(Debug)]
pub struct DynamicSlot<B: Backend> {
    pub buffer: Arc<SharedDynamicBuffer<B>>,
    pub offset: u32,
}

impl<B: Backend> Clone for DynamicSlot<B> {
    fn clone(&self) -> Self {
        DynamicSlot {
            buffer: self.buffer.clone(),
            offset: self.offset,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct DynamicKey {
    layout_hash: LayoutHash,
    binding_index: u32,
    aligned_slot_size: u64,
}

/**
Tracks, per layout and binding, the newest shared buffer with free slots.
*/
#[derive(Debug)]
pub struct DynamicAllocator<B: Backend> {
    alignment: u64,
    slots_per_buffer: u32,
    current: HashMap<DynamicKey, Arc<SharedDynamicBuffer<B>>>,
    buffers_created: usize,
}

impl<B: Backend> DynamicAllocator<B> {
    pub fn new(alignment: u64, slots_per_buffer: u32) -> Self {
        assert!(slots_per_buffer > 0, "dynamic buffers need at least one slot");
        DynamicAllocator {
            alignment,
            slots_per_buffer,
            current: HashMap::new(),
            buffers_created: 0,
        }
    }

    /// Slot size for a binding: its byte size rounded up to the alignment.
    pub fn aligned_slot_size(&self, binding: &BindingDescriptor) -> u64 {
        align_up(binding.byte_size() as u64, self.alignment)
    }

    /**
    Claims the next slot for a dynamic binding of a layout.

    Starts a new shared buffer on first use and whenever the current one is exhausted.
    */
    pub fn next_slot(
        &mut self,
        device: &B,
        layout: &ResourceLayout,
        binding: &BindingDescriptor,
    ) -> DynamicSlot<B> {
        let key = DynamicKey {
            layout_hash: layout.hash_code(),
            binding_index: binding.binding_index(),
            aligned_slot_size: self.aligned_slot_size(binding),
        };
        if let Some(buffer) = self.current.get(&key)
            && let Some(offset) = buffer.claim_slot()
        {
            return DynamicSlot {
                buffer: buffer.clone(),
                offset,
            };
        }
        let debug_name = format!("{}.{}", layout.name(), binding.name());
        let buffer = Arc::new(SharedDynamicBuffer::new(
            device,
            key.aligned_slot_size,
            self.slots_per_buffer,
            &debug_name,
        ));
        self.buffers_created += 1;
        logwise::info_sync!(
            "Created shared dynamic buffer {name} with {slots} slots",
            name = logwise::privacy::LogIt(&debug_name),
            slots = self.slots_per_buffer
        );
        let offset = match buffer.claim_slot() {
            Some(offset) => offset,
            None => unreachable!("a fresh dynamic buffer has no free slot"),
        };
        self.current.insert(key, buffer.clone());
        DynamicSlot { buffer, offset }
    }

    /// Byte offset the next [Self::next_slot] call would return, without claiming it.
    pub fn peek_next_offset(&self, layout: &ResourceLayout, binding: &BindingDescriptor) -> u32 {
        let key = DynamicKey {
            layout_hash: layout.hash_code(),
            binding_index: binding.binding_index(),
            aligned_slot_size: self.aligned_slot_size(binding),
        };
        match self.current.get(&key) {
            Some(buffer) if !buffer.is_exhausted() => buffer.slot_offset(buffer.used_slots()),
            _ => 0,
        }
    }

    pub fn alignment(&self) -> u64 {
        self.alignment
    }
    pub fn slots_per_buffer(&self) -> u32 {
        self.slots_per_buffer
    }
    /// Shared buffers created so far, including exhausted ones.
    pub fn buffers_created(&self) -> usize {
        self.buffers_created
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::visible_to::StageMask;
    use crate::imp::software::SoftwareDevice;

    fn layout() -> ResourceLayout {
        ResourceLayout::build(
            "Instance",
            2,
            vec![BindingDescriptor::dynamic_uniform_buffer(
                "Instance",
                0,
                64,
                StageMask::VERTEX,
            )],
        )
    }

    #[test]
    fn offsets_are_aligned() {
        let device = SoftwareDevice::new();
        let layout = layout();
        let binding = &layout.bindings()[0];
        let mut allocator = DynamicAllocator::<SoftwareDevice>::new(256, 1024);
        let offsets: Vec<u32> = (0..3)
            .map(|_| allocator.next_slot(&device, &layout, binding).offset)
            .collect();
        assert_eq!(offsets, vec![0, 256, 512]);
        assert_eq!(allocator.buffers_created(), 1);
        assert_eq!(allocator.peek_next_offset(&layout, binding), 768);
    }

    #[test]
    fn rolls_over_when_full() {
        let device = SoftwareDevice::new();
        let layout = layout();
        let binding = &layout.bindings()[0];
        let mut allocator = DynamicAllocator::<SoftwareDevice>::new(256, 2);
        let first = allocator.next_slot(&device, &layout, binding);
        let second = allocator.next_slot(&device, &layout, binding);
        let third = allocator.next_slot(&device, &layout, binding);
        assert!(Arc::ptr_eq(&first.buffer, &second.buffer));
        assert!(!Arc::ptr_eq(&second.buffer, &third.buffer));
        assert_eq!(third.offset, 0);
        assert!(first.buffer.is_exhausted());
        assert_eq!(first.buffer.used_slots(), 2);
        assert_eq!(allocator.buffers_created(), 2);
    }

    #[test]
    fn backing_is_sized_for_every_slot() {
        let device = SoftwareDevice::new();
        let layout = layout();
        let binding = &layout.bindings()[0];
        let mut allocator = DynamicAllocator::<SoftwareDevice>::new(256, 8);
        let slot = allocator.next_slot(&device, &layout, binding);
        assert_eq!(slot.buffer.aligned_slot_size(), 256);
        assert_eq!(slot.buffer.backing().byte_len(), 256 * 8);
    }

    #[test]
    fn exhausted_buffers_stay_exhausted() {
        let device = SoftwareDevice::new();
        let buffer = SharedDynamicBuffer::new(&device, 256, 2, "Instance.Instance");
        assert_eq!(buffer.claim_slot(), Some(0));
        assert_eq!(buffer.claim_slot(), Some(256));
        assert_eq!(buffer.claim_slot(), None);
        assert_eq!(buffer.claim_slot(), None);
        assert_eq!(buffer.used_slots(), 2);
    }

    #[test]
    #[should_panic(expected = "need offsets past u32::MAX")]
    fn offsets_must_fit_u32() {
        let device = SoftwareDevice::new();
        let layout = ResourceLayout::build(
            "Skin",
            2,
            vec![BindingDescriptor::dynamic_uniform_buffer(
                "Bones",
                0,
                1 << 20,
                StageMask::VERTEX,
            )],
        );
        let mut allocator = DynamicAllocator::<SoftwareDevice>::new(256, 8192);
        allocator.next_slot(&device, &layout, &layout.bindings()[0]);
    }
}
