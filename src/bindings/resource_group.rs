// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Resource groups: one fillable instance of a layout.

A [ResourceGroup] owns storage for every buffer binding of its layout.  Plain uniform buffers
get an exclusive buffer; dynamic ones get a slot inside a [SharedDynamicBuffer], whose offset is
passed along when the group is bound.  Image and sampler bindings are written as they are set.
*/

use crate::bindings::descriptor::{BindingDescriptor, BindingKind};
use crate::bindings::dynamic::{DynamicAllocator, DynamicSlot, SharedDynamicBuffer};
use crate::bindings::layout::ResourceLayout;
use crate::bindings::pipeline_layout::PipelineLayoutDescription;
use crate::bindings::pool::PoolSlot;
use crate::bittricks::align_up;
use crate::imp::Backend;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Backing storage for one buffer binding.
#[derive(Debug)]
pub enum BufferStorage<B: Backend> {
    /// A buffer used by this group alone.
    Exclusive { buffer: B::Buffer, range: u64 },
    /// A slot inside a shared dynamic buffer.
    Shared { slot: DynamicSlot<B>, range: u64 },
}

impl<B: Backend> BufferStorage<B> {
    pub fn range(&self) -> u64 {
        match self {
            BufferStorage::Exclusive { range, .. } | BufferStorage::Shared { range, .. } => *range,
        }
    }

    /// The buffer and the byte offset at which this binding's data starts.
    pub fn buffer_and_offset(&self) -> (&B::Buffer, u64) {
        match self {
            BufferStorage::Exclusive { buffer, .. } => (buffer, 0),
            BufferStorage::Shared { slot, .. } => (slot.buffer.backing(), slot.offset as u64),
        }
    }

    pub fn shared_buffer(&self) -> Option<&Arc<SharedDynamicBuffer<B>>> {
        match self {
            BufferStorage::Exclusive { .. } => None,
            BufferStorage::Shared { slot, .. } => Some(&slot.buffer),
        }
    }
}

#[derive(Debug)]
pub struct ResourceGroup<B: Backend> {
    layout: Arc<ResourceLayout>,
    native: B::Group,
    slot: PoolSlot,
    storages: BTreeMap<u32, BufferStorage<B>>,
    images: BTreeMap<(u32, u32), B::Image>,
    samplers: BTreeMap<(u32, u32), B::Sampler>,
    dynamic_offsets: Vec<u32>,
}

impl<B: Backend> ResourceGroup<B> {
    /**
    Wraps a native group and creates storage for every buffer binding.

    Usually called through [crate::bindings::pool::PoolManager::allocate_set].
    */
    pub fn new(
        device: &B,
        dynamic: &mut DynamicAllocator<B>,
        layout: Arc<ResourceLayout>,
        native: B::Group,
        slot: PoolSlot,
    ) -> Self {
        let mut group = ResourceGroup {
            layout,
            native,
            slot,
            storages: BTreeMap::new(),
            images: BTreeMap::new(),
            samplers: BTreeMap::new(),
            dynamic_offsets: Vec::new(),
        };
        let layout = group.layout.clone();
        for binding in layout.bindings() {
            let range = binding.byte_size() as u64;
            let storage = match binding.kind() {
                BindingKind::UniformBuffer => {
                    let size = align_up(range, dynamic.alignment());
                    let name = format!("{}.{}", layout.name(), binding.name());
                    BufferStorage::Exclusive {
                        buffer: device.create_buffer(size, &name),
                        range,
                    }
                }
                BindingKind::DynamicUniformBuffer => {
                    let slot = dynamic.next_slot(device, &layout, binding);
                    group.dynamic_offsets.push(slot.offset);
                    BufferStorage::Shared { slot, range }
                }
                BindingKind::SampledImage | BindingKind::Sampler => continue,
            };
            // dynamic bindings start at 0; their slot offset is supplied at bind time
            let buffer = match &storage {
                BufferStorage::Exclusive { buffer, .. } => buffer,
                BufferStorage::Shared { slot, .. } => slot.buffer.backing(),
            };
            device.write_buffer_binding(&mut group.native, binding, buffer, 0, range);
            group.storages.insert(binding.binding_index(), storage);
        }
        group
    }

    pub fn layout(&self) -> &Arc<ResourceLayout> {
        &self.layout
    }
    pub fn slot(&self) -> PoolSlot {
        self.slot
    }
    pub fn native(&self) -> &B::Group {
        &self.native
    }
    /// One offset per dynamic binding, in binding order.
    pub fn dynamic_offsets(&self) -> &[u32] {
        &self.dynamic_offsets
    }
    pub fn storage(&self, binding_index: u32) -> Option<&BufferStorage<B>> {
        self.storages.get(&binding_index)
    }
    pub fn image(&self, binding_index: u32, element: u32) -> Option<&B::Image> {
        self.images.get(&(binding_index, element))
    }
    pub fn sampler(&self, binding_index: u32, element: u32) -> Option<&B::Sampler> {
        self.samplers.get(&(binding_index, element))
    }

    /**
    Copies bytes into a buffer binding, `offset` bytes from the start of the binding.

    Unknown binding indices are logged and ignored.

    # Panics
    If the write runs past the end of the binding.
    */
    pub fn write(&self, device: &B, binding_index: u32, offset: u64, bytes: &[u8]) {
        let Some(storage) = self.storages.get(&binding_index) else {
            logwise::error_sync!(
                "Layout {layout} has no buffer at binding {binding}",
                layout = logwise::privacy::LogIt(&self.layout.name()),
                binding = binding_index
            );
            return;
        };
        let end = offset + bytes.len() as u64;
        assert!(
            end <= storage.range(),
            "write of {} bytes at {offset} overflows binding {binding_index} of {} ({} bytes)",
            bytes.len(),
            self.layout.name(),
            storage.range()
        );
        let (buffer, base) = storage.buffer_and_offset();
        device.write_buffer(buffer, base + offset, bytes);
    }

    fn checked_binding(
        layout: &ResourceLayout,
        binding_index: u32,
        element: u32,
    ) -> Option<&BindingDescriptor> {
        let Some(binding) = layout.binding_at(binding_index) else {
            logwise::error_sync!(
                "Layout {layout} has no binding {binding}",
                layout = logwise::privacy::LogIt(&layout.name()),
                binding = binding_index
            );
            return None;
        };
        assert!(
            element < binding.array_count(),
            "element {element} out of range for {} ({} elements)",
            binding.name(),
            binding.array_count()
        );
        Some(binding)
    }

    /// Points an image binding (or one element of an image array) at `image`.
    pub fn set_image(&mut self, device: &B, binding_index: u32, element: u32, image: &B::Image) {
        let layout = self.layout.clone();
        let Some(binding) = Self::checked_binding(&layout, binding_index, element) else {
            return;
        };
        device.write_image_binding(&mut self.native, binding, element, image);
        self.images.insert((binding_index, element), image.clone());
    }

    pub fn set_sampler(
        &mut self,
        device: &B,
        binding_index: u32,
        element: u32,
        sampler: &B::Sampler,
    ) {
        let layout = self.layout.clone();
        let Some(binding) = Self::checked_binding(&layout, binding_index, element) else {
            return;
        };
        device.write_sampler_binding(&mut self.native, binding, element, sampler);
        self.samplers.insert((binding_index, element), sampler.clone());
    }

    /**
    Records a bind of this group at whatever set index `pipeline` gives its layout.

    # Panics
    If the layout is not part of `pipeline`.
    */
    pub fn bind(
        &mut self,
        device: &B,
        command: &mut B::Command<'_>,
        pipeline: &PipelineLayoutDescription,
    ) {
        let set_index = match pipeline.try_set_index(&self.layout) {
            Ok(index) => index,
            Err(e) => panic!("{e}"),
        };
        device.bind_group(command, set_index, &mut self.native, &self.dynamic_offsets);
    }

    /**
    Binds groups to consecutive set indices, starting at the index of the first group's layout.

    Each group contributes its own dynamic offsets.

    # Panics
    If the first group's layout is not part of `pipeline`.
    */
    pub fn bind_consecutive(
        device: &B,
        command: &mut B::Command<'_>,
        pipeline: &PipelineLayoutDescription,
        groups: &mut [&mut ResourceGroup<B>],
    ) {
        let Some(first) = groups.first() else {
            return;
        };
        let first_index = match pipeline.try_set_index(&first.layout) {
            Ok(index) => index,
            Err(e) => panic!("{e}"),
        };
        for (i, group) in groups.iter_mut().enumerate() {
            device.bind_group(
                command,
                first_index + i as u32,
                &mut group.native,
                &group.dynamic_offsets,
            );
        }
    }
}
