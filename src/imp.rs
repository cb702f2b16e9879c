// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! The GPU seam.
//!
//! Everything above this module is CPU-side bookkeeping.  A [Backend] turns that bookkeeping
//! into native objects: buffers, pools, groups, and bind commands.

use crate::bindings::descriptor::{BindingDescriptor, BindingKind};
use crate::bindings::layout::ResourceLayout;
use std::collections::BTreeMap;
use std::fmt::Debug;

pub mod software;

#[cfg(feature = "backend_wgpu")]
pub mod wgpu;

/**
How many descriptors of each kind a native pool must hold.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSizes {
    /// Maximum number of groups carved from the pool.
    pub max_groups: u32,
    /// Descriptor count per binding kind, summed over the layout.
    pub descriptors: BTreeMap<BindingKindKey, u32>,
}

/// Orderable wrapper so [PoolSizes] iterates in a stable order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct BindingKindKey(pub i32);

impl From<BindingKind> for BindingKindKey {
    fn from(kind: BindingKind) -> Self {
        BindingKindKey(kind.code())
    }
}

impl PoolSizes {
    /// Every binding contributes `capacity * array_count` descriptors of its kind.
    pub fn for_layout(layout: &ResourceLayout, capacity: u32) -> Self {
        let mut descriptors: BTreeMap<BindingKindKey, u32> = BTreeMap::new();
        for binding in layout.bindings() {
            *descriptors
                .entry(BindingKindKey::from(binding.kind()))
                .or_insert(0) +=
                capacity.saturating_mul(binding.array_count());
        }
        PoolSizes {
            max_groups: capacity,
            descriptors,
        }
    }

    pub fn descriptors_of(&self, kind: BindingKind) -> u32 {
        self.descriptors
            .get(&BindingKindKey::from(kind))
            .copied()
            .unwrap_or(0)
    }
}

/**
A GPU device as seen by the binding subsystem.

Calls arrive from the single rendering thread; implementations need no internal locking for
the subsystem's sake.
*/
pub trait Backend: Debug {
    type Buffer: Debug;
    type Image: Clone + Debug;
    type Sampler: Clone + Debug;
    /// Native pool object, one per [crate::bindings::pool::Pool].
    type Pool: Debug;
    /// Native group object, one per [crate::bindings::resource_group::ResourceGroup].
    type Group: Debug;
    /// Whatever commands are recorded into at bind time.
    type Command<'a>;

    /// Required alignment for dynamic uniform buffer offsets.
    fn uniform_offset_alignment(&self) -> u64;

    fn create_buffer(&self, byte_len: u64, debug_name: &str) -> Self::Buffer;

    fn write_buffer(&self, buffer: &Self::Buffer, offset: u64, bytes: &[u8]);

    fn create_pool(&self, layout: &ResourceLayout, sizes: &PoolSizes) -> Self::Pool;

    /// Carves one group from a pool.  The caller guarantees the pool has room.
    fn allocate_group(&self, pool: &mut Self::Pool, layout: &ResourceLayout) -> Self::Group;

    fn write_buffer_binding(
        &self,
        group: &mut Self::Group,
        binding: &BindingDescriptor,
        buffer: &Self::Buffer,
        offset: u64,
        range: u64,
    );

    fn write_image_binding(
        &self,
        group: &mut Self::Group,
        binding: &BindingDescriptor,
        element: u32,
        image: &Self::Image,
    );

    fn write_sampler_binding(
        &self,
        group: &mut Self::Group,
        binding: &BindingDescriptor,
        element: u32,
        sampler: &Self::Sampler,
    );

    /// Records binding `group` at `set_index`, with one offset per dynamic binding in binding order.
    fn bind_group(
        &self,
        command: &mut Self::Command<'_>,
        set_index: u32,
        group: &mut Self::Group,
        dynamic_offsets: &[u32],
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::visible_to::StageMask;

    #[test]
    fn pool_sizes_scale_with_capacity() {
        let layout = ResourceLayout::build(
            "Material",
            1,
            vec![
                BindingDescriptor::uniform_buffer("Material", 0, 32, StageMask::FRAGMENT),
                BindingDescriptor::texture_2d("layers", 1, 4, StageMask::FRAGMENT),
                BindingDescriptor::texture_2d("normal", 2, 1, StageMask::FRAGMENT),
            ],
        );
        let sizes = PoolSizes::for_layout(&layout, 1024);
        assert_eq!(sizes.max_groups, 1024);
        assert_eq!(sizes.descriptors_of(BindingKind::UniformBuffer), 1024);
        assert_eq!(sizes.descriptors_of(BindingKind::SampledImage), 5 * 1024);
        assert_eq!(sizes.descriptors_of(BindingKind::Sampler), 0);
    }
}
