// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Fixed-capacity pools of resource groups.

A [Pool] hands out groups for one layout until it is full, then refuses.  The [PoolManager]
turns that refusal into growth: it keeps every pool it ever made for a layout and starts a new
one whenever the newest is full.  Nothing is ever returned to a pool.
*/

use crate::bindings::dynamic::DynamicAllocator;
use crate::bindings::layout::{LayoutHash, ResourceLayout};
use crate::bindings::resource_group::ResourceGroup;
use crate::imp::{Backend, PoolSizes};
use std::collections::HashMap;
use std::sync::Arc;

/// Where a group was carved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolSlot {
    pub layout_hash: LayoutHash,
    /// Index into [PoolManager::pools] for the hash.
    pub pool_index: usize,
    /// Index of the group within its pool.
    pub group_index: u32,
}

#[derive(Debug)]
pub struct Pool<B: Backend> {
    layout_hash: LayoutHash,
    capacity: u32,
    allocated: u32,
    native: B::Pool,
}

impl<B: Backend> Pool<B> {
    pub fn new(device: &B, layout: &ResourceLayout, capacity: u32) -> Self {
        let sizes = PoolSizes::for_layout(layout, capacity);
        Pool {
            layout_hash: layout.hash_code(),
            capacity,
            allocated: 0,
            native: device.create_pool(layout, &sizes),
        }
    }

    /// Carves one group, or returns `None` when the pool is full.
    pub fn allocate(&mut self, device: &B, layout: &ResourceLayout) -> Option<(B::Group, u32)> {
        if self.allocated == self.capacity {
            return None;
        }
        let index = self.allocated;
        self.allocated += 1;
        Some((device.allocate_group(&mut self.native, layout), index))
    }

    /// Carves `count` groups at once, or none of them if they do not all fit.
    pub fn allocate_many(
        &mut self,
        device: &B,
        layout: &ResourceLayout,
        count: u32,
    ) -> Option<Vec<(B::Group, u32)>> {
        if self.remaining() < count {
            return None;
        }
        Some(
            (0..count)
                .filter_map(|_| self.allocate(device, layout))
                .collect(),
        )
    }

    pub fn layout_hash(&self) -> LayoutHash {
        self.layout_hash
    }
    pub fn capacity(&self) -> u32 {
        self.capacity
    }
    pub fn allocated(&self) -> u32 {
        self.allocated
    }
    pub fn remaining(&self) -> u32 {
        self.capacity - self.allocated
    }
    pub fn is_full(&self) -> bool {
        self.allocated == self.capacity
    }
    pub fn native(&self) -> &B::Pool {
        &self.native
    }
}

/**
Every pool, grouped by layout hash.

Layouts that hash identically share pools.
*/
#[derive(Debug)]
pub struct PoolManager<B: Backend> {
    capacity: u32,
    pools: HashMap<LayoutHash, Vec<Pool<B>>>,
}

impl<B: Backend> PoolManager<B> {
    /// `capacity` is the number of groups in each new pool.
    pub fn new(capacity: u32) -> Self {
        assert!(capacity > 0, "pool capacity must be at least 1");
        PoolManager {
            capacity,
            pools: HashMap::new(),
        }
    }

    fn grow(&mut self, device: &B, layout: &ResourceLayout, capacity: u32) -> &mut Vec<Pool<B>> {
        let hash = layout.hash_code();
        let pools = self.pools.entry(hash).or_default();
        pools.push(Pool::new(device, layout, capacity));
        logwise::info_sync!(
            "Created pool {count} for layout {layout}",
            count = pools.len(),
            layout = logwise::privacy::LogIt(&layout.name())
        );
        pools
    }

    /// Carves one native group, creating a pool when the newest is full.  Never fails.
    pub fn allocate_native(&mut self, device: &B, layout: &ResourceLayout) -> (B::Group, PoolSlot) {
        let hash = layout.hash_code();
        if let Some(pools) = self.pools.get_mut(&hash) {
            let pool_index = pools.len() - 1;
            if let Some((group, group_index)) = pools
                .last_mut()
                .and_then(|pool| pool.allocate(device, layout))
            {
                return (
                    group,
                    PoolSlot {
                        layout_hash: hash,
                        pool_index,
                        group_index,
                    },
                );
            }
        }
        let capacity = self.capacity;
        let pools = self.grow(device, layout, capacity);
        let pool_index = pools.len() - 1;
        match pools[pool_index].allocate(device, layout) {
            Some((group, group_index)) => (
                group,
                PoolSlot {
                    layout_hash: hash,
                    pool_index,
                    group_index,
                },
            ),
            None => unreachable!("a fresh pool refused its first group"),
        }
    }

    /**
    Allocates a fillable [ResourceGroup] for a layout.

    Never fails: a full pool is replaced by a new one.
    */
    pub fn allocate_set(
        &mut self,
        device: &B,
        dynamic: &mut DynamicAllocator<B>,
        layout: &Arc<ResourceLayout>,
    ) -> ResourceGroup<B> {
        let (native, slot) = self.allocate_native(device, layout);
        ResourceGroup::new(device, dynamic, layout.clone(), native, slot)
    }

    /**
    Allocates `count` groups from one pool.

    A batch that does not fit in the newest pool goes into a fresh pool, sized to hold the whole
    batch if the configured capacity is too small.
    */
    pub fn allocate_sets(
        &mut self,
        device: &B,
        dynamic: &mut DynamicAllocator<B>,
        layout: &Arc<ResourceLayout>,
        count: u32,
    ) -> Vec<ResourceGroup<B>> {
        if count == 0 {
            return Vec::new();
        }
        let hash = layout.hash_code();
        let natives = match self.pools.get_mut(&hash) {
            Some(pools) => {
                let pool_index = pools.len() - 1;
                pools
                    .last_mut()
                    .and_then(|pool| pool.allocate_many(device, layout, count))
                    .map(|groups| (pool_index, groups))
            }
            None => None,
        };
        let (pool_index, natives) = match natives {
            Some(found) => found,
            None => {
                let capacity = self.capacity.max(count);
                let pools = self.grow(device, layout, capacity);
                let pool_index = pools.len() - 1;
                let groups = pools[pool_index]
                    .allocate_many(device, layout, count)
                    .unwrap_or_default();
                (pool_index, groups)
            }
        };
        natives
            .into_iter()
            .map(|(native, group_index)| {
                let slot = PoolSlot {
                    layout_hash: hash,
                    pool_index,
                    group_index,
                };
                ResourceGroup::new(device, dynamic, layout.clone(), native, slot)
            })
            .collect()
    }

    /// Pools created for a layout hash, oldest first.
    pub fn pools(&self, hash: LayoutHash) -> &[Pool<B>] {
        self.pools.get(&hash).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn pool_count(&self, hash: LayoutHash) -> usize {
        self.pools(hash).len()
    }

    /// Groups handed out across every pool.
    pub fn total_allocated(&self) -> usize {
        self.pools
            .values()
            .flatten()
            .map(|pool| pool.allocated() as usize)
            .sum()
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::descriptor::BindingDescriptor;
    use crate::bindings::visible_to::StageMask;
    use crate::imp::software::SoftwareDevice;

    fn layout() -> ResourceLayout {
        ResourceLayout::build(
            "Light",
            1,
            vec![BindingDescriptor::uniform_buffer("Light", 0, 32, StageMask::FRAGMENT)],
        )
    }

    #[test]
    fn pool_refuses_when_full() {
        let device = SoftwareDevice::new();
        let layout = layout();
        let mut pool = Pool::<SoftwareDevice>::new(&device, &layout, 2);
        assert!(pool.allocate(&device, &layout).is_some());
        assert!(pool.allocate(&device, &layout).is_some());
        assert!(pool.allocate(&device, &layout).is_none());
        assert_eq!(pool.allocated(), 2);
        assert!(pool.is_full());
    }

    #[test]
    fn manager_grows() {
        let device = SoftwareDevice::new();
        let layout = layout();
        let mut manager = PoolManager::<SoftwareDevice>::new(4);
        let slots: Vec<PoolSlot> = (0..5)
            .map(|_| manager.allocate_native(&device, &layout).1)
            .collect();
        assert_eq!(manager.pool_count(layout.hash_code()), 2);
        assert_eq!(slots[3].pool_index, 0);
        assert_eq!(slots[3].group_index, 3);
        assert_eq!(slots[4].pool_index, 1);
        assert_eq!(slots[4].group_index, 0);
        for pool in manager.pools(layout.hash_code()) {
            assert!(pool.allocated() <= pool.capacity());
        }
        assert_eq!(manager.total_allocated(), 5);
        assert_eq!(device.stats().pools_created(), 2);
    }

    #[test]
    fn batches_do_not_split() {
        let device = SoftwareDevice::new();
        let layout = layout();
        let mut pool = Pool::<SoftwareDevice>::new(&device, &layout, 4);
        assert!(pool.allocate_many(&device, &layout, 3).is_some());
        assert!(pool.allocate_many(&device, &layout, 2).is_none());
        assert_eq!(pool.allocated(), 3);
    }
}
