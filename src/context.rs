// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
use crate::bindings::dynamic::DynamicAllocator;
use crate::bindings::layout::{ResourceLayout, merge_stage_layouts};
use crate::bindings::pool::PoolManager;
use crate::bindings::registry::LayoutRegistry;
use crate::bindings::resource_group::ResourceGroup;
use crate::bindings::value_store::ValueStore;
use crate::config::BindingConfig;
use crate::imp::Backend;
use std::sync::Arc;

/**
Everything the binding subsystem shares across objects: the device, the pools, the dynamic
buffer allocator and the layout registry.

There is one context per renderer.  Independent contexts share nothing, which is what tests want.

```
use bindings_and_pools::{BindingConfig, BindingContext};
use bindings_and_pools::software::SoftwareDevice;

let context = BindingContext::new(SoftwareDevice::with_alignment(64), BindingConfig::default());
assert_eq!(context.dynamic().alignment(), 64);
```
*/
#[derive(Debug)]
pub struct BindingContext<B: Backend> {
    device: B,
    config: BindingConfig,
    pools: PoolManager<B>,
    dynamic: DynamicAllocator<B>,
    registry: LayoutRegistry,
}

impl<B: Backend> BindingContext<B> {
    pub fn new(device: B, config: BindingConfig) -> Self {
        let alignment = config
            .uniform_offset_alignment()
            .unwrap_or_else(|| device.uniform_offset_alignment());
        logwise::info_sync!(
            "Binding context with {frames} frames in flight, alignment {alignment}",
            frames = config.frames_in_flight(),
            alignment = alignment
        );
        BindingContext {
            pools: PoolManager::new(config.pool_capacity()),
            dynamic: DynamicAllocator::new(alignment, config.dynamic_slots_per_buffer()),
            registry: LayoutRegistry::new(),
            device,
            config,
        }
    }

    /// Allocates one group for a layout.  Never fails.
    pub fn allocate_group(&mut self, layout: &Arc<ResourceLayout>) -> ResourceGroup<B> {
        self.pools
            .allocate_set(&self.device, &mut self.dynamic, layout)
    }

    /// Allocates `count` groups for a layout from one pool.
    pub fn allocate_groups(
        &mut self,
        layout: &Arc<ResourceLayout>,
        count: u32,
    ) -> Vec<ResourceGroup<B>> {
        self.pools
            .allocate_sets(&self.device, &mut self.dynamic, layout, count)
    }

    /**
    Merges a shader's per-stage layouts by set index and registers the results as
    `"<shader>#<set name>"`.
    */
    pub fn register_shader<I>(&mut self, shader: &str, stages: I) -> Vec<Arc<ResourceLayout>>
    where
        I: IntoIterator<Item = Vec<ResourceLayout>>,
    {
        let merged = merge_stage_layouts(stages);
        self.registry.register_shader(shader, merged)
    }

    pub fn value_store(&mut self, layout: Arc<ResourceLayout>) -> ValueStore<B> {
        ValueStore::new(self, layout)
    }

    /// A value store for a registered `"<shader>#<set name>"`; logs unknown names.
    pub fn value_store_named(&mut self, full_name: &str) -> Option<ValueStore<B>> {
        let layout = self.registry.get(full_name)?;
        Some(ValueStore::new(self, layout))
    }

    pub fn device(&self) -> &B {
        &self.device
    }
    pub fn config(&self) -> &BindingConfig {
        &self.config
    }
    pub fn pools(&self) -> &PoolManager<B> {
        &self.pools
    }
    pub fn dynamic(&self) -> &DynamicAllocator<B> {
        &self.dynamic
    }
    pub fn registry(&self) -> &LayoutRegistry {
        &self.registry
    }
    pub fn registry_mut(&mut self) -> &mut LayoutRegistry {
        &mut self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::descriptor::{BindingDescriptor, MemberRange, ValueKind};
    use crate::bindings::visible_to::StageMask;
    use crate::imp::software::SoftwareDevice;

    #[test]
    fn alignment_override() {
        let context = BindingContext::new(
            SoftwareDevice::with_alignment(64),
            BindingConfig::default().with_uniform_offset_alignment(512),
        );
        assert_eq!(context.dynamic().alignment(), 512);
    }

    #[test]
    fn named_stores() {
        let mut context = BindingContext::new(SoftwareDevice::new(), BindingConfig::default());
        let vertex = vec![ResourceLayout::build(
            "Camera",
            0,
            vec![
                BindingDescriptor::uniform_buffer("Camera", 0, 64, StageMask::VERTEX)
                    .with_member(MemberRange::new("view", 0, 64, ValueKind::Mat4)),
            ],
        )];
        let fragment = vec![ResourceLayout::build(
            "Camera",
            0,
            vec![
                BindingDescriptor::uniform_buffer("Camera", 0, 64, StageMask::FRAGMENT)
                    .with_member(MemberRange::new("view", 0, 64, ValueKind::Mat4)),
            ],
        )];
        let layouts = context.register_shader("Standard", [vertex, fragment]);
        assert_eq!(layouts.len(), 1);
        let store = context.value_store_named("Standard#Camera").expect("registered");
        assert_eq!(
            store.layout().stage_mask(),
            StageMask::VERTEX | StageMask::FRAGMENT
        );
        assert!(context.value_store_named("Standard#Light").is_none());
        //one group per frame slot, all from one pool
        assert_eq!(context.pools().total_allocated(), 3);
        assert_eq!(context.pools().pool_count(layouts[0].hash_code()), 1);
    }
}
