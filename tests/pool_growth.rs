// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
use bindings_and_pools::bindings::descriptor::BindingDescriptor;
use bindings_and_pools::bindings::layout::ResourceLayout;
use bindings_and_pools::bindings::visible_to::StageMask;
use bindings_and_pools::software::SoftwareDevice;
use bindings_and_pools::{BindingConfig, BindingContext};
use std::sync::Arc;

fn instance_layout() -> Arc<ResourceLayout> {
    Arc::new(ResourceLayout::build(
        "Instance",
        2,
        vec![BindingDescriptor::dynamic_uniform_buffer(
            "Instance",
            0,
            64,
            StageMask::VERTEX,
        )],
    ))
}

#[test]
#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
fn full_pools_are_replaced() {
    let mut context = BindingContext::new(
        SoftwareDevice::new(),
        BindingConfig::default().with_pool_capacity(4),
    );
    let layout = instance_layout();
    let groups: Vec<_> = (0..5).map(|_| context.allocate_group(&layout)).collect();
    let hash = layout.hash_code();
    assert_eq!(context.pools().pool_count(hash), 2);
    for pool in context.pools().pools(hash) {
        assert!(pool.allocated() <= pool.capacity());
    }
    assert_eq!(groups[4].slot().pool_index, 1);
    assert_eq!(context.device().stats().pools_created(), 2);
}

#[test]
#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
fn identical_layouts_share_pools() {
    let mut context = BindingContext::new(SoftwareDevice::new(), BindingConfig::default());
    let a = instance_layout();
    let b = instance_layout();
    context.allocate_group(&a);
    context.allocate_group(&b);
    assert_eq!(context.pools().pool_count(a.hash_code()), 1);
    assert_eq!(context.pools().total_allocated(), 2);
}

#[test]
#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
fn dynamic_offsets_are_aligned() {
    let mut context = BindingContext::new(
        SoftwareDevice::with_alignment(256),
        BindingConfig::default(),
    );
    let layout = instance_layout();
    let offsets: Vec<u32> = (0..3)
        .map(|_| context.allocate_group(&layout).dynamic_offsets()[0])
        .collect();
    assert_eq!(offsets, vec![0, 256, 512]);
}

#[test]
#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
fn dynamic_buffers_roll_over() {
    let mut context = BindingContext::new(SoftwareDevice::new(), BindingConfig::default());
    let layout = instance_layout();
    let groups: Vec<_> = (0..1025).map(|_| context.allocate_group(&layout)).collect();
    let first = groups[0]
        .storage(0)
        .and_then(|s| s.shared_buffer())
        .expect("shared");
    let last_of_first = groups[1023]
        .storage(0)
        .and_then(|s| s.shared_buffer())
        .expect("shared");
    let rolled = groups[1024]
        .storage(0)
        .and_then(|s| s.shared_buffer())
        .expect("shared");
    assert!(Arc::ptr_eq(first, last_of_first));
    assert!(!Arc::ptr_eq(first, rolled));
    assert_eq!(groups[1024].dynamic_offsets(), &[0]);
    assert_eq!(groups[1023].dynamic_offsets(), &[1023 * 256]);
    assert_eq!(context.dynamic().buffers_created(), 2);

    //the earlier slots still work
    groups[1023].write(context.device(), 0, 0, &[7; 64]);
    assert_eq!(first.backing().read(1023 * 256, 64), vec![7; 64]);
    assert_eq!(rolled.backing().read(0, 64), vec![0; 64]);
}
