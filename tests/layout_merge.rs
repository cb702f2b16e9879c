// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
use bindings_and_pools::bindings::descriptor::{BindingDescriptor, MemberRange, ValueKind};
use bindings_and_pools::bindings::layout::{ResourceLayout, merge_stage_layouts};
use bindings_and_pools::bindings::visible_to::{Stage, StageMask};

fn camera(stage: Stage) -> ResourceLayout {
    ResourceLayout::build(
        "Camera",
        0,
        vec![
            BindingDescriptor::uniform_buffer("Camera", 0, 128, stage.into())
                .with_member(MemberRange::new("view", 0, 64, ValueKind::Mat4))
                .with_member(MemberRange::new("projection", 64, 64, ValueKind::Mat4)),
        ],
    )
}

#[test]
#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
fn equal_kinds_and_name_hash_equal() {
    let a = camera(Stage::Vertex);
    let b = camera(Stage::Fragment);
    assert_eq!(a.hash_code(), b.hash_code());
    //byte sizes do not participate
    let c = ResourceLayout::build(
        "Camera",
        0,
        vec![BindingDescriptor::uniform_buffer("Camera", 0, 16, StageMask::COMPUTE)],
    );
    assert_eq!(a.hash_code(), c.hash_code());
}

#[test]
#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
fn merging_stages_keeps_one_binding() {
    let mut merged = camera(Stage::Vertex);
    merged.merge(&camera(Stage::Fragment));
    assert_eq!(merged.bindings().len(), 1);
    assert_eq!(
        merged.bindings()[0].stages(),
        StageMask::VERTEX | StageMask::FRAGMENT
    );
    assert_eq!(merged.hash_code(), camera(Stage::Vertex).hash_code());
}

#[test]
#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
fn shader_stages_merge_per_set() {
    let vertex = vec![
        camera(Stage::Vertex),
        ResourceLayout::from_reflection(
            2,
            vec![BindingDescriptor::uniform_buffer("Instance_D", 0, 64, StageMask::VERTEX)],
        )
        .expect("named set"),
    ];
    let fragment = vec![
        camera(Stage::Fragment),
        ResourceLayout::from_reflection(
            1,
            vec![
                BindingDescriptor::uniform_buffer("Surface_M", 0, 32, StageMask::FRAGMENT),
                BindingDescriptor::texture_2d("albedo", 1, 1, StageMask::FRAGMENT),
            ],
        )
        .expect("named set"),
    ];
    let merged = merge_stage_layouts([vertex, fragment]);
    let names: Vec<&str> = merged.iter().map(|l| l.name()).collect();
    assert_eq!(names, vec!["Camera", "Surface", "Instance"]);
    assert!(merged[1].is_material_set());
    assert_eq!(merged[1].binding_index("albedo"), Some(1));
    assert_eq!(merged[0].value_kind("Camera.projection"), ValueKind::Mat4);
}
