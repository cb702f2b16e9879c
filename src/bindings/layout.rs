// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Resource layouts: the shape of one resource group.

A [ResourceLayout] is an ordered collection of [BindingDescriptor]s, sorted by binding index.
Each shader stage reflects its own layouts; layouts sharing a set index are merged into one so
a single resource group serves every stage of the shader.

Two layouts with the same name and the same binding kinds hash identically, which is what lets
the pool manager share pools between shaders that declare the same group.
*/

use crate::Error;
use crate::bindings::descriptor::{
    BindingDescriptor, BindingKind, MemberRange, ValueKind, parse_binding_options,
};
use crate::bindings::visible_to::StageMask;
use std::collections::BTreeMap;
use std::fmt::Display;

/// The structural hash of a [ResourceLayout].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayoutHash(pub i32);

impl Display for LayoutHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// Which family of objects fills a set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LayoutRole {
    /// Filled by the owning object (camera, light, mesh instance).
    #[default]
    Plain,
    /// Filled once per material.
    Material,
    /// Filled once per shader and shared by everything drawn with it.
    Shared,
}

const HASH_BASE: i32 = 17;
const HASH_MULTIPLIER: i32 = 31;

fn compute_hash(name: &str, bindings: &[BindingDescriptor]) -> LayoutHash {
    let mut result = HASH_BASE;
    for binding in bindings {
        result = result
            .wrapping_mul(HASH_MULTIPLIER)
            .wrapping_add(binding.kind().code());
    }
    for byte in name.bytes() {
        result = result
            .wrapping_mul(HASH_MULTIPLIER)
            .wrapping_add(byte as i32);
    }
    LayoutHash(result)
}

/**
An ordered, hashable collection of bindings describing one resource group.

# Examples

```
use bindings_and_pools::bindings::descriptor::BindingDescriptor;
use bindings_and_pools::bindings::layout::ResourceLayout;
use bindings_and_pools::bindings::visible_to::StageMask;

let mut vertex = ResourceLayout::build("Camera", 0, vec![
    BindingDescriptor::uniform_buffer("Camera", 0, 64, StageMask::VERTEX),
]);
let fragment = ResourceLayout::build("Camera", 0, vec![
    BindingDescriptor::uniform_buffer("Camera", 0, 64, StageMask::FRAGMENT),
]);
vertex.merge(&fragment);
assert_eq!(vertex.bindings().len(), 1);
assert_eq!(vertex.bindings()[0].stages(), StageMask::VERTEX | StageMask::FRAGMENT);
```
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLayout {
    name: String,
    set_index: u32,
    bindings: Vec<BindingDescriptor>,
    role: LayoutRole,
    hash: LayoutHash,
}

impl ResourceLayout {
    /**
    Builds a layout from a binding list.

    Bindings are sorted by binding index.

    # Panics
    If two bindings share a binding index.
    */
    pub fn build(name: impl Into<String>, set_index: u32, bindings: Vec<BindingDescriptor>) -> Self {
        let name = name.into();
        let mut bindings = bindings;
        bindings.sort_by_key(|b| b.binding_index());
        for pair in bindings.windows(2) {
            assert!(
                pair[0].binding_index() != pair[1].binding_index(),
                "binding index {} declared twice in layout {name}",
                pair[0].binding_index()
            );
        }
        let hash = compute_hash(&name, &bindings);
        ResourceLayout {
            name,
            set_index,
            bindings,
            role: LayoutRole::Plain,
            hash,
        }
    }

    /**
    Builds a layout from reflected bindings that still carry their `_` option suffixes.

    Options are stripped from the names: `D` turns a uniform buffer into a dynamic one, `S` and
    `M` assign the shared and material roles.  The set is named after the first binding whose
    name starts with an uppercase letter.

    # Panics
    If one set asks for both the material and the shared role.
    */
    pub fn from_reflection(
        set_index: u32,
        bindings: Vec<BindingDescriptor>,
    ) -> Result<Self, Error> {
        let mut role = LayoutRole::Plain;
        let mut set_name: Option<String> = None;
        let mut stripped = Vec::with_capacity(bindings.len());
        for binding in bindings {
            let (plain, options) = {
                let (plain, options) = parse_binding_options(binding.name());
                (plain.to_string(), options)
            };
            if options.material_set {
                role = merged_role(role, LayoutRole::Material, &plain);
            }
            if options.shared_set {
                role = merged_role(role, LayoutRole::Shared, &plain);
            }
            if set_name.is_none() && plain.starts_with(|c: char| c.is_ascii_uppercase()) {
                set_name = Some(plain.clone());
            }
            let binding = if options.dynamic && binding.kind() == BindingKind::UniformBuffer {
                binding.with_kind(BindingKind::DynamicUniformBuffer)
            } else {
                binding
            };
            stripped.push(binding.with_name(plain));
        }
        let name = set_name.ok_or(Error::UnnamedSet { set_index })?;
        let mut layout = Self::build(name, set_index, stripped);
        layout.role = role;
        Ok(layout)
    }

    /// Assigns the material or shared role.
    ///
    /// # Panics
    /// If the layout already holds the other role.
    pub fn with_role(mut self, role: LayoutRole) -> Self {
        self.role = merged_role(self.role, role, &self.name);
        self
    }

    /**
    Merges the bindings of another stage's layout for the same set into this one.

    Bindings occupying the same slot (same kind, array count and binding index) keep one entry
    with the stage masks OR-ed together; others are appended.  The result is re-sorted and
    rehashed.

    # Panics
    * If `other` declares stages this layout already covers (the same layout merged twice).
    * If the two layouts hold conflicting roles.
    * If the two layouts put different bindings at the same index.
    */
    pub fn merge(&mut self, other: &ResourceLayout) {
        let incoming = other.stage_mask();
        assert!(
            !self.stage_mask().intersects(incoming),
            "layout {} already merged stages {:?}",
            self.name,
            self.stage_mask() & incoming
        );
        self.role = merged_role(self.role, other.role, &self.name);
        for binding in &other.bindings {
            if let Some(existing) = self.bindings.iter_mut().find(|b| b.same_slot(binding)) {
                existing.add_stages(binding.stages());
            } else {
                assert!(
                    !self
                        .bindings
                        .iter()
                        .any(|b| b.binding_index() == binding.binding_index()),
                    "conflicting bindings at index {} in layout {}",
                    binding.binding_index(),
                    self.name
                );
                self.bindings.push(binding.clone());
            }
        }
        self.bindings.sort_by_key(|b| b.binding_index());
        self.hash = compute_hash(&self.name, &self.bindings);
    }

    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn set_index(&self) -> u32 {
        self.set_index
    }
    pub fn bindings(&self) -> &[BindingDescriptor] {
        &self.bindings
    }
    pub fn hash_code(&self) -> LayoutHash {
        self.hash
    }
    pub fn role(&self) -> LayoutRole {
        self.role
    }
    pub fn is_material_set(&self) -> bool {
        self.role == LayoutRole::Material
    }
    pub fn is_shared_set(&self) -> bool {
        self.role == LayoutRole::Shared
    }

    /// Union of the stages of every binding.
    pub fn stage_mask(&self) -> StageMask {
        self.bindings
            .iter()
            .fold(StageMask::empty(), |mask, b| mask | b.stages())
    }

    /// The binding at a given binding index.
    pub fn binding_at(&self, binding_index: u32) -> Option<&BindingDescriptor> {
        self.bindings
            .iter()
            .find(|b| b.binding_index() == binding_index)
    }

    /**
    Finds a struct member by name.

    `name` may be the bare member name or a dotted `Binding.member` path.
    */
    pub fn find_member(&self, name: &str) -> Option<(&BindingDescriptor, &MemberRange)> {
        for binding in &self.bindings {
            if let Some(member) = binding.members().iter().find(|m| m.name() == name) {
                return Some((binding, member));
            }
        }
        let (binding_name, member_name) = name.split_once('.')?;
        let binding = self.bindings.iter().find(|b| b.name() == binding_name)?;
        let member = binding
            .members()
            .iter()
            .find(|m| m.name() == member_name)?;
        Some((binding, member))
    }

    /// Finds the binding with this name, or the binding owning the member with this name.
    pub fn try_binding(&self, name: &str) -> Result<&BindingDescriptor, Error> {
        if let Some(binding) = self.bindings.iter().find(|b| b.name() == name) {
            return Ok(binding);
        }
        self.find_member(name)
            .map(|(binding, _)| binding)
            .ok_or_else(|| self.unknown(name))
    }

    /// Like [Self::try_binding], but logs unknown names and returns `None`.
    pub fn binding(&self, name: &str) -> Option<&BindingDescriptor> {
        match self.try_binding(name) {
            Ok(b) => Some(b),
            Err(e) => {
                logwise::error_sync!("{e}", e = logwise::privacy::LogIt(&e));
                None
            }
        }
    }

    /// The binding index for a binding or member name; logs unknown names.
    pub fn binding_index(&self, name: &str) -> Option<u32> {
        self.binding(name).map(|b| b.binding_index())
    }

    /**
    The byte range of a member.

    A bare binding name resolves to the binding's first member.  Logs unknown names.
    */
    pub fn member_range(&self, name: &str) -> Option<&MemberRange> {
        if let Some((_, member)) = self.find_member(name) {
            return Some(member);
        }
        match self.bindings.iter().find(|b| b.name() == name) {
            Some(binding) => binding.members().first(),
            None => {
                logwise::error_sync!(
                    "{e}",
                    e = logwise::privacy::LogIt(&self.unknown(name))
                );
                None
            }
        }
    }

    /// The declared kind of a member or binding; [ValueKind::Unknown] when absent.
    pub fn value_kind(&self, name: &str) -> ValueKind {
        if let Some((_, member)) = self.find_member(name) {
            return member.value_kind();
        }
        if let Some(binding) = self.bindings.iter().find(|b| b.name() == name) {
            return binding.value_kind();
        }
        logwise::warn_sync!(
            "No value kind for {name} in layout {layout}",
            name = logwise::privacy::LogIt(&name),
            layout = logwise::privacy::LogIt(&self.name)
        );
        ValueKind::Unknown
    }

    fn unknown(&self, name: &str) -> Error {
        Error::UnknownBinding {
            layout: self.name.clone(),
            name: name.to_string(),
        }
    }
}

fn merged_role(current: LayoutRole, requested: LayoutRole, layout: &str) -> LayoutRole {
    match (current, requested) {
        (current, LayoutRole::Plain) => current,
        (LayoutRole::Plain, requested) => requested,
        (current, requested) if current == requested => current,
        _ => panic!("layout {layout} cannot be both a material set and a shared set"),
    }
}

/**
Merges per-stage layout lists into one layout per set index.

Returns the merged layouts ordered by set index.
*/
pub fn merge_stage_layouts<I>(stages: I) -> Vec<ResourceLayout>
where
    I: IntoIterator<Item = Vec<ResourceLayout>>,
{
    let mut by_set: BTreeMap<u32, ResourceLayout> = BTreeMap::new();
    for stage in stages {
        for layout in stage {
            match by_set.get_mut(&layout.set_index()) {
                Some(existing) => existing.merge(&layout),
                None => {
                    by_set.insert(layout.set_index(), layout);
                }
            }
        }
    }
    by_set.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera(stages: StageMask) -> ResourceLayout {
        ResourceLayout::build(
            "Camera",
            0,
            vec![
                BindingDescriptor::uniform_buffer("Camera", 0, 128, stages)
                    .with_member(MemberRange::new("view", 0, 64, ValueKind::Mat4))
                    .with_member(MemberRange::new("position", 64, 12, ValueKind::Vec3)),
            ],
        )
    }

    #[test]
    fn hash_is_deterministic() {
        let a = camera(StageMask::VERTEX);
        let b = camera(StageMask::FRAGMENT);
        assert_eq!(a.hash_code(), b.hash_code());
        let renamed = ResourceLayout::build("Light", 0, a.bindings().to_vec());
        assert_ne!(a.hash_code(), renamed.hash_code());
    }

    #[test]
    fn hash_value() {
        let layout = ResourceLayout::build(
            "A",
            0,
            vec![BindingDescriptor::uniform_buffer("A", 0, 16, StageMask::VERTEX)],
        );
        // (17 * 31 + 6) * 31 + 'A'
        assert_eq!(layout.hash_code(), LayoutHash((17 * 31 + 6) * 31 + 65));
    }

    #[test]
    fn merge_ors_stage_masks() {
        let mut a = camera(StageMask::VERTEX);
        a.merge(&camera(StageMask::FRAGMENT));
        assert_eq!(a.bindings().len(), 1);
        assert_eq!(
            a.bindings()[0].stages(),
            StageMask::VERTEX | StageMask::FRAGMENT
        );
    }

    #[test]
    fn merge_appends_and_sorts() {
        let mut a = ResourceLayout::build(
            "Material",
            1,
            vec![BindingDescriptor::texture_2d("albedo", 2, 1, StageMask::FRAGMENT)],
        );
        let b = ResourceLayout::build(
            "Material",
            1,
            vec![BindingDescriptor::uniform_buffer("Material", 0, 16, StageMask::VERTEX)],
        );
        let before = a.hash_code();
        a.merge(&b);
        assert_eq!(a.bindings().len(), 2);
        assert_eq!(a.bindings()[0].binding_index(), 0);
        assert_eq!(a.bindings()[1].binding_index(), 2);
        assert_ne!(before, a.hash_code());
    }

    #[test]
    #[should_panic(expected = "already merged")]
    fn double_merge_panics() {
        let mut a = camera(StageMask::VERTEX);
        let b = camera(StageMask::FRAGMENT);
        a.merge(&b);
        a.merge(&b);
    }

    #[test]
    #[should_panic(expected = "both a material set and a shared set")]
    fn conflicting_roles_panic() {
        let mut a = camera(StageMask::VERTEX).with_role(LayoutRole::Material);
        let b = camera(StageMask::FRAGMENT).with_role(LayoutRole::Shared);
        a.merge(&b);
    }

    #[test]
    fn lookups() {
        let layout = camera(StageMask::VERTEX);
        assert_eq!(layout.binding_index("view"), Some(0));
        assert_eq!(layout.binding_index("Camera.position"), Some(0));
        assert_eq!(layout.member_range("position").map(|m| m.offset()), Some(64));
        assert_eq!(layout.member_range("Camera").map(|m| m.name()), Some("view"));
        assert_eq!(layout.value_kind("position"), ValueKind::Vec3);
        assert_eq!(layout.value_kind("nothing"), ValueKind::Unknown);
        assert!(layout.binding("nothing").is_none());
        assert!(matches!(
            layout.try_binding("nothing"),
            Err(Error::UnknownBinding { .. })
        ));
    }

    #[test]
    fn reflection_options() {
        let layout = ResourceLayout::from_reflection(
            2,
            vec![
                BindingDescriptor::texture_2d("albedo", 1, 1, StageMask::FRAGMENT),
                BindingDescriptor::uniform_buffer("Surface_MD", 0, 32, StageMask::FRAGMENT),
            ],
        )
        .expect("named set");
        assert_eq!(layout.name(), "Surface");
        assert!(layout.is_material_set());
        assert_eq!(layout.bindings()[0].name(), "Surface");
        assert_eq!(
            layout.bindings()[0].kind(),
            BindingKind::DynamicUniformBuffer
        );
    }

    #[test]
    fn reflection_requires_set_name() {
        let result = ResourceLayout::from_reflection(
            3,
            vec![BindingDescriptor::texture_2d("albedo", 0, 1, StageMask::FRAGMENT)],
        );
        assert_eq!(result, Err(Error::UnnamedSet { set_index: 3 }));
    }

    #[test]
    fn stage_layouts_merge_by_set() {
        let vertex = vec![camera(StageMask::VERTEX)];
        let fragment = vec![
            camera(StageMask::FRAGMENT),
            ResourceLayout::build(
                "Material",
                1,
                vec![BindingDescriptor::texture_2d("albedo", 0, 1, StageMask::FRAGMENT)],
            ),
        ];
        let merged = merge_stage_layouts([vertex, fragment]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].set_index(), 0);
        assert_eq!(
            merged[0].stage_mask(),
            StageMask::VERTEX | StageMask::FRAGMENT
        );
        assert_eq!(merged[1].name(), "Material");
    }
}
