// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Descriptions of individual shader inputs.

A [BindingDescriptor] is produced once per declared shader input by whatever reflects the
compiled shader, and never changes afterwards.  Buffer bindings that hold a struct carry a list
of [MemberRange]s so callers can address individual fields by name.
*/

use crate::bindings::visible_to::StageMask;
use std::fmt::Display;

/// What sort of GPU resource a binding slot holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingKind {
    /// A standalone sampler object.
    Sampler,
    /// An image sampled in the shader.
    SampledImage,
    /// A uniform buffer owned exclusively by one resource group.
    UniformBuffer,
    /// A uniform buffer slot inside a shared buffer, addressed by an offset at bind time.
    DynamicUniformBuffer,
}

impl BindingKind {
    /// A stable numeric code for the kind.
    ///
    /// The values follow the Vulkan descriptor-type numbering and feed into layout hashes,
    /// so they must never change.
    pub const fn code(self) -> i32 {
        match self {
            BindingKind::Sampler => 0,
            BindingKind::SampledImage => 1,
            BindingKind::UniformBuffer => 6,
            BindingKind::DynamicUniformBuffer => 8,
        }
    }

    /// True for both exclusive and dynamic uniform buffers.
    pub const fn is_buffer(self) -> bool {
        matches!(
            self,
            BindingKind::UniformBuffer | BindingKind::DynamicUniformBuffer
        )
    }
}

/**
The declared type of a binding, or of a member inside a struct binding.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Bool,
    Int,
    Float,
    Double,
    Vec2,
    Vec3,
    Vec4,
    Mat4,
    Color,
    Texture2D,
    Texture3D,
    TextureCube,
    Sampler,
    Struct,
    Unknown,
}

impl ValueKind {
    /// Size in bytes of one value of this kind inside a uniform buffer, if it has a fixed size.
    pub const fn byte_size(self) -> Option<u32> {
        match self {
            ValueKind::Bool | ValueKind::Int | ValueKind::Float => Some(4),
            ValueKind::Double | ValueKind::Vec2 => Some(8),
            ValueKind::Vec3 => Some(12),
            ValueKind::Vec4 | ValueKind::Color => Some(16),
            ValueKind::Mat4 => Some(64),
            _ => None,
        }
    }

    pub const fn is_texture(self) -> bool {
        matches!(
            self,
            ValueKind::Texture2D | ValueKind::Texture3D | ValueKind::TextureCube
        )
    }
}

impl Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// One field inside a struct-typed buffer binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRange {
    name: String,
    offset: u32,
    range: u32,
    value_kind: ValueKind,
}

impl MemberRange {
    pub fn new(name: impl Into<String>, offset: u32, range: u32, value_kind: ValueKind) -> Self {
        MemberRange {
            name: name.into(),
            offset,
            range,
            value_kind,
        }
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    /// Byte offset of the member from the start of the binding.
    pub fn offset(&self) -> u32 {
        self.offset
    }
    /// Byte length of the member.
    pub fn range(&self) -> u32 {
        self.range
    }
    pub fn value_kind(&self) -> ValueKind {
        self.value_kind
    }
}

/**
An immutable description of one named shader input.

# Examples

```
use bindings_and_pools::bindings::descriptor::{BindingDescriptor, BindingKind, MemberRange, ValueKind};
use bindings_and_pools::bindings::visible_to::StageMask;

let camera = BindingDescriptor::uniform_buffer("Camera", 0, 128, StageMask::VERTEX)
    .with_member(MemberRange::new("view", 0, 64, ValueKind::Mat4))
    .with_member(MemberRange::new("projection", 64, 64, ValueKind::Mat4));
assert_eq!(camera.kind(), BindingKind::UniformBuffer);
assert_eq!(camera.members().len(), 2);
```
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingDescriptor {
    name: String,
    kind: BindingKind,
    array_count: u32,
    byte_size: u32,
    stages: StageMask,
    binding_index: u32,
    members: Vec<MemberRange>,
    value_kind: ValueKind,
}

impl BindingDescriptor {
    /**
    Creates a new descriptor.

    `array_count` of 0 is treated as 1.
    */
    pub fn new(
        name: impl Into<String>,
        kind: BindingKind,
        binding_index: u32,
        array_count: u32,
        byte_size: u32,
        stages: StageMask,
        value_kind: ValueKind,
    ) -> Self {
        BindingDescriptor {
            name: name.into(),
            kind,
            array_count: array_count.max(1),
            byte_size,
            stages,
            binding_index,
            members: Vec::new(),
            value_kind,
        }
    }

    /// A struct-typed uniform buffer; add fields with [Self::with_member].
    pub fn uniform_buffer(
        name: impl Into<String>,
        binding_index: u32,
        byte_size: u32,
        stages: StageMask,
    ) -> Self {
        Self::new(
            name,
            BindingKind::UniformBuffer,
            binding_index,
            1,
            byte_size,
            stages,
            ValueKind::Struct,
        )
    }

    /// A struct-typed dynamic uniform buffer.
    pub fn dynamic_uniform_buffer(
        name: impl Into<String>,
        binding_index: u32,
        byte_size: u32,
        stages: StageMask,
    ) -> Self {
        Self::new(
            name,
            BindingKind::DynamicUniformBuffer,
            binding_index,
            1,
            byte_size,
            stages,
            ValueKind::Struct,
        )
    }

    /// A sampled 2D texture (or an array of them).
    pub fn texture_2d(
        name: impl Into<String>,
        binding_index: u32,
        array_count: u32,
        stages: StageMask,
    ) -> Self {
        Self::new(
            name,
            BindingKind::SampledImage,
            binding_index,
            array_count,
            0,
            stages,
            ValueKind::Texture2D,
        )
    }

    pub fn sampler(name: impl Into<String>, binding_index: u32, stages: StageMask) -> Self {
        Self::new(
            name,
            BindingKind::Sampler,
            binding_index,
            1,
            0,
            stages,
            ValueKind::Sampler,
        )
    }

    pub fn with_member(mut self, member: MemberRange) -> Self {
        self.members.push(member);
        self
    }

    pub fn with_kind(mut self, kind: BindingKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn kind(&self) -> BindingKind {
        self.kind
    }
    pub fn array_count(&self) -> u32 {
        self.array_count
    }
    pub fn byte_size(&self) -> u32 {
        self.byte_size
    }
    pub fn stages(&self) -> StageMask {
        self.stages
    }
    pub fn binding_index(&self) -> u32 {
        self.binding_index
    }
    pub fn members(&self) -> &[MemberRange] {
        &self.members
    }
    pub fn value_kind(&self) -> ValueKind {
        self.value_kind
    }

    pub(crate) fn add_stages(&mut self, stages: StageMask) {
        self.stages |= stages;
    }

    /// Bindings that describe the same slot, ignoring stage visibility.
    pub(crate) fn same_slot(&self, other: &BindingDescriptor) -> bool {
        self.kind == other.kind
            && self.array_count == other.array_count
            && self.binding_index == other.binding_index
    }
}

/// Options encoded in a binding name after the first `_`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BindingOptions {
    /// `D`: the buffer is sub-allocated from a shared dynamic buffer.
    pub dynamic: bool,
    /// `S`: the set is shared by every user of the shader.
    pub shared_set: bool,
    /// `M`: the set holds per-material values.
    pub material_set: bool,
}

/**
Splits a reflected binding name into its plain name and option letters.

Names without `_` have no options.  Unrecognized letters are ignored with a warning.

```
use bindings_and_pools::bindings::descriptor::parse_binding_options;
let (name, options) = parse_binding_options("Transform_D");
assert_eq!(name, "Transform");
assert!(options.dynamic);
```
*/
pub fn parse_binding_options(name: &str) -> (&str, BindingOptions) {
    let mut options = BindingOptions::default();
    let Some((plain, flags)) = name.split_once('_') else {
        return (name, options);
    };
    for flag in flags.chars() {
        match flag {
            'D' => options.dynamic = true,
            'S' => options.shared_set = true,
            'M' => options.material_set = true,
            other => {
                logwise::warn_sync!(
                    "Ignoring unknown binding option {flag} in {name}",
                    flag = logwise::privacy::LogIt(&other),
                    name = logwise::privacy::LogIt(&name)
                );
            }
        }
    }
    (plain, options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_are_parsed() {
        assert_eq!(
            parse_binding_options("Globals"),
            ("Globals", BindingOptions::default())
        );
        let (name, options) = parse_binding_options("Material_MD");
        assert_eq!(name, "Material");
        assert!(options.material_set);
        assert!(options.dynamic);
        assert!(!options.shared_set);
    }

    #[test]
    fn zero_array_count_is_one() {
        let b = BindingDescriptor::texture_2d("albedo", 1, 0, StageMask::FRAGMENT);
        assert_eq!(b.array_count(), 1);
    }

    #[test]
    fn slot_identity_ignores_stages() {
        let a = BindingDescriptor::uniform_buffer("Camera", 0, 64, StageMask::VERTEX);
        let b = BindingDescriptor::uniform_buffer("Camera", 0, 64, StageMask::FRAGMENT);
        assert!(a.same_slot(&b));
        let c = b.with_kind(BindingKind::DynamicUniformBuffer);
        assert!(!a.same_slot(&c));
    }

    #[test]
    fn kind_codes() {
        assert_eq!(BindingKind::Sampler.code(), 0);
        assert_eq!(BindingKind::SampledImage.code(), 1);
        assert_eq!(BindingKind::UniformBuffer.code(), 6);
        assert_eq!(BindingKind::DynamicUniformBuffer.code(), 8);
        assert!(BindingKind::DynamicUniformBuffer.is_buffer());
        assert!(!BindingKind::Sampler.is_buffer());
    }
}
