// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Named, typed values backed by per-frame resource groups.

A [ValueStore] is what cameras, lights and materials hold.  It owns one [ResourceGroup] per frame
slot and a CPU-side copy of every value in the layout.  Setting a value only touches the CPU
copy; [ValueStore::flush] copies pending changes into the group of the frame being recorded, and
keeps doing so for each distinct frame slot until every slot has the latest data.

Reads are always served from the CPU copy.

Textures and samplers have no CPU copy to keep coherent, so setting one writes it into every
frame slot's group right away.

# Examples

```
use std::sync::Arc;
use bindings_and_pools::{BindingConfig, BindingContext};
use bindings_and_pools::bindings::descriptor::{BindingDescriptor, MemberRange, ValueKind};
use bindings_and_pools::bindings::layout::ResourceLayout;
use bindings_and_pools::bindings::visible_to::StageMask;
use bindings_and_pools::software::SoftwareDevice;

let mut context = BindingContext::new(SoftwareDevice::new(), BindingConfig::default());
let layout = Arc::new(ResourceLayout::build("Light", 1, vec![
    BindingDescriptor::uniform_buffer("Light", 0, 16, StageMask::FRAGMENT)
        .with_member(MemberRange::new("intensity", 0, 4, ValueKind::Float)),
]));
let mut light = context.value_store(layout);
light.set_float("intensity", 5.0);
assert_eq!(light.get_float("intensity"), 5.0);
```
*/

use crate::Error;
use crate::bindings::descriptor::{BindingKind, ValueKind};
use crate::bindings::dirty_tracking::DirtyBindings;
use crate::bindings::layout::ResourceLayout;
use crate::bindings::pipeline_layout::PipelineLayoutDescription;
use crate::bindings::resource_group::ResourceGroup;
use crate::bindings::value::{Color, Mat4, Value, Vec2, Vec3, Vec4};
use crate::context::BindingContext;
use crate::imp::Backend;
use crate::multibuffer::FlushCounter;
use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::Arc;

#[derive(Debug, Clone)]
struct ValueSlot {
    binding_index: u32,
    offset: u32,
    range: u32,
    declared: ValueKind,
    value: Value,
}

#[derive(Debug)]
struct ImageSlot<T> {
    binding_index: u32,
    declared: ValueKind,
    elements: Vec<Option<T>>,
}

#[derive(Debug)]
pub struct ValueStore<B: Backend> {
    layout: Arc<ResourceLayout>,
    groups: Vec<ResourceGroup<B>>,
    /// Keyed by `Binding.member`, or by the binding name for a binding without members.
    values: BTreeMap<String, ValueSlot>,
    /// Bare member names to every `values` key they could mean.
    members: BTreeMap<String, Vec<String>>,
    textures: BTreeMap<String, ImageSlot<B::Image>>,
    samplers: BTreeMap<String, ImageSlot<B::Sampler>>,
    staging: BTreeMap<u32, Vec<u8>>,
    dirty: DirtyBindings,
    flush: FlushCounter,
}

impl<B: Backend> ValueStore<B> {
    /**
    Allocates one group per frame slot and fills the CPU copy with defaults.

    Defaults are zero for scalars and vectors and identity for matrices.  They are uploaded by
    the first flush of each frame slot.
    */
    pub fn new(context: &mut BindingContext<B>, layout: Arc<ResourceLayout>) -> Self {
        let frames = context.config().frames_in_flight();
        let groups = context.allocate_groups(&layout, frames as u32);
        let mut store = ValueStore {
            layout: layout.clone(),
            groups,
            values: BTreeMap::new(),
            members: BTreeMap::new(),
            textures: BTreeMap::new(),
            samplers: BTreeMap::new(),
            staging: BTreeMap::new(),
            dirty: DirtyBindings::default(),
            flush: FlushCounter::new(frames),
        };
        for binding in layout.bindings() {
            let binding_index = binding.binding_index();
            match binding.kind() {
                BindingKind::UniformBuffer | BindingKind::DynamicUniformBuffer => {
                    store
                        .staging
                        .insert(binding_index, vec![0; binding.byte_size() as usize]);
                    store.dirty.mark(binding_index);
                    if binding.members().is_empty() {
                        store.declare(
                            binding.name().to_string(),
                            binding_index,
                            0,
                            binding.byte_size(),
                            binding.value_kind(),
                        );
                    }
                    for member in binding.members() {
                        let key = format!("{}.{}", binding.name(), member.name());
                        store
                            .members
                            .entry(member.name().to_string())
                            .or_default()
                            .push(key.clone());
                        store.declare(
                            key,
                            binding_index,
                            member.offset(),
                            member.range(),
                            member.value_kind(),
                        );
                    }
                }
                BindingKind::SampledImage => {
                    store.textures.insert(
                        binding.name().to_string(),
                        ImageSlot {
                            binding_index,
                            declared: binding.value_kind(),
                            elements: vec![None; binding.array_count() as usize],
                        },
                    );
                }
                BindingKind::Sampler => {
                    store.samplers.insert(
                        binding.name().to_string(),
                        ImageSlot {
                            binding_index,
                            declared: ValueKind::Sampler,
                            elements: vec![None; binding.array_count() as usize],
                        },
                    );
                }
            }
        }
        store
    }

    fn declare(&mut self, name: String, binding_index: u32, offset: u32, range: u32, kind: ValueKind) {
        let Some(value) = Value::default_for(kind) else {
            logwise::warn_sync!(
                "{name} has unsupported kind {kind}; it will not be settable",
                name = logwise::privacy::LogIt(&name),
                kind = logwise::privacy::LogIt(&kind)
            );
            return;
        };
        let slot = ValueSlot {
            binding_index,
            offset,
            range,
            declared: kind,
            value,
        };
        self.stage(&slot);
        self.values.insert(name, slot);
    }

    /// Copies a slot's value into the CPU staging bytes of its binding.
    fn stage(&mut self, slot: &ValueSlot) {
        let Some(staging) = self.staging.get_mut(&slot.binding_index) else {
            return;
        };
        let bytes = slot.value.to_bytes();
        let len = bytes.len().min(slot.range as usize);
        let start = slot.offset as usize;
        assert!(
            start + len <= staging.len(),
            "member at {start} overflows binding {} of {}",
            slot.binding_index,
            self.layout.name()
        );
        staging[start..start + len].copy_from_slice(&bytes[..len]);
    }

    /// The key in `values` for a qualified `Binding.member` name, or a bare member name that only
    /// one binding declares.
    fn key_for(&self, name: &str, requested: ValueKind) -> Result<&str, Error> {
        if let Some((key, _)) = self.values.get_key_value(name) {
            return Ok(key.as_str());
        }
        match self.members.get(name).map(Vec::as_slice) {
            Some([key]) => return Ok(key.as_str()),
            Some([_, _, ..]) => {
                return Err(Error::AmbiguousName {
                    layout: self.layout.name().to_string(),
                    name: name.to_string(),
                });
            }
            _ => {}
        }
        let image = self
            .textures
            .get(name)
            .map(|slot| slot.declared)
            .or_else(|| self.samplers.get(name).map(|slot| slot.declared));
        match image {
            Some(declared) => Err(Error::KindMismatch {
                name: name.to_string(),
                declared,
                requested,
            }),
            None => Err(self.unknown(name)),
        }
    }

    /// Logs a lookup failure; a kind mismatch is a programming error and panics instead.
    fn report(e: Error) {
        if matches!(e, Error::KindMismatch { .. }) {
            panic!("{e}");
        }
        logwise::error_sync!("{e}", e = logwise::privacy::LogIt(&e));
    }

    fn unknown(&self, name: &str) -> Error {
        Error::UnknownBinding {
            layout: self.layout.name().to_string(),
            name: name.to_string(),
        }
    }

    /**
    Sets a value by name.

    `name` is either `Binding.member` or a member name declared by only one binding.  Unknown
    and ambiguous names are logged and ignored.

    # Panics
    If the value's kind differs from the declared kind, or `name` is a texture or sampler.
    */
    pub fn set(&mut self, name: &str, value: Value) {
        let key = match self.key_for(name, value.kind()) {
            Ok(key) => key.to_string(),
            Err(e) => {
                Self::report(e);
                return;
            }
        };
        let Some(slot) = self.values.get_mut(&key) else {
            return;
        };
        if slot.value.kind() != value.kind() {
            panic!(
                "{}",
                Error::KindMismatch {
                    name: name.to_string(),
                    declared: slot.declared,
                    requested: value.kind(),
                }
            );
        }
        slot.value = value;
        let slot = slot.clone();
        self.stage(&slot);
        self.dirty.mark(slot.binding_index);
        self.flush.reset();
    }

    /// Reads a value by name from the CPU copy.
    pub fn try_get(&self, name: &str) -> Result<Value, Error> {
        self.try_get_as(name, ValueKind::Unknown)
    }

    fn try_get_as(&self, name: &str, requested: ValueKind) -> Result<Value, Error> {
        let key = self.key_for(name, requested)?;
        self.values
            .get(key)
            .map(|slot| slot.value)
            .ok_or_else(|| self.unknown(name))
    }

    /**
    Reads a value, checking it has the requested kind.

    Unknown and ambiguous names are logged and answered with the default for `requested`.

    # Panics
    If the declared kind differs from `requested`, or `name` is a texture or sampler.
    */
    pub fn get(&self, name: &str, requested: ValueKind) -> Value {
        match self.try_get_as(name, requested) {
            Ok(value) => {
                if value.kind() != requested {
                    panic!(
                        "{}",
                        Error::KindMismatch {
                            name: name.to_string(),
                            declared: value.kind(),
                            requested,
                        }
                    );
                }
                value
            }
            Err(e) => {
                Self::report(e);
                Value::default_for(requested).unwrap_or(Value::Int(0))
            }
        }
    }

    pub fn set_int(&mut self, name: &str, value: i32) {
        self.set(name, Value::Int(value));
    }
    pub fn set_float(&mut self, name: &str, value: f32) {
        self.set(name, Value::Float(value));
    }
    pub fn set_vec2(&mut self, name: &str, value: Vec2) {
        self.set(name, Value::Vec2(value));
    }
    pub fn set_vec3(&mut self, name: &str, value: Vec3) {
        self.set(name, Value::Vec3(value));
    }
    pub fn set_vec4(&mut self, name: &str, value: Vec4) {
        self.set(name, Value::Vec4(value));
    }
    pub fn set_mat4(&mut self, name: &str, value: Mat4) {
        self.set(name, Value::Mat4(value));
    }

    /**
    Sets a color on a three- or four-component member.

    Alpha is dropped for three-component members.
    */
    pub fn set_color(&mut self, name: &str, color: Color) {
        match self.try_get_as(name, ValueKind::Color) {
            Ok(Value::Vec3(_)) => self.set(name, Value::Vec3(color.rgb())),
            Ok(Value::Vec4(_)) => self.set(name, Value::Vec4(color.rgba())),
            Ok(other) => panic!(
                "{}",
                Error::KindMismatch {
                    name: name.to_string(),
                    declared: other.kind(),
                    requested: ValueKind::Color,
                }
            ),
            Err(e) => Self::report(e),
        }
    }

    pub fn get_int(&self, name: &str) -> i32 {
        match self.get(name, ValueKind::Int) {
            Value::Int(v) => v,
            _ => 0,
        }
    }
    pub fn get_float(&self, name: &str) -> f32 {
        match self.get(name, ValueKind::Float) {
            Value::Float(v) => v,
            _ => 0.0,
        }
    }
    pub fn get_vec2(&self, name: &str) -> Vec2 {
        match self.get(name, ValueKind::Vec2) {
            Value::Vec2(v) => v,
            _ => [0.0; 2],
        }
    }
    pub fn get_vec3(&self, name: &str) -> Vec3 {
        match self.get(name, ValueKind::Vec3) {
            Value::Vec3(v) => v,
            _ => [0.0; 3],
        }
    }
    pub fn get_vec4(&self, name: &str) -> Vec4 {
        match self.get(name, ValueKind::Vec4) {
            Value::Vec4(v) => v,
            _ => [0.0; 4],
        }
    }
    pub fn get_mat4(&self, name: &str) -> Mat4 {
        match self.get(name, ValueKind::Mat4) {
            Value::Mat4(v) => v,
            _ => crate::bindings::value::IDENTITY,
        }
    }

    /// Reads a color from a three- (alpha 1) or four-component member; white when unknown.
    pub fn get_color(&self, name: &str) -> Color {
        match self.try_get_as(name, ValueKind::Color) {
            Ok(Value::Vec3(v)) => Color::from(v),
            Ok(Value::Vec4(v)) => Color::from(v),
            Ok(other) => panic!(
                "{}",
                Error::KindMismatch {
                    name: name.to_string(),
                    declared: other.kind(),
                    requested: ValueKind::Color,
                }
            ),
            Err(e) => {
                Self::report(e);
                Color::WHITE
            }
        }
    }

    /// A name that is not an image binding: a value name is a programming error, anything else is logged.
    fn reject_image_name(&self, name: &str, requested: ValueKind) {
        match self.try_get_as(name, requested) {
            Ok(value) => panic!(
                "{}",
                Error::KindMismatch {
                    name: name.to_string(),
                    declared: value.kind(),
                    requested,
                }
            ),
            Err(e) => Self::report(e),
        }
    }

    /// Points a texture binding at `image` in every frame slot.
    pub fn set_texture(&mut self, device: &B, name: &str, image: &B::Image) {
        self.set_texture_element(device, name, 0, image);
    }

    /**
    Points one element of a texture array at `image` in every frame slot.

    Takes effect immediately; the flush counter is not involved.

    # Panics
    If `element` is outside the array, or `name` is a value rather than a texture.
    */
    pub fn set_texture_element(&mut self, device: &B, name: &str, element: u32, image: &B::Image) {
        let Some(slot) = self.textures.get_mut(name) else {
            self.reject_image_name(name, ValueKind::Texture2D);
            return;
        };
        assert!(
            (element as usize) < slot.elements.len(),
            "element {element} out of range for {name}"
        );
        slot.elements[element as usize] = Some(image.clone());
        let binding_index = slot.binding_index;
        for group in &mut self.groups {
            group.set_image(device, binding_index, element, image);
        }
    }

    /**
    Points a texture binding at `image` in one frame slot only.

    The CPU copy is untouched, so [Self::get_texture] keeps reporting the image set for every slot.

    # Panics
    If `frame` is not below the number of frames in flight, or `name` is a value rather than a
    texture.
    */
    pub fn set_texture_for_frame(&mut self, device: &B, frame: usize, name: &str, image: &B::Image) {
        assert!(
            frame < self.groups.len(),
            "frame {frame} out of range for {} frames in flight",
            self.groups.len()
        );
        let Some(slot) = self.textures.get(name) else {
            self.reject_image_name(name, ValueKind::Texture2D);
            return;
        };
        let binding_index = slot.binding_index;
        self.groups[frame].set_image(device, binding_index, 0, image);
    }

    pub fn get_texture(&self, name: &str) -> Option<&B::Image> {
        self.get_texture_element(name, 0)
    }

    /// The image at one element of a texture array; `None` if unset or unknown.
    pub fn get_texture_element(&self, name: &str, element: u32) -> Option<&B::Image> {
        let Some(slot) = self.textures.get(name) else {
            self.reject_image_name(name, ValueKind::Texture2D);
            return None;
        };
        slot.elements.get(element as usize)?.as_ref()
    }

    /// Points a sampler binding at `sampler` in every frame slot.
    pub fn set_sampler(&mut self, device: &B, name: &str, sampler: &B::Sampler) {
        let Some(slot) = self.samplers.get_mut(name) else {
            self.reject_image_name(name, ValueKind::Sampler);
            return;
        };
        slot.elements[0] = Some(sampler.clone());
        let binding_index = slot.binding_index;
        for group in &mut self.groups {
            group.set_sampler(device, binding_index, 0, sampler);
        }
    }

    pub fn get_sampler(&self, name: &str) -> Option<&B::Sampler> {
        let Some(slot) = self.samplers.get(name) else {
            self.reject_image_name(name, ValueKind::Sampler);
            return None;
        };
        slot.elements.first()?.as_ref()
    }

    /**
    Copies pending values into the group for `frame`.

    Does nothing when no copy is pending, or when `frame` was the last slot flushed.  Each call
    that copies counts one slot down; once every slot has been written, flushing stops until the
    next set.

    Returns whether anything was written.

    # Panics
    If `frame` is not below the number of frames in flight.
    */
    pub fn flush(&mut self, device: &B, frame: usize) -> bool {
        assert!(
            frame < self.groups.len(),
            "frame {frame} out of range for {} frames in flight",
            self.groups.len()
        );
        if self.dirty.is_empty() || !self.flush.begin(frame) {
            return false;
        }
        let group = &self.groups[frame];
        for binding_index in self.dirty.iter() {
            if let Some(bytes) = self.staging.get(&binding_index) {
                group.write(device, binding_index, 0, bytes);
            }
        }
        logwise::trace_sync!(
            "Flushed {layout} into frame {frame}, {remaining} frames pending",
            layout = logwise::privacy::LogIt(&self.layout.name()),
            frame = frame,
            remaining = self.flush.remaining()
        );
        if self.flush.remaining() == 0 {
            self.dirty.clear();
        }
        true
    }

    /**
    Flushes `frame`, then records a bind of its group.

    # Panics
    If the layout is not part of `pipeline`.
    */
    pub fn bind(
        &mut self,
        device: &B,
        command: &mut B::Command<'_>,
        pipeline: &PipelineLayoutDescription,
        frame: usize,
    ) {
        self.flush(device, frame);
        self.groups[frame].bind(device, command, pipeline);
    }

    /**
    Rebuilds the store for another layout.

    Every value and image is discarded and new groups are allocated.  The old groups' pool slots
    are not reclaimed.
    */
    pub fn change_layout(&mut self, context: &mut BindingContext<B>, layout: Arc<ResourceLayout>) {
        logwise::info_sync!(
            "Changing layout {from} to {to}",
            from = logwise::privacy::LogIt(&self.layout.name()),
            to = logwise::privacy::LogIt(&layout.name())
        );
        *self = ValueStore::new(context, layout);
    }

    /// Human-readable listing of every name, its kind and its current value.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{} (set {})", self.layout.name(), self.layout.set_index());
        for (name, slot) in &self.values {
            let _ = writeln!(out, "  {name}: {} = {}", slot.declared, slot.value);
        }
        for (name, slot) in &self.textures {
            let _ = writeln!(out, "  {name}: texture = {:?}", slot.elements);
        }
        for (name, slot) in &self.samplers {
            let _ = writeln!(out, "  {name}: sampler = {:?}", slot.elements);
        }
        out
    }

    /// Whether a flush would write anything.
    pub fn needs_flush(&self) -> bool {
        !self.dirty.is_empty() && self.flush.remaining() > 0
    }

    /// Frame slots that still need the latest values.
    pub fn flush_counter(&self) -> usize {
        self.flush.remaining()
    }

    pub fn layout(&self) -> &Arc<ResourceLayout> {
        &self.layout
    }

    pub fn frames_in_flight(&self) -> usize {
        self.flush.frames_in_flight()
    }

    pub fn group(&self, frame: usize) -> &ResourceGroup<B> {
        &self.groups[frame]
    }

    /// Value names, in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.values.keys().map(String::as_str)
    }
}
