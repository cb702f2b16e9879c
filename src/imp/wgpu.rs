// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
wgpu backend.

wgpu has no descriptor pools; a "pool" here owns the bind group layout shared by every group
carved from it.  Groups collect their entries as they are written and build the
`wgpu::BindGroup` lazily at bind time, rebuilding it after any entry changes.
*/

use crate::bindings::descriptor::{BindingDescriptor, BindingKind, ValueKind};
use crate::bindings::layout::ResourceLayout;
use crate::bindings::visible_to::StageMask;
use crate::bittricks::align_up;
use crate::imp::{Backend, PoolSizes};
use std::collections::BTreeMap;
use std::num::NonZeroU32;

/// wgpu wants buffer sizes and write lengths in multiples of this.
const COPY_ALIGNMENT: u64 = wgpu::COPY_BUFFER_ALIGNMENT;

/**
A caller-supplied wgpu device and queue.

Adapter and device acquisition are up to the caller.
*/
#[derive(Debug)]
pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
}

impl WgpuDevice {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        WgpuDevice { device, queue }
    }
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }
}

#[derive(Debug)]
pub struct WgpuPool {
    layout: wgpu::BindGroupLayout,
    groups: u32,
}

impl WgpuPool {
    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }
}

#[derive(Debug)]
enum WgpuEntry {
    Buffer {
        buffer: wgpu::Buffer,
        offset: u64,
        range: u64,
    },
    Textures {
        elements: Vec<Option<wgpu::TextureView>>,
        array: bool,
    },
    Samplers {
        elements: Vec<Option<wgpu::Sampler>>,
        array: bool,
    },
}

#[derive(Debug)]
pub struct WgpuGroup {
    layout: wgpu::BindGroupLayout,
    expected_entries: usize,
    entries: BTreeMap<u32, WgpuEntry>,
    bind_group: Option<wgpu::BindGroup>,
    label: String,
}

impl WgpuGroup {
    /// The bind group, if it has been built since the last write.
    pub fn bind_group(&self) -> Option<&wgpu::BindGroup> {
        self.bind_group.as_ref()
    }
}

fn shader_stages(binding: &BindingDescriptor) -> wgpu::ShaderStages {
    let mask = binding.stages();
    let mut stages = wgpu::ShaderStages::empty();
    if mask.contains(StageMask::VERTEX) {
        stages |= wgpu::ShaderStages::VERTEX;
    }
    if mask.contains(StageMask::FRAGMENT) {
        stages |= wgpu::ShaderStages::FRAGMENT;
    }
    if mask.contains(StageMask::COMPUTE) {
        stages |= wgpu::ShaderStages::COMPUTE;
    }
    if mask.contains(StageMask::GEOMETRY) {
        logwise::warn_sync!(
            "{binding} is visible to the geometry stage, which wgpu does not have; that visibility is dropped",
            binding = logwise::privacy::LogIt(&binding.name())
        );
    }
    stages
}

fn binding_type(binding: &BindingDescriptor) -> wgpu::BindingType {
    match binding.kind() {
        BindingKind::UniformBuffer | BindingKind::DynamicUniformBuffer => wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: binding.kind() == BindingKind::DynamicUniformBuffer,
            min_binding_size: wgpu::BufferSize::new(binding.byte_size() as u64),
        },
        BindingKind::SampledImage => wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: match binding.value_kind() {
                ValueKind::Texture3D => wgpu::TextureViewDimension::D3,
                ValueKind::TextureCube => wgpu::TextureViewDimension::Cube,
                _ => wgpu::TextureViewDimension::D2,
            },
            multisampled: false,
        },
        BindingKind::Sampler => wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
    }
}

fn element_slot<'a, T>(elements: &'a mut [Option<T>], element: u32, binding: &BindingDescriptor) -> Option<&'a mut Option<T>> {
    let slot = elements.get_mut(element as usize);
    if slot.is_none() {
        logwise::warn_sync!(
            "Element {element} is out of range for {name}",
            element = element,
            name = logwise::privacy::LogIt(&binding.name())
        );
    }
    slot
}

impl WgpuDevice {
    fn build_bind_group(&self, group: &WgpuGroup) -> Option<wgpu::BindGroup> {
        if group.entries.len() < group.expected_entries {
            return None;
        }
        let mut views: BTreeMap<u32, Vec<&wgpu::TextureView>> = BTreeMap::new();
        let mut samplers: BTreeMap<u32, Vec<&wgpu::Sampler>> = BTreeMap::new();
        for (binding, entry) in &group.entries {
            match entry {
                WgpuEntry::Buffer { .. } => {}
                WgpuEntry::Textures { elements, .. } => {
                    let all: Option<Vec<&wgpu::TextureView>> =
                        elements.iter().map(Option::as_ref).collect();
                    views.insert(*binding, all?);
                }
                WgpuEntry::Samplers { elements, .. } => {
                    let all: Option<Vec<&wgpu::Sampler>> =
                        elements.iter().map(Option::as_ref).collect();
                    samplers.insert(*binding, all?);
                }
            }
        }
        let entries: Vec<wgpu::BindGroupEntry<'_>> = group
            .entries
            .iter()
            .map(|(binding, entry)| {
                let resource = match entry {
                    WgpuEntry::Buffer {
                        buffer,
                        offset,
                        range,
                    } => wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer,
                        offset: *offset,
                        size: wgpu::BufferSize::new(*range),
                    }),
                    WgpuEntry::Textures { array: true, .. } => {
                        wgpu::BindingResource::TextureViewArray(views[binding].as_slice())
                    }
                    WgpuEntry::Textures { array: false, .. } => {
                        wgpu::BindingResource::TextureView(views[binding][0])
                    }
                    WgpuEntry::Samplers { array: true, .. } => {
                        wgpu::BindingResource::SamplerArray(samplers[binding].as_slice())
                    }
                    WgpuEntry::Samplers { array: false, .. } => {
                        wgpu::BindingResource::Sampler(samplers[binding][0])
                    }
                };
                wgpu::BindGroupEntry {
                    binding: *binding,
                    resource,
                }
            })
            .collect();
        Some(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&group.label),
            layout: &group.layout,
            entries: &entries,
        }))
    }
}

impl Backend for WgpuDevice {
    type Buffer = wgpu::Buffer;
    type Image = wgpu::TextureView;
    type Sampler = wgpu::Sampler;
    type Pool = WgpuPool;
    type Group = WgpuGroup;
    type Command<'a> = wgpu::RenderPass<'a>;

    fn uniform_offset_alignment(&self) -> u64 {
        self.device.limits().min_uniform_buffer_offset_alignment as u64
    }

    fn create_buffer(&self, byte_len: u64, debug_name: &str) -> wgpu::Buffer {
        self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(debug_name),
            size: align_up(byte_len.max(COPY_ALIGNMENT), COPY_ALIGNMENT),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    fn write_buffer(&self, buffer: &wgpu::Buffer, offset: u64, bytes: &[u8]) {
        let padded_len = align_up(bytes.len() as u64, COPY_ALIGNMENT) as usize;
        if padded_len == bytes.len() {
            self.queue.write_buffer(buffer, offset, bytes);
        } else {
            let mut padded = bytes.to_vec();
            padded.resize(padded_len, 0);
            self.queue.write_buffer(buffer, offset, &padded);
        }
    }

    fn create_pool(&self, layout: &ResourceLayout, sizes: &PoolSizes) -> WgpuPool {
        let entries: Vec<wgpu::BindGroupLayoutEntry> = layout
            .bindings()
            .iter()
            .map(|binding| wgpu::BindGroupLayoutEntry {
                binding: binding.binding_index(),
                visibility: shader_stages(binding),
                ty: binding_type(binding),
                count: if binding.array_count() > 1 {
                    NonZeroU32::new(binding.array_count())
                } else {
                    None
                },
            })
            .collect();
        logwise::trace_sync!(
            "Creating bind group layout {name} for {groups} groups",
            name = logwise::privacy::LogIt(&layout.name()),
            groups = sizes.max_groups
        );
        WgpuPool {
            layout: self
                .device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some(layout.name()),
                    entries: &entries,
                }),
            groups: 0,
        }
    }

    fn allocate_group(&self, pool: &mut WgpuPool, layout: &ResourceLayout) -> WgpuGroup {
        pool.groups += 1;
        WgpuGroup {
            layout: pool.layout.clone(),
            expected_entries: layout.bindings().len(),
            entries: BTreeMap::new(),
            bind_group: None,
            label: format!("{} #{}", layout.name(), pool.groups),
        }
    }

    fn write_buffer_binding(
        &self,
        group: &mut WgpuGroup,
        binding: &BindingDescriptor,
        buffer: &wgpu::Buffer,
        offset: u64,
        range: u64,
    ) {
        group.entries.insert(
            binding.binding_index(),
            WgpuEntry::Buffer {
                buffer: buffer.clone(),
                offset,
                range,
            },
        );
        group.bind_group = None;
    }

    fn write_image_binding(
        &self,
        group: &mut WgpuGroup,
        binding: &BindingDescriptor,
        element: u32,
        image: &wgpu::TextureView,
    ) {
        let entry = group
            .entries
            .entry(binding.binding_index())
            .or_insert_with(|| WgpuEntry::Textures {
                elements: (0..binding.array_count()).map(|_| None).collect(),
                array: binding.array_count() > 1,
            });
        if let WgpuEntry::Textures { elements, .. } = entry
            && let Some(slot) = element_slot(elements, element, binding)
        {
            *slot = Some(image.clone());
        }
        group.bind_group = None;
    }

    fn write_sampler_binding(
        &self,
        group: &mut WgpuGroup,
        binding: &BindingDescriptor,
        element: u32,
        sampler: &wgpu::Sampler,
    ) {
        let entry = group
            .entries
            .entry(binding.binding_index())
            .or_insert_with(|| WgpuEntry::Samplers {
                elements: (0..binding.array_count()).map(|_| None).collect(),
                array: binding.array_count() > 1,
            });
        if let WgpuEntry::Samplers { elements, .. } = entry
            && let Some(slot) = element_slot(elements, element, binding)
        {
            *slot = Some(sampler.clone());
        }
        group.bind_group = None;
    }

    fn bind_group(
        &self,
        command: &mut wgpu::RenderPass<'_>,
        set_index: u32,
        group: &mut WgpuGroup,
        dynamic_offsets: &[u32],
    ) {
        if group.bind_group.is_none() {
            group.bind_group = self.build_bind_group(group);
        }
        match &group.bind_group {
            Some(bind_group) => command.set_bind_group(set_index, bind_group, dynamic_offsets),
            None => {
                logwise::error_sync!(
                    "Resource group {label} has unset bindings; skipping bind",
                    label = logwise::privacy::LogIt(&group.label)
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometry_visibility_is_dropped() {
        let geometry_only = BindingDescriptor::uniform_buffer("Extrude", 0, 16, StageMask::GEOMETRY);
        assert_eq!(shader_stages(&geometry_only), wgpu::ShaderStages::empty());
        let mixed = BindingDescriptor::uniform_buffer(
            "Extrude",
            0,
            16,
            StageMask::VERTEX | StageMask::GEOMETRY | StageMask::FRAGMENT,
        );
        assert_eq!(
            shader_stages(&mixed),
            wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT
        );
    }
}
