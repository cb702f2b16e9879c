// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
A CPU-only backend.

Buffers are byte vectors, groups remember what was written into them, and command buffers
record the binds they receive.  The device counts the work it is asked to do, which makes it
useful for tests and for headless tools that want to inspect what a renderer would upload.
*/

use crate::bindings::descriptor::BindingDescriptor;
use crate::bindings::layout::ResourceLayout;
use crate::imp::{Backend, PoolSizes};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::sync::Arc;

const DEFAULT_ALIGNMENT: u64 = 256;

/// Work counters for a [SoftwareDevice].
#[derive(Debug, Default)]
pub struct SoftwareStats {
    buffers_created: Cell<usize>,
    buffer_writes: Cell<usize>,
    pools_created: Cell<usize>,
    groups_allocated: Cell<usize>,
}

impl SoftwareStats {
    pub fn buffers_created(&self) -> usize {
        self.buffers_created.get()
    }
    pub fn buffer_writes(&self) -> usize {
        self.buffer_writes.get()
    }
    pub fn pools_created(&self) -> usize {
        self.pools_created.get()
    }
    pub fn groups_allocated(&self) -> usize {
        self.groups_allocated.get()
    }
}

fn bump(cell: &Cell<usize>) {
    cell.set(cell.get() + 1);
}

#[derive(Debug)]
pub struct SoftwareDevice {
    alignment: u64,
    next_id: Cell<u64>,
    stats: SoftwareStats,
}

impl Default for SoftwareDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftwareDevice {
    /// A device with a 256-byte uniform offset alignment.
    pub fn new() -> Self {
        Self::with_alignment(DEFAULT_ALIGNMENT)
    }

    pub fn with_alignment(alignment: u64) -> Self {
        SoftwareDevice {
            alignment,
            next_id: Cell::new(0),
            stats: SoftwareStats::default(),
        }
    }

    pub fn stats(&self) -> &SoftwareStats {
        &self.stats
    }

    fn next_id(&self) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    pub fn create_image(&self, debug_name: &str) -> SoftwareImage {
        SoftwareImage {
            id: self.next_id(),
            debug_name: debug_name.into(),
        }
    }

    pub fn create_sampler(&self, debug_name: &str) -> SoftwareSampler {
        SoftwareSampler {
            id: self.next_id(),
            debug_name: debug_name.into(),
        }
    }
}

#[derive(Debug)]
pub struct SoftwareBuffer {
    id: u64,
    debug_name: String,
    bytes: RefCell<Vec<u8>>,
}

impl SoftwareBuffer {
    pub fn id(&self) -> u64 {
        self.id
    }
    pub fn debug_name(&self) -> &str {
        &self.debug_name
    }
    pub fn byte_len(&self) -> usize {
        self.bytes.borrow().len()
    }
    /// Copies `len` bytes starting at `offset`.
    pub fn read(&self, offset: usize, len: usize) -> Vec<u8> {
        self.bytes.borrow()[offset..offset + len].to_vec()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoftwareImage {
    id: u64,
    debug_name: Arc<str>,
}

impl SoftwareImage {
    pub fn id(&self) -> u64 {
        self.id
    }
    pub fn debug_name(&self) -> &str {
        &self.debug_name
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoftwareSampler {
    id: u64,
    debug_name: Arc<str>,
}

impl SoftwareSampler {
    pub fn id(&self) -> u64 {
        self.id
    }
    pub fn debug_name(&self) -> &str {
        &self.debug_name
    }
}

#[derive(Debug)]
pub struct SoftwarePool {
    id: u64,
    sizes: PoolSizes,
    groups: u32,
}

impl SoftwarePool {
    pub fn id(&self) -> u64 {
        self.id
    }
    pub fn sizes(&self) -> &PoolSizes {
        &self.sizes
    }
}

/// What a group slot currently points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoftwareEntry {
    Buffer { buffer: u64, offset: u64, range: u64 },
    Image(u64),
    Sampler(u64),
}

#[derive(Debug)]
pub struct SoftwareGroup {
    pool: u64,
    index_in_pool: u32,
    entries: BTreeMap<(u32, u32), SoftwareEntry>,
}

impl SoftwareGroup {
    pub fn pool(&self) -> u64 {
        self.pool
    }
    pub fn index_in_pool(&self) -> u32 {
        self.index_in_pool
    }
    /// The entry written at a binding index and array element.
    pub fn entry(&self, binding_index: u32, element: u32) -> Option<&SoftwareEntry> {
        self.entries.get(&(binding_index, element))
    }
}

/// One recorded bind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedBind {
    pub set_index: u32,
    pub pool: u64,
    pub index_in_pool: u32,
    pub dynamic_offsets: Vec<u32>,
}

#[derive(Debug, Default)]
pub struct SoftwareCommandBuffer {
    binds: Vec<RecordedBind>,
}

impl SoftwareCommandBuffer {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn binds(&self) -> &[RecordedBind] {
        &self.binds
    }
}

impl Backend for SoftwareDevice {
    type Buffer = SoftwareBuffer;
    type Image = SoftwareImage;
    type Sampler = SoftwareSampler;
    type Pool = SoftwarePool;
    type Group = SoftwareGroup;
    type Command<'a> = SoftwareCommandBuffer;

    fn uniform_offset_alignment(&self) -> u64 {
        self.alignment
    }

    fn create_buffer(&self, byte_len: u64, debug_name: &str) -> SoftwareBuffer {
        bump(&self.stats.buffers_created);
        SoftwareBuffer {
            id: self.next_id(),
            debug_name: debug_name.to_string(),
            bytes: RefCell::new(vec![0; byte_len as usize]),
        }
    }

    fn write_buffer(&self, buffer: &SoftwareBuffer, offset: u64, bytes: &[u8]) {
        bump(&self.stats.buffer_writes);
        let offset = offset as usize;
        buffer.bytes.borrow_mut()[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    fn create_pool(&self, _layout: &ResourceLayout, sizes: &PoolSizes) -> SoftwarePool {
        bump(&self.stats.pools_created);
        SoftwarePool {
            id: self.next_id(),
            sizes: sizes.clone(),
            groups: 0,
        }
    }

    fn allocate_group(&self, pool: &mut SoftwarePool, _layout: &ResourceLayout) -> SoftwareGroup {
        bump(&self.stats.groups_allocated);
        let index_in_pool = pool.groups;
        pool.groups += 1;
        SoftwareGroup {
            pool: pool.id,
            index_in_pool,
            entries: BTreeMap::new(),
        }
    }

    fn write_buffer_binding(
        &self,
        group: &mut SoftwareGroup,
        binding: &BindingDescriptor,
        buffer: &SoftwareBuffer,
        offset: u64,
        range: u64,
    ) {
        group.entries.insert(
            (binding.binding_index(), 0),
            SoftwareEntry::Buffer {
                buffer: buffer.id,
                offset,
                range,
            },
        );
    }

    fn write_image_binding(
        &self,
        group: &mut SoftwareGroup,
        binding: &BindingDescriptor,
        element: u32,
        image: &SoftwareImage,
    ) {
        group.entries.insert(
            (binding.binding_index(), element),
            SoftwareEntry::Image(image.id),
        );
    }

    fn write_sampler_binding(
        &self,
        group: &mut SoftwareGroup,
        binding: &BindingDescriptor,
        element: u32,
        sampler: &SoftwareSampler,
    ) {
        group.entries.insert(
            (binding.binding_index(), element),
            SoftwareEntry::Sampler(sampler.id),
        );
    }

    fn bind_group(
        &self,
        command: &mut SoftwareCommandBuffer,
        set_index: u32,
        group: &mut SoftwareGroup,
        dynamic_offsets: &[u32],
    ) {
        command.binds.push(RecordedBind {
            set_index,
            pool: group.pool,
            index_in_pool: group.index_in_pool,
            dynamic_offsets: dynamic_offsets.to_vec(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffers_hold_writes() {
        let device = SoftwareDevice::new();
        let buffer = device.create_buffer(16, "scratch");
        device.write_buffer(&buffer, 4, &[1, 2, 3, 4]);
        assert_eq!(buffer.read(0, 8), vec![0, 0, 0, 0, 1, 2, 3, 4]);
        assert_eq!(device.stats().buffers_created(), 1);
        assert_eq!(device.stats().buffer_writes(), 1);
    }

    #[test]
    fn ids_are_unique() {
        let device = SoftwareDevice::with_alignment(64);
        let a = device.create_image("a");
        let b = device.create_image("b");
        assert_ne!(a, b);
        assert_eq!(device.uniform_offset_alignment(), 64);
    }
}
