// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*! bindings_and_pools turns a shader's declared inputs into pooled GPU resource groups that
application objects can fill by name and bind at draw time.

Cameras, lights and materials should not have to know how descriptor pools fill up, where a
dynamic uniform buffer slot lives, or how many frames the GPU is behind.  They ask for a group
matching a layout, set values by name, and bind.  This crate does the rest.

# Layers

| Layer                 | Type                                  | Job                                                                  |
|-----------------------|---------------------------------------|----------------------------------------------------------------------|
| Description           | [bindings::descriptor::BindingDescriptor] | One named shader input, as reflected                             |
| Layout                | [bindings::layout::ResourceLayout]    | Ordered bindings of one group; merged across stages; hashed          |
| Allocation            | [bindings::pool::PoolManager]         | Fixed-capacity pools per layout hash, grown on demand                |
| Sub-allocation        | [bindings::dynamic::DynamicAllocator] | Aligned slots in shared dynamic uniform buffers                      |
| Instance              | [bindings::resource_group::ResourceGroup] | Buffer storage and image bindings of one group; bind recording   |
| Values                | [bindings::value_store::ValueStore]   | Named typed values, flushed lazily into every in-flight frame slot   |

All of it hangs off one explicit [BindingContext]; there are no process-wide registries.

# Growth policy

Pools and shared dynamic buffers have a fixed capacity chosen when they are created
(see [BindingConfig]).  When one fills up, a new one is made and the old one is kept.  Slots are
never returned.  Allocation therefore never fails, at the cost of memory that is not reclaimed
until the context is dropped.

# Multibuffering

With N frames in flight, the GPU may still be reading any of N copies of a value.  A
[bindings::value_store::ValueStore] keeps one group per frame slot.  Each set restarts a
countdown from N; each flush of a distinct slot copies the pending values into that slot and
counts down by one.  After N flushes the value is everywhere and flushing stops.

# Backends

The GPU is reached through the [Backend] trait.  Two implementations ship:

* [software::SoftwareDevice], a CPU-only device that records what it is asked to do.  Always
  available.
* `wgpu_backend::WgpuDevice`, wrapping a [wgpu](https://wgpu.rs) device and queue.  Enabled by the
  default `backend_wgpu` feature.

Rendering is single-threaded with respect to this crate; nothing here takes a lock.
*/

pub mod bindings;
mod bittricks;
pub mod config;
pub mod context;
mod error;
mod imp;
mod multibuffer;

pub use config::BindingConfig;
pub use context::BindingContext;
pub use error::Error;
pub use imp::{Backend, BindingKindKey, PoolSizes, software};

#[cfg(feature = "backend_wgpu")]
pub use imp::wgpu as wgpu_backend;
