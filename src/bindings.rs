// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*! Defines binding types */

pub mod descriptor;
mod dirty_tracking;
pub mod dynamic;
pub mod layout;
pub mod pipeline_layout;
pub mod pool;
pub mod registry;
pub mod resource_group;
pub mod value;
pub mod value_store;
pub mod visible_to;

pub use descriptor::{BindingDescriptor, BindingKind, MemberRange, ValueKind};
pub use layout::{LayoutHash, LayoutRole, ResourceLayout};
pub use pipeline_layout::PipelineLayoutDescription;
pub use resource_group::ResourceGroup;
pub use value::{Color, Value};
pub use value_store::ValueStore;
pub use visible_to::{Stage, StageMask};
