// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Shader stage visibility for bindings.
//!
//! Every binding declares which pipeline stages read it. When the same resource group is
//! declared by several stages of one shader, the masks are OR-ed together during a
//! [crate::bindings::layout::ResourceLayout::merge].
//!
//! # Examples
//!
//! ```
//! use bindings_and_pools::bindings::visible_to::{Stage, StageMask};
//!
//! let mask = StageMask::from(Stage::Vertex) | StageMask::from(Stage::Fragment);
//! assert!(mask.contains(StageMask::VERTEX));
//! assert!(mask.contains(StageMask::FRAGMENT));
//! assert!(!mask.contains(StageMask::COMPUTE));
//! ```

/// A single pipeline stage that can declare bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Stage {
    /// Vertex shader.
    Vertex,
    /// Geometry shader.
    Geometry,
    /// Fragment (pixel) shader.
    Fragment,
    /// Compute shader.
    Compute,
}

bitflags::bitflags! {
    /// A set of pipeline stages.
    ///
    /// Bit values follow the Vulkan `VkShaderStageFlagBits` numbering.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct StageMask: u32 {
        /// Visible to vertex shaders.
        const VERTEX = 0x01;
        /// Visible to geometry shaders.
        const GEOMETRY = 0x08;
        /// Visible to fragment shaders.
        const FRAGMENT = 0x10;
        /// Visible to compute shaders.
        const COMPUTE = 0x20;
    }
}

impl From<Stage> for StageMask {
    fn from(stage: Stage) -> Self {
        match stage {
            Stage::Vertex => StageMask::VERTEX,
            Stage::Geometry => StageMask::GEOMETRY,
            Stage::Fragment => StageMask::FRAGMENT,
            Stage::Compute => StageMask::COMPUTE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_conversion() {
        assert_eq!(StageMask::from(Stage::Vertex), StageMask::VERTEX);
        assert_eq!(StageMask::from(Stage::Geometry), StageMask::GEOMETRY);
        assert_eq!(StageMask::from(Stage::Fragment), StageMask::FRAGMENT);
        assert_eq!(StageMask::from(Stage::Compute), StageMask::COMPUTE);
    }

    #[test]
    fn union_and_intersection() {
        let vf = StageMask::VERTEX | StageMask::FRAGMENT;
        assert_eq!(vf.bits(), 0x11);
        assert!(vf.intersects(StageMask::FRAGMENT));
        assert!(!vf.intersects(StageMask::COMPUTE));
    }
}
