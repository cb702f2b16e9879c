// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
use crate::Error;
use crate::bindings::layout::{LayoutHash, ResourceLayout};
use std::collections::HashMap;
use std::sync::Arc;

/**
The ordered list of resource layouts a pipeline was created with.

Position in the list is the set index the pipeline expects.  Resource groups resolve their set
index here at bind time, so the same group can be bound into pipelines that place its layout at
different positions.
*/
#[derive(Debug, Clone)]
pub struct PipelineLayoutDescription {
    layouts: Vec<Arc<ResourceLayout>>,
    positions: HashMap<LayoutHash, u32>,
}

impl PipelineLayoutDescription {
    /// # Panics
    /// If two layouts share a hash.
    pub fn new(layouts: Vec<Arc<ResourceLayout>>) -> Self {
        let mut positions = HashMap::with_capacity(layouts.len());
        for (position, layout) in layouts.iter().enumerate() {
            let previous = positions.insert(layout.hash_code(), position as u32);
            assert!(
                previous.is_none(),
                "layout {} appears twice in the pipeline layout",
                layout.name()
            );
        }
        PipelineLayoutDescription { layouts, positions }
    }

    pub fn layouts(&self) -> &[Arc<ResourceLayout>] {
        &self.layouts
    }

    pub fn try_set_index(&self, layout: &ResourceLayout) -> Result<u32, Error> {
        self.positions
            .get(&layout.hash_code())
            .copied()
            .ok_or_else(|| Error::LayoutNotInPipeline {
                layout: layout.name().to_string(),
            })
    }

    pub fn set_index(&self, layout: &ResourceLayout) -> Option<u32> {
        self.try_set_index(layout).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::descriptor::BindingDescriptor;
    use crate::bindings::visible_to::StageMask;

    fn layout(name: &str, set: u32) -> Arc<ResourceLayout> {
        Arc::new(ResourceLayout::build(
            name,
            set,
            vec![BindingDescriptor::uniform_buffer(name, 0, 16, StageMask::VERTEX)],
        ))
    }

    #[test]
    fn positions() {
        let camera = layout("Camera", 0);
        let material = layout("Material", 1);
        let pipeline = PipelineLayoutDescription::new(vec![material.clone(), camera.clone()]);
        assert_eq!(pipeline.set_index(&material), Some(0));
        assert_eq!(pipeline.set_index(&camera), Some(1));
        assert!(matches!(
            pipeline.try_set_index(&layout("Light", 2)),
            Err(Error::LayoutNotInPipeline { .. })
        ));
    }

    #[test]
    #[should_panic(expected = "appears twice")]
    fn duplicate_layouts_panic() {
        let camera = layout("Camera", 0);
        PipelineLayoutDescription::new(vec![camera.clone(), camera]);
    }
}
