// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
use crate::bindings::layout::ResourceLayout;
use std::collections::HashMap;
use std::sync::Arc;

/**
Merged layouts, registered by `"<Shader>#<SetName>"`.

Objects that only know the name of the set they fill (a camera filling `"Standard#Camera"`)
resolve their layout here.
*/
#[derive(Debug, Default)]
pub struct LayoutRegistry {
    layouts: HashMap<String, Arc<ResourceLayout>>,
}

impl LayoutRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn full_name(shader: &str, set_name: &str) -> String {
        format!("{shader}#{set_name}")
    }

    /**
    Registers a layout for a shader and returns the shared handle.

    Registering the same full name again replaces the previous entry.
    */
    pub fn register(&mut self, shader: &str, layout: ResourceLayout) -> Arc<ResourceLayout> {
        let full_name = Self::full_name(shader, layout.name());
        let layout = Arc::new(layout);
        if self.layouts.insert(full_name.clone(), layout.clone()).is_some() {
            logwise::warn_sync!(
                "Replacing registered layout {full_name}",
                full_name = logwise::privacy::LogIt(&full_name)
            );
        }
        layout
    }

    /// Registers every layout of a shader.
    pub fn register_shader<I>(&mut self, shader: &str, layouts: I) -> Vec<Arc<ResourceLayout>>
    where
        I: IntoIterator<Item = ResourceLayout>,
    {
        layouts
            .into_iter()
            .map(|layout| self.register(shader, layout))
            .collect()
    }

    /// Looks up a layout by full name; logs unknown names.
    pub fn get(&self, full_name: &str) -> Option<Arc<ResourceLayout>> {
        let found = self.layouts.get(full_name).cloned();
        if found.is_none() {
            logwise::error_sync!(
                "No layout registered as {full_name}",
                full_name = logwise::privacy::LogIt(&full_name)
            );
        }
        found
    }

    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::descriptor::BindingDescriptor;
    use crate::bindings::visible_to::StageMask;

    #[test]
    fn register_and_resolve() {
        let mut registry = LayoutRegistry::new();
        let layout = ResourceLayout::build(
            "Camera",
            0,
            vec![BindingDescriptor::uniform_buffer("Camera", 0, 64, StageMask::VERTEX)],
        );
        let registered = registry.register("Standard", layout);
        let found = registry.get("Standard#Camera").expect("registered");
        assert!(Arc::ptr_eq(&registered, &found));
        assert!(registry.get("Standard#Light").is_none());
        assert_eq!(registry.len(), 1);
    }
}
