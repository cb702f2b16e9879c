// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Tracks which buffer bindings hold CPU-side changes that have not reached every frame slot.
*/

use std::collections::BTreeSet;

#[derive(Debug, Default, Clone)]
pub(crate) struct DirtyBindings {
    bindings: BTreeSet<u32>,
}

impl DirtyBindings {
    pub(crate) fn mark(&mut self, binding_index: u32) {
        self.bindings.insert(binding_index);
    }

    pub(crate) fn clear(&mut self) {
        self.bindings.clear();
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Dirty binding indices, in binding order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.bindings.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::DirtyBindings;

    #[test]
    fn marks_are_deduplicated() {
        let mut dirty = DirtyBindings::default();
        dirty.mark(2);
        dirty.mark(0);
        dirty.mark(2);
        assert_eq!(dirty.iter().collect::<Vec<_>>(), vec![0, 2]);
        dirty.clear();
        assert!(dirty.is_empty());
    }
}
