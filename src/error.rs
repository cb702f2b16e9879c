// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
use crate::bindings::descriptor::ValueKind;

/**
Errors reported by the fallible (`try_*`) entry points.

The non-`try` variants of the same operations log these and fall back to a default, or
panic when the error can only come from a programming mistake.
*/
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    #[error("no binding named {name} in layout {layout}")]
    UnknownBinding { layout: String, name: String },
    #[error("{name} matches more than one member of layout {layout}; qualify it with the binding name")]
    AmbiguousName { layout: String, name: String },
    #[error("layout {layout} is not part of the pipeline layout")]
    LayoutNotInPipeline { layout: String },
    #[error("{name} is declared as {declared} but was accessed as {requested}")]
    KindMismatch {
        name: String,
        declared: ValueKind,
        requested: ValueKind,
    },
    #[error("no binding in set {set_index} names the set")]
    UnnamedSet { set_index: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages() {
        let e = Error::UnknownBinding {
            layout: "Camera".to_string(),
            name: "fov".to_string(),
        };
        assert_eq!(e.to_string(), "no binding named fov in layout Camera");
        let e = Error::KindMismatch {
            name: "exposure".to_string(),
            declared: ValueKind::Int,
            requested: ValueKind::Float,
        };
        assert_eq!(
            e.to_string(),
            "exposure is declared as Int but was accessed as Float"
        );
        let e = Error::AmbiguousName {
            layout: "Scene".to_string(),
            name: "color".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "color matches more than one member of layout Scene; qualify it with the binding name"
        );
    }
}
