// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Typed values held by a [crate::bindings::value_store::ValueStore].
*/

use crate::bindings::descriptor::ValueKind;
use std::fmt::Display;

pub type Vec2 = [f32; 2];
pub type Vec3 = [f32; 3];
pub type Vec4 = [f32; 4];
/// Column-major: `m[column][row]`.
pub type Mat4 = [[f32; 4]; 4];

pub const IDENTITY: Mat4 = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// A linear RGBA color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::new(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::new(0.0, 0.0, 0.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Color { r, g, b, a }
    }
    pub const fn rgb(self) -> Vec3 {
        [self.r, self.g, self.b]
    }
    pub const fn rgba(self) -> Vec4 {
        [self.r, self.g, self.b, self.a]
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

impl From<Vec3> for Color {
    fn from(v: Vec3) -> Self {
        Color::new(v[0], v[1], v[2], 1.0)
    }
}

impl From<Vec4> for Color {
    fn from(v: Vec4) -> Self {
        Color::new(v[0], v[1], v[2], v[3])
    }
}

/**
One value in a uniform buffer.
*/
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Int(i32),
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat4(Mat4),
}

impl Value {
    /// The initial value for a declared kind, or `None` if the kind cannot be stored.
    ///
    /// Colors are stored as four-component vectors.
    pub fn default_for(kind: ValueKind) -> Option<Value> {
        match kind {
            ValueKind::Int => Some(Value::Int(0)),
            ValueKind::Float => Some(Value::Float(0.0)),
            ValueKind::Vec2 => Some(Value::Vec2([0.0; 2])),
            ValueKind::Vec3 => Some(Value::Vec3([0.0; 3])),
            ValueKind::Vec4 | ValueKind::Color => Some(Value::Vec4([0.0; 4])),
            ValueKind::Mat4 => Some(Value::Mat4(IDENTITY)),
            _ => None,
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::Vec2(_) => ValueKind::Vec2,
            Value::Vec3(_) => ValueKind::Vec3,
            Value::Vec4(_) => ValueKind::Vec4,
            Value::Mat4(_) => ValueKind::Mat4,
        }
    }

    /// Native-endian bytes, as the GPU reads them.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Value::Int(v) => v.to_ne_bytes().to_vec(),
            Value::Float(v) => v.to_ne_bytes().to_vec(),
            Value::Vec2(v) => floats(v),
            Value::Vec3(v) => floats(v),
            Value::Vec4(v) => floats(v),
            Value::Mat4(m) => floats(m.as_flattened()),
        }
    }
}

fn floats(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|f| f.to_ne_bytes()).collect()
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Vec2(v) => write!(f, "{v:?}"),
            Value::Vec3(v) => write!(f, "{v:?}"),
            Value::Vec4(v) => write!(f, "{v:?}"),
            Value::Mat4(v) => write!(f, "{v:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        assert_eq!(Value::default_for(ValueKind::Mat4), Some(Value::Mat4(IDENTITY)));
        assert_eq!(
            Value::default_for(ValueKind::Color),
            Some(Value::Vec4([0.0; 4]))
        );
        assert_eq!(Value::default_for(ValueKind::Texture2D), None);
        assert_eq!(Value::default_for(ValueKind::Double), None);
    }

    #[test]
    fn byte_layout() {
        assert_eq!(Value::Float(1.0).to_bytes(), 1.0f32.to_ne_bytes().to_vec());
        assert_eq!(Value::Vec3([0.0; 3]).to_bytes().len(), 12);
        let bytes = Value::Mat4(IDENTITY).to_bytes();
        assert_eq!(bytes.len(), 64);
        //second column starts with 0, then 1
        assert_eq!(&bytes[20..24], &1.0f32.to_ne_bytes());
    }

    #[test]
    fn colors() {
        assert_eq!(Color::default(), Color::WHITE);
        assert_eq!(Color::from([0.5, 0.5, 0.5]).a, 1.0);
        assert_eq!(Color::new(0.1, 0.2, 0.3, 0.4).rgb(), [0.1, 0.2, 0.3]);
    }
}
