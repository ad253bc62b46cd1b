use serde::{Deserialize, Serialize};

/// One-byte wire tag describing the payload of a tagged value.
///
/// Tags are declared once per event in an `EventDeclaration` chunk; event chunks
/// only carry the raw payload bytes.
///
/// NOTE: older encoders tagged unsigned 64-bit values as `UInt32` while still
/// writing 8 payload bytes. Values built here carry `UInt64`; decoders that
/// must read captures from those encoders should treat a `UInt32` declaration
/// whose payload is 8 bytes wide as a 64-bit value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TypeTag {
    Nil = 0,
    Unknown = 1,
    String = 2,
    Int32 = 3,
    UInt32 = 4,
    Int64 = 5,
    UInt64 = 6,
    Float = 7,
    Double = 8,
    Vec2 = 9,
    Vec3 = 10,
    Quat = 11,
}

impl TypeTag {
    pub fn from_u8(raw: u8) -> Option<Self> {
        use TypeTag::*;
        let tag = match raw {
            0 => Nil,
            1 => Unknown,
            2 => String,
            3 => Int32,
            4 => UInt32,
            5 => Int64,
            6 => UInt64,
            7 => Float,
            8 => Double,
            9 => Vec2,
            10 => Vec3,
            11 => Quat,
            _ => return None,
        };
        Some(tag)
    }

    /// Natural payload width, or `None` for strings (variable) and `Nil`/`Unknown` (empty).
    pub fn fixed_size(self) -> Option<u16> {
        use TypeTag::*;
        match self {
            Int32 | UInt32 | Float => Some(4),
            Int64 | UInt64 | Double | Vec2 => Some(8),
            Vec3 => Some(12),
            Quat => Some(16),
            Nil | Unknown | String => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Rotation quaternion, laid out as the imaginary part followed by `w`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quat {
    pub v: Vec3,
    pub w: f32,
}

impl Quat {
    pub const IDENTITY: Quat = Quat {
        v: Vec3 { x: 0.0, y: 0.0, z: 0.0 },
        w: 1.0,
    };

    pub fn new(w: f32, x: f32, y: f32, z: f32) -> Self {
        Self {
            v: Vec3::new(x, y, z),
            w,
        }
    }
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

pub(crate) fn read_f32(bytes: &[u8], at: usize) -> Option<f32> {
    let raw: [u8; 4] = bytes.get(at..at + 4)?.try_into().ok()?;
    Some(f32::from_ne_bytes(raw))
}
