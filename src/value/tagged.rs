use std::borrow::Cow;
use std::ffi::{CStr, CString};
use std::fmt;

use super::types::{read_f32, Quat, TypeTag, Vec2, Vec3};

const INLINE_CAPACITY: usize = 16;

#[derive(Debug, Clone)]
enum Payload<'a> {
    /// Fixed-size scalars and vectors, always copied.
    Inline([u8; INLINE_CAPACITY]),
    /// String bytes: owned copy or a borrow of caller memory.
    Bytes(Cow<'a, [u8]>),
}

/// A single typed telemetry field value.
///
/// The lifetime selects the storage policy: `TaggedValue<'static>` built from
/// owned data (or via [`TaggedValue::into_owned`]) holds its own copy of the
/// payload, while a value built from `&'a str` / `&'a CStr` borrows the caller's
/// bytes until it is dropped.
///
/// `size` always matches the natural encoded width of the tag. Strings built
/// from a `CStr` include the NUL terminator; strings built from `str`/`String`
/// do not. Both encodings are kept distinct because decoders rely on them.
#[derive(Debug, Clone)]
pub struct TaggedValue<'a> {
    tag: TypeTag,
    size: u16,
    changed: bool,
    payload: Payload<'a>,
}

/// Tagged value that owns its payload.
pub type OwnedValue = TaggedValue<'static>;

impl<'a> TaggedValue<'a> {
    pub fn nil() -> Self {
        Self {
            tag: TypeTag::Nil,
            size: 0,
            changed: true,
            payload: Payload::Inline([0; INLINE_CAPACITY]),
        }
    }

    /// Builds a value with an explicit changed flag.
    pub fn new(value: impl Into<TaggedValue<'a>>, changed: bool) -> Self {
        let mut tagged = value.into();
        tagged.changed = changed;
        tagged
    }

    fn inline(tag: TypeTag, bytes: &[u8]) -> Self {
        debug_assert_eq!(tag.fixed_size(), Some(bytes.len() as u16));
        let mut buf = [0u8; INLINE_CAPACITY];
        buf[..bytes.len()].copy_from_slice(bytes);
        Self {
            tag,
            size: bytes.len() as u16,
            changed: true,
            payload: Payload::Inline(buf),
        }
    }

    fn string(bytes: Cow<'a, [u8]>) -> Self {
        debug_assert!(bytes.len() <= u16::MAX as usize, "string value exceeds 64 KiB");
        let bytes = match bytes {
            Cow::Borrowed(b) if b.len() > u16::MAX as usize => Cow::Borrowed(&b[..u16::MAX as usize]),
            Cow::Owned(mut b) if b.len() > u16::MAX as usize => {
                b.truncate(u16::MAX as usize);
                Cow::Owned(b)
            }
            other => other,
        };
        Self {
            tag: TypeTag::String,
            size: bytes.len() as u16,
            changed: true,
            payload: Payload::Bytes(bytes),
        }
    }

    /// Rebuilds an owned value from a tag and its payload as found on the wire.
    pub fn from_raw(tag: TypeTag, bytes: &[u8]) -> Option<OwnedValue> {
        match tag {
            TypeTag::Nil | TypeTag::Unknown => {
                let mut value = TaggedValue::nil();
                value.tag = tag;
                Some(value)
            }
            TypeTag::String => Some(TaggedValue::string(Cow::Owned(bytes.to_vec()))),
            fixed => {
                if fixed.fixed_size() != Some(bytes.len() as u16) {
                    return None;
                }
                Some(TaggedValue::inline(fixed, bytes))
            }
        }
    }

    /// Replaces the value in place, keeping the current changed flag.
    pub fn assign(&mut self, value: impl Into<TaggedValue<'a>>) {
        let changed = self.changed;
        *self = value.into();
        self.changed = changed;
    }

    pub fn tag(&self) -> TypeTag {
        self.tag
    }

    pub fn size(&self) -> u16 {
        self.size
    }

    pub fn is_changed(&self) -> bool {
        self.changed
    }

    pub fn set_changed(&mut self, changed: bool) {
        self.changed = changed;
    }

    /// Whether the payload is held by this value rather than borrowed.
    pub fn is_owned(&self) -> bool {
        !matches!(self.payload, Payload::Bytes(Cow::Borrowed(_)))
    }

    /// Raw payload exactly as it is written into an event chunk.
    pub fn payload(&self) -> &[u8] {
        match &self.payload {
            Payload::Inline(buf) => &buf[..self.size as usize],
            Payload::Bytes(bytes) => bytes,
        }
    }

    /// Detaches the value from any borrowed memory.
    pub fn into_owned(self) -> OwnedValue {
        let payload = match self.payload {
            Payload::Inline(buf) => Payload::Inline(buf),
            Payload::Bytes(bytes) => Payload::Bytes(Cow::Owned(bytes.into_owned())),
        };
        TaggedValue {
            tag: self.tag,
            size: self.size,
            changed: self.changed,
            payload,
        }
    }

    fn fixed<const N: usize>(&self, tag: TypeTag) -> Option<[u8; N]> {
        debug_assert_eq!(self.tag, tag, "tagged value accessed with the wrong type");
        if self.tag != tag {
            return None;
        }
        self.payload().get(..N)?.try_into().ok()
    }

    pub fn as_i32(&self) -> Option<i32> {
        self.fixed(TypeTag::Int32).map(i32::from_ne_bytes)
    }

    pub fn as_u32(&self) -> Option<u32> {
        self.fixed(TypeTag::UInt32).map(u32::from_ne_bytes)
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.fixed(TypeTag::Int64).map(i64::from_ne_bytes)
    }

    pub fn as_u64(&self) -> Option<u64> {
        self.fixed(TypeTag::UInt64).map(u64::from_ne_bytes)
    }

    pub fn as_f32(&self) -> Option<f32> {
        self.fixed(TypeTag::Float).map(f32::from_ne_bytes)
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.fixed(TypeTag::Double).map(f64::from_ne_bytes)
    }

    pub fn as_vec2(&self) -> Option<Vec2> {
        let raw: [u8; 8] = self.fixed(TypeTag::Vec2)?;
        Some(Vec2::new(read_f32(&raw, 0)?, read_f32(&raw, 4)?))
    }

    pub fn as_vec3(&self) -> Option<Vec3> {
        let raw: [u8; 12] = self.fixed(TypeTag::Vec3)?;
        Some(Vec3::new(read_f32(&raw, 0)?, read_f32(&raw, 4)?, read_f32(&raw, 8)?))
    }

    pub fn as_quat(&self) -> Option<Quat> {
        let raw: [u8; 16] = self.fixed(TypeTag::Quat)?;
        Some(Quat {
            v: Vec3::new(read_f32(&raw, 0)?, read_f32(&raw, 4)?, read_f32(&raw, 8)?),
            w: read_f32(&raw, 12)?,
        })
    }

    /// String payload without any trailing NUL terminator.
    pub fn as_str(&self) -> Option<&str> {
        debug_assert_eq!(self.tag, TypeTag::String, "tagged value accessed with the wrong type");
        if self.tag != TypeTag::String {
            return None;
        }
        let bytes = self.payload();
        let bytes = bytes.strip_suffix(&[0]).unwrap_or(bytes);
        std::str::from_utf8(bytes).ok()
    }
}

impl Default for TaggedValue<'_> {
    fn default() -> Self {
        Self::nil()
    }
}

impl PartialEq for TaggedValue<'_> {
    fn eq(&self, other: &Self) -> bool {
        if self.tag != other.tag || self.size != other.size {
            return false;
        }
        let (lhs, rhs) = (self.payload(), other.payload());
        std::ptr::eq(lhs, rhs) || lhs == rhs
    }
}

impl fmt::Display for TaggedValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tag {
            TypeTag::Nil | TypeTag::Unknown => Ok(()),
            TypeTag::String => {
                let bytes = self.payload();
                let bytes = bytes.strip_suffix(&[0]).unwrap_or(bytes);
                write!(f, "{}", String::from_utf8_lossy(bytes))
            }
            TypeTag::Int32 => write!(f, "{}", self.as_i32().unwrap_or_default()),
            TypeTag::UInt32 => write!(f, "{}", self.as_u32().unwrap_or_default()),
            TypeTag::Int64 => write!(f, "{}", self.as_i64().unwrap_or_default()),
            TypeTag::UInt64 => write!(f, "{}", self.as_u64().unwrap_or_default()),
            TypeTag::Float => write!(f, "{:.6}", self.as_f32().unwrap_or_default()),
            TypeTag::Double => write!(f, "{:.6}", self.as_f64().unwrap_or_default()),
            TypeTag::Vec2 => {
                let v = self.as_vec2().unwrap_or_default();
                write!(f, "{:.6}, {:.6}", v.x, v.y)
            }
            TypeTag::Vec3 => {
                let v = self.as_vec3().unwrap_or_default();
                write!(f, "{:.6}, {:.6}, {:.6}", v.x, v.y, v.z)
            }
            TypeTag::Quat => {
                let q = self.as_quat().unwrap_or_default();
                write!(f, "{:.6}, {:.6}, {:.6}, {:.6}", q.v.x, q.v.y, q.v.z, q.w)
            }
        }
    }
}

macro_rules! impl_from_scalar {
    ($($ty:ty => $tag:ident),* $(,)?) => {
        $(
            impl From<$ty> for TaggedValue<'_> {
                fn from(value: $ty) -> Self {
                    Self::inline(TypeTag::$tag, &value.to_ne_bytes())
                }
            }
        )*
    };
}

impl_from_scalar! {
    i32 => Int32,
    u32 => UInt32,
    i64 => Int64,
    u64 => UInt64,
    f32 => Float,
    f64 => Double,
}

impl From<Vec2> for TaggedValue<'_> {
    fn from(v: Vec2) -> Self {
        let mut raw = [0u8; 8];
        raw[..4].copy_from_slice(&v.x.to_ne_bytes());
        raw[4..].copy_from_slice(&v.y.to_ne_bytes());
        Self::inline(TypeTag::Vec2, &raw)
    }
}

impl From<Vec3> for TaggedValue<'_> {
    fn from(v: Vec3) -> Self {
        let mut raw = [0u8; 12];
        raw[..4].copy_from_slice(&v.x.to_ne_bytes());
        raw[4..8].copy_from_slice(&v.y.to_ne_bytes());
        raw[8..].copy_from_slice(&v.z.to_ne_bytes());
        Self::inline(TypeTag::Vec3, &raw)
    }
}

impl From<Quat> for TaggedValue<'_> {
    fn from(q: Quat) -> Self {
        let mut raw = [0u8; 16];
        raw[..4].copy_from_slice(&q.v.x.to_ne_bytes());
        raw[4..8].copy_from_slice(&q.v.y.to_ne_bytes());
        raw[8..12].copy_from_slice(&q.v.z.to_ne_bytes());
        raw[12..].copy_from_slice(&q.w.to_ne_bytes());
        Self::inline(TypeTag::Quat, &raw)
    }
}

impl<'a> From<&'a str> for TaggedValue<'a> {
    fn from(s: &'a str) -> Self {
        Self::string(Cow::Borrowed(s.as_bytes()))
    }
}

impl From<String> for TaggedValue<'_> {
    fn from(s: String) -> Self {
        Self::string(Cow::Owned(s.into_bytes()))
    }
}

impl<'a> From<&'a CStr> for TaggedValue<'a> {
    fn from(s: &'a CStr) -> Self {
        Self::string(Cow::Borrowed(s.to_bytes_with_nul()))
    }
}

impl From<CString> for TaggedValue<'_> {
    fn from(s: CString) -> Self {
        Self::string(Cow::Owned(s.into_bytes_with_nul()))
    }
}

/// A missing C string encodes as an empty string with no terminator.
impl<'a> From<Option<&'a CStr>> for TaggedValue<'a> {
    fn from(s: Option<&'a CStr>) -> Self {
        match s {
            Some(s) => s.into(),
            None => Self::string(Cow::Borrowed(&[])),
        }
    }
}
