use std::ops::Index;

use super::tagged::TaggedValue;
use super::types::TypeTag;
use crate::error::{Result, TelemetryError};

pub const MAX_PARAMS: usize = 8;

/// Inline, fixed-capacity list of event field values (no heap growth).
#[derive(Debug, Clone, Default)]
pub struct ParameterList<'a> {
    values: [TaggedValue<'a>; MAX_PARAMS],
    count: usize,
}

impl<'a> ParameterList<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value. A ninth value is a caller bug and is rejected.
    pub fn push(&mut self, value: impl Into<TaggedValue<'a>>) -> Result<()> {
        debug_assert!(self.count < MAX_PARAMS, "parameter list capacity exceeded");
        if self.count >= MAX_PARAMS {
            return Err(TelemetryError::ParamCapacity);
        }
        self.values[self.count] = value.into();
        self.count += 1;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &TaggedValue<'a>> {
        self.values[..self.count].iter()
    }

    pub fn type_tags(&self) -> Vec<TypeTag> {
        self.iter().map(TaggedValue::tag).collect()
    }

    /// True when the event should be encoded: no parameters at all, or at least
    /// one parameter flagged as changed.
    pub fn any_changed(&self) -> bool {
        self.is_empty() || self.iter().any(TaggedValue::is_changed)
    }

    /// Total size of the concatenated payloads.
    pub fn payload_len(&self) -> usize {
        self.iter().map(|v| v.size() as usize).sum()
    }
}

impl<'a> Index<usize> for ParameterList<'a> {
    type Output = TaggedValue<'a>;

    fn index(&self, index: usize) -> &Self::Output {
        assert!(index < self.count, "parameter index {index} out of range (len {})", self.count);
        &self.values[index]
    }
}

/// Builds a [`ParameterList`] from up to eight values.
///
/// ```
/// use nexus_telemetry::params;
/// let list = params![5i32, "spawn", 1.5f32];
/// assert_eq!(list.len(), 3);
/// ```
///
/// The argument count is checked at compile time, so a ninth value never
/// reaches [`ParameterList::push`]:
///
/// ```compile_fail
/// use nexus_telemetry::params;
/// let list = params![1i32, 2i32, 3i32, 4i32, 5i32, 6i32, 7i32, 8i32, 9i32];
/// ```
#[macro_export]
macro_rules! params {
    () => { $crate::value::ParameterList::new() };
    ($($value:expr),+ $(,)?) => {{
        const _: () = assert!(
            [$(stringify!($value)),+].len() <= $crate::value::MAX_PARAMS,
            "params! takes at most eight values"
        );
        let mut list = $crate::value::ParameterList::new();
        $(
            // Cannot fail: the count is bounded above
            let _ = list.push($value);
        )+
        list
    }};
}
