use super::verbosity::Verbosity;
use crate::value::{ParameterList, TypeTag};

/// Per-aspect verbosity override. `None` defers to the global verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AspectDeclaration {
    pub verbosity: Option<Verbosity>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventKey {
    pub aspect_id: u32,
    pub event_id: u32,
}

impl EventKey {
    pub fn new(aspect_id: u32, event_id: u32) -> Self {
        Self { aspect_id, event_id }
    }
}

/// Schema of an event, fixed the first time the event is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDeclaration {
    pub table_params: String,
    pub param_types: Vec<TypeTag>,
    pub verbosity: Verbosity,
}

impl EventDeclaration {
    pub fn new(table_params: &str, params: &ParameterList<'_>, verbosity: Verbosity) -> Self {
        Self {
            table_params: table_params.to_string(),
            param_types: params.type_tags(),
            verbosity,
        }
    }

    /// Whether a later send uses the same shape as the declaration.
    pub fn matches(&self, table_params: &str, params: &ParameterList<'_>, verbosity: Verbosity) -> bool {
        self.table_params == table_params
            && self.verbosity == verbosity
            && self.param_types.len() == params.len()
            && self.param_types.iter().zip(params.iter()).all(|(tag, v)| *tag == v.tag())
    }
}
