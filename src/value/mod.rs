pub mod params;
pub mod tagged;
pub mod types;

pub use params::{ParameterList, MAX_PARAMS};
pub use tagged::{OwnedValue, TaggedValue};
pub use types::{Quat, TypeTag, Vec2, Vec3};
