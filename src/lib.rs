pub mod config;
pub mod env;
pub mod error;
pub mod host;
pub mod protocol;
pub mod stream;
pub mod system;
pub mod value;

// Re-export the types most callers need
pub use config::TelemetryConfig;
pub use env::{Environment, ManualEnvironment, SystemEnvironment};
pub use error::{Result, TelemetryError};
pub use host::TelemetryHost;
pub use stream::{StreamHandle, TelemetryStream};
pub use system::{TelemetrySystem, Verbosity};
pub use value::{ParameterList, TaggedValue, TypeTag};
