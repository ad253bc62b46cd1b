pub mod declaration;
pub mod telemetry;
pub mod verbosity;

pub use declaration::{AspectDeclaration, EventDeclaration, EventKey};
pub use telemetry::TelemetrySystem;
pub use verbosity::{clamp_verbosity, Verbosity, MIN_VERBOSITY};
