use serde::{Deserialize, Serialize};

/// Ordered importance level. An event is encoded when its verbosity is at or
/// below the effective verbosity of its aspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Verbosity {
    Off = 0,
    Lowest = 1,
    Low = 2,
    #[default]
    Default = 3,
    High = 4,
    Highest = 5,
}

/// Build-time floor: stored verbosity levels never drop below this.
pub const MIN_VERBOSITY: Verbosity = Verbosity::Off;

pub fn clamp_verbosity(verbosity: Verbosity) -> Verbosity {
    verbosity.max(MIN_VERBOSITY)
}
