use thiserror::Error;

/// Errors surfaced by the telemetry encoder and its streams.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("failed to allocate send buffer of {capacity} bytes")]
    AllocationFailed { capacity: usize },

    #[error("a chunk is already open")]
    ChunkAlreadyOpen,

    #[error("no chunk is open")]
    NoOpenChunk,

    #[error("telemetry data too big for send buffer ({len} bytes, capacity {capacity})")]
    DataTooBig { len: usize, capacity: usize },

    #[error("parameter list is full")]
    ParamCapacity,

    #[error("telemetry system is not initialized")]
    NotInitialized,

    #[error("invalid stream address: {0}")]
    InvalidAddress(String),

    #[error("malformed telemetry data: {0}")]
    Malformed(String),

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TelemetryError>;
