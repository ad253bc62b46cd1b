//! Output streams fed by the send buffer on every flush.
//!
//! Transport is entirely the stream's business: the send buffer hands over
//! complete packets (packet header + whole chunks) and never retries.

pub mod file;
pub mod memory;
pub mod udp;

use std::sync::Arc;

pub use file::FileStream;
pub use memory::MemoryStream;
pub use udp::UdpStream;

pub trait TelemetryStream: Send + Sync {
    /// Writes one flushed packet. Called synchronously while the telemetry lock is held.
    fn write(&self, data: &[u8]) -> std::io::Result<()>;
}

pub type StreamHandle = Arc<dyn TelemetryStream>;

/// Streams are identified by the allocation they point at.
pub fn same_stream(a: &StreamHandle, b: &StreamHandle) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}
