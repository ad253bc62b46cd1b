use std::sync::{Mutex, PoisonError};

use super::TelemetryStream;

/// Keeps every written packet in memory. Used for capture and inspection.
#[derive(Debug, Default)]
pub struct MemoryStream {
    packets: Mutex<Vec<Vec<u8>>>,
}

impl MemoryStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn packets(&self) -> Vec<Vec<u8>> {
        self.packets.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// All packets concatenated in write order.
    pub fn bytes(&self) -> Vec<u8> {
        self.packets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .concat()
    }

    pub fn packet_count(&self) -> usize {
        self.packets.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn clear(&self) {
        self.packets.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl TelemetryStream for MemoryStream {
    fn write(&self, data: &[u8]) -> std::io::Result<()> {
        self.packets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(data.to_vec());
        Ok(())
    }
}
