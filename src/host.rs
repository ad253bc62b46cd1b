//! Engine-side wiring: keeps the file and UDP streams in sync with their settings.

use std::sync::Arc;

use tracing::warn;

use crate::config::{stream_setting_enabled, TelemetryConfig};
use crate::error::Result;
use crate::stream::{FileStream, StreamHandle, UdpStream};
use crate::system::TelemetrySystem;

pub struct TelemetryHost {
    system: Arc<TelemetrySystem>,
    file: Arc<FileStream>,
    udp: Arc<UdpStream>,
}

impl TelemetryHost {
    pub fn new(system: Arc<TelemetrySystem>) -> Self {
        Self {
            system,
            file: Arc::new(FileStream::new()),
            udp: Arc::new(UdpStream::new()),
        }
    }

    /// Builds a host and applies the stream settings of `config`.
    pub fn from_config(system: Arc<TelemetrySystem>, config: &TelemetryConfig) -> Result<Self> {
        let host = Self::new(system);
        host.set_stream_file(&config.stream_file)?;
        host.set_stream_ip(&config.stream_ip)?;
        Ok(host)
    }

    pub fn system(&self) -> &Arc<TelemetrySystem> {
        &self.system
    }

    pub fn file_stream(&self) -> &Arc<FileStream> {
        &self.file
    }

    pub fn udp_stream(&self) -> &Arc<UdpStream> {
        &self.udp
    }

    /// Re-targets the capture file. `""` or a value starting with `'0'` turns it off.
    pub fn set_stream_file(&self, file_name: &str) -> Result<()> {
        let handle: StreamHandle = self.file.clone();
        self.system.flush()?;
        self.system.detach_stream(&handle)?;
        self.file.shutdown()?;

        if stream_setting_enabled(file_name) {
            match self.file.init(file_name) {
                Ok(()) => self.system.attach_stream(handle)?,
                Err(e) => warn!("Failed to initialize telemetry file stream: {}", e),
            }
        }
        Ok(())
    }

    /// Re-targets the UDP collector (`host:port`). `""` or a leading `'0'` turns it off.
    pub fn set_stream_ip(&self, address: &str) -> Result<()> {
        let handle: StreamHandle = self.udp.clone();
        self.system.flush()?;
        self.system.detach_stream(&handle)?;
        self.udp.shutdown();

        if stream_setting_enabled(address) {
            match self.udp.init(address) {
                Ok(()) => self.system.attach_stream(handle)?,
                Err(e) => warn!("Failed to initialize telemetry UDP stream: {}", e),
            }
        }
        Ok(())
    }
}
