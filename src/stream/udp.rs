use std::io::ErrorKind;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::{Mutex, PoisonError};

use tracing::{debug, info};

use super::TelemetryStream;
use crate::error::{Result, TelemetryError};

#[derive(Debug)]
struct Connection {
    socket: UdpSocket,
    target: SocketAddr,
}

/// Sends every flushed packet as a single datagram to `host:port`.
#[derive(Debug, Default)]
pub struct UdpStream {
    conn: Mutex<Option<Connection>>,
}

impl UdpStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn init(&self, address: &str) -> Result<()> {
        let target = address
            .to_socket_addrs()
            .map_err(|e| TelemetryError::InvalidAddress(format!("{address}: {e}")))?
            .next()
            .ok_or_else(|| TelemetryError::InvalidAddress(address.to_string()))?;

        let local: SocketAddr = if target.is_ipv4() {
            ([0u8; 4], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };
        let socket = UdpSocket::bind(local)?;

        info!("Telemetry UDP stream targeting {}", target);
        *self.conn.lock().unwrap_or_else(PoisonError::into_inner) = Some(Connection { socket, target });
        Ok(())
    }

    pub fn shutdown(&self) {
        if let Some(conn) = self.conn.lock().unwrap_or_else(PoisonError::into_inner).take() {
            debug!("Telemetry UDP stream closed ({})", conn.target);
        }
    }

    pub fn target(&self) -> Option<SocketAddr> {
        self.conn
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|c| c.target)
    }
}

impl TelemetryStream for UdpStream {
    fn write(&self, data: &[u8]) -> std::io::Result<()> {
        let guard = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(conn) => conn.socket.send_to(data, conn.target).map(|_| ()),
            None => Err(std::io::Error::new(ErrorKind::NotConnected, "udp stream is not open")),
        }
    }
}
