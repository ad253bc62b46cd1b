use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::chunk::{ChunkHeader, ChunkId, PacketHeader, PACKET_HEADER_SIZE};
use crate::env::Environment;
use crate::error::{Result, TelemetryError};
use crate::stream::{same_stream, StreamHandle};
use crate::value::ParameterList;

/// Fixed-size arena that accumulates chunks and fans complete packets out to
/// the attached streams.
///
/// The arena always starts with a packet header. At most one chunk is open at
/// a time; a flush never emits a partially written chunk, it carries the open
/// chunk's bytes over into the fresh packet instead.
pub struct SendBuffer {
    arena: Vec<u8>,
    pos: usize,
    chunk_pos: Option<usize>,
    session_id: u64,
    streams: Vec<StreamHandle>,
    env: Arc<dyn Environment>,
    last_flush: Duration,
}

impl SendBuffer {
    pub fn init(capacity: usize, session_id: u64, env: Arc<dyn Environment>) -> Result<Self> {
        let capacity = capacity.max(PACKET_HEADER_SIZE);
        let mut arena = Vec::new();
        arena
            .try_reserve_exact(capacity)
            .map_err(|_| TelemetryError::AllocationFailed { capacity })?;
        arena.resize(capacity, 0);

        let last_flush = env.async_time();
        let mut buffer = Self {
            arena,
            pos: 0,
            chunk_pos: None,
            session_id,
            streams: Vec::new(),
            env,
            last_flush,
        };
        buffer.write_packet_header();
        Ok(buffer)
    }

    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    pub fn capacity(&self) -> usize {
        self.arena.len()
    }

    /// Bytes accumulated since the last flush, packet header included.
    pub fn pending(&self) -> &[u8] {
        &self.arena[..self.pos]
    }

    pub fn is_chunk_open(&self) -> bool {
        self.chunk_pos.is_some()
    }

    pub fn stream_count(&self) -> usize {
        self.streams.len()
    }

    pub fn begin_chunk(&mut self, id: ChunkId) -> Result<()> {
        if self.chunk_pos.is_some() {
            return Err(TelemetryError::ChunkAlreadyOpen);
        }
        self.chunk_pos = Some(self.pos);
        self.do_write(&ChunkHeader::new(id, 0).encode())
    }

    /// Closes the open chunk and patches its header with the full chunk span.
    pub fn end_chunk(&mut self) -> Result<()> {
        let start = self.chunk_pos.ok_or(TelemetryError::NoOpenChunk)?;
        let size = self.pos - start;
        if size > u16::MAX as usize {
            self.abandon_chunk();
            warn!("telemetry chunk of {} bytes exceeds the 16-bit chunk size", size);
            return Err(TelemetryError::DataTooBig {
                len: size,
                capacity: u16::MAX as usize,
            });
        }
        self.arena[start + 2..start + 4].copy_from_slice(&(size as u16).to_ne_bytes());
        self.chunk_pos = None;
        Ok(())
    }

    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.require_open_chunk()?;
        self.do_write(data)
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_bytes(&[value])
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.write_bytes(&value.to_ne_bytes())
    }

    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.write_bytes(&value.to_ne_bytes())
    }

    /// Writes the string followed by a NUL terminator.
    pub fn write_str(&mut self, value: &str) -> Result<()> {
        self.require_open_chunk()?;
        self.do_write(value.as_bytes())?;
        self.do_write(&[0])
    }

    /// Writes the raw payload of every parameter, without type tags.
    pub fn write_params(&mut self, params: &ParameterList<'_>) -> Result<()> {
        self.require_open_chunk()?;
        for value in params.iter() {
            self.do_write(value.payload())?;
        }
        Ok(())
    }

    /// Emits everything before the open chunk (or everything, if none is open)
    /// to `target`, or to every attached stream when `target` is `None`, then
    /// starts a new packet and carries the open chunk's bytes over.
    ///
    /// Streams must accept packets that hold nothing but the packet header.
    /// They come from keep-alive flushes in [`update`](Self::update), and from
    /// an overflowing write whose chunk is the first in the packet: that write
    /// flushes the bare header before the chunk is abandoned.
    pub fn flush(&mut self, target: Option<&StreamHandle>) {
        let end = self.chunk_pos.unwrap_or(self.pos);
        let carried = end..self.pos;

        let packet = &self.arena[..end];
        match target {
            Some(stream) => write_packet(stream, packet),
            None => {
                for stream in &self.streams {
                    write_packet(stream, packet);
                }
            }
        }
        debug!("Telemetry flush: {} bytes, {} carried", end, carried.len());

        self.write_packet_header();
        if self.chunk_pos.is_some() {
            let carried_len = carried.len();
            self.arena.copy_within(carried, self.pos);
            self.chunk_pos = Some(self.pos);
            self.pos += carried_len;
        }
        self.last_flush = self.env.async_time();
    }

    /// Keep-alive: flushes when nothing was flushed for longer than the configured interval.
    pub fn update(&mut self) {
        let idle = self.env.async_time().saturating_sub(self.last_flush);
        if idle > self.env.keep_alive() {
            self.flush(None);
        }
    }

    /// Attaches a stream and replays the session info to it alone.
    pub fn attach_stream(&mut self, stream: StreamHandle) -> Result<()> {
        self.flush(None);
        if self.streams.iter().any(|s| same_stream(s, &stream)) {
            return Ok(());
        }
        // A stream that cannot get its session info is not attached
        self.write_session_info()?;
        self.streams.push(Arc::clone(&stream));
        debug!("Telemetry stream attached ({} total)", self.streams.len());

        self.flush(Some(&stream));
        Ok(())
    }

    pub fn detach_stream(&mut self, stream: &StreamHandle) {
        let before = self.streams.len();
        self.streams.retain(|s| !same_stream(s, stream));
        if self.streams.len() != before {
            debug!("Telemetry stream detached ({} remaining)", self.streams.len());
        }
    }

    /// Flushes what is left and releases the streams.
    pub fn shutdown(mut self) {
        self.flush(None);
        self.streams.clear();
    }

    fn write_session_info(&mut self) -> Result<()> {
        let build = self.env.build_info();
        let game_name = self.env.game_name();
        let user_name = self.env.user_name();

        self.begin_chunk(ChunkId::SessionInfo)?;
        self.write_str(&game_name)?;
        self.write_str(&user_name)?;
        self.write_str(&build.timestamp)?;
        self.write_i32(build.version_major)?;
        self.end_chunk()
    }

    fn write_packet_header(&mut self) {
        let header = PacketHeader {
            session_id: self.session_id,
        };
        self.arena[..PACKET_HEADER_SIZE].copy_from_slice(&header.encode());
        self.pos = PACKET_HEADER_SIZE;
    }

    fn require_open_chunk(&self) -> Result<()> {
        if self.chunk_pos.is_none() {
            return Err(TelemetryError::NoOpenChunk);
        }
        Ok(())
    }

    fn abandon_chunk(&mut self) {
        if let Some(start) = self.chunk_pos.take() {
            self.pos = start;
        }
    }

    fn do_write(&mut self, data: &[u8]) -> Result<()> {
        if self.pos + data.len() > self.arena.len() {
            self.flush(None);
            if self.pos + data.len() > self.arena.len() {
                self.abandon_chunk();
                warn!("telemetry data too big for send buffer");
                return Err(TelemetryError::DataTooBig {
                    len: data.len(),
                    capacity: self.arena.len(),
                });
            }
        }
        self.arena[self.pos..self.pos + data.len()].copy_from_slice(data);
        self.pos += data.len();
        Ok(())
    }
}

fn write_packet(stream: &StreamHandle, packet: &[u8]) {
    if let Err(e) = stream.write(packet) {
        warn!("Telemetry stream write failed: {}", e);
    }
}
