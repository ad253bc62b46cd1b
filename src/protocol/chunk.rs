//! Chunk framing for the telemetry byte stream.
//!
//! Every packet starts with a `PacketHeader` chunk; the remaining chunks are
//! appended back to back. Each chunk begins with a [`ChunkHeader`] whose `size`
//! covers the whole chunk, header included. Fields are packed and written in
//! host byte order.

pub const CHUNK_HEADER_SIZE: usize = 4;
pub const PACKET_HEADER_SIZE: usize = CHUNK_HEADER_SIZE + 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ChunkId {
    PacketHeader = 0,
    SessionInfo = 1,
    EventDeclaration = 2,
    Event = 3,
}

impl ChunkId {
    pub fn from_u16(raw: u16) -> Option<Self> {
        match raw {
            0 => Some(ChunkId::PacketHeader),
            1 => Some(ChunkId::SessionInfo),
            2 => Some(ChunkId::EventDeclaration),
            3 => Some(ChunkId::Event),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub id: u16,
    pub size: u16,
}

impl ChunkHeader {
    pub fn new(id: ChunkId, size: u16) -> Self {
        Self { id: id as u16, size }
    }

    pub fn encode(&self) -> [u8; CHUNK_HEADER_SIZE] {
        let mut out = [0u8; CHUNK_HEADER_SIZE];
        out[..2].copy_from_slice(&self.id.to_ne_bytes());
        out[2..].copy_from_slice(&self.size.to_ne_bytes());
        out
    }

    pub fn decode(bytes: &[u8]) -> Option<Self> {
        let id = u16::from_ne_bytes(bytes.get(0..2)?.try_into().ok()?);
        let size = u16::from_ne_bytes(bytes.get(2..4)?.try_into().ok()?);
        Some(Self { id, size })
    }
}

/// First chunk of every packet, carrying the session id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    pub session_id: u64,
}

impl PacketHeader {
    pub fn encode(&self) -> [u8; PACKET_HEADER_SIZE] {
        let mut out = [0u8; PACKET_HEADER_SIZE];
        let header = ChunkHeader::new(ChunkId::PacketHeader, PACKET_HEADER_SIZE as u16);
        out[..CHUNK_HEADER_SIZE].copy_from_slice(&header.encode());
        out[CHUNK_HEADER_SIZE..].copy_from_slice(&self.session_id.to_ne_bytes());
        out
    }
}
