//! Consumer side of the chunk protocol: splits captured bytes back into chunks.

use super::chunk::{ChunkHeader, ChunkId, CHUNK_HEADER_SIZE};
use crate::error::{Result, TelemetryError};
use crate::value::{OwnedValue, TaggedValue, TypeTag};

/// One framed chunk; `body` excludes the chunk header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawChunk<'a> {
    pub id: u16,
    pub body: &'a [u8],
}

/// Iterates over back-to-back chunks. Stops after the first framing error.
pub struct ChunkReader<'a> {
    data: &'a [u8],
    pos: usize,
    failed: bool,
}

impl<'a> ChunkReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            failed: false,
        }
    }
}

impl<'a> Iterator for ChunkReader<'a> {
    type Item = Result<RawChunk<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.data.len() {
            return None;
        }
        let rest = &self.data[self.pos..];
        let header = match ChunkHeader::decode(rest) {
            Some(header) => header,
            None => {
                self.failed = true;
                return Some(Err(malformed(format!("truncated chunk header at offset {}", self.pos))));
            }
        };
        let size = header.size as usize;
        if size < CHUNK_HEADER_SIZE || size > rest.len() {
            self.failed = true;
            return Some(Err(malformed(format!(
                "chunk at offset {} claims {} bytes, {} available",
                self.pos,
                size,
                rest.len()
            ))));
        }
        self.pos += size;
        Some(Ok(RawChunk {
            id: header.id,
            body: &rest[CHUNK_HEADER_SIZE..size],
        }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub game_name: String,
    pub user_name: String,
    pub build_timestamp: String,
    pub build_version_major: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDeclarationChunk {
    pub aspect_id: u32,
    pub event_id: u32,
    pub table_params: String,
    pub param_types: Vec<TypeTag>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventChunk {
    pub aspect_id: u32,
    pub event_id: u32,
    pub payload: Vec<u8>,
}

impl EventChunk {
    /// Splits the payload using the declared parameter types. String values
    /// are read up to and including their NUL terminator.
    ///
    /// Strings built from `&str` or `String` carry no terminator, so they only
    /// split cleanly in the last position, where they run to the end of the
    /// payload. Anywhere else the string swallows bytes of the following
    /// values. Strings built from `CStr`/`CString` decode in any position.
    pub fn values(&self, decl: &EventDeclarationChunk) -> Option<Vec<OwnedValue>> {
        let mut rest = self.payload.as_slice();
        let mut values = Vec::with_capacity(decl.param_types.len());
        for &tag in &decl.param_types {
            let len = match tag.fixed_size() {
                Some(size) => size as usize,
                None if tag == TypeTag::String => rest
                    .iter()
                    .position(|&b| b == 0)
                    .map_or(rest.len(), |nul| nul + 1),
                None => 0,
            };
            let (bytes, tail) = rest.split_at_checked(len)?;
            values.push(TaggedValue::from_raw(tag, bytes)?);
            rest = tail;
        }
        Some(values)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    PacketHeader { session_id: u64 },
    SessionInfo(SessionInfo),
    EventDeclaration(EventDeclarationChunk),
    Event(EventChunk),
}

impl Chunk {
    pub fn id(&self) -> ChunkId {
        match self {
            Chunk::PacketHeader { .. } => ChunkId::PacketHeader,
            Chunk::SessionInfo(_) => ChunkId::SessionInfo,
            Chunk::EventDeclaration(_) => ChunkId::EventDeclaration,
            Chunk::Event(_) => ChunkId::Event,
        }
    }

    pub fn decode(raw: RawChunk<'_>) -> Result<Self> {
        let id = ChunkId::from_u16(raw.id).ok_or_else(|| malformed(format!("unknown chunk id {}", raw.id)))?;
        let mut fields = Fields::new(raw.body);
        let chunk = match id {
            ChunkId::PacketHeader => Chunk::PacketHeader {
                session_id: fields.u64()?,
            },
            ChunkId::SessionInfo => Chunk::SessionInfo(SessionInfo {
                game_name: fields.c_str()?,
                user_name: fields.c_str()?,
                build_timestamp: fields.c_str()?,
                build_version_major: fields.i32()?,
            }),
            ChunkId::EventDeclaration => {
                let aspect_id = fields.u32()?;
                let event_id = fields.u32()?;
                let table_params = fields.c_str()?;
                let count = fields.u8()? as usize;
                let param_types = (0..count)
                    .map(|_| {
                        let raw = fields.u8()?;
                        TypeTag::from_u8(raw).ok_or_else(|| malformed(format!("unknown type tag {raw}")))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Chunk::EventDeclaration(EventDeclarationChunk {
                    aspect_id,
                    event_id,
                    table_params,
                    param_types,
                })
            }
            ChunkId::Event => Chunk::Event(EventChunk {
                aspect_id: fields.u32()?,
                event_id: fields.u32()?,
                payload: fields.rest().to_vec(),
            }),
        };
        Ok(chunk)
    }
}

/// Decodes every chunk in `data` (one or more concatenated packets).
pub fn decode_chunks(data: &[u8]) -> Result<Vec<Chunk>> {
    ChunkReader::new(data)
        .map(|raw| raw.and_then(Chunk::decode))
        .collect()
}

fn malformed(reason: String) -> TelemetryError {
    TelemetryError::Malformed(reason)
}

struct Fields<'a> {
    data: &'a [u8],
}

impl<'a> Fields<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        let (head, tail) = self
            .data
            .split_first_chunk::<N>()
            .ok_or_else(|| malformed(format!("chunk body ends before a {N}-byte field")))?;
        self.data = tail;
        Ok(*head)
    }

    fn u8(&mut self) -> Result<u8> {
        self.take::<1>().map(|b| b[0])
    }

    fn u32(&mut self) -> Result<u32> {
        self.take().map(u32::from_ne_bytes)
    }

    fn i32(&mut self) -> Result<i32> {
        self.take().map(i32::from_ne_bytes)
    }

    fn u64(&mut self) -> Result<u64> {
        self.take().map(u64::from_ne_bytes)
    }

    fn c_str(&mut self) -> Result<String> {
        let nul = self
            .data
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| malformed("unterminated string".to_string()))?;
        let text = String::from_utf8_lossy(&self.data[..nul]).into_owned();
        self.data = &self.data[nul + 1..];
        Ok(text)
    }

    fn rest(&mut self) -> &'a [u8] {
        std::mem::take(&mut self.data)
    }
}
