pub mod chunk;
pub mod reader;
pub mod send_buffer;

pub use chunk::{ChunkHeader, ChunkId, PacketHeader, CHUNK_HEADER_SIZE, PACKET_HEADER_SIZE};
pub use reader::{decode_chunks, Chunk, ChunkReader, EventChunk, EventDeclarationChunk, RawChunk, SessionInfo};
pub use send_buffer::SendBuffer;
