use std::sync::Arc;
use std::time::Duration;

use nexus_telemetry::env::ManualEnvironment;
use nexus_telemetry::error::TelemetryError;
use nexus_telemetry::protocol::{
    decode_chunks, Chunk, ChunkHeader, ChunkId, ChunkReader, PacketHeader, SendBuffer, CHUNK_HEADER_SIZE,
    PACKET_HEADER_SIZE,
};
use nexus_telemetry::stream::{MemoryStream, StreamHandle};

fn test_env() -> Arc<ManualEnvironment> {
    Arc::new(ManualEnvironment::new("demo", "alice").with_keep_alive(Duration::from_secs(5)))
}

fn raw_chunks(packet: &[u8]) -> Vec<(u16, Vec<u8>)> {
    ChunkReader::new(packet)
        .map(|chunk| chunk.map(|c| (c.id, c.body.to_vec())))
        .collect::<Result<_, _>>()
        .expect("packet should frame cleanly")
}

#[test]
fn test_init_writes_packet_header() {
    let env = test_env();
    let buffer = SendBuffer::init(0x100, 0xABCD, env).unwrap();

    assert_eq!(buffer.capacity(), 0x100);
    assert_eq!(buffer.pending(), PacketHeader { session_id: 0xABCD }.encode());
    assert!(!buffer.is_chunk_open());
}

#[test]
fn test_init_enforces_minimum_capacity() {
    let buffer = SendBuffer::init(0, 1, test_env()).unwrap();
    assert_eq!(buffer.capacity(), PACKET_HEADER_SIZE);
}

#[test]
fn test_first_packet_starts_with_session_header() {
    let mut buffer = SendBuffer::init(0x100, 0x1122_3344_5566_7788, test_env()).unwrap();
    let stream = Arc::new(MemoryStream::new());
    buffer.attach_stream(stream.clone()).unwrap();
    buffer.flush(None);

    for packet in stream.packets() {
        let chunks = decode_chunks(&packet).unwrap();
        assert_eq!(
            chunks[0],
            Chunk::PacketHeader {
                session_id: 0x1122_3344_5566_7788
            }
        );
    }
}

#[test]
fn test_chunk_size_covers_whole_chunk() {
    let mut buffer = SendBuffer::init(0x100, 7, test_env()).unwrap();
    let stream = Arc::new(MemoryStream::new());
    buffer.attach_stream(stream.clone()).unwrap();

    buffer.begin_chunk(ChunkId::Event).unwrap();
    buffer.write_bytes(&[1, 2, 3, 4, 5]).unwrap();
    buffer.end_chunk().unwrap();
    buffer.flush(None);

    let packets = stream.packets();
    let last = packets.last().unwrap();
    assert_eq!(last.len(), PACKET_HEADER_SIZE + CHUNK_HEADER_SIZE + 5);

    let header = ChunkHeader::decode(&last[PACKET_HEADER_SIZE..]).unwrap();
    assert_eq!(header.id, ChunkId::Event as u16);
    assert_eq!(header.size as usize, CHUNK_HEADER_SIZE + 5);

    let chunks = raw_chunks(last);
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[1], (ChunkId::Event as u16, vec![1, 2, 3, 4, 5]));
}

#[test]
fn test_chunk_discipline_errors() {
    let mut buffer = SendBuffer::init(0x100, 1, test_env()).unwrap();

    assert!(matches!(buffer.end_chunk(), Err(TelemetryError::NoOpenChunk)));
    assert!(matches!(buffer.write_bytes(&[1]), Err(TelemetryError::NoOpenChunk)));
    assert!(matches!(buffer.write_str("x"), Err(TelemetryError::NoOpenChunk)));

    buffer.begin_chunk(ChunkId::Event).unwrap();
    assert!(matches!(
        buffer.begin_chunk(ChunkId::Event),
        Err(TelemetryError::ChunkAlreadyOpen)
    ));
    buffer.end_chunk().unwrap();
    assert!(!buffer.is_chunk_open());
}

#[test]
fn test_write_str_appends_terminator() {
    let mut buffer = SendBuffer::init(0x100, 1, test_env()).unwrap();
    buffer.begin_chunk(ChunkId::Event).unwrap();
    buffer.write_str("abc").unwrap();
    buffer.end_chunk().unwrap();

    let chunks = raw_chunks(buffer.pending());
    assert_eq!(chunks[1].1, b"abc\0".to_vec());
}

#[test]
fn test_overflow_abandons_chunk() {
    // Short names keep the session info chunk within the 32-byte arena
    let env = Arc::new(ManualEnvironment::new("g", "u"));
    let mut buffer = SendBuffer::init(32, 9, env).unwrap();
    let stream = Arc::new(MemoryStream::new());
    let handle: StreamHandle = stream.clone();

    buffer.begin_chunk(ChunkId::Event).unwrap();
    let result = buffer.write_bytes(&[0xEE; 40]);
    assert!(matches!(result, Err(TelemetryError::DataTooBig { len: 40, capacity: 32 })));

    // Only the rewritten packet header remains, and no chunk is open
    assert_eq!(buffer.pending(), PacketHeader { session_id: 9 }.encode());
    assert!(!buffer.is_chunk_open());

    // The buffer keeps working afterwards
    buffer.attach_stream(handle).unwrap();
    buffer.begin_chunk(ChunkId::Event).unwrap();
    buffer.write_bytes(&[1, 2]).unwrap();
    buffer.end_chunk().unwrap();
    buffer.flush(None);

    let bytes = stream.bytes();
    assert!(!bytes.windows(4).any(|w| w == [0xEE; 4]), "no garbage from the abandoned chunk");
}

#[test]
fn test_attach_fails_cleanly_when_session_info_overflows() {
    let long_user = "u".repeat(40);
    let env = Arc::new(ManualEnvironment::new("g", &long_user));
    let mut buffer = SendBuffer::init(32, 1, env).unwrap();
    let stream = Arc::new(MemoryStream::new());

    let result = buffer.attach_stream(stream.clone());
    assert!(matches!(result, Err(TelemetryError::DataTooBig { len: 40, capacity: 32 })));
    assert_eq!(buffer.stream_count(), 0);
    assert!(!buffer.is_chunk_open());

    // Nothing reaches the rejected stream later on
    buffer.flush(None);
    assert_eq!(stream.packet_count(), 0);
}

#[test]
fn test_overflow_of_first_chunk_flushes_bare_header() {
    let env = Arc::new(ManualEnvironment::new("g", "u"));
    let mut buffer = SendBuffer::init(32, 9, env).unwrap();
    let stream = Arc::new(MemoryStream::new());
    buffer.attach_stream(stream.clone()).unwrap();
    stream.clear();

    buffer.begin_chunk(ChunkId::Event).unwrap();
    assert!(buffer.write_bytes(&[0xEE; 40]).is_err());

    assert_eq!(stream.packets(), vec![PacketHeader { session_id: 9 }.encode().to_vec()]);
}

#[test]
fn test_open_chunk_carries_over_implicit_flush() {
    let mut buffer = SendBuffer::init(64, 3, test_env()).unwrap();
    let stream = Arc::new(MemoryStream::new());
    let handle: StreamHandle = stream.clone();
    buffer.attach_stream(handle).unwrap();
    stream.clear();

    buffer.begin_chunk(ChunkId::Event).unwrap();
    buffer.write_bytes(&[0xA1; 30]).unwrap();
    buffer.end_chunk().unwrap();

    buffer.begin_chunk(ChunkId::Event).unwrap();
    buffer.write_bytes(&[0xB2; 10]).unwrap();
    // Does not fit: flushes the first chunk, keeps the open one
    buffer.write_bytes(&[0xB3; 10]).unwrap();
    assert!(buffer.is_chunk_open());
    buffer.end_chunk().unwrap();
    buffer.flush(None);

    let packets = stream.packets();
    assert_eq!(packets.len(), 2);

    let first = raw_chunks(&packets[0]);
    assert_eq!(first.len(), 2);
    assert_eq!(first[1].1, vec![0xA1; 30]);

    let second = raw_chunks(&packets[1]);
    assert_eq!(second.len(), 2);
    assert_eq!(second[0].0, ChunkId::PacketHeader as u16);
    let mut expected = vec![0xB2; 10];
    expected.extend_from_slice(&[0xB3; 10]);
    assert_eq!(second[1].1, expected);
}

#[test]
fn test_attach_replays_session_info_to_new_stream_only() {
    let mut buffer = SendBuffer::init(0x100, 5, test_env()).unwrap();
    let a = Arc::new(MemoryStream::new());
    let b = Arc::new(MemoryStream::new());

    buffer.attach_stream(a.clone()).unwrap();
    buffer.attach_stream(b.clone()).unwrap();

    let a_chunks = decode_chunks(&a.bytes()).unwrap();
    let b_chunks = decode_chunks(&b.bytes()).unwrap();

    let count_info = |chunks: &[Chunk]| chunks.iter().filter(|c| matches!(c, Chunk::SessionInfo(_))).count();
    assert_eq!(count_info(&a_chunks), 1);
    assert_eq!(count_info(&b_chunks), 1);

    let info = b_chunks
        .iter()
        .find_map(|c| match c {
            Chunk::SessionInfo(info) => Some(info.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(info.game_name, "demo");
    assert_eq!(info.user_name, "alice");
    assert_eq!(info.build_timestamp, "test");
    assert_eq!(info.build_version_major, 1);
}

#[test]
fn test_attach_is_deduplicated_by_identity() {
    let mut buffer = SendBuffer::init(0x100, 5, test_env()).unwrap();
    let stream = Arc::new(MemoryStream::new());

    buffer.attach_stream(stream.clone()).unwrap();
    buffer.attach_stream(stream.clone()).unwrap();
    assert_eq!(buffer.stream_count(), 1);

    let infos = decode_chunks(&stream.bytes())
        .unwrap()
        .into_iter()
        .filter(|c| matches!(c, Chunk::SessionInfo(_)))
        .count();
    assert_eq!(infos, 1);
}

#[test]
fn test_detach_stops_delivery() {
    let mut buffer = SendBuffer::init(0x100, 5, test_env()).unwrap();
    let stream = Arc::new(MemoryStream::new());
    let handle: StreamHandle = stream.clone();

    buffer.attach_stream(handle.clone()).unwrap();
    buffer.detach_stream(&handle);
    assert_eq!(buffer.stream_count(), 0);

    let before = stream.packet_count();
    buffer.flush(None);
    assert_eq!(stream.packet_count(), before);
}

#[test]
fn test_update_sends_keep_alive_after_idle_interval() {
    let env = test_env();
    let mut buffer = SendBuffer::init(0x100, 5, env.clone()).unwrap();
    let stream = Arc::new(MemoryStream::new());
    buffer.attach_stream(stream.clone()).unwrap();
    let after_attach = stream.packet_count();

    env.advance(Duration::from_secs(3));
    buffer.update();
    assert_eq!(stream.packet_count(), after_attach, "not idle long enough");

    env.advance(Duration::from_secs(3));
    buffer.update();
    assert_eq!(stream.packet_count(), after_attach + 1);

    // Heartbeat is a bare packet header
    let heartbeat = stream.packets().pop().unwrap();
    assert_eq!(heartbeat, PacketHeader { session_id: 5 }.encode());

    buffer.update();
    assert_eq!(stream.packet_count(), after_attach + 1, "flush resets the idle timer");
}

#[test]
fn test_shutdown_flushes_pending_chunks() {
    let mut buffer = SendBuffer::init(0x100, 5, test_env()).unwrap();
    let stream = Arc::new(MemoryStream::new());
    buffer.attach_stream(stream.clone()).unwrap();

    buffer.begin_chunk(ChunkId::Event).unwrap();
    buffer.write_u32(10).unwrap();
    buffer.write_u32(20).unwrap();
    buffer.end_chunk().unwrap();
    buffer.shutdown();

    let chunks = decode_chunks(&stream.packets().pop().unwrap()).unwrap();
    assert!(matches!(
        chunks.last(),
        Some(Chunk::Event(event)) if event.aspect_id == 10 && event.event_id == 20
    ));
}

#[test]
fn test_reader_rejects_bad_framing() {
    let mut bytes = PacketHeader { session_id: 1 }.encode().to_vec();
    bytes.extend_from_slice(&ChunkHeader::new(ChunkId::Event, 200).encode());
    bytes.extend_from_slice(&[0; 8]);

    let mut reader = ChunkReader::new(&bytes);
    assert!(reader.next().unwrap().is_ok());
    assert!(matches!(reader.next(), Some(Err(TelemetryError::Malformed(_)))));
    assert!(reader.next().is_none());
}
