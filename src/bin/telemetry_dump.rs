use std::collections::HashMap;
use std::fs;

use anyhow::{anyhow, Context};
use nexus_telemetry::protocol::{decode_chunks, Chunk, EventDeclarationChunk};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let path = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow!("usage: telemetry-dump <capture-file>"))?;
    let data = fs::read(&path).with_context(|| format!("reading {path}"))?;
    let chunks = decode_chunks(&data)?;
    tracing::info!("{}: {} bytes, {} chunks", path, data.len(), chunks.len());

    let mut declarations: HashMap<(u32, u32), EventDeclarationChunk> = HashMap::new();
    for chunk in chunks {
        match chunk {
            Chunk::PacketHeader { session_id } => println!("packet  session={session_id:#018x}"),
            Chunk::SessionInfo(info) => println!(
                "session game={} user={} build={} v{}",
                info.game_name, info.user_name, info.build_timestamp, info.build_version_major
            ),
            Chunk::EventDeclaration(decl) => {
                println!(
                    "declare {}:{} \"{}\" {:?}",
                    decl.aspect_id, decl.event_id, decl.table_params, decl.param_types
                );
                declarations.insert((decl.aspect_id, decl.event_id), decl);
            }
            Chunk::Event(event) => {
                let rendered = declarations
                    .get(&(event.aspect_id, event.event_id))
                    .and_then(|decl| event.values(decl))
                    .map(|values| values.iter().map(ToString::to_string).collect::<Vec<_>>().join(" | "))
                    .unwrap_or_else(|| format!("<{} undeclared bytes>", event.payload.len()));
                println!("event   {}:{} {}", event.aspect_id, event.event_id, rendered);
            }
        }
    }
    Ok(())
}
