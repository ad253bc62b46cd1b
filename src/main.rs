use std::sync::Arc;
use std::time::Duration;

use nexus_telemetry::params;
use nexus_telemetry::value::{TaggedValue, Vec3};
use nexus_telemetry::{SystemEnvironment, TelemetryConfig, TelemetryHost, TelemetrySystem, Verbosity};
use tokio::time::MissedTickBehavior;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const ASPECT_SESSION: u32 = 1;
const ASPECT_PLAYER: u32 = 2;

const EVENT_SESSION_START: u32 = 1;
const EVENT_PLAYER_SAMPLE: u32 = 1;

// Demo emitter: streams a synthetic player sample every cadence tick to the
// streams configured in the JSON config (first argument, default `telemetry.json`).
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config_path = std::env::args().nth(1).unwrap_or_else(|| "telemetry.json".to_string());
    let config = TelemetryConfig::load(&config_path)?;
    tracing::info!("Telemetry config loaded from {}", config_path);

    let env = Arc::new(SystemEnvironment::new(config.clone()));
    let system = Arc::new(TelemetrySystem::new(env));
    system.init(config.buffer_size)?;
    system.set_global_verbosity(config.global_verbosity);

    let host = TelemetryHost::from_config(Arc::clone(&system), &config)?;

    system.send(
        ASPECT_SESSION,
        EVENT_SESSION_START,
        "game:string",
        &params![config.game_name.as_str()],
        Verbosity::Lowest,
    )?;

    let mut cadence = tokio::time::interval(Duration::from_millis(100));
    cadence.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut frame: u32 = 0;
    let mut health: f32 = 100.0;

    tracing::info!("Telemetry emitter active. Press Ctrl+C to stop.");
    loop {
        tokio::select! {
            _ = cadence.tick() => {
                frame += 1;
                let angle = frame as f32 * 0.05;
                let position = Vec3::new(angle.cos() * 10.0, angle.sin() * 10.0, 0.0);

                // Health only moves every 10 frames; the sample is skipped when nothing changed.
                let health_changed = frame % 10 == 0;
                if health_changed {
                    health = (health - 1.0).max(0.0);
                }

                let sample = params![
                    TaggedValue::new(frame, health_changed),
                    TaggedValue::new(position, health_changed),
                    TaggedValue::new(health, health_changed),
                ];
                system.send(
                    ASPECT_PLAYER,
                    EVENT_PLAYER_SAMPLE,
                    "frame:uint32,position:vec3,health:float",
                    &sample,
                    Verbosity::Default,
                )?;
                system.update()?;
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    tracing::info!("Shutting down telemetry after {} frames", frame);
    system.shutdown();
    host.file_stream().shutdown()?;
    host.udp_stream().shutdown();
    Ok(())
}
