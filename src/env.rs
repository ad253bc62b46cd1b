//! Host collaborators: clock, settings and process identity.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::config::TelemetryConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInfo {
    pub timestamp: String,
    pub version_major: i32,
}

impl BuildInfo {
    pub fn current() -> Self {
        Self {
            timestamp: option_env!("NEXUS_BUILD_TIMESTAMP").unwrap_or("unknown").to_string(),
            version_major: env!("CARGO_PKG_VERSION_MAJOR").parse().unwrap_or(0),
        }
    }
}

pub trait Environment: Send + Sync {
    /// Monotonic time, used for keep-alive checks and session ids.
    fn async_time(&self) -> Duration;
    fn keep_alive(&self) -> Duration;
    fn game_name(&self) -> String;
    fn user_name(&self) -> String;
    fn build_info(&self) -> BuildInfo;
}

/// Session id: clock seconds in the high half, CRC32 of the user name in the low half.
pub fn generate_session_id(env: &dyn Environment) -> u64 {
    let time = env.async_time().as_secs() as u32 as u64;
    let user = crc32fast::hash(env.user_name().as_bytes()) as u64;
    (time << 32) | user
}

/// Environment backed by the real process: wall-anchored monotonic clock,
/// `USER`/`USERNAME` identity and a [`TelemetryConfig`].
#[derive(Debug)]
pub struct SystemEnvironment {
    config: TelemetryConfig,
    origin: Instant,
    epoch_at_origin: Duration,
    user_name: String,
}

impl SystemEnvironment {
    pub fn new(config: TelemetryConfig) -> Self {
        let user_name = std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "unknown".to_string());
        Self {
            config,
            origin: Instant::now(),
            epoch_at_origin: SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default(),
            user_name,
        }
    }

    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }
}

impl Environment for SystemEnvironment {
    fn async_time(&self) -> Duration {
        self.epoch_at_origin + self.origin.elapsed()
    }

    fn keep_alive(&self) -> Duration {
        self.config.keep_alive()
    }

    fn game_name(&self) -> String {
        self.config.game_name.clone()
    }

    fn user_name(&self) -> String {
        self.user_name.clone()
    }

    fn build_info(&self) -> BuildInfo {
        BuildInfo::current()
    }
}

/// Hand-driven environment for tests and replay tools.
#[derive(Debug)]
pub struct ManualEnvironment {
    now: Mutex<Duration>,
    keep_alive: Duration,
    game_name: String,
    user_name: String,
    build: BuildInfo,
}

impl ManualEnvironment {
    pub fn new(game_name: &str, user_name: &str) -> Self {
        Self {
            now: Mutex::new(Duration::ZERO),
            keep_alive: TelemetryConfig::default().keep_alive(),
            game_name: game_name.to_string(),
            user_name: user_name.to_string(),
            build: BuildInfo {
                timestamp: "test".to_string(),
                version_major: 1,
            },
        }
    }

    pub fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    pub fn with_build(mut self, build: BuildInfo) -> Self {
        self.build = build;
        self
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) += by;
    }

    pub fn set_time(&self, now: Duration) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = now;
    }
}

impl Environment for ManualEnvironment {
    fn async_time(&self) -> Duration {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn keep_alive(&self) -> Duration {
        self.keep_alive
    }

    fn game_name(&self) -> String {
        self.game_name.clone()
    }

    fn user_name(&self) -> String {
        self.user_name.clone()
    }

    fn build_info(&self) -> BuildInfo {
        self.build.clone()
    }
}
