use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use super::declaration::{AspectDeclaration, EventDeclaration, EventKey};
use super::verbosity::{clamp_verbosity, Verbosity};
use crate::env::{generate_session_id, Environment};
use crate::error::{Result, TelemetryError};
use crate::protocol::{ChunkId, SendBuffer};
use crate::stream::StreamHandle;
use crate::value::ParameterList;

enum State {
    Uninitialized,
    Initialized(SendBuffer),
    Shutdown,
}

struct Inner {
    state: State,
    global_verbosity: Verbosity,
    aspects: HashMap<u32, AspectDeclaration>,
    events: HashMap<EventKey, EventDeclaration>,
}

impl Inner {
    fn buffer(&mut self) -> Result<&mut SendBuffer> {
        match &mut self.state {
            State::Initialized(buffer) => Ok(buffer),
            State::Uninitialized | State::Shutdown => Err(TelemetryError::NotInitialized),
        }
    }

    fn effective_verbosity(&self, aspect_id: u32) -> Verbosity {
        self.aspects
            .get(&aspect_id)
            .and_then(|aspect| aspect.verbosity)
            .unwrap_or(self.global_verbosity)
    }

    fn should_send(&self, aspect_id: u32, verbosity: Verbosity) -> bool {
        verbosity <= self.effective_verbosity(aspect_id)
    }
}

/// Thread-safe telemetry front end.
///
/// Every public operation holds one coarse lock for its whole duration,
/// including the synchronous stream writes of any flush it triggers.
pub struct TelemetrySystem {
    env: Arc<dyn Environment>,
    inner: Mutex<Inner>,
}

impl TelemetrySystem {
    pub fn new(env: Arc<dyn Environment>) -> Self {
        Self {
            env,
            inner: Mutex::new(Inner {
                state: State::Uninitialized,
                global_verbosity: Verbosity::Default,
                aspects: HashMap::new(),
                events: HashMap::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Allocates the send buffer and starts a new session. A no-op when already initialized.
    pub fn init(&self, buffer_size: usize) -> Result<()> {
        let session_id = generate_session_id(self.env.as_ref());
        self.init_with_session(buffer_size, session_id)
    }

    /// Like [`init`](Self::init), with a caller-chosen session id (replays, tests).
    pub fn init_with_session(&self, buffer_size: usize, session_id: u64) -> Result<()> {
        let mut inner = self.lock();
        if matches!(inner.state, State::Initialized(_)) {
            return Ok(());
        }
        let buffer = SendBuffer::init(buffer_size, session_id, Arc::clone(&self.env))?;
        info!(
            "Telemetry initialized: session {:#018x}, buffer {} bytes",
            session_id,
            buffer.capacity()
        );
        inner.events.clear();
        inner.state = State::Initialized(buffer);
        Ok(())
    }

    /// Flushes remaining data and releases the buffer. Safe to call repeatedly.
    pub fn shutdown(&self) {
        let mut inner = self.lock();
        if let State::Initialized(buffer) = std::mem::replace(&mut inner.state, State::Shutdown) {
            buffer.shutdown();
            info!("Telemetry shut down");
        }
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self.lock().state, State::Initialized(_))
    }

    pub fn session_id(&self) -> Option<u64> {
        match &self.lock().state {
            State::Initialized(buffer) => Some(buffer.session_id()),
            State::Uninitialized | State::Shutdown => None,
        }
    }

    /// Per-frame tick: emits a keep-alive packet when the streams have been idle too long.
    pub fn update(&self) -> Result<()> {
        self.lock().buffer()?.update();
        Ok(())
    }

    pub fn attach_stream(&self, stream: StreamHandle) -> Result<()> {
        self.lock().buffer()?.attach_stream(stream)
    }

    pub fn detach_stream(&self, stream: &StreamHandle) -> Result<()> {
        self.lock().buffer()?.detach_stream(stream);
        Ok(())
    }

    pub fn flush(&self) -> Result<()> {
        self.lock().buffer()?.flush(None);
        Ok(())
    }

    pub fn global_verbosity(&self) -> Verbosity {
        self.lock().global_verbosity
    }

    pub fn set_global_verbosity(&self, verbosity: Verbosity) {
        let verbosity = clamp_verbosity(verbosity);
        debug!("Telemetry global verbosity: {:?}", verbosity);
        self.lock().global_verbosity = verbosity;
    }

    pub fn set_aspect_verbosity(&self, aspect_id: u32, verbosity: Verbosity) {
        let verbosity = clamp_verbosity(verbosity);
        debug!("Telemetry aspect {} verbosity: {:?}", aspect_id, verbosity);
        self.lock().aspects.entry(aspect_id).or_default().verbosity = Some(verbosity);
    }

    pub fn should_send(&self, aspect_id: u32, verbosity: Verbosity) -> bool {
        self.lock().should_send(aspect_id, verbosity)
    }

    /// Encodes one event.
    ///
    /// The first send of an `(aspect_id, event_id)` pair also emits its
    /// declaration; later sends must keep the same schema, parameter types and
    /// verbosity. The event itself is skipped when parameters are present but
    /// none of them is flagged as changed.
    pub fn send(
        &self,
        aspect_id: u32,
        event_id: u32,
        table_params: &str,
        params: &ParameterList<'_>,
        verbosity: Verbosity,
    ) -> Result<()> {
        let mut guard = self.lock();
        if !matches!(guard.state, State::Initialized(_)) {
            return Err(TelemetryError::NotInitialized);
        }
        if !guard.should_send(aspect_id, verbosity) {
            return Ok(());
        }
        let Inner { state, events, .. } = &mut *guard;
        let State::Initialized(buffer) = state else {
            return Err(TelemetryError::NotInitialized);
        };

        let key = EventKey::new(aspect_id, event_id);
        if let Some(existing) = events.get(&key) {
            debug_assert!(
                existing.matches(table_params, params, verbosity),
                "event {}:{} redeclared with a different shape",
                aspect_id,
                event_id
            );
        } else {
            // Recorded only once the declaration chunk is in the buffer
            write_event_declaration(buffer, key, table_params, params)?;
            events.insert(key, EventDeclaration::new(table_params, params, verbosity));
        }

        if params.any_changed() {
            buffer.begin_chunk(ChunkId::Event)?;
            buffer.write_u32(aspect_id)?;
            buffer.write_u32(event_id)?;
            buffer.write_params(params)?;
            buffer.end_chunk()?;
        }
        Ok(())
    }

    /// Declaration recorded for an event, if it has been sent at least once this session.
    pub fn event_declaration(&self, aspect_id: u32, event_id: u32) -> Option<EventDeclaration> {
        self.lock().events.get(&EventKey::new(aspect_id, event_id)).cloned()
    }
}

impl Drop for TelemetrySystem {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn write_event_declaration(
    buffer: &mut SendBuffer,
    key: EventKey,
    table_params: &str,
    params: &ParameterList<'_>,
) -> Result<()> {
    buffer.begin_chunk(ChunkId::EventDeclaration)?;
    buffer.write_u32(key.aspect_id)?;
    buffer.write_u32(key.event_id)?;
    buffer.write_str(table_params)?;
    buffer.write_u8(params.len() as u8)?;
    for value in params.iter() {
        buffer.write_u8(value.tag() as u8)?;
    }
    buffer.end_chunk()
}
