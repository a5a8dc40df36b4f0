//! The AquaLogic engine: reads the bus, tracks controller state, and sends
//! queued key presses.
//!
//! # Architecture
//!
//! ```text
//!              ┌──────────── AquaLogic<T> (reader task) ────────────┐
//!  ByteStream ─┤ FrameDecoder ─► verify ─► decode_type ─► dispatch  ├─► on_change(&ChangeSet)
//!              │                                            │       │
//!              │        keep-alive ─► burst write ◄─ queue  │       │
//!              └────────────────────────────│───────────────│───────┘
//!                                           │   Arc<Shared> │
//!  AquaLogicHandle (any thread) ── set_state / send_key ────┘
//!                               ── getters, close()
//! ```
//!
//! # Concurrency (for beginners)
//!
//! The reader task owns the transport outright; only it reads and writes
//! bytes.  State that callers need to see lives in one `Shared` struct behind
//! `std::sync` locks.  No critical section contains an `.await`.
//!
//! Three parties touch the command queue:
//!
//! - **Callers** append through [`AquaLogicHandle::set_state`] and
//!   [`AquaLogicHandle::send_key`].
//! - **The reader** pops one command per keep-alive and burst-writes it.
//! - **Reconciliation timers** (one spawned task per sent command) check the
//!   outcome after `reconcile_delay` and requeue or drop the command.
//!
//! # Termination
//!
//! [`AquaLogic::process`] returns `Ok(())` at end of stream or after
//! [`AquaLogicHandle::close`], and [`EngineError::ReadTimeout`] when the bus
//! goes quiet.  It never reconnects; the caller decides whether to.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use aqualogic_core::protocol::codec::{decode_type, verify, DecodeEvent, FrameDecoder};
use aqualogic_core::protocol::sequence::CommandId;
use aqualogic_core::{DisplayDecoder, DisplaySection, Frame, FrameType, Key, State, StateStore};
use thiserror::Error;
use tokio::sync::Notify;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, error, info, trace, warn};

use crate::application::display_fields::{self, Body, DisplayField, Sensor};
use crate::application::snapshot::{ChangeSet, Field, FieldValue, Snapshot};
use crate::infrastructure::transport::{ByteStream, TransportError};

/// Errors that end [`AquaLogic::process`].
#[derive(Debug, Error)]
pub enum EngineError {
    /// Nothing arrived from the controller within the read window.
    #[error("no data from controller within {0:?}")]
    ReadTimeout(Duration),

    /// The transport failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Timing and limits of the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Inactivity window for reads and for finding a start marker.
    pub read_timeout: Duration,
    /// Delay between a burst and checking whether the command landed.
    pub reconcile_delay: Duration,
    /// Copies of a command frame written per keep-alive.
    pub burst_writes: u32,
    pub burst_interval: Duration,
    /// Pause after a keep-alive before the burst starts.
    pub send_delay: Duration,
    /// Send attempts given to each state change.
    pub command_retries: u32,
    pub max_frame_len: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_secs(5),
            reconcile_delay: Duration::from_secs(2),
            burst_writes: 5,
            burst_interval: Duration::from_millis(8),
            send_delay: Duration::from_millis(50),
            command_retries: aqualogic_core::domain::store::DEFAULT_RETRIES,
            max_frame_len: aqualogic_core::protocol::codec::DEFAULT_MAX_FRAME_LEN,
        }
    }
}

/// State shared between the reader, timers, and handles.
#[derive(Debug)]
struct Shared {
    store: Mutex<StateStore>,
    snapshot: RwLock<Snapshot>,
    display: RwLock<Vec<DisplaySection>>,
    closed: AtomicBool,
    close_notify: Notify,
}

impl Shared {
    fn store(&self) -> MutexGuard<'_, StateStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self) -> Snapshot {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

// ── Engine ────────────────────────────────────────────────────────────────────

/// Reader side of a controller connection.
pub struct AquaLogic<T: ByteStream> {
    transport: T,
    decoder: FrameDecoder,
    display: DisplayDecoder,
    config: EngineConfig,
    shared: Arc<Shared>,
}

impl<T: ByteStream> AquaLogic<T> {
    /// Connects `transport` with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Transport`] if the transport cannot connect.
    pub async fn connect(transport: T) -> Result<Self, EngineError> {
        Self::connect_with(transport, EngineConfig::default()).await
    }

    /// Connects `transport` with an explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Transport`] if the transport cannot connect.
    pub async fn connect_with(mut transport: T, config: EngineConfig) -> Result<Self, EngineError> {
        transport.connect().await?;

        let shared = Arc::new(Shared {
            store: Mutex::new(StateStore::with_retries(config.command_retries)),
            snapshot: RwLock::new(Snapshot::default()),
            display: RwLock::new(Vec::new()),
            closed: AtomicBool::new(false),
            close_notify: Notify::new(),
        });

        Ok(Self {
            transport,
            decoder: FrameDecoder::with_max_len(config.max_frame_len),
            display: DisplayDecoder::new(),
            config,
            shared,
        })
    }

    /// Returns a cloneable handle for commands and queries.
    pub fn handle(&self) -> AquaLogicHandle {
        AquaLogicHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Runs the read loop until end of stream, close, or timeout.
    ///
    /// `on_change` is called at most once per frame with every field that
    /// frame changed.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ReadTimeout`] if the bus goes quiet and
    /// [`EngineError::Transport`] if the transport fails.
    pub async fn process<F>(&mut self, mut on_change: F) -> Result<(), EngineError>
    where
        F: FnMut(&ChangeSet),
    {
        let shared = Arc::clone(&self.shared);
        let read_timeout = self.config.read_timeout;
        let mut sync_deadline = Instant::now() + read_timeout;

        loop {
            if shared.closed.load(Ordering::Acquire) {
                info!("engine closed, shutting down transport");
                self.transport.close().await?;
                return Ok(());
            }

            let read = tokio::select! {
                biased;
                _ = shared.close_notify.notified() => continue,
                read = timeout(read_timeout, self.transport.read_byte()) => read,
            };

            let byte = match read {
                Ok(Ok(Some(byte))) => byte,
                Ok(Ok(None)) => {
                    info!("end of stream");
                    return Ok(());
                }
                Ok(Err(e)) => {
                    error!("transport failed: {e}");
                    return Err(e.into());
                }
                Err(_) => {
                    error!("no data from controller for {read_timeout:?}");
                    return Err(EngineError::ReadTimeout(read_timeout));
                }
            };

            match self.decoder.push(byte) {
                None => {
                    if !self.decoder.in_frame() && Instant::now() >= sync_deadline {
                        error!("no frame start within {read_timeout:?}");
                        return Err(EngineError::ReadTimeout(read_timeout));
                    }
                }
                Some(DecodeEvent::FrameStarted) => {
                    sync_deadline = Instant::now() + read_timeout;
                }
                Some(DecodeEvent::EscapeAnomaly(b)) => {
                    warn!("unexpected byte {b:#04x} after DLE inside frame");
                }
                Some(DecodeEvent::Overflow(e)) => {
                    warn!("frame dropped: {e}");
                }
                Some(DecodeEvent::Frame(raw)) => {
                    let Some(frame) = Self::parse(&raw) else {
                        continue;
                    };

                    if frame.frame_type == FrameType::KeepAlive {
                        self.send_queued().await?;
                        continue;
                    }

                    let changes = self.dispatch(&frame);
                    if !changes.is_empty() {
                        on_change(&changes);
                    }
                }
            }
        }
    }

    fn parse(raw: &[u8]) -> Option<Frame> {
        let payload = match verify(raw) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("bad frame: {e}");
                return None;
            }
        };
        match decode_type(payload) {
            Ok(frame) => Some(frame),
            Err(e) => {
                debug!("skipping frame: {e}");
                None
            }
        }
    }

    // ── Outbound ──────────────────────────────────────────────────────────────

    /// Writes the next queued command, if any, in a burst.
    async fn send_queued(&mut self) -> Result<(), EngineError> {
        let Some(cmd) = self.shared.store().begin_send() else {
            return Ok(());
        };

        info!(id = %cmd.id, key = %cmd.key, "sending queued command");
        sleep(self.config.send_delay).await;

        debug!(
            writes = self.config.burst_writes,
            frame = ?cmd.frame,
            "burst write"
        );
        for _ in 0..self.config.burst_writes {
            self.transport.write(&cmd.frame).await?;
            sleep(self.config.burst_interval).await;
        }

        if !cmd.desired_states.is_empty() {
            self.schedule_reconcile(cmd.id);
        }
        Ok(())
    }

    fn schedule_reconcile(&self, id: CommandId) {
        let shared = Arc::clone(&self.shared);
        let delay = self.config.reconcile_delay;
        tokio::spawn(async move {
            sleep(delay).await;
            let outcome = shared.store().reconcile(id);
            debug!(%id, ?outcome, "reconciled");
        });
    }

    // ── Inbound ───────────────────────────────────────────────────────────────

    fn dispatch(&mut self, frame: &Frame) -> ChangeSet {
        let mut changes = ChangeSet::new();
        let body = frame.body.as_slice();

        match frame.frame_type {
            FrameType::KeepAlive => {}
            FrameType::LocalKey => debug!("local wired key: {body:02x?}"),
            FrameType::RemoteKey => debug!("remote wired key: {body:02x?}"),
            FrameType::WirelessKey => debug!("wireless key: {body:02x?}"),
            FrameType::Leds => self.on_leds(body, &mut changes),
            FrameType::PumpSpeedRequest => self.on_pump_speed_request(body, &mut changes),
            FrameType::PumpStatus => self.on_pump_status(body, &mut changes),
            FrameType::DisplayUpdate => self.on_display(body, &mut changes),
            FrameType::LongDisplayUpdate => trace!("long display update ignored"),
        }

        changes
    }

    fn on_leds(&self, body: &[u8], changes: &mut ChangeSet) {
        let &[c0, c1, c2, c3, f0, f1, f2, f3, ..] = body else {
            warn!("LEDS frame too short: {} bytes", body.len());
            return;
        };
        let current = u32::from_le_bytes([c0, c1, c2, c3]);
        let flashing = u32::from_le_bytes([f0, f1, f2, f3]);

        let mut store = self.shared.store();
        let old = store.current_states();
        if store.apply_leds(current, flashing) {
            let new = store.current_states();
            debug!(states = ?new, "LED states changed");
            changes.push(Field::States, FieldValue::States(old), FieldValue::States(new));
        }
    }

    fn on_pump_speed_request(&self, body: &[u8], changes: &mut ChangeSet) {
        let &[hi, lo, ..] = body else {
            warn!("pump speed request too short: {} bytes", body.len());
            return;
        };
        let speed = u16::from_be_bytes([hi, lo]);
        debug!(speed, "pump speed request");

        let mut snap = self.shared.snapshot.write().unwrap_or_else(PoisonError::into_inner);
        Snapshot::assign(&mut snap.pump_speed, u32::from(speed), Field::PumpSpeed, changes);
    }

    fn on_pump_status(&self, body: &[u8], changes: &mut ChangeSet) {
        let &[_, _, speed, p_hi, p_lo, ..] = body else {
            debug!("pump status too short: {} bytes", body.len());
            return;
        };
        let power = bcd(p_hi) * 100 + bcd(p_lo);
        debug!(speed, power, "pump status");

        let mut snap = self.shared.snapshot.write().unwrap_or_else(PoisonError::into_inner);
        Snapshot::assign(&mut snap.multi_speed_pump, true, Field::MultiSpeedPump, changes);
        Snapshot::assign(&mut snap.pump_speed, u32::from(speed), Field::PumpSpeed, changes);
        Snapshot::assign(&mut snap.pump_power, power, Field::PumpPower, changes);
    }

    fn on_display(&mut self, body: &[u8], changes: &mut ChangeSet) {
        let old_text = self.display.text();
        if !self.display.decode(body) {
            return;
        }

        let new_text = self.display.text();
        debug!("display update: {new_text:?}");
        *self.shared.display.write().unwrap_or_else(PoisonError::into_inner) =
            self.display.sections().to_vec();
        if new_text != old_text {
            changes.push(Field::Display, old_text, new_text);
        }

        match display_fields::extract(self.display.tokens()) {
            Ok(Some(field)) => self.apply_display_field(field, changes),
            Ok(None) => {}
            Err(e) => debug!("ignoring display text: {e}"),
        }
    }

    fn apply_display_field(&self, field: DisplayField, changes: &mut ChangeSet) {
        if let DisplayField::HeaterAutoMode(auto) = field {
            let mut store = self.shared.store();
            let old = store.heater_auto_mode();
            if store.set_heater_auto_mode(auto) {
                changes.push(Field::HeaterAutoMode, old, auto);
            }
            return;
        }

        let mut snap = self.shared.snapshot.write().unwrap_or_else(PoisonError::into_inner);
        match field {
            DisplayField::Temperature {
                sensor,
                value,
                metric,
            } => {
                let (slot, name) = match sensor {
                    Sensor::Pool => (&mut snap.pool_temp, Field::PoolTemp),
                    Sensor::Spa => (&mut snap.spa_temp, Field::SpaTemp),
                    Sensor::Air => (&mut snap.air_temp, Field::AirTemp),
                };
                Snapshot::assign(slot, value, name, changes);
                Snapshot::assign(&mut snap.is_metric, metric, Field::IsMetric, changes);
            }
            DisplayField::Chlorinator { body, percent } => {
                let (slot, name) = match body {
                    Body::Pool => (&mut snap.pool_chlorinator_percent, Field::PoolChlorinatorPercent),
                    Body::Spa => (&mut snap.spa_chlorinator_percent, Field::SpaChlorinatorPercent),
                };
                Snapshot::assign(slot, percent, name, changes);
            }
            DisplayField::SaltLevel { value, metric } => {
                Snapshot::assign(&mut snap.salt_level, value, Field::SaltLevel, changes);
                Snapshot::assign(&mut snap.is_metric, metric, Field::IsMetric, changes);
            }
            DisplayField::CheckSystem(message) => {
                Snapshot::assign(
                    &mut snap.check_system_message,
                    message,
                    Field::CheckSystemMessage,
                    changes,
                );
            }
            DisplayField::MenuLocked(locked) => {
                Snapshot::assign(&mut snap.menu_locked, locked, Field::MenuLocked, changes);
            }
            DisplayField::HeaterAutoMode(_) => {}
        }
    }
}

/// Decodes one packed-BCD byte (two decimal digits).
fn bcd(b: u8) -> u32 {
    u32::from(b >> 4) * 10 + u32::from(b & 0x0F)
}

// ── Handle ────────────────────────────────────────────────────────────────────

/// Cloneable, thread-safe access to a running engine.
///
/// Commands only append to the queue and never block on the bus.
#[derive(Debug, Clone)]
pub struct AquaLogicHandle {
    shared: Arc<Shared>,
}

impl AquaLogicHandle {
    /// Returns the state of `state`, or the pending target while a command
    /// for it is queued or in flight.
    pub fn get_state(&self, state: State) -> bool {
        self.shared.store().get_state(state)
    }

    /// Requests `state` to become `enable`.  See [`StateStore::set_state`].
    pub fn set_state(&self, state: State, enable: bool) -> bool {
        self.shared.store().set_state(state, enable)
    }

    /// Queues a bare key press.
    pub fn send_key(&self, key: Key) -> CommandId {
        self.shared.store().send_key(key)
    }

    /// Flags currently on, including `FILTER_LOW_SPEED`.
    pub fn get_states(&self) -> Vec<State> {
        self.shared.store().current_states()
    }

    /// Returns `true` while any command is queued or awaiting confirmation.
    pub fn is_attempting_request(&self) -> bool {
        self.shared.store().is_attempting_request()
    }

    /// Copy of every scalar field.
    pub fn snapshot(&self) -> Snapshot {
        self.shared.snapshot()
    }

    /// Sections of the last decoded display.
    pub fn display(&self) -> Vec<DisplaySection> {
        self.shared
            .display
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// `"Ok"`, or the check-system message while the alarm LED is on.
    pub fn status(&self) -> String {
        if !self.get_state(State::CheckSystem) {
            return "Ok".to_string();
        }
        self.shared
            .snapshot()
            .check_system_message
            .unwrap_or_else(|| "Check System".to_string())
    }

    pub fn is_metric(&self) -> Option<bool> {
        self.shared.snapshot().is_metric
    }

    pub fn air_temp(&self) -> Option<i32> {
        self.shared.snapshot().air_temp
    }

    pub fn pool_temp(&self) -> Option<i32> {
        self.shared.snapshot().pool_temp
    }

    pub fn spa_temp(&self) -> Option<i32> {
        self.shared.snapshot().spa_temp
    }

    pub fn pool_chlorinator_percent(&self) -> Option<u8> {
        self.shared.snapshot().pool_chlorinator_percent
    }

    pub fn spa_chlorinator_percent(&self) -> Option<u8> {
        self.shared.snapshot().spa_chlorinator_percent
    }

    pub fn salt_level(&self) -> Option<f64> {
        self.shared.snapshot().salt_level
    }

    pub fn pump_speed(&self) -> Option<u32> {
        self.shared.snapshot().pump_speed
    }

    /// Pump power draw in watts.
    pub fn pump_power(&self) -> Option<u32> {
        self.shared.snapshot().pump_power
    }

    pub fn multi_speed_pump(&self) -> Option<bool> {
        self.shared.snapshot().multi_speed_pump
    }

    pub fn menu_locked(&self) -> Option<bool> {
        self.shared.snapshot().menu_locked
    }

    /// Heater mode as shown on the panel; `None` until it has been shown.
    pub fn heater_auto_mode(&self) -> Option<bool> {
        self.shared.store().heater_auto_mode()
    }

    pub fn is_heater_enabled(&self) -> bool {
        self.get_state(State::Heater1)
    }

    pub fn is_super_chlorinate(&self) -> bool {
        self.get_state(State::SuperChlorinate)
    }

    /// The waterfall is wired to AUX 2.
    pub fn waterfall(&self) -> bool {
        self.get_state(State::Aux2)
    }

    /// Declares whether a variable-speed pump is installed.
    pub fn enable_multi_speed_pump(&self, enable: bool) {
        self.shared
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .multi_speed_pump = Some(enable);
    }

    /// Stops the engine: the read loop closes its transport and returns.
    pub fn close(&self) {
        self.shared.closed.store(true, Ordering::Release);
        self.shared.close_notify.notify_one();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
