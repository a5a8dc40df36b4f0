//! Bitmask state plus the queue of commands awaiting confirmation.
//!
//! # How a command travels (for beginners)
//!
//! The controller cannot be told "turn the lights on"; a client can only
//! press the LIGHTS key, which *toggles* them.  So a state change is modelled
//! as a [`PendingCommand`]: the key frame to send plus the [`DesiredState`]s
//! that should be observed once the press has landed.
//!
//! ```text
//!  set_state() ──► queue ──► begin_send() ──► in flight ──► reconcile(id)
//!                    ▲        (keep-alive)                    │
//!                    └──────────── Requeued (retries left) ◄──┤
//!                                  Confirmed / Abandoned ◄────┘
//! ```
//!
//! While a command is queued or in flight, [`StateStore::get_state`] reports
//! the *desired* value so callers see their intent rather than the stale wire
//! state.  The store is plain data; timing (the burst write and the
//! reconciliation delay) is owned by the engine.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::keys::{key_for_state, Key};
use crate::domain::state::{State, StateSet};
use crate::protocol::codec::encode_key_frame;
use crate::protocol::sequence::{CommandId, CommandIdCounter};

/// Retry budget given to commands created by [`StateStore::set_state`].
pub const DEFAULT_RETRIES: u32 = 10;

/// A flag value expected after a command lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredState {
    pub state: State,
    pub enabled: bool,
}

impl DesiredState {
    pub const fn new(state: State, enabled: bool) -> Self {
        Self { state, enabled }
    }
}

/// An encoded key press waiting to be sent or confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCommand {
    pub id: CommandId,
    pub key: Key,
    /// Fully encoded, stuffed wire frame.
    pub frame: Vec<u8>,
    pub desired_states: Vec<DesiredState>,
    /// `None` for fire-and-forget key presses.
    pub retries: Option<u32>,
}

impl PendingCommand {
    /// Returns the expectation for `state`, if this command carries one.
    pub fn desired(&self, state: State) -> Option<bool> {
        self.desired_states
            .iter()
            .find(|d| d.state == state)
            .map(|d| d.enabled)
    }
}

/// Result of checking an in-flight command against the wire state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Every desired state was observed.
    Confirmed,
    /// Not yet observed; the command went back to the end of the queue.
    Requeued { retries_left: u32 },
    /// Not observed and no retries remain; the command was dropped.
    Abandoned,
    /// The id is not in flight (already confirmed early, or never sent).
    NotInFlight,
}

/// LED state and the command queue of one controller connection.
#[derive(Debug)]
pub struct StateStore {
    pool_state: StateSet,
    flashing_state: StateSet,
    heater_auto_mode: Option<bool>,
    queue: VecDeque<PendingCommand>,
    in_flight: HashMap<CommandId, PendingCommand>,
    ids: CommandIdCounter,
    retries: u32,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore {
    pub fn new() -> Self {
        Self::with_retries(DEFAULT_RETRIES)
    }

    /// Creates a store whose state changes get `retries` send attempts.
    pub fn with_retries(retries: u32) -> Self {
        Self {
            pool_state: StateSet::EMPTY,
            flashing_state: StateSet::EMPTY,
            heater_auto_mode: None,
            queue: VecDeque::new(),
            in_flight: HashMap::new(),
            ids: CommandIdCounter::new(),
            retries,
        }
    }

    pub fn pool_state(&self) -> StateSet {
        self.pool_state
    }

    pub fn flashing_state(&self) -> StateSet {
        self.flashing_state
    }

    /// Heater mode from the display; `None` until the panel has shown it.
    pub fn heater_auto_mode(&self) -> Option<bool> {
        self.heater_auto_mode
    }

    /// Records the heater mode and mirrors it into the synthetic flag.
    ///
    /// Returns `true` if the mode changed.
    pub fn set_heater_auto_mode(&mut self, auto: bool) -> bool {
        if self.heater_auto_mode == Some(auto) {
            return false;
        }
        self.heater_auto_mode = Some(auto);
        self.pool_state = if auto {
            self.pool_state.with(State::HeaterAutoMode)
        } else {
            StateSet(self.pool_state.0 & !State::HeaterAutoMode.bit())
        };
        self.confirm_satisfied();
        true
    }

    // ── Wire updates ──────────────────────────────────────────────────────────

    /// Applies the two bitmasks of a `LEDS` frame.
    ///
    /// Flashing LEDs count as on.  Returns `true` if either bitmask changed;
    /// an identical frame is a no-op.
    pub fn apply_leds(&mut self, current: u32, flashing: u32) -> bool {
        let flashing = StateSet::from_wire(flashing);
        let mut states = StateSet::from_wire(current).union(flashing);
        if self.heater_auto_mode != Some(false) {
            states = states.with(State::HeaterAutoMode);
        }

        if states == self.pool_state && flashing == self.flashing_state {
            return false;
        }

        self.pool_state = states;
        self.flashing_state = flashing;
        self.confirm_satisfied();
        true
    }

    /// Drops queued and in-flight commands whose desired states are already
    /// observed.  Bare key presses have no desired states and are kept.
    fn confirm_satisfied(&mut self) {
        let satisfied: Vec<CommandId> = self
            .queue
            .iter()
            .chain(self.in_flight.values())
            .filter(|cmd| !cmd.desired_states.is_empty() && self.is_satisfied(cmd))
            .map(|cmd| cmd.id)
            .collect();
        if satisfied.is_empty() {
            return;
        }

        self.queue.retain(|cmd| !satisfied.contains(&cmd.id));
        for id in satisfied {
            self.in_flight.remove(&id);
            debug!(%id, "command confirmed before reconciliation");
        }
    }

    // ── Queries ───────────────────────────────────────────────────────────────

    /// Flags currently on, including the synthetic `FILTER_LOW_SPEED`.
    pub fn current_states(&self) -> Vec<State> {
        let mut states: Vec<State> = self.pool_state.iter().collect();
        if self.flashing_state.contains(State::Filter) {
            states.push(State::FilterLowSpeed);
        }
        states
    }

    /// Returns the value of `state`, preferring a pending command's intent.
    pub fn get_state(&self, state: State) -> bool {
        self.queue
            .iter()
            .chain(self.in_flight.values())
            .find_map(|cmd| cmd.desired(state))
            .unwrap_or_else(|| self.actual_state(state))
    }

    /// Returns the value of `state` as last reported on the wire.
    pub fn actual_state(&self, state: State) -> bool {
        match state {
            State::FilterLowSpeed => self.flashing_state.contains(State::Filter),
            other => self.pool_state.contains(other),
        }
    }

    /// Returns `true` while any command is queued or awaiting confirmation.
    pub fn is_attempting_request(&self) -> bool {
        !self.queue.is_empty() || !self.in_flight.is_empty()
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    fn is_satisfied(&self, cmd: &PendingCommand) -> bool {
        cmd.desired_states
            .iter()
            .all(|d| self.actual_state(d.state) == d.enabled)
    }

    // ── Commands ──────────────────────────────────────────────────────────────

    /// Requests `state` to become `enable`.
    ///
    /// Returns `true` if the state is already at the target or a command was
    /// queued, `false` if no key can change this flag.
    pub fn set_state(&mut self, state: State, enable: bool) -> bool {
        if self.get_state(state) == enable {
            return true;
        }

        let (key, desired) = match state {
            // No key forces the heater; it follows the thermostat.
            State::Heater1 => return false,
            // One FILTER press; the retry loop presses again until the pump
            // lands on the requested speed.
            State::FilterLowSpeed => (Key::Filter, DesiredState::new(state, enable)),
            State::HeaterAutoMode => {
                let auto = self.heater_auto_mode.unwrap_or(true);
                (Key::Heater1, DesiredState::new(state, !auto))
            }
            State::Pool | State::Spa => (Key::PoolSpa, DesiredState::new(state, enable)),
            other => match key_for_state(other) {
                Some(key) => (key, DesiredState::new(other, enable)),
                None => {
                    debug!(state = %other, "no key toggles this state");
                    return false;
                }
            },
        };

        self.enqueue(key, vec![desired], Some(self.retries));
        true
    }

    /// Queues a bare key press with no expected outcome.
    pub fn send_key(&mut self, key: Key) -> CommandId {
        self.enqueue(key, Vec::new(), None)
    }

    /// Queues a key press with explicit expectations and retry budget.
    pub fn enqueue(
        &mut self,
        key: Key,
        desired_states: Vec<DesiredState>,
        retries: Option<u32>,
    ) -> CommandId {
        let id = self.ids.next();
        info!(%id, %key, ?desired_states, "queueing key");
        self.queue.push_back(PendingCommand {
            id,
            key,
            frame: encode_key_frame(key),
            desired_states,
            retries,
        });
        id
    }

    /// Takes the next command to transmit.
    ///
    /// Commands with desired states stay tracked as in flight until
    /// [`reconcile`](Self::reconcile) is called with their id.
    pub fn begin_send(&mut self) -> Option<PendingCommand> {
        let cmd = self.queue.pop_front()?;
        if !cmd.desired_states.is_empty() {
            self.in_flight.insert(cmd.id, cmd.clone());
        }
        Some(cmd)
    }

    /// Checks an in-flight command against the wire state.
    pub fn reconcile(&mut self, id: CommandId) -> ReconcileOutcome {
        let Some(mut cmd) = self.in_flight.remove(&id) else {
            return ReconcileOutcome::NotInFlight;
        };

        if self.is_satisfied(&cmd) {
            debug!(%id, "state changed successfully");
            return ReconcileOutcome::Confirmed;
        }

        match cmd.retries {
            Some(n) if n > 1 => {
                let retries_left = n - 1;
                cmd.retries = Some(retries_left);
                info!(%id, retries_left, "state not reached, requeued");
                self.queue.push_back(cmd);
                ReconcileOutcome::Requeued { retries_left }
            }
            _ => {
                warn!(%id, key = %cmd.key, "state not reached, command abandoned");
                ReconcileOutcome::Abandoned
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
