//! LED state flags reported by the controller.
//!
//! A `LEDS` frame carries two little-endian `u32` bitmasks: the LEDs that are
//! lit and the LEDs that are flashing.  Each bit corresponds to one [`State`].
//!
//! Two flags never appear on the wire and are synthesised by the client:
//!
//! | Flag                | Derived from                                  |
//! |---------------------|-----------------------------------------------|
//! | `HEATER_AUTO_MODE`  | the `Heater1 Auto/Manual` display line        |
//! | `FILTER_LOW_SPEED`  | the FILTER LED *flashing* (two-speed pumps)   |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One LED / feature flag of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum State {
    Heater1 = 1 << 0,
    Valve3 = 1 << 1,
    CheckSystem = 1 << 2,
    Pool = 1 << 3,
    Spa = 1 << 4,
    Filter = 1 << 5,
    Lights = 1 << 6,
    Aux1 = 1 << 7,
    Aux2 = 1 << 8,
    Service = 1 << 9,
    Aux3 = 1 << 10,
    Aux4 = 1 << 11,
    Aux5 = 1 << 12,
    Aux6 = 1 << 13,
    Valve4 = 1 << 14,
    Spillover = 1 << 15,
    SystemOff = 1 << 16,
    Aux7 = 1 << 17,
    Aux8 = 1 << 18,
    Aux9 = 1 << 19,
    Aux10 = 1 << 20,
    Aux11 = 1 << 21,
    Aux12 = 1 << 22,
    Aux13 = 1 << 23,
    Aux14 = 1 << 24,
    SuperChlorinate = 1 << 25,
    /// Synthetic: heater follows its thermostat instead of being forced.
    HeaterAutoMode = 1 << 30,
    /// Synthetic: the filter pump is running at low speed.
    FilterLowSpeed = 1 << 31,
}

impl State {
    /// Every flag, in bit order.
    pub const ALL: [State; 28] = [
        State::Heater1,
        State::Valve3,
        State::CheckSystem,
        State::Pool,
        State::Spa,
        State::Filter,
        State::Lights,
        State::Aux1,
        State::Aux2,
        State::Service,
        State::Aux3,
        State::Aux4,
        State::Aux5,
        State::Aux6,
        State::Valve4,
        State::Spillover,
        State::SystemOff,
        State::Aux7,
        State::Aux8,
        State::Aux9,
        State::Aux10,
        State::Aux11,
        State::Aux12,
        State::Aux13,
        State::Aux14,
        State::SuperChlorinate,
        State::HeaterAutoMode,
        State::FilterLowSpeed,
    ];

    /// Bits of the synthetic flags; always cleared from wire bitmasks.
    pub const SYNTHETIC_MASK: u32 = State::HeaterAutoMode as u32 | State::FilterLowSpeed as u32;

    /// Returns the bit this flag occupies.
    pub const fn bit(self) -> u32 {
        self as u32
    }

    /// Returns `true` for flags the controller never sends.
    pub const fn is_synthetic(self) -> bool {
        self.bit() & Self::SYNTHETIC_MASK != 0
    }

    /// Returns the upper-snake-case name used in logs and the shell.
    pub const fn name(self) -> &'static str {
        match self {
            State::Heater1 => "HEATER_1",
            State::Valve3 => "VALVE_3",
            State::CheckSystem => "CHECK_SYSTEM",
            State::Pool => "POOL",
            State::Spa => "SPA",
            State::Filter => "FILTER",
            State::Lights => "LIGHTS",
            State::Aux1 => "AUX_1",
            State::Aux2 => "AUX_2",
            State::Service => "SERVICE",
            State::Aux3 => "AUX_3",
            State::Aux4 => "AUX_4",
            State::Aux5 => "AUX_5",
            State::Aux6 => "AUX_6",
            State::Valve4 => "VALVE_4",
            State::Spillover => "SPILLOVER",
            State::SystemOff => "SYSTEM_OFF",
            State::Aux7 => "AUX_7",
            State::Aux8 => "AUX_8",
            State::Aux9 => "AUX_9",
            State::Aux10 => "AUX_10",
            State::Aux11 => "AUX_11",
            State::Aux12 => "AUX_12",
            State::Aux13 => "AUX_13",
            State::Aux14 => "AUX_14",
            State::SuperChlorinate => "SUPER_CHLORINATE",
            State::HeaterAutoMode => "HEATER_AUTO_MODE",
            State::FilterLowSpeed => "FILTER_LOW_SPEED",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a string does not name any [`State`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown state name: {0}")]
pub struct UnknownStateName(pub String);

impl FromStr for State {
    type Err = UnknownStateName;

    /// Parses a flag name case-insensitively (`"lights"`, `"AUX_1"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        State::ALL
            .into_iter()
            .find(|state| state.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownStateName(wanted.to_string()))
    }
}

// ── Bitmask set ───────────────────────────────────────────────────────────────

/// A set of [`State`] flags stored as the controller's bitmask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateSet(pub u32);

impl StateSet {
    /// The empty set.
    pub const EMPTY: StateSet = StateSet(0);

    /// Builds a set from a wire bitmask, dropping the synthetic bits.
    pub const fn from_wire(bits: u32) -> Self {
        StateSet(bits & !State::SYNTHETIC_MASK)
    }

    /// Returns `true` if `state` is in the set.
    pub const fn contains(self, state: State) -> bool {
        self.0 & state.bit() != 0
    }

    /// Returns `true` if no flag is set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns a copy with `state` added.
    #[must_use]
    pub const fn with(self, state: State) -> Self {
        StateSet(self.0 | state.bit())
    }

    /// Returns the union of two sets.
    #[must_use]
    pub const fn union(self, other: StateSet) -> Self {
        StateSet(self.0 | other.0)
    }

    /// Iterates the flags in the set, in bit order.
    pub fn iter(self) -> impl Iterator<Item = State> {
        State::ALL.into_iter().filter(move |s| self.contains(*s))
    }
}

impl FromIterator<State> for StateSet {
    fn from_iter<I: IntoIterator<Item = State>>(iter: I) -> Self {
        iter.into_iter().fold(StateSet::EMPTY, StateSet::with)
    }
}

impl fmt::Display for StateSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(State::name).collect();
        write!(f, "[{}]", names.join(", "))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
