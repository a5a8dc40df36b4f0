//! Wireless remote key codes.
//!
//! Each key is a single bit in a 32-bit code.  The code is sent twice,
//! little-endian, inside a `WIRELESS_KEY` frame (see
//! [`encode_key_frame`](crate::protocol::codec::encode_key_frame)).
//!
//! [`key_for_state`] maps a [`State`] flag to the key that toggles it.  The
//! table is explicit: flags that no key toggles return `None`, and callers
//! treat that as "unsupported".

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::state::State;

/// A key on the wireless remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum Key {
    Right = 0x0000_0001,
    Menu = 0x0000_0002,
    Left = 0x0000_0004,
    Service = 0x0000_0008,
    Minus = 0x0000_0010,
    Plus = 0x0000_0020,
    PoolSpa = 0x0000_0040,
    Filter = 0x0000_0080,
    Lights = 0x0000_0100,
    Aux1 = 0x0000_0200,
    Aux2 = 0x0000_0400,
    Aux3 = 0x0000_0800,
    Aux4 = 0x0000_1000,
    Aux5 = 0x0000_2000,
    Aux6 = 0x0000_4000,
    Aux7 = 0x0000_8000,
    Valve3 = 0x0001_0000,
    Valve4 = 0x0002_0000,
    Heater1 = 0x0004_0000,
    Aux8 = 0x0008_0000,
    Aux9 = 0x0010_0000,
    Aux10 = 0x0020_0000,
    Aux11 = 0x0040_0000,
    Aux12 = 0x0080_0000,
    Aux13 = 0x0100_0000,
    Aux14 = 0x0200_0000,
}

impl Key {
    /// Every key, in code order.
    pub const ALL: [Key; 26] = [
        Key::Right,
        Key::Menu,
        Key::Left,
        Key::Service,
        Key::Minus,
        Key::Plus,
        Key::PoolSpa,
        Key::Filter,
        Key::Lights,
        Key::Aux1,
        Key::Aux2,
        Key::Aux3,
        Key::Aux4,
        Key::Aux5,
        Key::Aux6,
        Key::Aux7,
        Key::Valve3,
        Key::Valve4,
        Key::Heater1,
        Key::Aux8,
        Key::Aux9,
        Key::Aux10,
        Key::Aux11,
        Key::Aux12,
        Key::Aux13,
        Key::Aux14,
    ];

    /// Returns the 32-bit key code.
    pub const fn code(self) -> u32 {
        self as u32
    }

    pub const fn name(self) -> &'static str {
        match self {
            Key::Right => "RIGHT",
            Key::Menu => "MENU",
            Key::Left => "LEFT",
            Key::Service => "SERVICE",
            Key::Minus => "MINUS",
            Key::Plus => "PLUS",
            Key::PoolSpa => "POOL_SPA",
            Key::Filter => "FILTER",
            Key::Lights => "LIGHTS",
            Key::Aux1 => "AUX_1",
            Key::Aux2 => "AUX_2",
            Key::Aux3 => "AUX_3",
            Key::Aux4 => "AUX_4",
            Key::Aux5 => "AUX_5",
            Key::Aux6 => "AUX_6",
            Key::Aux7 => "AUX_7",
            Key::Valve3 => "VALVE_3",
            Key::Valve4 => "VALVE_4",
            Key::Heater1 => "HEATER_1",
            Key::Aux8 => "AUX_8",
            Key::Aux9 => "AUX_9",
            Key::Aux10 => "AUX_10",
            Key::Aux11 => "AUX_11",
            Key::Aux12 => "AUX_12",
            Key::Aux13 => "AUX_13",
            Key::Aux14 => "AUX_14",
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a string does not name any [`Key`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown key name: {0}")]
pub struct UnknownKeyName(pub String);

impl FromStr for Key {
    type Err = UnknownKeyName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Key::ALL
            .into_iter()
            .find(|key| key.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownKeyName(wanted.to_string()))
    }
}

/// Returns the key whose press toggles `state`, if one exists.
///
/// Only flags with a dedicated key on the remote are listed.  `POOL`/`SPA`,
/// `HEATER_AUTO_MODE` and `FILTER_LOW_SPEED` need extra handling and are
/// resolved by the state store before this table is consulted.
pub const fn key_for_state(state: State) -> Option<Key> {
    match state {
        State::Heater1 => Some(Key::Heater1),
        State::Valve3 => Some(Key::Valve3),
        State::Valve4 => Some(Key::Valve4),
        State::Filter => Some(Key::Filter),
        State::Lights => Some(Key::Lights),
        State::Service => Some(Key::Service),
        State::Aux1 => Some(Key::Aux1),
        State::Aux2 => Some(Key::Aux2),
        State::Aux3 => Some(Key::Aux3),
        State::Aux4 => Some(Key::Aux4),
        State::Aux5 => Some(Key::Aux5),
        State::Aux6 => Some(Key::Aux6),
        State::Aux7 => Some(Key::Aux7),
        State::Aux8 => Some(Key::Aux8),
        State::Aux9 => Some(Key::Aux9),
        State::Aux10 => Some(Key::Aux10),
        State::Aux11 => Some(Key::Aux11),
        State::Aux12 => Some(Key::Aux12),
        State::Aux13 => Some(Key::Aux13),
        State::Aux14 => Some(Key::Aux14),
        State::CheckSystem
        | State::Pool
        | State::Spa
        | State::Spillover
        | State::SystemOff
        | State::SuperChlorinate
        | State::HeaterAutoMode
        | State::FilterLowSpeed => None,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
