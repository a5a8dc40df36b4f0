//! Domain entities for the AquaLogic client.
//!
//! Pure logic with no I/O: the controller's state flags, the remote's key
//! codes, the pending-command store, and the LCD text decoder.  Everything
//! here can be unit-tested without a bus, a socket, or a runtime.

/// LCD display text decoding.
pub mod display;

/// Wireless remote key codes and the state-to-key table.
pub mod keys;

/// LED state flags and bitmask sets.
pub mod state;

/// Bitmask state plus the queue of commands awaiting confirmation.
pub mod store;
