//! aqualogic-client library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does aqualogic-client do? (for beginners)
//!
//! An AquaLogic controller never answers requests.  It just keeps talking:
//! every few hundred milliseconds it broadcasts a keep-alive, its LED
//! bitmasks, and whatever its LCD currently shows.  The client:
//!
//! 1. Opens a byte stream to the bus (TCP bridge, RS-485 adapter, or a
//!    recorded capture file).
//! 2. Decodes every frame and keeps a model of the controller: which
//!    equipment is on, temperatures, salt level, pump telemetry.
//! 3. Calls back with the fields each frame changed.
//! 4. When asked to change something, pretends to be a wireless remote and
//!    presses the right key right after a keep-alive, then checks the LEDs
//!    to see whether the press worked, retrying if it did not.

/// Application layer: the engine and the state it reports.
pub mod application;

/// Infrastructure layer: transports and configuration.
pub mod infrastructure;

pub use application::engine::{AquaLogic, AquaLogicHandle, EngineConfig, EngineError};
pub use application::snapshot::{ChangeSet, Field, FieldChange, FieldValue, Snapshot};
