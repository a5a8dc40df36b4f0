//! # aqualogic-core
//!
//! Shared library for talking to AquaLogic / ProLogic pool and spa controllers
//! over their RS-485 bus.  Contains the frame codec, the bitmask state model
//! with pending-command reconciliation, and the LCD display text decoder.
//!
//! It has zero dependencies on OS APIs, async runtimes, or network sockets:
//! bytes go in, typed values come out.
//!
//! # Architecture overview (for beginners)
//!
//! The controller continuously broadcasts short binary *frames* on its bus:
//! keep-alives, LED state bitmasks, LCD display text, and pump telemetry.  A
//! client listens to those frames to learn the state of the pool, and injects
//! its own frames (pretending to be a wireless remote) to press keys.
//!
//! This crate is split into two areas:
//!
//! - **`protocol`** – How bytes travel on the bus.  The [`protocol::codec`]
//!   module finds frame boundaries, removes DLE stuffing, verifies the
//!   additive checksum, and encodes outbound key-press frames.
//!
//! - **`domain`** – What the bytes mean.  [`domain::state`] models the LED
//!   bitmask, [`domain::keys`] the remote's key codes, [`domain::store`] the
//!   queue of commands waiting to be confirmed, and [`domain::display`] turns
//!   raw LCD bytes into rows of text segments.

pub mod domain;
pub mod protocol;

pub use domain::display::{DisplayDecoder, DisplaySection, DisplayToken};
pub use domain::keys::{key_for_state, Key};
pub use domain::state::{State, StateSet};
pub use domain::store::{DesiredState, PendingCommand, ReconcileOutcome, StateStore};
pub use protocol::codec::{
    checksum, decode_type, encode_frame, encode_key_frame, verify, DecodeEvent, FrameDecoder,
    ProtocolError,
};
pub use protocol::frame::{Frame, FrameType};
