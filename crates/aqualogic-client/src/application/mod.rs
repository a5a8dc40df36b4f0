//! Application layer for the client.
//!
//! - **`engine`** – the read loop ([`engine::AquaLogic`]) and the handle used
//!   to submit commands and read state ([`engine::AquaLogicHandle`]).
//! - **`snapshot`** – scalar fields the controller reports, and the change
//!   sets delivered to callbacks.
//! - **`display_fields`** – turns decoded LCD text into typed readings.

pub mod display_fields;
pub mod engine;
pub mod snapshot;
