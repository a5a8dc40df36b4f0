//! Infrastructure layer for the client.
//!
//! Contains the adapters that touch the outside world: byte transports to the
//! controller bus and the on-disk configuration file.
//!
//! **Dependency rule**: this layer may depend on `aqualogic_core`, and the
//! application layer depends on the [`transport::ByteStream`] trait defined
//! here, never on a concrete transport.
//!
//! # Sub-modules
//!
//! - **`transport`** – the `ByteStream` trait plus TCP, file replay,
//!   in-memory, and (feature `serial`) RS-485 serial implementations.
//!
//! - **`storage`** – TOML configuration loading and saving.

pub mod storage;
pub mod transport;
