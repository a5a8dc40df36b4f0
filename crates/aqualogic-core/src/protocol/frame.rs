//! Frame tags and framing constants for the AquaLogic bus protocol.
//!
//! Wire format:
//! ```text
//! [DLE STX][type:2][payload:N][checksum:2][DLE ETX]
//! ```
//! Every literal `0x10` inside type, payload, or checksum is followed by an
//! inserted `0x00` ("DLE stuffing").  The checksum is big-endian.

use serde::{Deserialize, Serialize};

// ── Framing constants ─────────────────────────────────────────────────────────

/// Data Link Escape: first byte of both frame markers.
pub const DLE: u8 = 0x10;

/// Start of Text: second byte of the start marker.
pub const STX: u8 = 0x02;

/// End of Text: second byte of the end marker.
pub const ETX: u8 = 0x03;

/// Byte inserted after a literal [`DLE`] inside a frame body.
pub const STUFFING: u8 = 0x00;

/// Length of the frame type tag in bytes.
pub const TAG_LEN: usize = 2;

/// Length of the trailing checksum in bytes.
pub const CHECKSUM_LEN: usize = 2;

// ── Frame types ───────────────────────────────────────────────────────────────

/// The 2-byte tag that opens every frame payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrameType {
    /// Periodic poll from the controller; the window for sending queued frames.
    KeepAlive,
    /// Key pressed on the local wired panel (black face with service button).
    LocalKey,
    /// Key pressed on a remote wired panel (white face).
    RemoteKey,
    /// Key pressed on a wireless remote; also the tag of frames we send.
    WirelessKey,
    /// Current and flashing LED bitmasks.
    Leds,
    /// Speed percentage requested of a variable-speed pump.
    PumpSpeedRequest,
    /// Speed and power telemetry reported by a variable-speed pump.
    PumpStatus,
    /// LCD text for the standard two-line display.
    DisplayUpdate,
    /// LCD text for the long display variant.
    LongDisplayUpdate,
}

impl FrameType {
    /// Every known frame type, in tag order of the protocol table.
    pub const ALL: [FrameType; 9] = [
        FrameType::KeepAlive,
        FrameType::LocalKey,
        FrameType::RemoteKey,
        FrameType::WirelessKey,
        FrameType::Leds,
        FrameType::DisplayUpdate,
        FrameType::LongDisplayUpdate,
        FrameType::PumpSpeedRequest,
        FrameType::PumpStatus,
    ];

    /// Returns the 2-byte wire tag for this frame type.
    pub const fn tag(self) -> [u8; 2] {
        match self {
            FrameType::KeepAlive => [0x01, 0x01],
            FrameType::LocalKey => [0x00, 0x02],
            FrameType::RemoteKey => [0x00, 0x03],
            FrameType::WirelessKey => [0x00, 0x8C],
            FrameType::Leds => [0x01, 0x02],
            FrameType::DisplayUpdate => [0x01, 0x03],
            FrameType::LongDisplayUpdate => [0x04, 0x0A],
            FrameType::PumpSpeedRequest => [0x0C, 0x01],
            FrameType::PumpStatus => [0x00, 0x0C],
        }
    }
}

impl TryFrom<[u8; 2]> for FrameType {
    type Error = ();

    fn try_from(tag: [u8; 2]) -> Result<Self, ()> {
        FrameType::ALL
            .into_iter()
            .find(|t| t.tag() == tag)
            .ok_or(())
    }
}

/// A verified frame: its type and the body that follows the tag.
///
/// Frames are ephemeral; the engine consumes them as soon as they are decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub frame_type: FrameType,
    pub body: Vec<u8>,
}

// ── Tests ─────────────────────────────────────────────────────────────────────
