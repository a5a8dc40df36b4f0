//! Wire codec for AquaLogic bus frames.
//!
//! Wire format:
//! ```text
//! [10 02][type:2][payload:N][checksum:2][10 03]
//! ```
//! `checksum = (0x10 + 0x02 + Σ type/payload bytes) mod 65536`, big-endian.
//! A literal `0x10` anywhere between the markers is sent as `10 00`.
//!
//! # Decoding pipeline
//!
//! 1. [`FrameDecoder::push`] is fed one byte at a time.  It discards noise
//!    until the start marker, collects the frame body, collapses `10 00`
//!    back to `10`, and yields the raw frame when the end marker arrives.
//! 2. [`verify`] checks the trailing checksum and strips it.
//! 3. [`decode_type`] splits off the 2-byte tag and resolves a [`FrameType`].
//!
//! Each step can fail softly: the caller logs the [`ProtocolError`] and moves
//! on to the next frame.

use thiserror::Error;

use crate::domain::keys::Key;
use crate::protocol::frame::{Frame, FrameType, CHECKSUM_LEN, DLE, ETX, STUFFING, STX, TAG_LEN};

/// Frames longer than this are assumed to be a lost end marker.
pub const DEFAULT_MAX_FRAME_LEN: usize = 512;

/// Errors that can occur while verifying or decoding a frame.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// The trailing checksum does not match the frame contents.
    #[error("bad checksum: computed 0x{expected:04X}, frame carries 0x{actual:04X}")]
    ChecksumMismatch { expected: u16, actual: u16 },

    /// The frame is shorter than its fixed-size fields.
    #[error("truncated frame: need at least {needed} bytes, got {available}")]
    Truncated { needed: usize, available: usize },

    /// The 2-byte type tag is not one the protocol defines.
    #[error("unknown frame type: {:02X} {:02X}", .0[0], .0[1])]
    UnknownFrameType([u8; 2]),

    /// No end marker arrived before the frame grew past the length limit.
    #[error("frame exceeds {limit} bytes without an end marker")]
    FrameTooLong { limit: usize },
}

// ── Incremental decoder ───────────────────────────────────────────────────────

/// Position of the decoder inside the byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecoderState {
    /// Scanning for the `DLE` of a start marker.
    SeekDle,
    /// Saw `DLE`; an `STX` completes the start marker.
    SeekStx,
    /// Collecting frame bytes.
    InFrame,
    /// Saw `DLE` inside a frame; the next byte decides what it meant.
    Escape,
}

/// Events produced by [`FrameDecoder::push`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeEvent {
    /// The start marker was found; a new frame is being collected.
    FrameStarted,
    /// The end marker was found.  Holds the de-stuffed bytes between the
    /// markers: type tag, payload, and checksum.
    Frame(Vec<u8>),
    /// `DLE` was followed by something other than `00` or `03`.  The `DLE`
    /// is kept as data and the offending byte is dropped.
    EscapeAnomaly(u8),
    /// The frame exceeded the length limit and was discarded.
    Overflow(ProtocolError),
}

/// Push-based frame synchroniser and de-stuffer.
///
/// The decoder never blocks and owns no I/O: the caller reads bytes from
/// whatever transport it has and feeds them in, which keeps read timeouts and
/// cancellation in the caller's hands.
///
/// # Examples
///
/// ```rust
/// use aqualogic_core::protocol::codec::{DecodeEvent, FrameDecoder};
///
/// let mut decoder = FrameDecoder::new();
/// let frames = decoder.push_slice(&[0xFF, 0x10, 0x02, 0x01, 0x01, 0x00, 0x14, 0x10, 0x03]);
/// assert_eq!(frames, vec![vec![0x01, 0x01, 0x00, 0x14]]);
/// ```
#[derive(Debug)]
pub struct FrameDecoder {
    state: DecoderState,
    buf: Vec<u8>,
    max_len: usize,
}

impl FrameDecoder {
    /// Creates a decoder with the [`DEFAULT_MAX_FRAME_LEN`] limit.
    pub fn new() -> Self {
        Self::with_max_len(DEFAULT_MAX_FRAME_LEN)
    }

    /// Creates a decoder that drops frames longer than `max_len` bytes.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            state: DecoderState::SeekDle,
            buf: Vec::with_capacity(64),
            max_len,
        }
    }

    /// Returns `true` once a start marker has been seen and the current frame
    /// has not yet ended.
    pub fn in_frame(&self) -> bool {
        matches!(self.state, DecoderState::InFrame | DecoderState::Escape)
    }

    /// Drops any partial frame and goes back to scanning for a start marker.
    pub fn reset(&mut self) {
        self.state = DecoderState::SeekDle;
        self.buf.clear();
    }

    /// Feeds one byte into the decoder.
    pub fn push(&mut self, byte: u8) -> Option<DecodeEvent> {
        match self.state {
            DecoderState::SeekDle => {
                if byte == DLE {
                    self.state = DecoderState::SeekStx;
                }
                None
            }
            DecoderState::SeekStx => match byte {
                STX => {
                    self.state = DecoderState::InFrame;
                    self.buf.clear();
                    Some(DecodeEvent::FrameStarted)
                }
                // `10 10 02` still synchronises on the second DLE.
                DLE => None,
                _ => {
                    self.state = DecoderState::SeekDle;
                    None
                }
            },
            DecoderState::InFrame => {
                if byte == DLE {
                    self.state = DecoderState::Escape;
                    return None;
                }
                self.append(byte)
            }
            DecoderState::Escape => match byte {
                ETX => {
                    self.state = DecoderState::SeekDle;
                    Some(DecodeEvent::Frame(std::mem::take(&mut self.buf)))
                }
                STUFFING => {
                    self.state = DecoderState::InFrame;
                    self.append(DLE)
                }
                other => {
                    self.state = DecoderState::InFrame;
                    self.append(DLE)
                        .or(Some(DecodeEvent::EscapeAnomaly(other)))
                }
            },
        }
    }

    /// Feeds a run of bytes and returns every complete frame found.
    ///
    /// Anomalies and overflows are skipped; use [`push`](Self::push) when the
    /// caller needs to observe them.
    pub fn push_slice(&mut self, data: &[u8]) -> Vec<Vec<u8>> {
        data.iter()
            .filter_map(|&b| match self.push(b) {
                Some(DecodeEvent::Frame(frame)) => Some(frame),
                _ => None,
            })
            .collect()
    }

    fn append(&mut self, byte: u8) -> Option<DecodeEvent> {
        if self.buf.len() >= self.max_len {
            self.reset();
            return Some(DecodeEvent::Overflow(ProtocolError::FrameTooLong {
                limit: self.max_len,
            }));
        }
        self.buf.push(byte);
        None
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

// ── Checksum / verify / type decode ──────────────────────────────────────────

/// Computes the additive frame checksum over the un-stuffed type and payload.
///
/// The start marker bytes are part of the sum even though they are not part
/// of `payload`.
pub fn checksum(payload: &[u8]) -> u16 {
    payload
        .iter()
        .fold(u16::from(DLE) + u16::from(STX), |acc, &b| {
            acc.wrapping_add(u16::from(b))
        })
}

/// Verifies the trailing big-endian checksum of a de-stuffed frame.
///
/// Returns the bytes before the checksum (type tag and payload).
///
/// # Errors
///
/// Returns [`ProtocolError::Truncated`] if there is no room for a checksum,
/// and [`ProtocolError::ChecksumMismatch`] if the sum does not match.
pub fn verify(raw: &[u8]) -> Result<&[u8], ProtocolError> {
    if raw.len() < CHECKSUM_LEN {
        return Err(ProtocolError::Truncated {
            needed: CHECKSUM_LEN,
            available: raw.len(),
        });
    }
    let (payload, crc) = raw.split_at(raw.len() - CHECKSUM_LEN);
    let actual = u16::from_be_bytes([crc[0], crc[1]]);
    let expected = checksum(payload);
    if actual != expected {
        return Err(ProtocolError::ChecksumMismatch { expected, actual });
    }
    Ok(payload)
}

/// Splits a verified payload into its [`FrameType`] and body.
///
/// # Errors
///
/// Returns [`ProtocolError::Truncated`] when the tag is incomplete and
/// [`ProtocolError::UnknownFrameType`] when the tag is not recognised.
pub fn decode_type(payload: &[u8]) -> Result<Frame, ProtocolError> {
    if payload.len() < TAG_LEN {
        return Err(ProtocolError::Truncated {
            needed: TAG_LEN,
            available: payload.len(),
        });
    }
    let tag = [payload[0], payload[1]];
    let frame_type = FrameType::try_from(tag).map_err(|_| ProtocolError::UnknownFrameType(tag))?;
    Ok(Frame {
        frame_type,
        body: payload[TAG_LEN..].to_vec(),
    })
}

// ── Encoding ──────────────────────────────────────────────────────────────────

/// Appends `data` to `out`, inserting `00` after every `10`.
fn append_stuffed(out: &mut Vec<u8>, data: &[u8]) {
    for &b in data {
        out.push(b);
        if b == DLE {
            out.push(STUFFING);
        }
    }
}

/// Returns `data` with DLE stuffing applied.
pub fn stuff(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + 4);
    append_stuffed(&mut out, data);
    out
}

/// Encodes a complete frame: markers, stuffed tag/body/checksum.
pub fn encode_frame(frame_type: FrameType, body: &[u8]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(TAG_LEN + body.len());
    payload.extend_from_slice(&frame_type.tag());
    payload.extend_from_slice(body);
    let crc = checksum(&payload);

    let mut out = Vec::with_capacity(payload.len() + 12);
    out.push(DLE);
    out.push(STX);
    append_stuffed(&mut out, &payload);
    append_stuffed(&mut out, &crc.to_be_bytes());
    out.push(DLE);
    out.push(ETX);
    out
}

/// Encodes the wireless-remote frame that presses `key`.
///
/// Body layout: `01`, key code (u32 LE), key code again (u32 LE), `00`.
///
/// # Examples
///
/// ```rust
/// use aqualogic_core::{encode_key_frame, Key};
///
/// let frame = encode_key_frame(Key::Right);
/// assert_eq!(
///     frame,
///     vec![0x10, 0x02, 0x00, 0x8C, 0x01, 0x01, 0x00, 0x00, 0x00,
///          0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0xA1, 0x10, 0x03]
/// );
/// ```
pub fn encode_key_frame(key: Key) -> Vec<u8> {
    let code = key.code().to_le_bytes();
    let mut body = Vec::with_capacity(10);
    body.push(0x01);
    body.extend_from_slice(&code);
    body.extend_from_slice(&code);
    body.push(0x00);
    encode_frame(FrameType::WirelessKey, &body)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
