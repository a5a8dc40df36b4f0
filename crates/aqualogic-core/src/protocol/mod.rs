//! Protocol module containing frame types and the wire codec.

pub mod codec;
pub mod frame;
pub mod sequence;

pub use codec::{
    checksum, decode_type, encode_frame, encode_key_frame, verify, DecodeEvent, FrameDecoder,
    ProtocolError,
};
pub use frame::{Frame, FrameType};
pub use sequence::CommandIdCounter;
