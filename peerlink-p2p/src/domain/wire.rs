//! Bit-exact wire format.
//!
//! Byte 0 is the packet-type tag, bytes `1..` are the payload. Only `Data`
//! packets carry a payload; control packets are a single tag byte.

use crate::domain::{Channel, PeerId};

/// Packet-type tag in byte 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketType {
    Connect = 0,
    ConnectionAccepted = 1,
    Data = 2,
    Disconnect = 3,
}

impl TryFrom<u8> for PacketType {
    type Error = WireError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(PacketType::Connect),
            1 => Ok(PacketType::ConnectionAccepted),
            2 => Ok(PacketType::Data),
            3 => Ok(PacketType::Disconnect),
            other => Err(WireError::UnknownTag(other)),
        }
    }
}

/// Codec failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    #[error("empty packet")]
    Empty,

    #[error("unrecognised packet tag {0}")]
    UnknownTag(u8),

    #[error("data packet without payload")]
    EmptyData,
}

/// Decoded view over a raw packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    pub kind: PacketType,
    pub payload: &'a [u8],
}

/// Build a packet: tag byte followed by `payload`
pub fn encode(kind: PacketType, payload: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(payload.len() + 1);
    bytes.push(kind as u8);
    bytes.extend_from_slice(payload);
    bytes
}

/// Tag-only control packet
pub fn control(kind: PacketType) -> Vec<u8> {
    vec![kind as u8]
}

pub fn decode(bytes: &[u8]) -> Result<Frame<'_>, WireError> {
    let (&tag, payload) = bytes.split_first().ok_or(WireError::Empty)?;
    let kind = PacketType::try_from(tag)?;

    if kind == PacketType::Data && payload.is_empty() {
        return Err(WireError::EmptyData);
    }

    Ok(Frame { kind, payload })
}

/// A packet read off the platform and waiting for dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundPacket {
    pub sender: PeerId,
    /// Tag byte + body
    pub payload: Vec<u8>,
    pub channel: Channel,
}

impl InboundPacket {
    pub fn new(sender: PeerId, payload: Vec<u8>, channel: Channel) -> Self {
        Self {
            sender,
            payload,
            channel,
        }
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_values() {
        assert_eq!(PacketType::Connect as u8, 0);
        assert_eq!(PacketType::ConnectionAccepted as u8, 1);
        assert_eq!(PacketType::Data as u8, 2);
        assert_eq!(PacketType::Disconnect as u8, 3);
    }

    #[test]
    fn test_encode_data() {
        assert_eq!(encode(PacketType::Data, b"hi"), vec![2, b'h', b'i']);
        assert_eq!(control(PacketType::Connect), vec![0]);
    }

    #[test]
    fn test_decode_strips_tag() {
        let bytes = [2u8, 10, 20, 30];
        let frame = decode(&bytes).unwrap();
        assert_eq!(frame.kind, PacketType::Data);
        assert_eq!(frame.payload, &[10, 20, 30]);
    }

    #[test]
    fn test_decode_control_packets() {
        assert_eq!(decode(&[1]).unwrap().kind, PacketType::ConnectionAccepted);
        assert_eq!(decode(&[3]).unwrap().kind, PacketType::Disconnect);
        assert!(decode(&[0]).unwrap().payload.is_empty());
    }

    #[test]
    fn test_decode_rejects_malformed() {
        assert_eq!(decode(&[]), Err(WireError::Empty));
        assert_eq!(decode(&[9, 1, 2]), Err(WireError::UnknownTag(9)));
        assert_eq!(decode(&[2]), Err(WireError::EmptyData));
    }
}
