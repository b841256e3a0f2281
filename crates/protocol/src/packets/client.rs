//! Client -> Server packet parsing.

use crate::{BinaryReader, ProtocolError};

/// Parsed client packet.
///
/// All gameplay packets only record intent; the simulation consumes them at
/// the next tick boundary.
#[derive(Debug, Clone)]
pub enum ClientPacket {
    /// Spawn or respawn into the arena (0x01), optionally with a stake.
    Respawn { name: String, stake: Option<f64> },
    /// Heading target relative to the player centroid (0x10).
    SetTarget { x: f32, y: f32 },
    /// Split request (0x11).
    Split,
    /// Eject-mass request (0x12).
    Eject,
    /// Heartbeat for otherwise-idle clients (0x20).
    Ping,
    /// Voluntary exit (0x21).
    Leave,
}

impl ClientPacket {
    /// Parse a client packet from raw bytes.
    pub fn parse(data: &[u8]) -> Result<Self, ProtocolError> {
        if data.is_empty() {
            return Err(ProtocolError::UnexpectedEof);
        }

        let mut reader = BinaryReader::new(data.to_vec());
        let opcode = reader.get_u8();

        match opcode {
            0x01 => {
                let has_stake = reader.try_get_u8().ok_or(ProtocolError::UnexpectedEof)?;
                let stake = if has_stake != 0 {
                    Some(reader.try_get_f64().ok_or(ProtocolError::UnexpectedEof)?)
                } else {
                    None
                };
                if stake.is_some_and(|s| !s.is_finite() || s < 0.0) {
                    return Err(ProtocolError::MalformedPayload);
                }
                let name = reader.get_string();
                Ok(ClientPacket::Respawn { name, stake })
            }
            0x10 => {
                let x = reader.try_get_f32().ok_or(ProtocolError::UnexpectedEof)?;
                let y = reader.try_get_f32().ok_or(ProtocolError::UnexpectedEof)?;
                if !x.is_finite() || !y.is_finite() {
                    return Err(ProtocolError::MalformedPayload);
                }
                Ok(ClientPacket::SetTarget { x, y })
            }
            0x11 => Ok(ClientPacket::Split),
            0x12 => Ok(ClientPacket::Eject),
            0x20 => Ok(ClientPacket::Ping),
            0x21 => Ok(ClientPacket::Leave),
            _ => Err(ProtocolError::InvalidOpcode(opcode)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BinaryWriter;

    #[test]
    fn test_parse_set_target() {
        let mut w = BinaryWriter::new();
        w.put_u8(0x10);
        w.put_f32(120.5);
        w.put_f32(-80.0);
        let pkt = ClientPacket::parse(w.as_slice()).unwrap();
        match pkt {
            ClientPacket::SetTarget { x, y } => {
                assert_eq!(x, 120.5);
                assert_eq!(y, -80.0);
            }
            other => panic!("unexpected packet: {other:?}"),
        }
    }

    #[test]
    fn test_parse_respawn_with_stake() {
        let mut w = BinaryWriter::new();
        w.put_u8(0x01);
        w.put_u8(1);
        w.put_f64(25.0);
        w.put_string("gambler");
        let pkt = ClientPacket::parse(w.as_slice()).unwrap();
        match pkt {
            ClientPacket::Respawn { name, stake } => {
                assert_eq!(name, "gambler");
                assert_eq!(stake, Some(25.0));
            }
            other => panic!("unexpected packet: {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_negative_stake() {
        let mut w = BinaryWriter::new();
        w.put_u8(0x01);
        w.put_u8(1);
        w.put_f64(-5.0);
        w.put_string("x");
        assert!(ClientPacket::parse(w.as_slice()).is_err());
    }

    #[test]
    fn test_parse_invalid_opcode() {
        assert!(ClientPacket::parse(&[0x7F]).is_err());
    }
}
