//! Fixed command header
//!
//! Every announcement packet leads with this 64-byte header; the payload
//! length field is what the receiver trusts to frame the rest.

use crate::error::FramingError;
use crate::types::{Command, PacketId, PACKET_ID_SIZE, TRANS_REPLY};

use super::cursor::{ReadCursor, WriteCursor};

/// Fixed-size command header leading every announcement packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CmdHeader {
    /// Destination id; also carries piggybacked version fields on reverse lookup.
    pub id: PacketId,
    /// Transaction id; the high bit is the reply marker.
    pub trans: u64,
    /// Command code (see [`Command`]).
    pub cmd: u32,
    /// Flag bitset (NEED-ACK, DIRECT, NO-LOCK).
    pub flags: u64,
    /// Payload length in bytes following the header.
    pub size: u64,
}

impl CmdHeader {
    /// Encoded size: 36-byte id, transaction, command, flags, payload length.
    pub const WIRE_SIZE: usize = PacketId::WIRE_SIZE + 8 + 4 + 8 + 8;

    pub fn new(id: PacketId, trans: u64, cmd: Command) -> Self {
        Self { id, trans, cmd: cmd as u32, flags: 0, size: 0 }
    }

    /// Whether the reply marker is set on the transaction id.
    pub fn is_reply(&self) -> bool {
        self.trans & TRANS_REPLY != 0
    }

    /// Transaction id with the reply marker stripped.
    pub fn trans_id(&self) -> u64 {
        self.trans & !TRANS_REPLY
    }

    /// The command code, rejected if this node does not speak it.
    pub fn command(&self) -> Result<Command, FramingError> {
        Command::from_u32(self.cmd).ok_or(FramingError::UnknownCommand(self.cmd))
    }

    pub fn encode(&self, cur: &mut WriteCursor) {
        cur.put_bytes(&self.id.id);
        cur.put_u32_le(self.id.group_id);
        cur.put_u64_le(self.trans);
        cur.put_u32_le(self.cmd);
        cur.put_u64_le(self.flags);
        cur.put_u64_le(self.size);
    }

    pub fn decode(cur: &mut ReadCursor<'_>) -> Result<Self, FramingError> {
        let mut id = [0u8; PACKET_ID_SIZE];
        id.copy_from_slice(cur.get_bytes(PACKET_ID_SIZE)?);
        let group_id = cur.get_u32_le()?;
        let trans = cur.get_u64_le()?;
        let cmd = cur.get_u32_le()?;
        let flags = cur.get_u64_le()?;
        let size = cur.get_u64_le()?;
        Ok(Self { id: PacketId::new(id, group_id), trans, cmd, flags, size })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FLAG_DIRECT, FLAG_NOLOCK};

    #[test]
    fn header_round_trip() {
        let header = CmdHeader {
            id: PacketId::new([7; PACKET_ID_SIZE], 3),
            trans: 99 | TRANS_REPLY,
            cmd: Command::Join as u32,
            flags: FLAG_NOLOCK | FLAG_DIRECT,
            size: 1234,
        };

        let mut cur = WriteCursor::with_exact_size(CmdHeader::WIRE_SIZE).unwrap();
        header.encode(&mut cur);
        let buf = cur.finish().unwrap();
        assert_eq!(buf.len(), CmdHeader::WIRE_SIZE);

        let mut cur = ReadCursor::new(&buf);
        let decoded = CmdHeader::decode(&mut cur).unwrap();
        cur.finish().unwrap();

        assert_eq!(decoded, header);
        assert!(decoded.is_reply());
        assert_eq!(decoded.trans_id(), 99);
        assert_eq!(decoded.command().unwrap(), Command::Join);
    }

    #[test]
    fn unknown_command_is_rejected() {
        let header = CmdHeader { cmd: 77, ..CmdHeader::new(PacketId::default(), 0, Command::Join) };
        assert_eq!(header.command().unwrap_err(), FramingError::UnknownCommand(77));
    }

    #[test]
    fn truncated_header_is_rejected() {
        let buf = [0u8; CmdHeader::WIRE_SIZE - 1];
        let mut cur = ReadCursor::new(&buf);
        assert!(CmdHeader::decode(&mut cur).is_err());
    }
}
