//! Id container codec
//!
//! The id container announces, per backend slot, which raw ids the slot
//! owns. The decode path is the trust boundary for inbound joins: every
//! declared count is checked against the remaining payload before it is
//! used to size or index memory.

use crate::error::FramingError;
use crate::types::{RawId, RAW_ID_SIZE};

use super::cursor::{ReadCursor, WriteCursor};

/// Size of the container's count prefix.
pub const ID_CONTAINER_HEADER_SIZE: usize = 4;

/// One backend's ownership declaration as carried on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendAnnouncement {
    /// Backend slot index.
    pub backend_id: u32,
    /// Replication group affiliation; -1 for a never-enabled slot.
    pub group_id: i32,
    /// Owned ids, in registration order.
    pub ids: Vec<RawId>,
}

impl BackendAnnouncement {
    /// Size of a block's fixed fields: backend id, group id, id count.
    pub const HEADER_SIZE: usize = 12;

    /// Encoded size of a block carrying `ids_count` ids.
    pub fn wire_size(ids_count: usize) -> usize {
        Self::HEADER_SIZE + ids_count * RAW_ID_SIZE
    }

    pub fn encode(&self, cur: &mut WriteCursor) {
        encode_block(cur, self.backend_id, self.group_id, &self.ids);
    }

    fn decode(cur: &mut ReadCursor<'_>) -> Result<Self, FramingError> {
        let backend_id = cur.get_u32_le()?;
        let group_id = cur.get_i32_le()?;
        let ids_count = cur.get_u32_le()?;

        let need = (ids_count as usize)
            .checked_mul(RAW_ID_SIZE)
            .ok_or(FramingError::OversizedIdArray { backend_id, ids_count })?;
        if cur.remaining() < need {
            return Err(FramingError::OversizedIdArray { backend_id, ids_count });
        }

        let mut ids = Vec::with_capacity(ids_count as usize);
        for _ in 0..ids_count {
            let mut raw = [0u8; RAW_ID_SIZE];
            raw.copy_from_slice(cur.get_bytes(RAW_ID_SIZE)?);
            ids.push(RawId(raw));
        }
        Ok(Self { backend_id, group_id, ids })
    }
}

/// Write one backend block: index, group, count, then the raw id bytes
/// back-to-back with no padding.
pub fn encode_block(cur: &mut WriteCursor, backend_id: u32, group_id: i32, ids: &[RawId]) {
    cur.put_u32_le(backend_id);
    cur.put_i32_le(group_id);
    cur.put_u32_le(ids.len() as u32);
    for id in ids {
        cur.put_bytes(id.as_bytes());
    }
}

/// Validate and decode the id container.
///
/// The declared backend count is bounded by the remaining payload (each
/// block is at least [`BackendAnnouncement::HEADER_SIZE`] bytes) before any
/// allocation happens.
pub fn decode_id_container(cur: &mut ReadCursor<'_>) -> Result<Vec<BackendAnnouncement>, FramingError> {
    let backends_count = cur.get_u32_le()?;

    let min = (backends_count as usize)
        .checked_mul(BackendAnnouncement::HEADER_SIZE)
        .ok_or(FramingError::Truncated { need: usize::MAX, have: cur.remaining() })?;
    if cur.remaining() < min {
        return Err(FramingError::Truncated { need: min, have: cur.remaining() });
    }

    let mut backends = Vec::with_capacity(backends_count as usize);
    for _ in 0..backends_count {
        backends.push(BackendAnnouncement::decode(cur)?);
    }
    Ok(backends)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(byte: u8) -> RawId {
        RawId::from_bytes([byte; RAW_ID_SIZE])
    }

    #[test]
    fn container_round_trip() {
        let backends = vec![
            BackendAnnouncement { backend_id: 0, group_id: 1, ids: vec![id(0xaa), id(0xbb)] },
            BackendAnnouncement { backend_id: 5, group_id: -1, ids: vec![] },
        ];

        let total = ID_CONTAINER_HEADER_SIZE
            + backends.iter().map(|b| BackendAnnouncement::wire_size(b.ids.len())).sum::<usize>();
        let mut cur = WriteCursor::with_exact_size(total).unwrap();
        cur.put_u32_le(backends.len() as u32);
        for backend in &backends {
            backend.encode(&mut cur);
        }
        let buf = cur.finish().unwrap();

        let mut cur = ReadCursor::new(&buf);
        let decoded = decode_id_container(&mut cur).unwrap();
        cur.finish().unwrap();
        assert_eq!(decoded, backends);
    }

    #[test]
    fn oversized_ids_count_rejected_before_allocation() {
        // One block declaring u32::MAX ids with an empty array.
        let mut cur = WriteCursor::with_exact_size(ID_CONTAINER_HEADER_SIZE + BackendAnnouncement::HEADER_SIZE).unwrap();
        cur.put_u32_le(1);
        cur.put_u32_le(3);
        cur.put_i32_le(1);
        cur.put_u32_le(u32::MAX);
        let buf = cur.finish().unwrap();

        let mut cur = ReadCursor::new(&buf);
        let err = decode_id_container(&mut cur).unwrap_err();
        assert_eq!(err, FramingError::OversizedIdArray { backend_id: 3, ids_count: u32::MAX });
    }

    #[test]
    fn oversized_backend_count_rejected() {
        let mut cur = WriteCursor::with_exact_size(ID_CONTAINER_HEADER_SIZE).unwrap();
        cur.put_u32_le(1000);
        let buf = cur.finish().unwrap();

        let mut cur = ReadCursor::new(&buf);
        let err = decode_id_container(&mut cur).unwrap_err();
        assert_eq!(err, FramingError::Truncated { need: 1000 * BackendAnnouncement::HEADER_SIZE, have: 0 });
    }

    #[test]
    fn preserves_registration_order() {
        let ids = vec![id(3), id(1), id(2)];
        let block = BackendAnnouncement { backend_id: 0, group_id: 7, ids: ids.clone() };

        let mut cur = WriteCursor::with_exact_size(ID_CONTAINER_HEADER_SIZE + BackendAnnouncement::wire_size(3)).unwrap();
        cur.put_u32_le(1);
        block.encode(&mut cur);
        let buf = cur.finish().unwrap();

        let mut cur = ReadCursor::new(&buf);
        let decoded = decode_id_container(&mut cur).unwrap();
        assert_eq!(decoded[0].ids, ids);
    }
}
