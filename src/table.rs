//! Backend ownership table
//!
//! `RouteList` tracks which local backends currently participate in routing
//! and which raw ids each one claims. All reads and writes go through one
//! node-scoped lock, which also covers the local address list so a snapshot
//! sees both consistently. Membership changes are rare relative to data-path
//! traffic, so the coarse lock favors correctness over throughput.

use log::debug;
use parking_lot::Mutex;

use crate::error::RouteResult;
use crate::types::{
    Command, NodeAddr, PacketId, RawId, RouteConfig, FLAG_DIRECT, FLAG_NOLOCK, TRANS_REPLY,
};
use crate::wire::{ids, AddrContainer, CmdHeader, WriteCursor, ID_CONTAINER_HEADER_SIZE};

/// Per-backend routing state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendSlot {
    /// Whether this backend currently participates in routing.
    pub activated: bool,
    /// Replication group affiliation; -1 while the slot has never been enabled.
    pub group_id: i32,
    /// Ids this backend claims, in registration order.
    pub ids: Vec<RawId>,
}

impl Default for BackendSlot {
    fn default() -> Self {
        Self { activated: false, group_id: -1, ids: Vec::new() }
    }
}

#[derive(Debug, Default)]
struct RouteListInner {
    backends: Vec<BackendSlot>,
    addrs: Vec<NodeAddr>,
}

/// The node's backend ownership table.
///
/// Owned by the routing subsystem for the lifetime of the node and passed by
/// reference to the command handlers; no other component reads or mutates
/// the slots directly.
#[derive(Debug)]
pub struct RouteList {
    config: RouteConfig,
    inner: Mutex<RouteListInner>,
}

impl RouteList {
    pub fn new(config: RouteConfig) -> Self {
        let inner = RouteListInner { backends: Vec::new(), addrs: config.addrs.clone() };
        Self { config, inner: Mutex::new(inner) }
    }

    /// Node identity used as the destination id of outbound joins.
    pub fn node_id(&self) -> PacketId {
        self.config.node_id
    }

    /// Local protocol version for the reverse-lookup exchange.
    pub fn local_version(&self) -> [u32; 4] {
        self.config.version
    }

    /// Local index shard count for the reverse-lookup exchange.
    pub fn shard_count(&self) -> u32 {
        self.config.shard_count
    }

    /// Number of locally configured addresses.
    pub fn local_addr_num(&self) -> usize {
        self.inner.lock().addrs.len()
    }

    /// Number of slots currently in the table. Grows, never shrinks.
    pub fn backend_count(&self) -> usize {
        self.inner.lock().backends.len()
    }

    /// Point-in-time copy of one slot, mainly for inspection and tests.
    pub fn backend(&self, backend_id: usize) -> Option<BackendSlot> {
        self.inner.lock().backends.get(backend_id).cloned()
    }

    /// Activate a backend slot, growing the table if needed.
    ///
    /// The slot's id set is replaced wholesale: after this call the backend
    /// owns exactly `ids`, not a union with whatever it owned before. Ids
    /// are not validated here; the handler that parsed them already did.
    pub fn enable_backend(&self, backend_id: usize, group_id: i32, ids: Vec<RawId>) -> RouteResult<()> {
        let mut inner = self.inner.lock();

        if backend_id >= inner.backends.len() {
            let grow = backend_id + 1 - inner.backends.len();
            inner.backends.try_reserve(grow)?;
            inner.backends.resize_with(backend_id + 1, BackendSlot::default);
        }

        let slot = &mut inner.backends[backend_id];
        slot.activated = true;
        slot.group_id = group_id;
        slot.ids = ids;

        debug!("enabled backend {}: group {}, {} ids", backend_id, group_id, slot.ids.len());
        Ok(())
    }

    /// Deactivate a backend slot.
    ///
    /// Disabling a slot that was never enabled is a no-op success. The
    /// slot's group and ids are retained, so a later re-enable restores
    /// prior ownership unless it re-registers.
    pub fn disable_backend(&self, backend_id: usize) -> RouteResult<()> {
        let mut inner = self.inner.lock();

        if backend_id >= inner.backends.len() {
            return Ok(());
        }
        inner.backends[backend_id].activated = false;

        debug!("disabled backend {}", backend_id);
        Ok(())
    }

    /// Serialize the full table into an announcement packet.
    ///
    /// Every slot is included regardless of activation state; the receiver
    /// needs the full view to notice recently disabled backends. The size
    /// computation and the buffer fill are a single critical section under
    /// the table lock: if the table could change in between, the buffer
    /// would be under- or over-sized. The returned packet is handed to the
    /// transport after the lock is released, which is what the NO-LOCK
    /// header flag promises the receiver.
    pub fn serialize_snapshot(
        &self,
        dst: &PacketId,
        trans: u64,
        command: Command,
        reply: bool,
        direct: bool,
    ) -> RouteResult<Vec<u8>> {
        let inner = self.inner.lock();

        let mut total = CmdHeader::WIRE_SIZE
            + AddrContainer::wire_size(inner.addrs.len())
            + ID_CONTAINER_HEADER_SIZE;
        for slot in &inner.backends {
            total += ids::BackendAnnouncement::wire_size(slot.ids.len());
        }

        let mut cur = WriteCursor::with_exact_size(total)?;

        let mut trans = trans;
        if reply {
            trans |= TRANS_REPLY;
        }
        let mut flags = FLAG_NOLOCK;
        if direct {
            flags |= FLAG_DIRECT;
        }

        let header = CmdHeader {
            id: *dst,
            trans,
            cmd: command as u32,
            flags,
            size: (total - CmdHeader::WIRE_SIZE) as u64,
        };
        header.encode(&mut cur);

        AddrContainer::encode(&mut cur, &inner.addrs);

        cur.put_u32_le(inner.backends.len() as u32);
        for (backend_id, slot) in inner.backends.iter().enumerate() {
            ids::encode_block(&mut cur, backend_id as u32, slot.group_id, &slot.ids);
        }

        Ok(cur.finish()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RAW_ID_SIZE;

    fn id(byte: u8) -> RawId {
        RawId::from_bytes([byte; RAW_ID_SIZE])
    }

    fn route() -> RouteList {
        RouteList::new(RouteConfig::default())
    }

    #[test]
    fn enable_grows_table_exactly() {
        let route = route();
        route.enable_backend(4, 1, vec![id(1)]).unwrap();

        assert_eq!(route.backend_count(), 5);
        for backend_id in 0..4 {
            let slot = route.backend(backend_id).unwrap();
            assert!(!slot.activated);
            assert!(slot.ids.is_empty());
            assert_eq!(slot.group_id, -1);
        }
        assert!(route.backend(4).unwrap().activated);
    }

    #[test]
    fn enable_replaces_ids_wholesale() {
        let route = route();
        route.enable_backend(0, 1, vec![id(1), id(2)]).unwrap();
        route.enable_backend(0, 2, vec![id(3)]).unwrap();

        let slot = route.backend(0).unwrap();
        assert_eq!(slot.group_id, 2);
        assert_eq!(slot.ids, vec![id(3)]);
    }

    #[test]
    fn disable_never_enabled_slot_is_noop() {
        let route = route();
        route.disable_backend(7).unwrap();
        assert_eq!(route.backend_count(), 0);
    }

    #[test]
    fn disable_retains_ids_and_group() {
        let route = route();
        route.enable_backend(1, 3, vec![id(9)]).unwrap();
        route.disable_backend(1).unwrap();

        let slot = route.backend(1).unwrap();
        assert!(!slot.activated);
        assert_eq!(slot.group_id, 3);
        assert_eq!(slot.ids, vec![id(9)]);

        // Table size is unchanged by the disable.
        assert_eq!(route.backend_count(), 2);
    }

    #[test]
    fn reenable_overwrites_prior_ownership() {
        let route = route();
        route.enable_backend(0, 1, vec![id(1)]).unwrap();
        route.disable_backend(0).unwrap();
        route.enable_backend(0, 1, vec![id(2)]).unwrap();

        let slot = route.backend(0).unwrap();
        assert!(slot.activated);
        assert_eq!(slot.ids, vec![id(2)]);
    }
}
