//! Protocol command handlers
//!
//! Entry points invoked when a peer requests this node's ownership table
//! (reverse lookup) or announces its own (join), plus the outbound join.
//! Handlers validate framing on per-connection state outside the routing
//! lock; only the table itself locks.

use log::{debug, error, info};

use crate::error::{FramingError, RouteResult};
use crate::table::RouteList;
use crate::types::{Command, JoinState, NodeAddr, FLAG_NEED_ACK};
use crate::version;
use crate::wire::{self, CmdHeader};

/// Byte transmission seam; the routing subsystem never touches sockets.
pub trait Transport {
    /// Hand a fully framed packet to the connection for delivery.
    fn send(&self, packet: &[u8]) -> RouteResult<()>;
}

/// Per-connection peer state.
///
/// Everything here is connection-local; mutating it never requires the
/// routing lock.
#[derive(Debug, Clone)]
pub struct PeerState {
    /// The peer's authoritative address; rewritten from its join announcement.
    pub addr: NodeAddr,
    /// The socket address this node observed for the connection.
    pub observed_addr: NodeAddr,
    /// The peer's full declared address list, copied on join.
    pub peer_addrs: Vec<NodeAddr>,
    /// Protocol version the peer reported during reverse lookup.
    pub version: [u32; 4],
    /// Index shard count the peer reported during reverse lookup.
    pub shard_count: u32,
    /// Whether this node has announced itself on this connection.
    pub join_state: JoinState,
    /// Still on the idle/unjoined bookkeeping lists.
    pub idle: bool,
    /// Backend ids registered on behalf of this peer.
    pub backend_associations: Vec<u32>,
    /// Set when a handler failure forced the connection into reset.
    pub reset: bool,
}

impl PeerState {
    pub fn new(observed_addr: NodeAddr) -> Self {
        Self {
            addr: observed_addr,
            observed_addr,
            peer_addrs: Vec::new(),
            version: [0; 4],
            shard_count: 0,
            join_state: JoinState::NotJoined,
            idle: true,
            backend_associations: Vec::new(),
            reset: false,
        }
    }

    /// Force the connection into reset; the connection owner tears the
    /// socket down when it sees this.
    pub fn mark_reset(&mut self) {
        self.reset = true;
    }

    fn drop_backend_associations(&mut self) {
        self.backend_associations.clear();
    }
}

impl RouteList {
    /// Handle an inbound reverse-lookup request: exchange protocol versions
    /// and reply with a snapshot of the full ownership table.
    ///
    /// Any failure forces the connection into reset and sets NEED-ACK on the
    /// inbound header; success is silent, the sent packet being the only
    /// observable effect.
    pub fn on_reverse_lookup<T: Transport>(
        &self,
        peer: &mut PeerState,
        transport: &T,
        cmd: &mut CmdHeader,
    ) -> RouteResult<()> {
        match self.reverse_lookup_inner(peer, transport, cmd) {
            Ok(()) => Ok(()),
            Err(err) => {
                cmd.flags |= FLAG_NEED_ACK;
                peer.mark_reset();
                error!("{}: reverse lookup failed: {}", peer.addr, err);
                Err(err)
            }
        }
    }

    fn reverse_lookup_inner<T: Transport>(
        &self,
        peer: &mut PeerState,
        transport: &T,
        cmd: &mut CmdHeader,
    ) -> RouteResult<()> {
        let remote_version = version::decode_version(&cmd.id);
        let remote_shards = version::decode_shard_count(&cmd.id);
        peer.version = remote_version;
        peer.shard_count = remote_shards;

        // Negotiation is two-way: overwrite the same id fields with the
        // local values before the header travels back.
        version::encode_version(&mut cmd.id, &self.local_version());
        version::encode_shard_count(&mut cmd.id, self.shard_count());

        version::check(&self.local_version(), &remote_version)?;

        info!(
            "{}: reverse lookup: client shard count {}, server shard count {}",
            peer.addr,
            remote_shards,
            self.shard_count()
        );

        cmd.id.group_id = self.node_id().group_id;
        let packet =
            self.serialize_snapshot(&cmd.id, cmd.trans_id(), Command::ReverseLookup, true, true)?;
        transport.send(&packet)
    }

    /// Handle an inbound join announcement.
    ///
    /// Validation failures leave every piece of state untouched. On success
    /// the peer's declared backends are merged into the table in packet
    /// order. If a registration fails partway, the backends merged before it
    /// stay merged (best-effort, inherited behavior); only this peer's
    /// connection-level backend associations are torn down before the error
    /// propagates.
    pub fn on_join(&self, peer: &mut PeerState, cmd: &CmdHeader, payload: &[u8]) -> RouteResult<()> {
        if cmd.size != payload.len() as u64 {
            let err = FramingError::LengthMismatch {
                declared: cmd.size,
                actual: payload.len() as u64,
            };
            error!("{}: invalid join request: {}", peer.addr, err);
            return Err(err.into());
        }

        let parsed = match wire::parse_join_payload(payload, &peer.observed_addr, self.local_addr_num()) {
            Ok(parsed) => parsed,
            Err(err) => {
                error!("{}: invalid join request: {}", peer.addr, err);
                return Err(err.into());
            }
        };

        debug!(
            "{}: join request: address idx {}, addr num {}, peer addr num {}, backends {}",
            peer.addr,
            parsed.addr_index,
            parsed.addrs.len(),
            parsed.node_addr_num,
            parsed.backends.len()
        );

        // The peer is a full member from here on; off the idle lists.
        peer.idle = false;
        peer.addr = parsed.addrs[parsed.addr_index];
        peer.peer_addrs = parsed.addrs;

        for backend in parsed.backends {
            let backend_id = backend.backend_id;
            if let Err(err) = self.enable_backend(backend_id as usize, backend.group_id, backend.ids) {
                peer.drop_backend_associations();
                error!(
                    "{}: join failed while registering backend {}: {}",
                    peer.addr, backend_id, err
                );
                return Err(err);
            }
            peer.backend_associations.push(backend_id);
        }

        info!(
            "{}: join request completed: {} backends registered",
            peer.addr,
            peer.backend_associations.len()
        );
        Ok(())
    }

    /// Announce this node's full ownership table to a peer.
    ///
    /// The announcement is sent direct, so the group affiliation in the
    /// destination id is irrelevant. On success the connection is marked
    /// joined; on failure no local state changes.
    pub fn initiate_join<T: Transport>(&self, peer: &mut PeerState, transport: &T) -> RouteResult<()> {
        let id = self.node_id();
        let packet = self.serialize_snapshot(&id, 0, Command::Join, false, true)?;

        if let Err(err) = transport.send(&packet) {
            error!("{}: failed to send join request: {}", peer.addr, err);
            return Err(err);
        }

        peer.join_state = JoinState::Joined;
        info!("{}: successfully joined network, group {}", peer.addr, id.group_id);
        Ok(())
    }
}
