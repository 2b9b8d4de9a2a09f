//! Externally callable boundary
//!
//! The node's control surface is C-shaped: every operation returns an
//! integer status, zero on success and negated POSIX error codes on
//! failure, and that mapping is part of the wire-compatible contract. No
//! failure inside the core, panics included, may escape this surface as a
//! process fault.

use std::panic::{self, AssertUnwindSafe};

use crate::error::{RouteError, RouteResult};
use crate::handlers::{PeerState, Transport};
use crate::table::RouteList;
use crate::types::RawId;
use crate::wire::CmdHeader;

/// Map an internal error onto the wire-compatible status code.
pub fn status_code(err: &RouteError) -> i32 {
    match err {
        RouteError::Resource(_) => -libc::ENOMEM,
        _ => -libc::EINVAL,
    }
}

fn guarded<F>(op: F) -> i32
where
    F: FnOnce() -> RouteResult<()>,
{
    match panic::catch_unwind(AssertUnwindSafe(op)) {
        Ok(Ok(())) => 0,
        Ok(Err(err)) => status_code(&err),
        // An unwind must surface as a status code, never cross the boundary.
        Err(_) => -libc::EINVAL,
    }
}

/// Activate a backend slot. See [`RouteList::enable_backend`].
pub fn route_enable_backend(route: &RouteList, backend_id: usize, group_id: i32, ids: Vec<RawId>) -> i32 {
    guarded(|| route.enable_backend(backend_id, group_id, ids))
}

/// Deactivate a backend slot. See [`RouteList::disable_backend`].
pub fn route_disable_backend(route: &RouteList, backend_id: usize) -> i32 {
    guarded(|| route.disable_backend(backend_id))
}

/// Handle an inbound reverse-lookup request. See [`RouteList::on_reverse_lookup`].
pub fn route_reverse_lookup<T: Transport>(
    route: &RouteList,
    peer: &mut PeerState,
    transport: &T,
    cmd: &mut CmdHeader,
) -> i32 {
    guarded(|| route.on_reverse_lookup(peer, transport, cmd))
}

/// Handle an inbound join announcement. See [`RouteList::on_join`].
pub fn route_join_request(route: &RouteList, peer: &mut PeerState, cmd: &CmdHeader, payload: &[u8]) -> i32 {
    guarded(|| route.on_join(peer, cmd, payload))
}

/// Announce this node to a peer. See [`RouteList::initiate_join`].
pub fn route_initiate_join<T: Transport>(route: &RouteList, peer: &mut PeerState, transport: &T) -> i32 {
    guarded(|| route.initiate_join(peer, transport))
}
