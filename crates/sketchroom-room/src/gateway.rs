//! Per-room fan-out to connected participants.

use std::collections::HashMap;

use sketchroom_protocol::{ServerEvent, UserId};
use sketchroom_transport::ConnectionId;
use tokio::sync::mpsc;

/// Channel that delivers outbound events to one connection's writer task.
pub type ClientSender = mpsc::UnboundedSender<ServerEvent>;

/// A participant's current transport handle.
#[derive(Debug, Clone)]
pub struct ClientHandle {
    connection_id: ConnectionId,
    sender: ClientSender,
}

impl ClientHandle {
    pub fn new(connection_id: ConnectionId, sender: ClientSender) -> Self {
        Self {
            connection_id,
            sender,
        }
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    /// Queues an event. Returns `false` if the writer is gone.
    pub fn send(&self, event: ServerEvent) -> bool {
        self.sender.send(event).is_ok()
    }
}

/// Maps each participant to the connection currently speaking for them.
///
/// A user has at most one handle. Rejoining from a new connection
/// replaces the old handle, and the old connection's later disconnect is
/// recognised as stale by its `ConnectionId` and ignored.
#[derive(Debug, Default)]
pub struct BroadcastGateway {
    clients: HashMap<UserId, ClientHandle>,
}

impl BroadcastGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `user` to `handle`, returning the handle it replaced.
    pub fn attach(&mut self, user: UserId, handle: ClientHandle) -> Option<ClientHandle> {
        let previous = self.clients.insert(user.clone(), handle);
        if let Some(prev) = &previous {
            tracing::debug!(%user, stale = %prev.connection_id, "replaced client handle");
        }
        previous
    }

    /// Unbinds `user` only if `connection_id` is still their current
    /// connection. Returns `true` if a handle was removed.
    pub fn detach(&mut self, user: &UserId, connection_id: ConnectionId) -> bool {
        match self.clients.get(user) {
            Some(handle) if handle.connection_id == connection_id => {
                self.clients.remove(user);
                true
            }
            Some(handle) => {
                tracing::debug!(
                    %user,
                    stale = %connection_id,
                    current = %handle.connection_id,
                    "ignoring disconnect from stale connection"
                );
                false
            }
            None => false,
        }
    }

    /// Unbinds `user` regardless of connection (explicit leave).
    pub fn remove(&mut self, user: &UserId) -> Option<ClientHandle> {
        self.clients.remove(user)
    }

    /// Whether `user` has a live handle.
    pub fn is_connected(&self, user: &UserId) -> bool {
        self.clients
            .get(user)
            .is_some_and(|h| !h.sender.is_closed())
    }

    /// The connection currently bound to `user`.
    pub fn connection_of(&self, user: &UserId) -> Option<ConnectionId> {
        self.clients.get(user).map(|h| h.connection_id)
    }

    /// Delivers `event` to `user`. A missing or closed handle is a
    /// silent no-op; the user resyncs from a snapshot when they return.
    pub fn send(&self, user: &UserId, event: ServerEvent) -> bool {
        match self.clients.get(user) {
            Some(handle) => handle.send(event),
            None => false,
        }
    }

    /// Number of bound users.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
