//! In-memory platform: simulates P2P sessions and per-channel delivery
//! between peers living in the same process.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::domain::{Channel, PeerId, SendMode, SessionError, CHANNEL_COUNT};
use crate::infrastructure::networking::{
    P2PNetworking, RawPacket, SessionCallback, SessionCallbackSource, SubscriptionId,
};

/// First address handed out by [`MemoryNetwork::create_peer`]
const FIRST_PEER_ADDRESS: u64 = 76_561_197_960_265_729;

/// Record of a packet a peer handed to the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentPacket {
    pub to: PeerId,
    pub data: Vec<u8>,
    pub channel: Channel,
    pub mode: SendMode,
}

#[derive(Default)]
struct PeerSlot {
    inboxes: [VecDeque<RawPacket>; CHANNEL_COUNT],
    /// Remote peers whose session requests we accepted
    accepted: HashSet<PeerId>,
    /// Remote peers we opened a session to by sending first
    initiated: HashSet<PeerId>,
    /// Packets from not-yet-accepted peers
    pending: HashMap<PeerId, Vec<(Channel, RawPacket)>>,
    subscribers: HashMap<SubscriptionId, UnboundedSender<SessionCallback>>,
    sent: Vec<SentPacket>,
    fail_sends: bool,
    fail_accepts: bool,
}

impl PeerSlot {
    fn has_session_with(&self, peer: PeerId) -> bool {
        self.accepted.contains(&peer) || self.initiated.contains(&peer)
    }

    fn notify(&mut self, callback: SessionCallback) {
        self.subscribers
            .retain(|_, tx| tx.send(callback.clone()).is_ok());
    }
}

#[derive(Default)]
struct NetworkState {
    peers: HashMap<PeerId, PeerSlot>,
    next_peer: u64,
    next_subscription: u64,
}

/// Shared network bus (all peers write/read from here)
#[derive(Clone, Default)]
pub struct MemoryNetwork {
    state: Arc<Mutex<NetworkState>>,
}

impl MemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new peer with the next free address
    pub fn create_peer(&self) -> MemoryPeer {
        let id = {
            let mut state = lock(&self.state);
            let id = PeerId::new(FIRST_PEER_ADDRESS + state.next_peer);
            state.next_peer += 1;
            state.peers.insert(id, PeerSlot::default());
            id
        };

        tracing::debug!("🔌 MemoryNetwork: new peer {}", id);
        self.handle(id)
    }

    /// Register a peer with a fixed address (replaces any existing one)
    pub fn create_peer_with_id(&self, id: PeerId) -> MemoryPeer {
        lock(&self.state).peers.insert(id, PeerSlot::default());
        self.handle(id)
    }

    fn handle(&self, id: PeerId) -> MemoryPeer {
        MemoryPeer {
            id,
            state: self.state.clone(),
        }
    }

    /// Raise a connection-failed callback on `at` for its session with `remote`
    pub fn report_connection_failure(&self, at: PeerId, remote: PeerId, error: SessionError) {
        let mut state = lock(&self.state);
        if let Some(slot) = state.peers.get_mut(&at) {
            slot.accepted.remove(&remote);
            slot.initiated.remove(&remote);
            slot.pending.remove(&remote);
            slot.notify(SessionCallback::ConnectionFailed {
                peer: remote,
                error,
            });
        }
    }

    pub fn peer_count(&self) -> usize {
        lock(&self.state).peers.len()
    }
}

/// One endpoint on a [`MemoryNetwork`]
#[derive(Clone)]
pub struct MemoryPeer {
    id: PeerId,
    state: Arc<Mutex<NetworkState>>,
}

impl MemoryPeer {
    pub fn id(&self) -> PeerId {
        self.id
    }

    /// Make every following `send_packet` fail
    pub fn set_send_failure(&self, fail: bool) {
        self.with_slot(|slot| slot.fail_sends = fail);
    }

    /// Make every following `accept_session` fail
    pub fn set_accept_failure(&self, fail: bool) {
        self.with_slot(|slot| slot.fail_accepts = fail);
    }

    /// Place a packet straight into our inbox, bypassing sessions
    pub fn inject(&self, sender: PeerId, data: Vec<u8>, channel: Channel) {
        self.with_slot(|slot| {
            slot.inboxes[channel.index()].push_back(RawPacket { sender, data });
        });
    }

    /// Every packet this peer has handed to the platform so far
    pub fn sent_packets(&self) -> Vec<SentPacket> {
        self.with_slot(|slot| slot.sent.clone()).unwrap_or_default()
    }

    pub fn has_session_with(&self, peer: PeerId) -> bool {
        self.with_slot(|slot| slot.has_session_with(peer))
            .unwrap_or(false)
    }

    pub fn subscriber_count(&self) -> usize {
        self.with_slot(|slot| slot.subscribers.len())
            .unwrap_or(0)
    }

    /// Packets waiting in our inboxes across all channels
    pub fn inbox_len(&self) -> usize {
        self.with_slot(|slot| slot.inboxes.iter().map(VecDeque::len).sum())
            .unwrap_or(0)
    }

    fn with_slot<R>(&self, f: impl FnOnce(&mut PeerSlot) -> R) -> Option<R> {
        let mut state = lock(&self.state);
        state.peers.get_mut(&self.id).map(f)
    }
}

impl SessionCallbackSource for MemoryPeer {
    fn subscribe(&self) -> (SubscriptionId, UnboundedReceiver<SessionCallback>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = lock(&self.state);

        let id = SubscriptionId(state.next_subscription);
        state.next_subscription += 1;

        if let Some(slot) = state.peers.get_mut(&self.id) {
            slot.subscribers.insert(id, tx);
        }
        (id, rx)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.with_slot(|slot| slot.subscribers.remove(&id));
    }
}

impl P2PNetworking for MemoryPeer {
    fn local_peer_id(&self) -> PeerId {
        self.id
    }

    fn accept_session(&self, peer: PeerId) -> bool {
        self.with_slot(|slot| {
            if slot.fail_accepts {
                return false;
            }

            slot.accepted.insert(peer);
            if let Some(held) = slot.pending.remove(&peer) {
                for (channel, packet) in held {
                    slot.inboxes[channel.index()].push_back(packet);
                }
            }
            true
        })
        .unwrap_or(false)
    }

    fn close_session(&self, peer: PeerId) -> bool {
        self.with_slot(|slot| {
            let accepted = slot.accepted.remove(&peer);
            let initiated = slot.initiated.remove(&peer);
            let pending = slot.pending.remove(&peer).is_some();
            accepted || initiated || pending
        })
        .unwrap_or(false)
    }

    fn send_packet(&self, peer: PeerId, data: &[u8], channel: Channel, mode: SendMode) -> bool {
        let mut state = lock(&self.state);

        if !state.peers.contains_key(&peer) {
            tracing::trace!("📤 {} → {}: no such peer", self.id, peer);
            return false;
        }

        match state.peers.get_mut(&self.id) {
            Some(own) if !own.fail_sends => {
                own.initiated.insert(peer);
                own.sent.push(SentPacket {
                    to: peer,
                    data: data.to_vec(),
                    channel,
                    mode,
                });
            }
            _ => return false,
        }

        let packet = RawPacket {
            sender: self.id,
            data: data.to_vec(),
        };

        let Some(target) = state.peers.get_mut(&peer) else {
            return false;
        };

        if target.has_session_with(self.id) {
            target.inboxes[channel.index()].push_back(packet);
        } else {
            let first = !target.pending.contains_key(&self.id);
            target
                .pending
                .entry(self.id)
                .or_default()
                .push((channel, packet));

            if first {
                target.notify(SessionCallback::SessionRequest(self.id));
            }
        }

        tracing::trace!(
            "📤 {} → {} ({} bytes, channel {}, {:?})",
            self.id,
            peer,
            data.len(),
            channel,
            mode
        );
        true
    }

    fn is_packet_available(&self, channel: Channel) -> bool {
        self.with_slot(|slot| !slot.inboxes[channel.index()].is_empty())
            .unwrap_or(false)
    }

    fn read_packet(&self, channel: Channel) -> Option<RawPacket> {
        self.with_slot(|slot| slot.inboxes[channel.index()].pop_front())
            .flatten()
    }
}

fn lock(state: &Mutex<NetworkState>) -> MutexGuard<'_, NetworkState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
