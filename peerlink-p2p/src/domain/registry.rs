use std::collections::HashMap;

use crate::domain::{ConnectionId, PeerId};

/// Enforces a 1:1 bidirectional mapping between peers and connection ids
///
/// Both directions are inserted and removed together, so the two maps always
/// hold the same number of entries and every entry has its mirror.
#[derive(Debug, Clone)]
pub struct ConnectionRegistry {
    /// Peer ID → Connection ID
    peer_to_connection: HashMap<PeerId, ConnectionId>,
    /// Connection ID → Peer ID
    connection_to_peer: HashMap<ConnectionId, PeerId>,
    max_connections: usize,
}

impl ConnectionRegistry {
    pub fn new(max_connections: usize) -> Self {
        Self {
            peer_to_connection: HashMap::with_capacity(max_connections),
            connection_to_peer: HashMap::with_capacity(max_connections),
            max_connections,
        }
    }

    /// Register a peer-connection pair
    ///
    /// Returns `false` without touching the maps if either side is already
    /// registered or the registry is at capacity.
    pub fn add(&mut self, peer_id: PeerId, connection_id: ConnectionId) -> bool {
        if self.peer_to_connection.contains_key(&peer_id)
            || self.connection_to_peer.contains_key(&connection_id)
        {
            return false;
        }

        if self.len() >= self.max_connections {
            return false;
        }

        self.peer_to_connection.insert(peer_id, connection_id);
        self.connection_to_peer.insert(connection_id, peer_id);
        true
    }

    /// Remove mapping for a peer, returning its connection id if it existed
    pub fn remove_by_peer(&mut self, peer_id: PeerId) -> Option<ConnectionId> {
        let connection_id = *self.peer_to_connection.get(&peer_id)?;
        self.remove_pair(peer_id, connection_id)
            .then_some(connection_id)
    }

    /// Remove mapping for a connection, returning its peer if it existed
    pub fn remove_by_connection(&mut self, connection_id: ConnectionId) -> Option<PeerId> {
        let peer_id = *self.connection_to_peer.get(&connection_id)?;
        self.remove_pair(peer_id, connection_id).then_some(peer_id)
    }

    /// Remove an exact pair. Nothing changes unless the two are mapped to
    /// each other in both directions.
    pub fn remove(&mut self, peer_id: PeerId, connection_id: ConnectionId) -> bool {
        self.remove_pair(peer_id, connection_id)
    }

    fn remove_pair(&mut self, peer_id: PeerId, connection_id: ConnectionId) -> bool {
        let forward = self.peer_to_connection.get(&peer_id) == Some(&connection_id);
        let reverse = self.connection_to_peer.get(&connection_id) == Some(&peer_id);

        if !(forward && reverse) {
            return false;
        }

        self.peer_to_connection.remove(&peer_id);
        self.connection_to_peer.remove(&connection_id);
        true
    }

    pub fn contains_peer(&self, peer_id: PeerId) -> bool {
        self.peer_to_connection.contains_key(&peer_id)
    }

    pub fn contains_connection(&self, connection_id: ConnectionId) -> bool {
        self.connection_to_peer.contains_key(&connection_id)
    }

    /// Check that `peer_id` and `connection_id` are registered as a pair
    pub fn contains(&self, peer_id: PeerId, connection_id: ConnectionId) -> bool {
        self.peer_to_connection.get(&peer_id) == Some(&connection_id)
            && self.connection_to_peer.get(&connection_id) == Some(&peer_id)
    }

    pub fn connection_id(&self, peer_id: PeerId) -> Option<ConnectionId> {
        self.peer_to_connection.get(&peer_id).copied()
    }

    pub fn peer(&self, connection_id: ConnectionId) -> Option<PeerId> {
        self.connection_to_peer.get(&connection_id).copied()
    }

    pub fn peers(&self) -> impl Iterator<Item = &PeerId> {
        self.peer_to_connection.keys()
    }

    pub fn connections(&self) -> impl Iterator<Item = (&ConnectionId, &PeerId)> {
        self.connection_to_peer.iter()
    }

    /// Get the number of mappings
    pub fn len(&self) -> usize {
        debug_assert_eq!(
            self.peer_to_connection.len(),
            self.connection_to_peer.len(),
            "Bidirectional map invariant violated"
        );
        self.peer_to_connection.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peer_to_connection.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_connections
    }

    pub fn clear(&mut self) {
        self.peer_to_connection.clear();
        self.connection_to_peer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(raw: u64) -> PeerId {
        PeerId::new(raw)
    }

    #[test]
    fn test_add_mapping() {
        let mut registry = ConnectionRegistry::new(4);

        assert!(registry.add(peer(10), ConnectionId(0)));

        assert_eq!(registry.connection_id(peer(10)), Some(ConnectionId(0)));
        assert_eq!(registry.peer(ConnectionId(0)), Some(peer(10)));
        assert!(registry.contains(peer(10), ConnectionId(0)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_all_pairs_resolve_both_ways() {
        let mut registry = ConnectionRegistry::new(8);

        for i in 0..8 {
            assert!(registry.add(peer(100 + i), ConnectionId(i)));
        }

        for i in 0..8 {
            let p = peer(100 + i);
            let c = ConnectionId(i);
            assert!(registry.contains_peer(p));
            assert!(registry.contains_connection(c));
            assert_eq!(registry.connection_id(p), Some(c));
            assert_eq!(registry.peer(c), Some(p));
        }
    }

    #[test]
    fn test_add_rejected_at_capacity() {
        let mut registry = ConnectionRegistry::new(2);
        assert!(registry.add(peer(1), ConnectionId(0)));
        assert!(registry.add(peer(2), ConnectionId(1)));

        assert!(!registry.add(peer(3), ConnectionId(2)));
        assert_eq!(registry.len(), 2);
        assert!(!registry.contains_peer(peer(3)));
        assert!(!registry.contains_connection(ConnectionId(2)));
    }

    #[test]
    fn test_add_rejects_duplicates() {
        let mut registry = ConnectionRegistry::new(4);
        assert!(registry.add(peer(1), ConnectionId(0)));

        // Same peer, new id
        assert!(!registry.add(peer(1), ConnectionId(1)));
        // New peer, same id
        assert!(!registry.add(peer(2), ConnectionId(0)));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.connection_id(peer(1)), Some(ConnectionId(0)));
        assert_eq!(registry.peer(ConnectionId(1)), None);
    }

    #[test]
    fn test_remove_by_peer() {
        let mut registry = ConnectionRegistry::new(4);
        registry.add(peer(1), ConnectionId(0));
        registry.add(peer(2), ConnectionId(1));

        let removed = registry.remove_by_peer(peer(1));

        assert_eq!(removed, Some(ConnectionId(0)));
        assert!(!registry.contains_peer(peer(1)));
        assert!(!registry.contains_connection(ConnectionId(0)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_by_connection() {
        let mut registry = ConnectionRegistry::new(4);
        registry.add(peer(1), ConnectionId(5));

        assert_eq!(registry.remove_by_connection(ConnectionId(5)), Some(peer(1)));
        assert!(registry.is_empty());
        assert_eq!(registry.remove_by_connection(ConnectionId(5)), None);
    }

    #[test]
    fn test_remove_pair_requires_exact_match() {
        let mut registry = ConnectionRegistry::new(4);
        registry.add(peer(1), ConnectionId(0));
        registry.add(peer(2), ConnectionId(1));

        // Both present but not mapped to each other
        assert!(!registry.remove(peer(1), ConnectionId(1)));
        assert_eq!(registry.len(), 2);
        assert!(registry.contains(peer(1), ConnectionId(0)));
        assert!(registry.contains(peer(2), ConnectionId(1)));

        assert!(registry.remove(peer(1), ConnectionId(0)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_nonexistent() {
        let mut registry = ConnectionRegistry::new(4);
        assert_eq!(registry.remove_by_peer(peer(9)), None);
        assert_eq!(registry.remove_by_connection(ConnectionId(9)), None);
        assert!(!registry.remove(peer(9), ConnectionId(9)));
    }

    #[test]
    fn test_lookups_miss_quietly() {
        let registry = ConnectionRegistry::new(4);
        assert_eq!(registry.connection_id(peer(1)), None);
        assert_eq!(registry.peer(ConnectionId(0)), None);
        assert!(!registry.contains(peer(1), ConnectionId(0)));
    }

    #[test]
    fn test_slot_freed_after_remove() {
        let mut registry = ConnectionRegistry::new(1);
        registry.add(peer(1), ConnectionId(0));
        assert!(!registry.add(peer(2), ConnectionId(1)));

        registry.remove_by_peer(peer(1));
        assert!(registry.add(peer(2), ConnectionId(1)));
    }

    #[test]
    fn test_clear() {
        let mut registry = ConnectionRegistry::new(4);
        registry.add(peer(1), ConnectionId(0));
        registry.add(peer(2), ConnectionId(1));

        registry.clear();

        assert_eq!(registry.len(), 0);
        assert!(registry.is_empty());
        assert_eq!(registry.peers().count(), 0);
        assert_eq!(registry.connections().count(), 0);
    }
}
