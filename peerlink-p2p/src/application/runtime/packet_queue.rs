use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::domain::InboundPacket;

/// Thread-safe FIFO of inbound packets
///
/// Filled by the receive loop and drained by the dispatch loop. Every
/// operation, `clear` included, goes through the same lock.
#[derive(Debug, Default)]
pub struct PacketQueue {
    queue: Mutex<VecDeque<InboundPacket>>,
}

impl PacketQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append to the tail
    pub fn enqueue(&self, packet: InboundPacket) {
        self.lock().push_back(packet);
    }

    /// Remove the head
    pub fn dequeue(&self) -> Option<InboundPacket> {
        self.lock().pop_front()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn has_packets(&self) -> bool {
        !self.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<InboundPacket>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
