use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::application::config::TransportConfig;
use crate::application::runtime::{ActiveFlag, PacketQueue, QueueMonitor};
use crate::domain::{Channel, InboundPacket};
use crate::infrastructure::networking::P2PNetworking;

/// Pulls packets off the platform into the inbound queue, once per tick
pub struct ReceiveLoop<N: P2PNetworking> {
    network: Arc<N>,
    queue: Arc<PacketQueue>,
    active: ActiveFlag,
    tick: Duration,
    max_packet_bytes: usize,
    monitor: QueueMonitor,
}

impl<N: P2PNetworking> ReceiveLoop<N> {
    pub fn new(
        network: Arc<N>,
        queue: Arc<PacketQueue>,
        active: ActiveFlag,
        config: &TransportConfig,
    ) -> Self {
        Self {
            network,
            queue,
            active,
            tick: config.tick(),
            max_packet_bytes: config.max_packet_bytes,
            monitor: QueueMonitor::new(config.queue_warn_threshold, config.queue_warn_cooldown()),
        }
    }

    /// Run until the owning role goes inactive. The flag is only checked at
    /// the top of each tick.
    pub async fn run(mut self) {
        let local = self.network.local_peer_id();
        tracing::debug!("📡 Receive loop started for {}", local);

        while self.active.get() {
            self.poll_once();
            tokio::time::sleep(self.tick).await;
        }

        tracing::debug!("📡 Receive loop stopped for {}", local);
    }

    /// Read at most one packet per channel; returns how many were queued
    pub fn poll_once(&mut self) -> usize {
        let mut queued = 0;

        for channel in Channel::ALL {
            if !self.network.is_packet_available(channel) {
                continue;
            }

            let Some(packet) = self.network.read_packet(channel) else {
                continue;
            };

            if packet.data.len() >= self.max_packet_bytes {
                tracing::warn!(
                    "⚠️ Dropping {} byte packet from {} on channel {} (max {})",
                    packet.data.len(),
                    packet.sender,
                    channel,
                    self.max_packet_bytes
                );
                continue;
            }

            self.queue
                .enqueue(InboundPacket::new(packet.sender, packet.data, channel));
            queued += 1;
        }

        let depth = self.queue.len();
        if self.monitor.observe(depth, Instant::now()) {
            tracing::warn!(
                "⚠️ Inbound queue backlog: {} packets pending (threshold {})",
                depth,
                self.monitor.threshold()
            );
        }

        queued
    }
}
