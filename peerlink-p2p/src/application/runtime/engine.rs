use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::application::config::TransportConfig;
use crate::application::runtime::{CallbackSubscription, PacketQueue, ReceiveLoop};
use crate::domain::wire::{self, PacketType};
use crate::domain::{Channel, InboundPacket, PeerId, SessionError};
use crate::infrastructure::error::{Result, TransportError};
use crate::infrastructure::networking::{P2PNetworking, SessionCallback};

/// Shared "role is running" flag, read by the receive loop at each tick
#[derive(Debug, Clone, Default)]
pub struct ActiveFlag(Arc<AtomicBool>);

impl ActiveFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn set(&self, active: bool) {
        self.0.store(active, Ordering::Release);
    }
}

/// Per-role callbacks the engine dispatches into
pub trait RoleHandlers {
    /// Whether packets from `peer` may be dispatched at all
    fn is_known_sender(&self, peer: PeerId) -> bool;

    fn on_session_request(&mut self, peer: PeerId) -> Result<()>;

    /// `CONNECTION_ACCEPTED` seen outside a connect attempt
    fn on_connection_accepted(&mut self, peer: PeerId) -> Result<()> {
        tracing::debug!("Ignoring CONNECTION_ACCEPTED from {}", peer);
        Ok(())
    }

    fn on_data(&mut self, peer: PeerId, data: Vec<u8>, channel: Channel) -> Result<()>;

    fn on_disconnect(&mut self, peer: PeerId) -> Result<()>;

    fn on_connection_failed(&mut self, peer: PeerId, error: SessionError) -> Result<()>;
}

/// Role-agnostic protocol logic: owns the inbound queue, the receive task and
/// the callback subscription, and dispatches packets to a [`RoleHandlers`].
pub struct ProtocolEngine<N: P2PNetworking> {
    network: Arc<N>,
    queue: Arc<PacketQueue>,
    active: ActiveFlag,
    callbacks: CallbackSubscription,
    config: TransportConfig,
    receive_task: Option<JoinHandle<()>>,
}

impl<N: P2PNetworking> ProtocolEngine<N> {
    pub fn new(network: Arc<N>, config: TransportConfig) -> Self {
        Self {
            network,
            queue: Arc::new(PacketQueue::new()),
            active: ActiveFlag::new(),
            callbacks: CallbackSubscription::new(),
            config,
            receive_task: None,
        }
    }

    pub fn network(&self) -> &Arc<N> {
        &self.network
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    pub fn queue(&self) -> &Arc<PacketQueue> {
        &self.queue
    }

    pub fn active_flag(&self) -> ActiveFlag {
        self.active.clone()
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    /// Whether the spawned receive loop is still running
    pub fn receive_loop_running(&self) -> bool {
        self.receive_task
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Subscribe to platform callbacks and spawn the receive loop on the
    /// current tokio runtime.
    pub fn activate(&mut self) -> Result<()> {
        if self.is_active() {
            return Err(TransportError::AlreadyActive);
        }
        self.config.validate()?;
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|e| TransportError::NoRuntime(e.to_string()))?;

        // A loop from a previous activation may still be asleep
        if let Some(stale) = self.receive_task.take() {
            stale.abort();
        }

        self.queue.clear();
        self.callbacks.subscribe(self.network.as_ref());
        self.active.set(true);

        let receive = ReceiveLoop::new(
            self.network.clone(),
            self.queue.clone(),
            self.active.clone(),
            &self.config,
        );
        self.receive_task = Some(runtime.spawn(receive.run()));
        Ok(())
    }

    /// Stop the role. The receive loop notices at its next tick.
    pub fn deactivate(&mut self) {
        self.active.set(false);
        self.callbacks.unsubscribe(self.network.as_ref());
        self.queue.clear();
    }

    /// Frame and send one packet, enforcing the size ceiling
    pub fn send(&self, peer: PeerId, kind: PacketType, payload: &[u8], channel: Channel) -> Result<()> {
        let bytes = wire::encode(kind, payload);
        if bytes.len() >= self.config.max_packet_bytes {
            return Err(TransportError::PacketTooLarge {
                size: bytes.len(),
                max: self.config.max_packet_bytes,
            });
        }

        if !self
            .network
            .send_packet(peer, &bytes, channel, channel.send_mode())
        {
            return Err(TransportError::SendFailed(format!(
                "platform refused {} byte packet to {}",
                bytes.len(),
                peer
            )));
        }
        Ok(())
    }

    /// Send a tag-only control packet on the reliable channel
    pub fn send_control(&self, peer: PeerId, kind: PacketType) -> Result<()> {
        send_control(self.network.as_ref(), peer, kind)
    }

    /// Run one dispatch pass: platform callbacks first, then at most as many
    /// packets as were queued on entry.
    ///
    /// A packet that fails validation drops the rest of the batch. A handler
    /// error stops the pass and leaves undispatched packets queued for the
    /// next call. Returns the number of packets dispatched.
    pub fn process_messages<H: RoleHandlers>(&mut self, handlers: &mut H) -> Result<usize> {
        if !self.is_active() {
            return Ok(0);
        }

        let started = instant::Instant::now();

        let mut first_failure = None;
        for callback in self.callbacks.drain() {
            let outcome = match callback {
                SessionCallback::SessionRequest(peer) => handlers.on_session_request(peer),
                SessionCallback::ConnectionFailed { peer, error } => {
                    handlers.on_connection_failed(peer, error)
                }
            };

            if let Err(err) = outcome {
                tracing::error!("❌ Platform callback handling failed: {}", err);
                first_failure.get_or_insert(err);
            }
        }
        if let Some(err) = first_failure {
            return Err(err);
        }

        let batch = self.queue.len();
        let mut dispatched = 0;

        for index in 0..batch {
            let Some(packet) = self.queue.dequeue() else {
                break;
            };

            let kind = match validate(handlers, &packet) {
                Ok(kind) => kind,
                Err(err) => {
                    let dropped = self.discard(batch - index - 1);
                    tracing::warn!(
                        "🚫 Rejected packet from {}: {} (dropping {} more from this batch)",
                        packet.sender,
                        err,
                        dropped
                    );
                    break;
                }
            };

            if let Err(err) = route(handlers, kind, packet) {
                tracing::error!("❌ Packet handling failed: {}", err);
                self.warn_if_slow(started, dispatched);
                return Err(err);
            }
            dispatched += 1;
        }

        self.warn_if_slow(started, dispatched);
        Ok(dispatched)
    }

    fn discard(&self, count: usize) -> usize {
        (0..count).filter(|_| self.queue.dequeue().is_some()).count()
    }

    fn warn_if_slow(&self, started: instant::Instant, dispatched: usize) {
        let elapsed = started.elapsed();
        if elapsed > self.config.slow_dispatch_threshold() {
            tracing::warn!(
                "🐢 Dispatching {} packets took {:?} (threshold {} ms)",
                dispatched,
                elapsed,
                self.config.slow_dispatch_warn_ms
            );
        }
    }
}

impl<N: P2PNetworking> Drop for ProtocolEngine<N> {
    fn drop(&mut self) {
        self.active.set(false);
        self.callbacks.unsubscribe(self.network.as_ref());
    }
}

pub(crate) fn send_control<N: P2PNetworking + ?Sized>(
    network: &N,
    peer: PeerId,
    kind: PacketType,
) -> Result<()> {
    let channel = Channel::RELIABLE;
    if network.send_packet(peer, &wire::control(kind), channel, channel.send_mode()) {
        Ok(())
    } else {
        Err(TransportError::SendFailed(format!(
            "platform refused {:?} to {}",
            kind, peer
        )))
    }
}

fn validate<H: RoleHandlers>(handlers: &H, packet: &InboundPacket) -> Result<PacketType> {
    if !handlers.is_known_sender(packet.sender) {
        return Err(TransportError::UnknownSender(packet.sender));
    }
    let frame = wire::decode(&packet.payload)?;
    Ok(frame.kind)
}

fn route<H: RoleHandlers>(handlers: &mut H, kind: PacketType, packet: InboundPacket) -> Result<()> {
    let sender = packet.sender;
    match kind {
        PacketType::Connect => handlers.on_session_request(sender),
        PacketType::ConnectionAccepted => handlers.on_connection_accepted(sender),
        PacketType::Data => {
            let data = packet.payload[1..].to_vec();
            handlers.on_data(sender, data, packet.channel)
        }
        PacketType::Disconnect => handlers.on_disconnect(sender),
    }
}
