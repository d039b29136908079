use std::sync::Arc;
use std::time::Duration;

use peerlink_p2p::{
    ClientEvent, ConnectionId, MemoryNetwork, MemoryPeer, P2PTransport, ServerEvent,
    TransportConfig, TransportEvent,
};
use tokio::time::{sleep, Instant};

use crate::infrastructure::{CliError, Result};

/// Channel clients talk to the host on
const REQUEST_CHANNEL: u8 = 0;
/// Channel the host echoes back on
const ECHO_CHANNEL: u8 = 1;

/// Ticks to pump the host while one client handshakes
const HANDSHAKE_TICKS: u32 = 50;
/// Ticks to let traffic settle after each round
const SETTLE_TICKS: u32 = 20;

#[derive(Debug, Clone)]
pub struct DemoOptions {
    pub clients: usize,
    pub rounds: usize,
    pub config: TransportConfig,
}

impl Default for DemoOptions {
    fn default() -> Self {
        Self {
            clients: 2,
            rounds: 3,
            config: TransportConfig::default(),
        }
    }
}

/// What the host and clients observed during a demo run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DemoReport {
    pub connected: usize,
    pub requests_received: usize,
    pub echoes_received: usize,
    pub disconnected: usize,
}

/// One host plus N clients on a loopback memory network
pub struct LoopbackDemo {
    options: DemoOptions,
    host: P2PTransport<MemoryPeer>,
    host_address: String,
    clients: Vec<P2PTransport<MemoryPeer>>,
    network: MemoryNetwork,
    report: DemoReport,
}

impl LoopbackDemo {
    pub fn new(options: DemoOptions) -> Self {
        let network = MemoryNetwork::new();
        let host_peer = network.create_peer();
        let host_address = host_peer.id().to_string();
        let host = P2PTransport::new(Arc::new(host_peer), options.config.clone());

        Self {
            options,
            host,
            host_address,
            clients: Vec::new(),
            network,
            report: DemoReport::default(),
        }
    }

    pub fn host_address(&self) -> &str {
        &self.host_address
    }

    /// Run every phase: listen, connect, exchange, disconnect
    pub async fn run(mut self) -> Result<DemoReport> {
        if !self.host.start_server() {
            return Err(CliError::Transport("host failed to start".to_string()));
        }
        tracing::info!("🚀 Host listening on {}", self.host_address);

        for index in 0..self.options.clients {
            self.connect_client(index).await?;
        }

        for round in 0..self.options.rounds {
            self.exchange(round).await?;
        }

        for client in self.clients.iter_mut() {
            client.disconnect(ConnectionId::new(0));
        }
        self.settle(SETTLE_TICKS).await;

        self.host.shutdown();
        self.handle_host_events()?;

        tracing::info!("✅ Demo finished: {:?}", self.report);
        Ok(self.report)
    }

    async fn connect_client(&mut self, index: usize) -> Result<()> {
        let peer = self.network.create_peer();
        let mut client = P2PTransport::new(Arc::new(peer), self.options.config.clone());

        let ticks = HANDSHAKE_TICKS;
        let (connected, pumped) = tokio::join!(
            client.connect(&self.host_address),
            pump(&mut self.host, ticks)
        );
        pumped?;

        if !connected {
            return Err(CliError::P2PConnection(format!(
                "client {} could not reach {}",
                index, self.host_address
            )));
        }

        tracing::info!("🟢 Client {} connected", index);
        self.clients.push(client);
        self.handle_host_events()
    }

    async fn exchange(&mut self, round: usize) -> Result<()> {
        for (index, client) in self.clients.iter_mut().enumerate() {
            let request = serde_json::json!({
                "type": "greeting",
                "client": index,
                "round": round,
            });
            let data = serde_json::to_vec(&request)?;

            if !client.send(ConnectionId::new(0), REQUEST_CHANNEL, &data) {
                tracing::warn!("⚠️ Client {} could not send round {}", index, round);
            }
        }

        self.settle(SETTLE_TICKS).await;
        Ok(())
    }

    async fn settle(&mut self, ticks: u32) {
        let tick = self.options.config.tick();

        for _ in 0..ticks {
            self.host.process_messages();
            if let Err(e) = self.handle_host_events() {
                tracing::warn!("⚠️ {}", e);
            }

            for client in self.clients.iter_mut() {
                client.process_messages();
                for event in client.drain_events() {
                    if let TransportEvent::Client(ClientEvent::DataReceived { data, .. }) = event
                    {
                        tracing::info!("📥 Echo: {}", String::from_utf8_lossy(&data));
                        self.report.echoes_received += 1;
                    }
                }
            }

            sleep(tick).await;
        }
    }

    fn handle_host_events(&mut self) -> Result<()> {
        for event in self.host.drain_events() {
            let TransportEvent::Server(event) = event else {
                continue;
            };

            match event {
                ServerEvent::Connected(connection_id) => {
                    tracing::info!("🟢 Host: {} connected", connection_id);
                    self.report.connected += 1;
                }
                ServerEvent::Disconnected(connection_id) => {
                    tracing::info!("🔴 Host: {} disconnected", connection_id);
                    self.report.disconnected += 1;
                }
                ServerEvent::DataReceived {
                    connection_id,
                    data,
                    ..
                } => {
                    let request: serde_json::Value = serde_json::from_slice(&data)?;
                    tracing::info!("📥 Host: {} from {}", request, connection_id);
                    self.report.requests_received += 1;

                    if !self.host.send(connection_id, ECHO_CHANNEL, &data) {
                        tracing::warn!("⚠️ Echo to {} failed", connection_id);
                    }
                }
                ServerEvent::Error {
                    connection_id,
                    reason,
                } => {
                    tracing::error!("❌ Host: {} failed: {}", connection_id, reason);
                }
            }
        }
        Ok(())
    }
}

async fn pump(transport: &mut P2PTransport<MemoryPeer>, ticks: u32) -> Result<()> {
    let tick = transport.config().tick();
    for _ in 0..ticks {
        transport.process_messages();
        sleep(tick).await;
    }
    Ok(())
}

/// Run a demo, stopping early once `limit` elapses
pub async fn run_with_limit(options: DemoOptions, limit: Option<Duration>) -> Result<DemoReport> {
    let demo = LoopbackDemo::new(options);
    let Some(limit) = limit else {
        return demo.run().await;
    };

    let started = Instant::now();
    tokio::time::timeout(limit, demo.run())
        .await
        .map_err(|_| {
            CliError::Transport(format!(
                "demo did not finish within {:?}",
                started.elapsed()
            ))
        })?
}
