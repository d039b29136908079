#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use peerlink_p2p::{ClientRole, MemoryNetwork, MemoryPeer, ServerRole, TransportConfig};
use tokio::time::{sleep, Instant};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Long enough for any handshake or delivery on the memory network
pub const SETTLE: Duration = Duration::from_millis(300);

pub fn init_test_tracing() {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::new("debug"))
        .with(fmt::layer().with_test_writer())
        .try_init();
}

/// One listening server plus N clients on a shared memory network
pub struct LoopbackFixture {
    pub network: MemoryNetwork,
    pub host: MemoryPeer,
    pub server: ServerRole<MemoryPeer>,
    pub clients: Vec<(MemoryPeer, ClientRole<MemoryPeer>)>,
}

impl LoopbackFixture {
    pub fn new(client_count: usize) -> Self {
        Self::with_config(client_count, TransportConfig::default())
    }

    pub fn with_config(client_count: usize, config: TransportConfig) -> Self {
        init_test_tracing();

        let network = MemoryNetwork::new();
        let host = network.create_peer();
        let mut server = ServerRole::new(Arc::new(host.clone()), config.clone());
        server.start().unwrap();

        let clients = (0..client_count)
            .map(|_| {
                let peer = network.create_peer();
                let client = ClientRole::new(Arc::new(peer.clone()), config.clone());
                (peer, client)
            })
            .collect();

        Self {
            network,
            host,
            server,
            clients,
        }
    }

    /// Connect client `index` while pumping the server
    pub async fn connect(&mut self, index: usize) {
        let host = self.host.id();
        let (_, client) = &mut self.clients[index];

        let (result, ()) = tokio::join!(client.connect_to_id(host), pump(&mut self.server, SETTLE));
        result.unwrap();
    }

    pub async fn connect_all(&mut self) {
        for index in 0..self.clients.len() {
            self.connect(index).await;
        }
    }

    /// Run dispatch on every role for `duration`
    pub async fn settle(&mut self, duration: Duration) {
        let tick = self.server.config().tick();
        let deadline = Instant::now() + duration;

        while Instant::now() < deadline {
            let _ = self.server.process_messages();
            for (_, client) in self.clients.iter_mut() {
                let _ = client.process_messages();
            }
            sleep(tick).await;
        }
    }

    pub fn client(&mut self, index: usize) -> &mut ClientRole<MemoryPeer> {
        &mut self.clients[index].1
    }

    pub fn client_peer(&self, index: usize) -> &MemoryPeer {
        &self.clients[index].0
    }
}

/// Drive a server's dispatch pass every tick for `duration`
pub async fn pump(server: &mut ServerRole<MemoryPeer>, duration: Duration) {
    let tick = server.config().tick();
    let deadline = Instant::now() + duration;

    while Instant::now() < deadline {
        let _ = server.process_messages();
        sleep(tick).await;
    }
}
