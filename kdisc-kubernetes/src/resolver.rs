//! Peer-address resolver backed by the registry client

use async_trait::async_trait;
use kdisc_core::{NetworkService, PeerAddressResolver, Result, Settings, TransportService};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::client::RegistryClient;
use crate::options::REFRESH_INTERVAL;

struct CachedPeers {
    peers: Vec<SocketAddr>,
    fetched_at: Instant,
}

/// Turns the service's endpoint addresses into transport addresses.
///
/// Every peer is assumed to listen on the same transport port as this node.
/// The node's own publish address is left out.
pub struct KubernetesPeerResolver<C> {
    client: Arc<C>,
    transport: Arc<dyn TransportService>,
    network: Arc<dyn NetworkService>,
    refresh_interval: Duration,
    cache: Mutex<Option<CachedPeers>>,
}

impl<C: RegistryClient> KubernetesPeerResolver<C> {
    pub fn new(
        settings: &Settings,
        client: Arc<C>,
        transport: Arc<dyn TransportService>,
        network: Arc<dyn NetworkService>,
    ) -> Result<Self> {
        Ok(Self {
            client,
            transport,
            network,
            refresh_interval: REFRESH_INTERVAL.get(settings)?,
            cache: Mutex::new(None),
        })
    }

    /// The registry client this resolver queries
    #[must_use]
    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    #[must_use]
    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }
}

#[async_trait]
impl<C: RegistryClient> PeerAddressResolver for KubernetesPeerResolver<C> {
    async fn resolve_peers(&self) -> Result<Vec<SocketAddr>> {
        let mut cache = self.cache.lock().await;

        if let Some(cached) = cache.as_ref() {
            if cached.fetched_at.elapsed() < self.refresh_interval {
                tracing::trace!(peer_count = cached.peers.len(), "Using cached peers");
                return Ok(cached.peers.clone());
            }
        }

        let addresses = match self.client.endpoint_addresses().await {
            Ok(addresses) => addresses,
            Err(e) => {
                tracing::warn!(error = %e, "Kubernetes peer lookup failed");
                return Err(e);
            }
        };

        let port = self.transport.publish_port();
        let own_host = self.network.publish_host();
        let peers: Vec<SocketAddr> = addresses
            .into_iter()
            // Skip self
            .filter(|ip| Some(*ip) != own_host)
            .map(|ip| SocketAddr::new(ip, port))
            .collect();

        tracing::debug!(peer_count = peers.len(), "Kubernetes peers resolved");

        if !self.refresh_interval.is_zero() {
            *cache = Some(CachedPeers {
                peers: peers.clone(),
                fetched_at: Instant::now(),
            });
        }

        Ok(peers)
    }
}
