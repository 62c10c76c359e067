//! Host-provided services and the collaborators discovery backends are wired to
//!
//! These traits are the narrow boundary between a discovery backend and the
//! node that embeds it. A host implements the service traits, hands them over
//! through [`DiscoveryContext`] / [`ResolverContext`], and chooses the
//! [`MembershipEngine`] a backend's deferred factory builds.

use async_trait::async_trait;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::runtime::Handle;

use crate::config::Settings;
use crate::error::Result;

/// Node-to-node transport layer
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
pub trait TransportService: Send + Sync {
    /// Port other nodes reach this node's transport on
    fn publish_port(&self) -> u16;
}

/// Local network configuration
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
pub trait NetworkService: Send + Sync {
    /// Address this node publishes to peers, if known
    fn publish_host(&self) -> Option<IpAddr>;
}

/// Cluster state as seen by this node
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
pub trait ClusterStateService: Send + Sync {
    fn cluster_name(&self) -> String;
}

/// Source of candidate peer addresses for the membership engine
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait PeerAddressResolver: Send + Sync {
    async fn resolve_peers(&self) -> Result<Vec<SocketAddr>>;
}

/// Everything a cluster-membership engine is built from
#[derive(Clone)]
pub struct EngineParts {
    pub settings: Settings,
    pub scheduler: Handle,
    pub transport: Arc<dyn TransportService>,
    pub cluster_state: Arc<dyn ClusterStateService>,
    pub hosts_provider: Arc<dyn PeerAddressResolver>,
}

/// Cluster-membership engine owned by the host
///
/// The engine is a black box to discovery backends; they only decide whether
/// and with which peer resolver it gets built.
pub trait MembershipEngine: Send + Sized + 'static {
    fn build(parts: EngineParts) -> Result<Self>;
}

/// Services handed to a backend when the host asks for its discovery factory
#[derive(Clone)]
pub struct DiscoveryContext {
    pub scheduler: Handle,
    pub transport: Arc<dyn TransportService>,
    pub cluster_state: Arc<dyn ClusterStateService>,
    pub hosts_provider: Arc<dyn PeerAddressResolver>,
}

/// Services handed to a backend when the host asks for its resolver factory
#[derive(Clone)]
pub struct ResolverContext {
    pub transport: Arc<dyn TransportService>,
    pub network: Arc<dyn NetworkService>,
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingEngine {
        cluster: String,
        peers: Vec<SocketAddr>,
    }

    impl MembershipEngine for CountingEngine {
        fn build(parts: EngineParts) -> Result<Self> {
            Ok(Self {
                cluster: parts.cluster_state.cluster_name(),
                peers: Vec::new(),
            })
        }
    }

    #[tokio::test]
    async fn test_engine_parts_wiring() {
        let mut cluster_state = MockClusterStateService::new();
        cluster_state
            .expect_cluster_name()
            .times(1)
            .returning(|| "kdisc-test".to_string());

        let peer: SocketAddr = "10.0.0.2:9300".parse().unwrap();
        let mut resolver = MockPeerAddressResolver::new();
        resolver
            .expect_resolve_peers()
            .times(1)
            .returning(move || Ok(vec![peer]));

        let mut transport = MockTransportService::new();
        transport.expect_publish_port().return_const(9300u16);

        let parts = EngineParts {
            settings: Settings::builder().build().unwrap(),
            scheduler: Handle::current(),
            transport: Arc::new(transport),
            cluster_state: Arc::new(cluster_state),
            hosts_provider: Arc::new(resolver),
        };

        let hosts_provider = parts.hosts_provider.clone();
        let mut engine = CountingEngine::build(parts).unwrap();
        engine.peers = hosts_provider.resolve_peers().await.unwrap();

        assert_eq!(engine.cluster, "kdisc-test");
        assert_eq!(engine.peers, vec![peer]);
    }
}
