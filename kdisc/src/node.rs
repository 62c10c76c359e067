use kdisc_core::{NetworkService, TransportService};
use std::net::IpAddr;

/// Host services of a node described on the command line
pub struct StaticNode {
    pub transport_port: u16,
    pub publish_host: Option<IpAddr>,
}

impl TransportService for StaticNode {
    fn publish_port(&self) -> u16 {
        self.transport_port
    }
}

impl NetworkService for StaticNode {
    fn publish_host(&self) -> Option<IpAddr> {
        self.publish_host
    }
}
