pub mod config;
pub mod error;
pub mod host;
pub mod logging;
pub mod settings;

pub use config::{LoggingConfig, Settings};
pub use error::{Error, Result};
pub use host::{
    ClusterStateService, DiscoveryContext, EngineParts, MembershipEngine, NetworkService,
    PeerAddressResolver, ResolverContext, TransportService,
};
pub use settings::{Setting, SettingDescriptor, SettingKind, SettingValue};
