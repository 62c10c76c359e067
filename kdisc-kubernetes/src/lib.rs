//! Kubernetes-based cluster discovery
//!
//! Lets a node find its peers through the endpoints of a Kubernetes service
//! when `discovery.type` is `kubernetes`. The backend only decides whether it
//! is active and hands the host deferred factories; the registry client is
//! built the first time the host actually asks for the peer resolver.

pub mod client;
pub mod factory;
pub mod gate;
pub mod options;
pub mod plugin;
pub mod resolver;
pub mod slot;

pub use client::{KubernetesApiClient, RegistryClient};
pub use factory::DeferredFactory;
pub use gate::is_discovery_active;
pub use options::{declared_options, RegistryOptions, KUBERNETES};
pub use plugin::{KubernetesDiscoveryPlugin, PluginState};
pub use resolver::KubernetesPeerResolver;
pub use slot::ResourceSlot;
