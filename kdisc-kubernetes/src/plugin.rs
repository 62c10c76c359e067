//! Kubernetes discovery plugin
//!
//! Host-facing contract of the backend:
//! - `offer_discovery_factory`: deferred membership engine wired to a peer resolver
//! - `offer_resolver_factory`: deferred Kubernetes peer resolver; builds the
//!   registry client and is the only writer of the client slot
//! - `declared_options` / `shutdown`: option registration and client release
//!
//! Both offers consult the activation gate first and return `None` when this
//! backend is not selected, so the host can fall back to other discovery modes.

use kdisc_core::{
    DiscoveryContext, EngineParts, Error, MembershipEngine, ResolverContext, Result,
    SettingDescriptor, Settings,
};
use std::sync::Arc;
use tracing::{debug, error, info, info_span, trace, warn, Span};

use crate::client::{KubernetesApiClient, RegistryClient};
use crate::factory::DeferredFactory;
use crate::gate::is_discovery_active;
use crate::options::{declared_options, KUBERNETES};
use crate::resolver::KubernetesPeerResolver;
use crate::slot::ResourceSlot;

/// Lifecycle of a plugin instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginState {
    /// No registry client built yet
    Constructed,
    /// The resolver factory ran and the registry client is held
    ClientBuilt,
    /// `shutdown` ran
    Closed,
}

pub struct KubernetesDiscoveryPlugin<C = KubernetesApiClient> {
    settings: Settings,
    client: Arc<ResourceSlot<C>>,
    span: Span,
}

impl<C: RegistryClient> KubernetesDiscoveryPlugin<C> {
    #[must_use]
    pub fn new(settings: Settings) -> Self {
        Self::with_span(settings, info_span!("kubernetes_discovery"))
    }

    /// Create with a host-provided span all plugin events are recorded in
    #[must_use]
    pub fn with_span(settings: Settings, span: Span) -> Self {
        span.in_scope(|| trace!("Starting kubernetes discovery plugin"));
        Self {
            settings,
            client: Arc::new(ResourceSlot::new()),
            span,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn is_active(&self) -> Result<bool> {
        is_discovery_active(&self.settings, &self.span)
    }

    /// Factory for the cluster-membership engine, if Kubernetes discovery is active.
    ///
    /// The factory only builds the engine; the registry client is left to the
    /// resolver factory.
    pub fn offer_discovery_factory<E: MembershipEngine>(
        &self,
        ctx: &DiscoveryContext,
    ) -> Result<Option<DeferredFactory<E>>> {
        if !self.is_active()? {
            return Ok(None);
        }

        let parts = EngineParts {
            settings: self.settings.clone(),
            scheduler: ctx.scheduler.clone(),
            transport: ctx.transport.clone(),
            cluster_state: ctx.cluster_state.clone(),
            hosts_provider: ctx.hosts_provider.clone(),
        };
        Ok(Some(DeferredFactory::new(KUBERNETES, move || E::build(parts))))
    }

    /// Factory for the Kubernetes peer resolver, if Kubernetes discovery is active.
    ///
    /// Invoking it builds the registry client and stores it for `shutdown`.
    /// At most one invocation per plugin instance may succeed; a second one is
    /// a host contract violation and fails with [`Error::HostContract`].
    pub fn offer_resolver_factory(
        &self,
        ctx: &ResolverContext,
    ) -> Result<Option<DeferredFactory<Arc<KubernetesPeerResolver<C>>>>> {
        if !self.is_active()? {
            return Ok(None);
        }

        let settings = self.settings.clone();
        let slot = self.client.clone();
        let ctx = ctx.clone();
        let span = self.span.clone();

        Ok(Some(DeferredFactory::new(KUBERNETES, move || {
            let _entered = span.enter();

            let client = Arc::new(C::connect(&settings)?);
            if let Err(rejected) = slot.fill(client.clone()) {
                if let Err(e) = rejected.close() {
                    warn!(error = %e, "Failed to close rejected registry client");
                }
                error!("Kubernetes resolver factory invoked more than once");
                return Err(Error::HostContract(
                    "kubernetes resolver factory may be invoked at most once per plugin instance"
                        .to_string(),
                ));
            }
            info!("Kubernetes registry client created");

            let resolver = KubernetesPeerResolver::new(&settings, client, ctx.transport, ctx.network)?;
            Ok(Arc::new(resolver))
        })))
    }

    /// Options this backend registers with the host
    #[must_use]
    pub fn declared_options(&self) -> Vec<SettingDescriptor> {
        declared_options()
    }

    /// The registry client, once the resolver factory has built it
    #[must_use]
    pub fn registry_client(&self) -> Option<Arc<C>> {
        self.client.get()
    }

    #[must_use]
    pub fn state(&self) -> PluginState {
        if self.client.is_released() {
            PluginState::Closed
        } else if self.client.is_holding() {
            PluginState::ClientBuilt
        } else {
            PluginState::Constructed
        }
    }

    /// Release the registry client, if one was built.
    ///
    /// The client is closed at most once across all calls. A close failure is
    /// reported as [`Error::Io`] after the slot was released, so it is not retried.
    pub fn shutdown(&self) -> Result<()> {
        let _entered = self.span.enter();

        let Some(client) = self.client.drain() else {
            debug!("No registry client to release");
            return Ok(());
        };

        client.close()?;
        info!("Kubernetes registry client released");
        Ok(())
    }
}
