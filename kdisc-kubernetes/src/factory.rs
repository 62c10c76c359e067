//! Deferred construction handed to the host

use kdisc_core::Result;
use std::fmt;

/// Zero-argument builder for a capability the host may or may not use.
///
/// Invoking consumes the factory, so one factory value builds at most once.
pub struct DeferredFactory<T> {
    capability: &'static str,
    build: Box<dyn FnOnce() -> Result<T> + Send>,
}

impl<T> DeferredFactory<T> {
    pub fn new<F>(capability: &'static str, build: F) -> Self
    where
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        Self {
            capability,
            build: Box::new(build),
        }
    }

    /// Name the host registers this factory under
    #[must_use]
    pub fn capability(&self) -> &'static str {
        self.capability
    }

    pub fn invoke(self) -> Result<T> {
        (self.build)()
    }
}

impl<T> fmt::Debug for DeferredFactory<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredFactory")
            .field("capability", &self.capability)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_nothing_is_built_until_invoked() {
        let builds = Arc::new(AtomicUsize::new(0));
        let counter = builds.clone();
        let factory = DeferredFactory::new("kubernetes", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(42)
        });

        assert_eq!(factory.capability(), "kubernetes");
        assert_eq!(builds.load(Ordering::SeqCst), 0);

        assert_eq!(factory.invoke().unwrap(), 42);
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dropped_factory_never_builds() {
        let builds = Arc::new(AtomicUsize::new(0));
        let counter = builds.clone();
        let factory: DeferredFactory<()> = DeferredFactory::new("kubernetes", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        drop(factory);
        assert_eq!(builds.load(Ordering::SeqCst), 0);
    }
}
