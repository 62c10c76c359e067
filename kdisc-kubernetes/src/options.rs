//! Kubernetes discovery options

use kdisc_core::{Result, Setting, SettingDescriptor, Settings};
use std::time::Duration;

/// Reserved discovery-mode identifier of this backend
pub const KUBERNETES: &str = "kubernetes";

/// Host-level discovery mode selector
pub const DISCOVERY_TYPE: Setting<String> = Setting::with_default("discovery.type", "static");

/// Namespace of the headless service backing the cluster
pub const NAMESPACE: Setting<String> = Setting::required("cloud.kubernetes.namespace");

/// Name of the service whose endpoints are the cluster peers
pub const SERVICE_NAME: Setting<String> = Setting::required("cloud.kubernetes.service_name");

/// How long resolved peers are reused before the API is queried again (`0s` = never cached)
pub const REFRESH_INTERVAL: Setting<Duration> =
    Setting::with_default("cloud.kubernetes.refresh_interval", "0s");

pub const RETRY_COUNT: Setting<u32> = Setting::with_default("cloud.kubernetes.retry_count", "3");

/// Per-request timeout against the API server
pub const MAX_WAIT: Setting<Duration> = Setting::with_default("cloud.kubernetes.max_wait", "5s");

/// The options this backend registers with the host, in declaration order
#[must_use]
pub fn declared_options() -> Vec<SettingDescriptor> {
    vec![
        NAMESPACE.descriptor(),
        SERVICE_NAME.descriptor(),
        REFRESH_INTERVAL.descriptor(),
        RETRY_COUNT.descriptor(),
        MAX_WAIT.descriptor(),
    ]
}

/// Effective values of the declared options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryOptions {
    pub namespace: String,
    pub service_name: String,
    pub refresh_interval: Duration,
    /// Retry budget for resolver implementations that retry; the built-in one does not
    pub retry_count: u32,
    pub max_wait: Duration,
}

impl RegistryOptions {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self {
            namespace: NAMESPACE.get(settings)?.trim().to_string(),
            service_name: SERVICE_NAME.get(settings)?.trim().to_string(),
            refresh_interval: REFRESH_INTERVAL.get(settings)?,
            retry_count: RETRY_COUNT.get(settings)?,
            max_wait: MAX_WAIT.get(settings)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kdisc_core::SettingKind;

    #[test]
    fn test_declared_options_order() {
        let keys: Vec<_> = declared_options().iter().map(|o| o.key).collect();
        assert_eq!(
            keys,
            vec![
                "cloud.kubernetes.namespace",
                "cloud.kubernetes.service_name",
                "cloud.kubernetes.refresh_interval",
                "cloud.kubernetes.retry_count",
                "cloud.kubernetes.max_wait",
            ]
        );
    }

    #[test]
    fn test_declared_option_types() {
        let options = declared_options();
        let kinds: Vec<_> = options.iter().map(|o| o.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SettingKind::String,
                SettingKind::String,
                SettingKind::Duration,
                SettingKind::Integer,
                SettingKind::Duration,
            ]
        );
        assert!(options[0].required && options[1].required);
        assert!(options[2..].iter().all(|o| !o.required && o.default.is_some()));
    }

    #[test]
    fn test_registry_options_defaults() {
        let settings = Settings::from_pairs([
            ("cloud.kubernetes.namespace", " ns1 "),
            ("cloud.kubernetes.service_name", "svc1"),
        ])
        .unwrap();

        let options = RegistryOptions::from_settings(&settings).unwrap();
        assert_eq!(options.namespace, "ns1");
        assert_eq!(options.service_name, "svc1");
        assert_eq!(options.refresh_interval, Duration::ZERO);
        assert_eq!(options.retry_count, 3);
        assert_eq!(options.max_wait, Duration::from_secs(5));
    }

    #[test]
    fn test_registry_options_require_service() {
        let settings = Settings::from_pairs([("cloud.kubernetes.namespace", "ns1")]).unwrap();
        assert!(RegistryOptions::from_settings(&settings).is_err());
    }
}
