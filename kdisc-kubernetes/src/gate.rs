//! Activation gate
//!
//! Decides from the settings bundle alone whether Kubernetes discovery is
//! selected and carries the options it cannot run without. Nothing is cached:
//! the bundle is immutable, so every check gives the same answer.

use kdisc_core::{Result, Settings};
use tracing::{debug, trace, warn, Span};

use crate::options::{DISCOVERY_TYPE, KUBERNETES, NAMESPACE, SERVICE_NAME};

/// Whether Kubernetes discovery should be used for `settings`.
///
/// `Ok(false)` covers both "another discovery mode is selected" and
/// "selected but namespace or service name is blank". Only a malformed
/// bundle produces an error.
pub fn is_discovery_active(settings: &Settings, span: &Span) -> Result<bool> {
    let _entered = span.enter();

    let discovery_type = DISCOVERY_TYPE.get(settings)?;
    if !discovery_type.eq_ignore_ascii_case(KUBERNETES) {
        debug!(
            discovery_type = %discovery_type,
            "{} not set to {KUBERNETES}",
            DISCOVERY_TYPE.key()
        );
        return Ok(false);
    }

    if NAMESPACE.has_text(settings)? && SERVICE_NAME.has_text(settings)? {
        trace!("All required settings for Kubernetes discovery are set");
        return Ok(true);
    }

    warn!(
        "Kubernetes discovery selected but one or more settings are missing. Should have [{}] and [{}]",
        NAMESPACE.key(),
        SERVICE_NAME.key()
    );
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active(pairs: &[(&str, &str)]) -> bool {
        let settings = Settings::from_pairs(pairs.iter().copied()).unwrap();
        is_discovery_active(&settings, &Span::none()).unwrap()
    }

    #[test]
    fn test_not_selected() {
        assert!(!active(&[]));
        assert!(!active(&[
            ("discovery.type", "zen"),
            ("cloud.kubernetes.namespace", "ns1"),
            ("cloud.kubernetes.service_name", "svc1"),
        ]));
        assert!(!active(&[
            ("discovery.type", " kubernetes"),
            ("cloud.kubernetes.namespace", "ns1"),
            ("cloud.kubernetes.service_name", "svc1"),
        ]));
    }

    #[test]
    fn test_selector_is_case_insensitive() {
        assert!(active(&[
            ("discovery.type", "KuBeRnEtEs"),
            ("cloud.kubernetes.namespace", "ns1"),
            ("cloud.kubernetes.service_name", "svc1"),
        ]));
    }

    #[test]
    fn test_selected_but_misconfigured() {
        for namespace in ["", "   ", "\t"] {
            assert!(!active(&[
                ("discovery.type", "kubernetes"),
                ("cloud.kubernetes.namespace", namespace),
                ("cloud.kubernetes.service_name", "svc1"),
            ]));
        }
        assert!(!active(&[
            ("discovery.type", "kubernetes"),
            ("cloud.kubernetes.service_name", "svc1"),
        ]));
        assert!(!active(&[
            ("discovery.type", "kubernetes"),
            ("cloud.kubernetes.namespace", "ns1"),
            ("cloud.kubernetes.service_name", " "),
        ]));
    }

    #[test]
    fn test_selected_and_configured() {
        assert!(active(&[
            ("discovery.type", "kubernetes"),
            ("cloud.kubernetes.namespace", "ns1"),
            ("cloud.kubernetes.service_name", "svc1"),
        ]));
    }

    #[test]
    fn test_valueless_yaml_keys_are_absent() {
        use std::io::Write;

        // `namespace:` and `type:` parse as null
        for yaml in [
            "discovery:\n  type: kubernetes\ncloud:\n  kubernetes:\n    namespace:\n    service_name: svc1",
            "discovery:\n  type:\ncloud:\n  kubernetes:\n    namespace: ns1\n    service_name: svc1",
        ] {
            let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
            writeln!(file, "{yaml}").unwrap();
            let settings = Settings::load(file.path().to_str()).unwrap();

            assert!(!is_discovery_active(&settings, &Span::none()).unwrap());
        }
    }

    #[test]
    fn test_malformed_bundle_is_an_error() {
        // `cloud.kubernetes.namespace` holds a table instead of text
        let settings = Settings::from_pairs([
            ("discovery.type", "kubernetes"),
            ("cloud.kubernetes.namespace.inner", "ns1"),
            ("cloud.kubernetes.service_name", "svc1"),
        ])
        .unwrap();
        assert!(is_discovery_active(&settings, &Span::none()).is_err());
    }
}
