//! Inbound header access and forwarding policy.

use std::collections::HashMap;

use crate::config::ClientConfig;

/// Read-only access to the headers of the currently-active inbound call.
///
/// The web framework hosting the service implements this; the client only
/// ever reads from it. A plain `HashMap` works for tests and for static
/// header sets.
pub trait InboundHeaders: Send + Sync {
    /// The inbound value of the named header, if present.
    fn get(&self, name: &str) -> Option<String>;
}

impl InboundHeaders for HashMap<String, String> {
    fn get(&self, name: &str) -> Option<String> {
        Self::get(self, name).cloned()
    }
}

/// Snapshot of the configured forwarded headers that are present and
/// non-empty on the inbound call, in configuration order.
///
/// The same snapshot is attached to the outgoing request and rendered into
/// log events, so one call always logs exactly what it forwarded.
pub(crate) fn forwarded_snapshot(
    config: &ClientConfig,
    source: Option<&dyn InboundHeaders>,
) -> Vec<(String, String)> {
    let Some(source) = source else {
        return Vec::new();
    };

    config
        .forwarded_headers()
        .iter()
        .filter_map(|name| {
            source
                .get(name)
                .filter(|value| !value.is_empty())
                .map(|value| (name.clone(), value))
        })
        .collect()
}

/// The forwarded headers as they appear in log events: the full snapshot
/// when value logging is enabled, an empty list when it is suppressed. The
/// wire is unaffected either way.
pub(crate) fn loggable_headers(
    config: &ClientConfig,
    snapshot: &[(String, String)],
) -> Vec<(String, String)> {
    if config.log_forwarded_header_values() {
        snapshot.to_vec()
    } else {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;

    fn inbound() -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert("X-Trace-Id".to_string(), "abc".to_string());
        headers.insert("X-Empty".to_string(), String::new());
        headers
    }

    #[test]
    fn snapshot_keeps_present_non_empty_in_order() {
        let config = ClientConfig::builder()
            .add_forwarded_header("X-Trace-Id")
            .add_forwarded_header("X-Missing")
            .add_forwarded_header("X-Empty")
            .build();
        let source = inbound();

        let snapshot = forwarded_snapshot(&config, Some(&source));

        assert_eq!(snapshot, [("X-Trace-Id".to_string(), "abc".to_string())]);
    }

    #[test]
    fn snapshot_without_source_is_empty() {
        let config = ClientConfig::builder()
            .add_forwarded_header("X-Trace-Id")
            .build();

        assert!(forwarded_snapshot(&config, None).is_empty());
    }

    #[test]
    fn loggable_headers_render_the_snapshot_by_default() {
        let config = ClientConfig::builder()
            .add_forwarded_header("X-Trace-Id")
            .add_forwarded_header("X-Userspace-Id")
            .build();
        let source = inbound();

        let snapshot = forwarded_snapshot(&config, Some(&source));
        let rendered = loggable_headers(&config, &snapshot);

        assert_eq!(rendered, [("X-Trace-Id".to_string(), "abc".to_string())]);
    }

    #[test]
    fn loggable_headers_are_empty_when_values_are_suppressed() {
        let config = ClientConfig::builder()
            .add_forwarded_header("X-Trace-Id")
            .log_forwarded_header_values(false)
            .build();
        let source = inbound();

        let snapshot = forwarded_snapshot(&config, Some(&source));
        let rendered = loggable_headers(&config, &snapshot);

        // Still forwarded on the wire, only the log rendering is gated.
        assert_eq!(snapshot, [("X-Trace-Id".to_string(), "abc".to_string())]);
        assert!(rendered.is_empty());
    }

    #[test]
    fn snapshot_preserves_configuration_order() {
        let config = ClientConfig::builder()
            .add_forwarded_header("X-B")
            .add_forwarded_header("X-A")
            .build();
        let mut source = HashMap::new();
        source.insert("X-A".to_string(), "1".to_string());
        source.insert("X-B".to_string(), "2".to_string());

        let snapshot = forwarded_snapshot(&config, Some(&source));

        assert_eq!(
            snapshot,
            [
                ("X-B".to_string(), "2".to_string()),
                ("X-A".to_string(), "1".to_string()),
            ]
        );
    }
}
