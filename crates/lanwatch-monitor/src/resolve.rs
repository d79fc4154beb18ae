//! Best-effort reverse name resolution.
//!
//! A lookup never fails from the caller's point of view: errors, timeouts,
//! and unrecognized resolver output all degrade to [`UNKNOWN_NAME`].

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use lanwatch_core::UNKNOWN_NAME;

use crate::platform::Platform;

pub struct NameResolver {
    platform: Arc<dyn Platform>,
    timeout: Duration,
}

impl NameResolver {
    pub fn new(platform: Arc<dyn Platform>, timeout: Duration) -> Self {
        Self { platform, timeout }
    }

    /// Resolve `address` to a display name, or [`UNKNOWN_NAME`].
    pub async fn resolve(&self, address: Ipv4Addr) -> String {
        let lookup = tokio::time::timeout(self.timeout, self.platform.reverse_lookup(address));

        match lookup.await {
            Ok(Ok(out)) => parse_lookup_output(&out).unwrap_or_else(|| {
                tracing::debug!(ip = %address, "Reverse lookup returned no name");
                UNKNOWN_NAME.to_string()
            }),
            Ok(Err(e)) => {
                tracing::debug!(ip = %address, error = %e, "Reverse lookup failed");
                UNKNOWN_NAME.to_string()
            }
            Err(_) => {
                tracing::debug!(
                    ip = %address,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Reverse lookup timed out"
                );
                UNKNOWN_NAME.to_string()
            }
        }
    }
}

/// Extract the first resolved name from `nslookup` output.
///
/// Handles both the `Name:    host.lan` layout (Windows) and the
/// `... name = host.lan.` layout (BIND nslookup on Unix).
pub fn parse_lookup_output(out: &str) -> Option<String> {
    out.lines().find_map(|line| {
        let line = line.trim();
        let rest = line
            .strip_prefix("Name:")
            .or_else(|| line.split_once("name = ").map(|(_, rest)| rest))?;

        let token = rest.split_whitespace().next()?.trim_end_matches('.');
        let valid = !token.is_empty()
            && token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_'));

        valid.then(|| token.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubPlatform;

    #[test]
    fn test_parse_windows_output() {
        let out = "\
Server:  router.lan
Address:  192.168.1.1

Name:    laptop-7.lan
Address:  192.168.1.40
";
        assert_eq!(parse_lookup_output(out), Some("laptop-7.lan".to_string()));
    }

    #[test]
    fn test_parse_bind_output() {
        let out = "40.1.168.192.in-addr.arpa\tname = printer.home.\n\nAuthoritative answers can be found from:\n";
        assert_eq!(parse_lookup_output(out), Some("printer.home".to_string()));
    }

    #[test]
    fn test_parse_not_found() {
        let out = "** server can't find 40.1.168.192.in-addr.arpa: NXDOMAIN\n";
        assert_eq!(parse_lookup_output(out), None);
        assert_eq!(parse_lookup_output("Name:   \n"), None);
        assert_eq!(parse_lookup_output("Name: <bad>\n"), None);
    }

    #[tokio::test]
    async fn test_resolve_uses_platform_output() {
        let platform = StubPlatform::default().with_name("192.168.1.40", "laptop-7.lan");
        let resolver = NameResolver::new(Arc::new(platform), Duration::from_secs(1));

        let name = resolver.resolve(Ipv4Addr::new(192, 168, 1, 40)).await;
        assert_eq!(name, "laptop-7.lan");
    }

    #[tokio::test]
    async fn test_lookup_failure_is_unknown() {
        let resolver = NameResolver::new(Arc::new(StubPlatform::default()), Duration::from_secs(1));

        let name = resolver.resolve(Ipv4Addr::new(192, 168, 1, 41)).await;
        assert_eq!(name, UNKNOWN_NAME);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_lookup_times_out_to_unknown() {
        let platform = StubPlatform::default()
            .with_name("192.168.1.40", "laptop-7.lan")
            .with_lookup_delay(Duration::from_secs(10));
        let resolver = NameResolver::new(Arc::new(platform), Duration::from_millis(500));

        let name = resolver.resolve(Ipv4Addr::new(192, 168, 1, 40)).await;
        assert_eq!(name, UNKNOWN_NAME);
    }
}
