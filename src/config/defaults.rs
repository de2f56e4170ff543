//! Default values for configuration options.

/// Key pattern matching every interface's IPv6 state entry.
pub const INTERFACE_IPV6_PATTERN: &str = "State:/Network/Interface/[^/]+/IPv6";

/// Default configuration file name written by `init`.
pub const CONFIG_FILE: &str = "scdns.toml";

/// Default watch key patterns.
#[must_use]
pub fn watch_keys() -> Vec<String> {
    vec![INTERFACE_IPV6_PATTERN.to_string()]
}

/// Default snapshot query patterns.
#[must_use]
pub fn query_patterns() -> Vec<String> {
    vec![INTERFACE_IPV6_PATTERN.to_string()]
}
