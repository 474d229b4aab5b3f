//! Shared encoding and matching utilities.

/// Format bytes as colon-separated uppercase hex (e.g., "AB:CD:EF").
pub fn hex_colon_upper(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(":")
}

/// Check whether input looks like PEM (starts with a `-----BEGIN` marker
/// after leading whitespace).
pub fn is_pem(input: &[u8]) -> bool {
    let trimmed = match input.iter().position(|b| !b.is_ascii_whitespace()) {
        Some(pos) => &input[pos..],
        None => return false,
    };
    trimmed.starts_with(b"-----BEGIN")
}

/// Match a hostname against a certificate name pattern per RFC 6125.
///
/// Comparison is case-insensitive. A pattern may carry a single leading
/// wildcard label (`*.example.com`) which matches exactly one hostname
/// label: `www.example.com` matches, `a.b.example.com` and `example.com`
/// do not. Partial-label wildcards (`w*.example.com`) are not supported.
pub fn hostname_matches(pattern: &str, hostname: &str) -> bool {
    let pattern = pattern.trim_end_matches('.').to_ascii_lowercase();
    let hostname = hostname.trim_end_matches('.').to_ascii_lowercase();

    if let Some(suffix) = pattern.strip_prefix("*.") {
        // The wildcard must cover exactly one label, and the bare parent
        // domain must not match.
        let Some(rest) = hostname.split_once('.').map(|(_, rest)| rest) else {
            return false;
        };
        return rest == suffix;
    }

    pattern == hostname
}

/// Match a hostname against SAN DNS names, falling back to the subject CN
/// only when no SAN DNS entries exist.
///
/// Returns `(matched, used_cn_fallback)`.
pub fn hostname_match_with_fallback(
    dns_names: &[String],
    cn: Option<&str>,
    hostname: &str,
) -> (bool, bool) {
    if !dns_names.is_empty() {
        let matched = dns_names.iter().any(|p| hostname_matches(p, hostname));
        return (matched, false);
    }
    match cn {
        Some(cn) if hostname_matches(cn, hostname) => (true, true),
        _ => (false, false),
    }
}
