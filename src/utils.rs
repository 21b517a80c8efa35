//! Small shared helpers.

/// Builds a direct-IP HTTPS URL for `path` on `ip`.
///
/// IPv6 literals are always bracketed; `path` may or may not carry a leading
/// slash. The Host header (and SNI, when a server name is pinned) is supplied
/// separately by the caller, so the authority here is purely the wire target.
pub fn direct_url(ip: &str, path: &str) -> String {
    let path = path.strip_prefix('/').unwrap_or(path);
    if ip.contains(':') && !ip.starts_with('[') {
        format!("https://[{ip}]/{path}")
    } else {
        format!("https://{ip}/{path}")
    }
}
