//! Proxy URL validation and normalization.
//!
//! Scheme checking happens here, synchronously, before any dial: an
//! unsupported scheme must fail fast instead of surfacing as a connect
//! error. CONNECT and SOCKS5 negotiation itself is handled by the
//! transport layer.

use url::Url;

use crate::error_handling::EngineError;

/// Validates `raw` as a proxy URL and normalizes it to
/// `scheme://host:port` with the scheme's default port filled in
/// (`80` for http(s) CONNECT, `1080` for socks5).
///
/// # Errors
///
/// [`EngineError::UnsupportedProxy`] for unparsable URLs or schemes other
/// than `http`, `https` and `socks5`.
pub(crate) fn normalize_proxy(raw: &str) -> Result<String, EngineError> {
    let parsed = Url::parse(raw).map_err(|_| EngineError::UnsupportedProxy(raw.to_string()))?;

    let default_port = match parsed.scheme() {
        "http" | "https" => 80,
        "socks5" => 1080,
        other => return Err(EngineError::UnsupportedProxy(other.to_string())),
    };

    let host = parsed
        .host_str()
        .ok_or_else(|| EngineError::UnsupportedProxy(raw.to_string()))?;
    let port = parsed.port().unwrap_or(default_port);

    Ok(format!("{}://{}:{}", parsed.scheme(), host, port))
}
