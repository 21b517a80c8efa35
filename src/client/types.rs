//! Client configuration and request/response types.

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Duration;

use crate::config::DEFAULT_CLIENT_TIMEOUT;

/// Client-wide configuration.
///
/// One `ClientConfig` describes how every connection made by a
/// [`Client`](super::Client) is established.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Holistic request deadline (dial + handshake + transfer).
    pub timeout: Duration,
    /// Skip server certificate verification.
    pub insecure_skip_verify: bool,
    /// Logical hostname to pin. When set and the target authority is an IP
    /// literal, SNI, certificate checks and the Host header all carry this
    /// name while the TCP connection goes to the literal address.
    pub server_name: Option<String>,
    /// Proxy URL: `http[s]://host[:port]` (CONNECT) or
    /// `socks5://host[:port]` (no-auth).
    pub proxy: Option<String>,
    /// Local source address to bind outgoing connections to.
    pub local_ip: Option<IpAddr>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            timeout: DEFAULT_CLIENT_TIMEOUT,
            insecure_skip_verify: false,
            server_name: None,
            proxy: None,
            local_ip: None,
        }
    }
}

/// Per-request options.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Request headers. A `User-Agent` entry also steers fingerprint
    /// inference; pass the profile's UA (or none) to avoid surprises.
    pub headers: HashMap<String, String>,
    /// Host header override, decoupling the HTTP host from the URL
    /// authority.
    pub host: Option<String>,
    /// Request body, sent as-is.
    pub body: Option<Vec<u8>>,
}

/// A fully buffered HTTP response.
#[derive(Debug, Clone)]
pub struct Response {
    /// HTTP status code.
    pub status_code: u16,
    /// Canonical reason phrase for the status, e.g. `"Forbidden"`.
    pub status_text: String,
    /// Response headers; on multi-valued headers the first value wins.
    pub headers: HashMap<String, String>,
    /// Entire response body.
    pub body: Vec<u8>,
    /// `"HTTP/2"` or `"HTTP/1.1"`.
    pub http_version: &'static str,
}

impl Response {
    /// True for a 200 status.
    pub fn is_ok(&self) -> bool {
        self.status_code == 200
    }
}
