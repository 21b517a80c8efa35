//! TLS-mimicking HTTP client.
//!
//! Each [`Client`] sends requests whose TLS ClientHello matches a browser
//! recipe from the fingerprint catalogue. HTTP/2 is attempted first over a
//! cached per-origin transport; any transport-level failure falls back to a
//! cached HTTP/1.1 transport built from the same recipe. Responses are
//! buffered whole.

mod proxy;
mod types;

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Mutex;

use log::debug;
use rand::rngs::StdRng;
use rand::SeedableRng;
use url::{Host, Url};
use wreq::header::{HeaderMap, HeaderName, HeaderValue, HOST};

use crate::config::{H1_POOL_IDLE_PER_HOST, H1_POOL_IDLE_TIMEOUT};
use crate::error_handling::EngineError;
use crate::fingerprint::ClientHelloId;

pub use types::{ClientConfig, RequestOptions, Response};
pub use wreq::Method;

/// Which application protocol a cached transport advertises.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Alpn {
    H2,
    H1,
}

/// HTTP client with a browser-accurate TLS handshake.
///
/// Transports are cached per origin host for the client's lifetime, one
/// cache for HTTP/2 and one for the HTTP/1.1 fallback, so repeated requests
/// to the same origin reuse warm connections and HTTP/2 session state.
pub struct Client {
    config: ClientConfig,
    default_hello: ClientHelloId,
    // Seeded once per client; the randomized ClientHello ids draw their
    // concrete recipe from here.
    rng: Mutex<StdRng>,
    h2: Mutex<HashMap<String, wreq::Client>>,
    h1: Mutex<HashMap<String, wreq::Client>>,
}

impl Client {
    /// Creates a client using `hello` as the default handshake recipe.
    /// The client's handshake PRNG is seeded from OS entropy here.
    pub fn new(hello: ClientHelloId, config: ClientConfig) -> Self {
        Client {
            config,
            default_hello: hello,
            rng: Mutex::new(StdRng::from_entropy()),
            h2: Mutex::new(HashMap::new()),
            h1: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a client with the latest Chrome recipe and default config.
    pub fn with_defaults() -> Self {
        Client::new(ClientHelloId::chrome_latest(), ClientConfig::default())
    }

    /// The client-wide configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Sends a GET request.
    ///
    /// # Errors
    ///
    /// See [`Client::execute`].
    pub async fn get(
        &self,
        target: &str,
        headers: HashMap<String, String>,
    ) -> Result<Response, EngineError> {
        self.execute(
            Method::GET,
            target,
            &RequestOptions {
                headers,
                ..RequestOptions::default()
            },
        )
        .await
    }

    /// Sends a POST request with a body.
    ///
    /// # Errors
    ///
    /// See [`Client::execute`].
    pub async fn post(
        &self,
        target: &str,
        headers: HashMap<String, String>,
        body: Vec<u8>,
    ) -> Result<Response, EngineError> {
        self.execute(
            Method::POST,
            target,
            &RequestOptions {
                headers,
                host: None,
                body: Some(body),
            },
        )
        .await
    }

    /// Sends one request and buffers the whole response.
    ///
    /// The HTTP/2 transport is tried first; any transport-level failure is
    /// retried once over HTTP/1.1 with the same ClientHello recipe. Both
    /// attempts share the holistic deadline from the config.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidUrl`] for unparsable targets or targets with
    /// no host, [`EngineError::UnsupportedProxy`] for a bad proxy config,
    /// [`EngineError::InvalidHeader`] for unencodable headers, and
    /// [`EngineError::Timeout`]/[`EngineError::Transport`] when both
    /// protocol attempts fail.
    pub async fn execute(
        &self,
        method: Method,
        target: &str,
        options: &RequestOptions,
    ) -> Result<Response, EngineError> {
        let parsed = Url::parse(target).map_err(|_| EngineError::InvalidUrl(target.to_string()))?;
        let origin = parsed
            .host_str()
            .ok_or_else(|| EngineError::InvalidUrl(target.to_string()))?
            .to_string();

        let hello = options
            .headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("user-agent"))
            .map(|(_, ua)| infer_hello(ua))
            .unwrap_or(self.default_hello);

        let headers = build_header_map(options)?;
        let (request_url, pin) = self.pin_origin(&parsed);

        let h2 = self.transport(&origin, hello, Alpn::H2, pin.as_ref())?;
        match self
            .send(&h2, method.clone(), request_url.clone(), &headers, options)
            .await
        {
            Ok(resp) => Ok(resp),
            Err(err @ (EngineError::Timeout(_) | EngineError::Transport(_))) => {
                debug!("HTTP/2 attempt to {origin} failed ({err}); retrying over HTTP/1.1");
                let h1 = self.transport(&origin, hello, Alpn::H1, pin.as_ref())?;
                self.send(&h1, method, request_url, &headers, options).await
            }
            Err(err) => Err(err),
        }
    }

    /// Drops all cached transports. Idle sockets are torn down by the
    /// transports' own idle timers.
    pub fn close(&self) {
        self.h2.lock().expect("transport cache poisoned").clear();
        self.h1.lock().expect("transport cache poisoned").clear();
    }

    /// Resolves the SNI/Host decoupling for direct-IP targets.
    ///
    /// With a pinned `server_name` and an IP-literal authority, the request
    /// is rewritten to the logical hostname and the transport resolves that
    /// hostname back to the literal address. Domain authorities pass
    /// through untouched.
    fn pin_origin(&self, parsed: &Url) -> (Url, Option<(String, SocketAddr)>) {
        let Some(server_name) = self.config.server_name.as_deref() else {
            return (parsed.clone(), None);
        };
        let addr = match parsed.host() {
            Some(Host::Ipv4(ip)) => IpAddr::V4(ip),
            Some(Host::Ipv6(ip)) => IpAddr::V6(ip),
            _ => return (parsed.clone(), None),
        };
        let port = parsed.port_or_known_default().unwrap_or(443);

        let mut rewritten = parsed.clone();
        if rewritten.set_host(Some(server_name)).is_err() {
            return (parsed.clone(), None);
        }
        (
            rewritten,
            Some((server_name.to_string(), SocketAddr::new(addr, port))),
        )
    }

    /// Returns the cached transport for `origin`, building it on first use.
    fn transport(
        &self,
        origin: &str,
        hello: ClientHelloId,
        alpn: Alpn,
        pin: Option<&(String, SocketAddr)>,
    ) -> Result<wreq::Client, EngineError> {
        let cache = match alpn {
            Alpn::H2 => &self.h2,
            Alpn::H1 => &self.h1,
        };

        if let Some(existing) = cache.lock().expect("transport cache poisoned").get(origin) {
            return Ok(existing.clone());
        }

        let built = self.build_transport(hello, alpn, pin)?;
        let mut cache = cache.lock().expect("transport cache poisoned");
        Ok(cache
            .entry(origin.to_string())
            .or_insert(built)
            .clone())
    }

    fn build_transport(
        &self,
        hello: ClientHelloId,
        alpn: Alpn,
        pin: Option<&(String, SocketAddr)>,
    ) -> Result<wreq::Client, EngineError> {
        let emulation = {
            let mut rng = self.rng.lock().expect("handshake rng poisoned");
            hello.emulation(&mut *rng)
        };
        let mut builder = wreq::Client::builder()
            .emulation(emulation)
            .timeout(self.config.timeout)
            .connect_timeout(self.config.timeout)
            .cert_verification(!self.config.insecure_skip_verify);

        builder = match alpn {
            Alpn::H2 => builder.http2_only(),
            Alpn::H1 => builder
                .http1_only()
                .pool_max_idle_per_host(H1_POOL_IDLE_PER_HOST)
                .pool_idle_timeout(H1_POOL_IDLE_TIMEOUT),
        };

        builder = match self.config.proxy.as_deref() {
            Some(raw) => {
                let normalized = proxy::normalize_proxy(raw)?;
                builder.proxy(wreq::Proxy::all(&normalized)?)
            }
            None => builder.no_proxy(),
        };

        if let Some(ip) = self.config.local_ip {
            builder = builder.local_address(ip);
        }

        if let Some((name, addr)) = pin {
            builder = builder.resolve(name, *addr);
        }

        Ok(builder.build()?)
    }

    async fn send(
        &self,
        transport: &wreq::Client,
        method: Method,
        url: Url,
        headers: &HeaderMap,
        options: &RequestOptions,
    ) -> Result<Response, EngineError> {
        let mut request = transport
            .request(method, url.as_str())
            .headers(headers.clone());
        if let Some(body) = &options.body {
            request = request.body(body.clone());
        }

        let response = request.send().await.map_err(|e| self.tag_error(e))?;

        let status = response.status();
        let http_version = match response.version() {
            wreq::Version::HTTP_2 => "HTTP/2",
            _ => "HTTP/1.1",
        };

        let mut header_map = HashMap::new();
        for name in response.headers().keys() {
            // HeaderMap::get returns the first value of a multi-valued header.
            if let Some(value) = response.headers().get(name) {
                if let Ok(text) = value.to_str() {
                    header_map.insert(name.as_str().to_string(), text.to_string());
                }
            }
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| self.tag_error(e))?
            .to_vec();

        Ok(Response {
            status_code: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers: header_map,
            body,
            http_version,
        })
    }

    fn tag_error(&self, err: wreq::Error) -> EngineError {
        if err.is_timeout() {
            EngineError::Timeout(self.config.timeout)
        } else {
            EngineError::Transport(err)
        }
    }
}

/// Infers a handshake recipe from a User-Agent string.
///
/// Deliberately coarse, case-insensitive, first match wins: callers who
/// care pick the profile explicitly instead of relying on this.
pub(crate) fn infer_hello(user_agent: &str) -> ClientHelloId {
    let ua = user_agent.to_ascii_lowercase();
    if ua.contains("firefox") {
        ClientHelloId::firefox_latest()
    } else if ua.contains("edge") {
        ClientHelloId::edge_latest()
    } else if ua.contains("safari") && !ua.contains("chrome") {
        ClientHelloId::ios_latest()
    } else {
        ClientHelloId::chrome_latest()
    }
}

fn build_header_map(options: &RequestOptions) -> Result<HeaderMap, EngineError> {
    let mut map = HeaderMap::new();
    for (name, value) in &options.headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| EngineError::InvalidHeader(name.clone()))?;
        let header_value =
            HeaderValue::from_str(value).map_err(|_| EngineError::InvalidHeader(name.clone()))?;
        map.insert(header_name, header_value);
    }
    if let Some(host) = &options.host {
        let header_value =
            HeaderValue::from_str(host).map_err(|_| EngineError::InvalidHeader("Host".into()))?;
        map.insert(HOST, header_value);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_execute_rejects_invalid_url() {
        let client = Client::with_defaults();
        let err = client
            .execute(Method::GET, "not a url", &RequestOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn test_execute_rejects_url_without_host() {
        let client = Client::with_defaults();
        let err = client
            .execute(Method::GET, "data:text/plain,x", &RequestOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn test_unsupported_proxy_fails_before_dialing() {
        let client = Client::new(
            ClientHelloId::chrome_latest(),
            ClientConfig {
                proxy: Some("ftp://proxy.example.com".into()),
                ..ClientConfig::default()
            },
        );
        let err = client
            .execute(
                Method::GET,
                "https://example.com/",
                &RequestOptions::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedProxy(_)));
    }

    #[test]
    fn test_infer_hello_rules() {
        assert_eq!(
            infer_hello("Mozilla/5.0 (Windows NT 10.0; rv:135.0) Gecko/20100101 Firefox/135.0"),
            ClientHelloId::firefox_latest()
        );
        assert_eq!(
            infer_hello("Mozilla/5.0 AppleWebKit/537.36 Chrome/131.0.0.0 Safari/537.36 Edge/131"),
            ClientHelloId::edge_latest()
        );
        // Safari without Chrome -> iOS recipe
        assert_eq!(
            infer_hello("Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) Safari/604.1"),
            ClientHelloId::ios_latest()
        );
        // Desktop Chrome mentions Safari too; Chrome wins
        assert_eq!(
            infer_hello("Mozilla/5.0 AppleWebKit/537.36 Chrome/131.0.0.0 Safari/537.36"),
            ClientHelloId::chrome_latest()
        );
        assert_eq!(infer_hello("curl/8.0"), ClientHelloId::chrome_latest());
    }

    #[test]
    fn test_pin_origin_rewrites_ip_literals() {
        let client = Client::new(
            ClientHelloId::chrome_latest(),
            ClientConfig {
                server_name: Some("kh.google.com".into()),
                ..ClientConfig::default()
            },
        );

        let parsed = Url::parse("https://172.217.160.78/rt/earth/PlanetoidMetadata").unwrap();
        let (rewritten, pin) = client.pin_origin(&parsed);
        assert_eq!(rewritten.host_str(), Some("kh.google.com"));
        let (name, addr) = pin.unwrap();
        assert_eq!(name, "kh.google.com");
        assert_eq!(addr.to_string(), "172.217.160.78:443");

        let parsed6 = Url::parse("https://[2404:6800:4008:c07::5e]/x").unwrap();
        let (_, pin6) = client.pin_origin(&parsed6);
        assert_eq!(pin6.unwrap().1.port(), 443);
    }

    #[test]
    fn test_pin_origin_leaves_domains_alone() {
        let client = Client::new(
            ClientHelloId::chrome_latest(),
            ClientConfig {
                server_name: Some("kh.google.com".into()),
                ..ClientConfig::default()
            },
        );
        let parsed = Url::parse("https://example.com/x").unwrap();
        let (rewritten, pin) = client.pin_origin(&parsed);
        assert_eq!(rewritten.host_str(), Some("example.com"));
        assert!(pin.is_none());
    }

    #[test]
    fn test_build_header_map_host_override() {
        let options = RequestOptions {
            headers: HashMap::from([("Accept".to_string(), "application/json".to_string())]),
            host: Some("kh.google.com".to_string()),
            body: None,
        };
        let map = build_header_map(&options).unwrap();
        assert_eq!(map.get(HOST).unwrap(), "kh.google.com");
        assert_eq!(map.get("accept").unwrap(), "application/json");
    }

    #[test]
    fn test_build_header_map_rejects_bad_names() {
        let options = RequestOptions {
            headers: HashMap::from([("bad header\n".to_string(), "v".to_string())]),
            ..RequestOptions::default()
        };
        assert!(matches!(
            build_header_map(&options),
            Err(EngineError::InvalidHeader(_))
        ));
    }
}
