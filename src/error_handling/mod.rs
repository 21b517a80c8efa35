//! Error type definitions.
//!
//! One enum per subsystem. Engine errors surface transport/input problems;
//! protocol-level outcomes (a 403, a 500) are *not* errors — they come back
//! as regular responses and feed the reputation map instead.

use std::time::Duration;

use thiserror::Error;

/// Errors produced by the TLS-mimicking HTTP engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The target URL could not be parsed or has no host.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The configured proxy uses a scheme other than http(s) or socks5.
    #[error("unsupported proxy scheme: {0}")]
    UnsupportedProxy(String),

    /// The request exceeded the transport deadline.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// A header name or value could not be encoded.
    #[error("invalid header {0:?}")]
    InvalidHeader(String),

    /// TCP/TLS/proxy/transport failure from the underlying client.
    #[error("transport error: {0}")]
    Transport(#[from] wreq::Error),
}

/// Errors produced by the IP-pool store and its sync protocol.
#[derive(Error, Debug)]
pub enum PoolError {
    /// The host is not present in the synced directory.
    #[error("host not found in directory: {0}")]
    HostNotFound(String),

    /// The directory lists no simple pool for this host.
    #[error("no simple pool published for host: {0}")]
    PoolUnavailable(String),

    /// The directory lists no detail pool for this host.
    #[error("no detail pool published for host: {0}")]
    DetailUnavailable(String),

    /// No pool data has been synced or loaded for this host yet.
    #[error("no pool data for host {0}; sync it first")]
    PoolMissing(String),

    /// No detail data has been synced or loaded for this host yet.
    #[error("no detail data for host {0}; sync it first")]
    DetailMissing(String),

    /// The requested IP is not in the host's detail pool.
    #[error("ip {ip} not found in detail pool for {host}")]
    IpNotFound {
        /// Hostname whose detail pool was consulted.
        host: String,
        /// The address that was looked up.
        ip: String,
    },

    /// The host has no usable addresses at all.
    #[error("host {0} has no usable addresses")]
    NoAddresses(String),

    /// The upstream directory answered with a non-200 status.
    #[error("upstream returned HTTP {0}")]
    UpstreamStatus(u16),

    /// Sync was requested while offline mode is active.
    #[error("offline mode is active")]
    Offline,

    /// `start_auto_sync` was called while a sync timer is already running.
    #[error("auto-sync is already running")]
    AutoSyncRunning,

    /// Upstream or on-disk JSON failed to parse.
    #[error("JSON decode error: {0}")]
    Json(#[from] serde_json::Error),

    /// Local file read/write failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport failure while talking to the upstream directory.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Errors produced by the fingerprint catalogue.
#[derive(Error, Debug)]
pub enum CatalogueError {
    /// No profile carries the requested name.
    #[error("fingerprint profile not found: {0}")]
    ProfileNotFound(String),

    /// A random selection was requested over an empty filter result.
    #[error("no profiles match {0}")]
    EmptySelection(String),
}

/// Errors produced by the connection-pool manager.
#[derive(Error, Debug)]
pub enum ConnPoolError {
    /// The source address passed to `bind_local_source` is not an IP.
    #[error("invalid local source address: {0}")]
    InvalidSourceAddress(String),
}

/// Error initializing the logger.
#[derive(Error, Debug)]
#[error("logger initialization error: {0}")]
pub struct LoggerError(#[from] log::SetLoggerError);
