//! Connection-pool manager: one warm client per remote IP.
//!
//! A pure connection cache. Reputation decisions live elsewhere; this type
//! only materializes clients (lazily establishing TLS on first real
//! request so HTTP/2 session state is shared afterwards) and remembers when
//! an IP last answered 200.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, RwLock};
use std::time::Instant;

use crate::client::{Client, ClientConfig};
use crate::error_handling::ConnPoolError;
use crate::fingerprint::ClientHelloId;

struct PoolState {
    clients: HashMap<String, Arc<Client>>,
    last_ok: HashMap<String, Instant>,
}

/// Cache of per-remote-IP clients sharing one fingerprint and base config.
///
/// The base config's `server_name` is expected to be pinned to the logical
/// hostname so every cached client decouples SNI from the direct-IP wire
/// target.
pub struct ConnPoolManager {
    hello: ClientHelloId,
    base: RwLock<ClientConfig>,
    state: RwLock<PoolState>,
}

impl ConnPoolManager {
    /// Creates a manager building clients from `hello` and `base`.
    pub fn new(hello: ClientHelloId, base: ClientConfig) -> Self {
        ConnPoolManager {
            hello,
            base: RwLock::new(base),
            state: RwLock::new(PoolState {
                clients: HashMap::new(),
                last_ok: HashMap::new(),
            }),
        }
    }

    /// Materializes a client for every IP that does not have one yet.
    ///
    /// No network I/O happens here; the TLS session is established by the
    /// first real request through each client.
    pub fn warm_up<I, S>(&self, remote_ips: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let base = self.base.read().expect("conn pool config poisoned").clone();
        let mut state = self.state.write().expect("conn pool state poisoned");
        for ip in remote_ips {
            let ip = ip.as_ref();
            if state.clients.contains_key(ip) {
                continue;
            }
            state
                .clients
                .insert(ip.to_string(), Arc::new(Client::new(self.hello, base.clone())));
        }
    }

    /// The cached client for `remote_ip`, if one has been warmed up.
    pub fn get(&self, remote_ip: &str) -> Option<Arc<Client>> {
        self.state
            .read()
            .expect("conn pool state poisoned")
            .clients
            .get(remote_ip)
            .cloned()
    }

    /// Number of cached clients.
    pub fn len(&self) -> usize {
        self.state
            .read()
            .expect("conn pool state poisoned")
            .clients
            .len()
    }

    /// True when no client has been warmed up yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Records the outcome of a request through `remote_ip`. Only a clean
    /// 200 updates the last-success timestamp.
    pub fn mark_result(&self, remote_ip: &str, status: u16, ok: bool) {
        if ok && status == 200 {
            self.state
                .write()
                .expect("conn pool state poisoned")
                .last_ok
                .insert(remote_ip.to_string(), Instant::now());
        }
    }

    /// When `remote_ip` last answered 200 through this pool.
    pub fn last_success(&self, remote_ip: &str) -> Option<Instant> {
        self.state
            .read()
            .expect("conn pool state poisoned")
            .last_ok
            .get(remote_ip)
            .copied()
    }

    /// Binds a local source address for clients created by subsequent
    /// `warm_up` calls. Existing clients are unaffected.
    ///
    /// # Errors
    ///
    /// [`ConnPoolError::InvalidSourceAddress`] when `ip` is not a valid
    /// IPv4/IPv6 address.
    pub fn bind_local_source(&self, ip: &str) -> Result<(), ConnPoolError> {
        let parsed: IpAddr = ip
            .parse()
            .map_err(|_| ConnPoolError::InvalidSourceAddress(ip.to_string()))?;
        self.base
            .write()
            .expect("conn pool config poisoned")
            .local_ip = Some(parsed);
        Ok(())
    }
}
