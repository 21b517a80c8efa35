//! stealthpool: fingerprint-masquerading HTTP fetcher with a geo-indexed
//! IP pool and per-IP health-tracked dispatch.
//!
//! The crate retrieves resources from a target hostname across a large set
//! of candidate origin IPs while presenting a TLS ClientHello
//! indistinguishable from a real browser, keeping warm long-lived
//! connections per IP, steering traffic away from IPs that answer 403,
//! and redistributing failed requests across the remaining healthy IPs.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use stealthpool::{
//!     DispatchSpec, Dispatcher, FingerprintCatalogue, PoolStore, ReputationMap,
//! };
//!
//! # #[tokio::main]
//! # async fn main() {
//! let store = Arc::new(PoolStore::open("http://directory.example:9005", ""));
//! store.sync_all().await.ok();
//!
//! let reputation = Arc::new(ReputationMap::new());
//! let catalogue = FingerprintCatalogue::new();
//! let profile = catalogue.random_profile();
//!
//! let dispatcher = Dispatcher::new(Arc::clone(&store), Arc::clone(&reputation));
//! let report = dispatcher
//!     .run(
//!         &profile,
//!         DispatchSpec::new("kh.google.com", "rt/earth/PlanetoidMetadata", 100),
//!     )
//!     .await;
//! println!("{} ok, {} failed", report.succeeded, report.failed);
//! # }
//! ```
//!
//! # Requirements
//!
//! The crate requires a Tokio runtime; call library functions from within
//! an async context.

#![warn(missing_docs)]

pub mod analyzer;
pub mod client;
pub mod config;
pub mod connpool;
pub mod dispatch;
pub mod error_handling;
pub mod fingerprint;
pub mod health;
pub mod initialization;
pub mod nodemeta;
pub mod pool;
pub mod reputation;
mod utils;

pub use analyzer::{PoolAnalysis, PoolAnalyzer, SearchCriteria};
pub use client::{Client, ClientConfig, Method, RequestOptions, Response};
pub use config::{LogFormat, LogLevel};
pub use connpool::ConnPoolManager;
pub use dispatch::{DispatchReport, DispatchSpec, Dispatcher, GeoLatency, TaskOutcome};
pub use error_handling::{CatalogueError, ConnPoolError, EngineError, PoolError};
pub use fingerprint::{ClientHelloId, FingerprintCatalogue, FingerprintProfile};
pub use health::{
    rehabilitate_host, spawn_rehabilitation, warm_host, AddressFamily, ProbeSpec, RehabSummary,
    WarmupSummary,
};
pub use pool::{
    sanitize_host, DetailPool, HostRecord, IpGeoRecord, IpPool, LocalDataInfo, PoolStats,
    PoolStore,
};
pub use reputation::ReputationMap;
pub use utils::direct_url;
