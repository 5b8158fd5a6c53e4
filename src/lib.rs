//! Redis used as a cache.
//!
//! This crate talks to a Redis server over RESP and builds two small caches
//! on top of it:
//!
//! - [`cache::Cache`] stores values under random keys, reads them back with
//!   optional conversion, and records every call to its `store` method
//!   (count, inputs and outputs) in Redis itself
//! - [`web::PageCache`] caches fetched web pages for a few seconds and counts
//!   how often each URL was requested
//!
//! Both caches are written against the [`store::Store`] trait, implemented by
//! [`client::RedisClient`] and by the in-process
//! [`key_value_store::MemoryStore`].

pub mod cache;
pub mod client;
pub mod config;
pub mod connection;
pub mod key_value_store;
pub mod resp;
pub mod store;
pub mod web;

use tracing_subscriber::EnvFilter;

/// Installs the global `tracing` subscriber.
///
/// The filter comes from `RUST_LOG` and defaults to `info`. Calling this more
/// than once is harmless: later calls leave the first subscriber in place.
pub fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
