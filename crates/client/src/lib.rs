//! Taskdeck API client.
//!
//! - [`TaskdeckClient`]: typed calls against `/api/v1`, reading through a
//!   [`QueryCache`] and applying mutations optimistically.
//! - [`QueryCache`]: keyed cache with freshness flags and fetch generations.
//!   Optimistic writes are marked stale; failures roll back to the exact
//!   snapshot taken before the write.
//! - [`Debouncer`]: trailing-edge autosave that only saves the last value.
//! - [`Transport`]: the HTTP seam; [`HttpTransport`] is the reqwest one.

pub mod api;
pub mod cache;
pub mod config;
pub mod debounce;
pub mod error;

pub use api::{ApiRequest, HttpTransport, TaskdeckClient, Transport};
pub use cache::{CacheEntry, QueryCache, QueryKey};
pub use config::ClientConfig;
pub use debounce::Debouncer;
pub use error::ClientError;
