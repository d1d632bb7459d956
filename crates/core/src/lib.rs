//! Core types and shared functionality for offcache.
//!
//! This crate provides:
//! - Disk-backed content store keyed by URL hash
//! - Request/response model shared by the fetcher and the engine
//! - Connectivity oracle and event source abstractions
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod model;

pub use cache::{CacheKey, ContentStore, StoredEntry};
pub use config::{AppConfig, CachePolicy, ConfigError};
pub use connectivity::{
    ConnectivityEvent, ConnectivityEventSource, ConnectivityOracle, ManualConnectivity, Subscription, SubscriptionId,
};
pub use error::Error;
pub use model::{CachedResponse, RequestDescriptor, ResponseSource};
