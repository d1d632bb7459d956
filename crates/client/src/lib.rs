//! Client code for offcache.
//!
//! This crate provides the outbound HTTP half of the cache: a `Fetcher` seam
//! used by the interception engine, a reqwest-backed implementation, and
//! media type resolution for responses that do not declare one.

pub mod fetch;

pub use fetch::{FetchConfig, FetchResult, Fetcher, HttpFetcher, TransportError, media_type};
