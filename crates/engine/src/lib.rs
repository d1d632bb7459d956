//! Request interception for offcache.
//!
//! The [`InterceptionEngine`] sits between a rendering host and the network.
//! For every resource request it decides whether to fetch, serve from the
//! content store, or both, and keeps the store populated from successful
//! fetches. It also turns connectivity transitions into advisory directives
//! for the host's own transport cache.

pub mod directive;
pub mod engine;
pub mod state;

pub use directive::{Advisory, ConnectivityWatch, HostDirective, TransportCacheMode};
pub use engine::{EngineError, InterceptionEngine};
pub use state::{EngineState, OperatingMode};
