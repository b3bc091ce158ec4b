//! Tiered rate limiting ports and application service.
//!
//! Every tier keeps its own fixed-window counter per client key. Counter
//! stores are expected to increment atomically; the service only decides.

mod ports;
mod service;

pub use ports::{AttemptInfo, RateLimitRepository};
pub use service::RateLimitService;
