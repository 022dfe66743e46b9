pub mod cache;
pub mod cancel;
pub mod compare;
pub mod endpoints;
pub mod error;
pub mod pipeline;
pub mod scoring;
pub mod scout;
pub mod seeds;
pub mod throttle;
pub mod timing;
pub mod transport;

pub use cache::{CacheStatus, CacheStore, MemoryCacheStore, Payload, PgCacheStore};
pub use cancel::{CancelToken, CancellationRegistry};
pub use endpoints::{EndpointPool, PoolStatus};
pub use error::{AcquireError, Result};
pub use scout::{Scout, ScoutSettings};
pub use seeds::Seeds;
pub use throttle::{PacingConfig, RateGate};
pub use timing::{LogTimingSink, TimingSink};
pub use transport::RotatingEndpoints;
