//! Core EWMA estimator implementations.
//!
//! Each estimator is a thread-safe, low-level building block meant to sit
//! behind whatever metrics or admission-control surface the application
//! provides.
//!
//! # Available Estimators
//!
//! - **[`EwmaRateCore`]** - Decaying event-rate estimate; idle time decays it to zero
//! - **[`EwmaCore`]** - Decaying average of sampled values; idle time holds the level
//!
//! # Estimator Comparison
//!
//! | Estimator | Tracks | Input | Idle Behavior | Use Case |
//! |-----------|--------|-------|---------------|----------|
//! | Rate | events/second | event + weight | decays to 0 | request/packet/byte rates |
//! | Level | value average | sampled value | holds last average | latency, queue depth |
//!
//! # Thread Safety
//!
//! Both estimators take `&self`, guard their state with an internal mutex,
//! and hold it only for the few float operations of a single update or
//! read. Wrap an instance in `Arc` to share it between producer threads
//! and a reporting thread.

pub mod ewma_core;
pub use ewma_core::EwmaCore;
pub use ewma_core::EwmaCoreConfig;

pub mod ewma_rate_core;
pub use ewma_rate_core::EwmaRateCore;
pub use ewma_rate_core::EwmaRateCoreConfig;
