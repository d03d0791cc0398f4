//! Continuous-time EWMA estimation for Rust applications.
//!
//! This library provides exponentially-weighted moving-average estimators
//! driven by real timestamps rather than fixed-interval sampling. All
//! implementations are thread-safe and designed for sparse, bursty, or
//! idle event streams: request rates, packet rates, byte throughput.
//!
//! # Quick Start
//!
//! ```rust
//! use std::time::{Duration, Instant};
//! use ewma_rate_core::estimators::EwmaRateCore;
//!
//! // Track events per second, forgetting the past with a 1 s half-life
//! let start = Instant::now();
//! let rate = EwmaRateCore::new_at(Duration::from_secs(1), start);
//!
//! // One event per second converges toward 1.0 events/s
//! rate.record_one_at(start + Duration::from_secs(1));
//! rate.record_one_at(start + Duration::from_secs(2));
//!
//! let estimate = rate.current_at(start + Duration::from_secs(2));
//! assert!((estimate - 0.75).abs() < 1e-9);
//! ```
//!
//! # Available Estimators
//!
//! ## [Rate](estimators::EwmaRateCore)
//! Decaying estimate of event *rate* (events per second, optionally
//! weighted). Idle time drags the estimate toward zero:
//! ```rust
//! # use std::time::Duration;
//! # use ewma_rate_core::estimators::EwmaRateCore;
//! let rate = EwmaRateCore::new(Duration::from_secs(30));
//! rate.record_one_now();
//! ```
//!
//! ## [Level](estimators::EwmaCore)
//! Decaying average of sampled *values* (latency, queue depth). Idle time
//! holds the level; new samples pull it toward themselves:
//! ```rust
//! # use std::time::Duration;
//! # use ewma_rate_core::estimators::EwmaCore;
//! let latency = EwmaCore::new(Duration::from_secs(5));
//! latency.update_now(12.5);
//! ```
//!
//! # Core Concepts
//!
//! ## Time Representation
//! Every estimator has an explicit-timestamp API (`record_at`,
//! `current_at`, `update_at`) taking [`std::time::Instant`], plus `_now`
//! conveniences that bind the current wall clock. Explicit timestamps keep
//! tests deterministic and let callers batch events under one clock read.
//! Callers must supply non-decreasing timestamps per instance; a timestamp
//! behind the last recorded one is tolerated by clamping the elapsed
//! interval to zero, never by decaying backward.
//!
//! ## Reads Are Pure
//! Querying projects the stored value to the query time without touching
//! estimator state. Polling an estimator ten times or ten thousand times
//! per second yields the same trajectory.
//!
//! ## Thread Safety
//! Estimators take `&self` and guard their state pair with an internal
//! mutex held only for a handful of float operations. Share one instance
//! across threads with `Arc`.
//!
//! ## Error Handling
//! Recording and querying cannot fail. The only rejectable input is a zero
//! half-life at construction: `new` panics (fail fast), [`try_new`]
//! returns [`EstimatorError::ZeroHalfLife`] for config-driven callers.
//!
//! [`try_new`]: estimators::EwmaRateCore::try_new

use thiserror::Error;

pub mod estimators;

/// Error type for estimator construction.
///
/// Recording and querying never fail; only configuration can be invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EstimatorError {
    /// The half-life was zero.
    ///
    /// A zero half-life makes the decay factor `2^(-Δt / half_life)`
    /// degenerate, so it is rejected at construction. Negative half-lives
    /// cannot be expressed: [`std::time::Duration`] is unsigned.
    #[error("half-life must be greater than zero")]
    ZeroHalfLife,
}

/// Result type for fallible estimator construction.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use ewma_rate_core::{EstimatorError, EstimatorResult};
/// use ewma_rate_core::estimators::EwmaRateCore;
///
/// let ok: EstimatorResult<EwmaRateCore> = EwmaRateCore::try_new(Duration::from_secs(1));
/// assert!(ok.is_ok());
///
/// let bad: EstimatorResult<EwmaRateCore> = EwmaRateCore::try_new(Duration::ZERO);
/// assert_eq!(bad.unwrap_err(), EstimatorError::ZeroHalfLife);
/// ```
pub type EstimatorResult<T> = Result<T, EstimatorError>;
