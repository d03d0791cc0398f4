use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::trace;

use crate::{EstimatorError, EstimatorResult};

/// Time-aware EWMA of irregularly sampled values.
///
/// Each sample pulls the average toward itself with weight
/// `alpha = 1 - 2^(-Δt / half_life)`, so a sample arriving after a long
/// gap moves the average more than one arriving moments after the last.
/// Unlike [`EwmaRateCore`](super::EwmaRateCore), idle time does not drag
/// the average anywhere: a level holds until the next sample.
///
/// # Example
///
/// ```rust
/// use std::time::{Duration, Instant};
/// use ewma_rate_core::estimators::EwmaCore;
///
/// let start = Instant::now();
/// let latency_ms = EwmaCore::new_at(Duration::from_secs(1), start);
///
/// latency_ms.update_at(start, 8.0); // first sample seeds the average
/// let v = latency_ms.update_at(start + Duration::from_secs(1), 0.0);
///
/// // One half-life later, the new sample carries weight 0.5
/// assert!((v - 4.0).abs() < 1e-9);
/// ```
#[derive(Debug)]
pub struct EwmaCore {
    half_life: Duration,
    /// Internal state protected by mutex for thread safety
    state: Mutex<EwmaCoreState>,
}

#[derive(Debug)]
struct EwmaCoreState {
    /// Last blended average, `None` until the first sample
    average: Option<f64>,
    /// Timestamp of the last mutation
    anchor: Instant,
}

impl EwmaCore {
    /// Creates a new averager with the given half-life. No average exists
    /// until the first sample.
    ///
    /// # Panics
    ///
    /// Panics if `half_life` is zero. Use [`try_new`](Self::try_new) for a
    /// non-panicking variant.
    pub fn new(half_life: Duration) -> Self {
        Self::new_at(half_life, Instant::now())
    }

    /// Creates a new averager anchored at an explicit start time.
    ///
    /// # Panics
    ///
    /// Panics if `half_life` is zero.
    pub fn new_at(half_life: Duration, start: Instant) -> Self {
        assert!(!half_life.is_zero(), "half-life must be greater than zero");

        EwmaCore {
            half_life,
            state: Mutex::new(EwmaCoreState {
                average: None,
                anchor: start,
            }),
        }
    }

    /// Fallible construction for config-driven callers.
    pub fn try_new(half_life: Duration) -> EstimatorResult<Self> {
        if half_life.is_zero() {
            return Err(EstimatorError::ZeroHalfLife);
        }
        Ok(Self::new(half_life))
    }

    /// Returns the configured half-life.
    pub fn half_life(&self) -> Duration {
        self.half_life
    }

    /// Blends a sample observed at time `t` into the average and returns
    /// the updated average.
    ///
    /// The first sample seeds the average directly. A sample carrying the
    /// same timestamp as the previous mutation, or an earlier one, has
    /// `alpha = 0` and leaves the average untouched; the anchor never
    /// moves backward.
    #[inline(always)]
    pub fn update_at(&self, t: Instant, sample: f64) -> f64 {
        let mut state = self.lock_state();

        let average = match state.average {
            // First sample seeds the average
            None => sample,
            Some(average) => {
                let dt = match t.checked_duration_since(state.anchor) {
                    Some(dt) => dt,
                    None => {
                        trace!("update timestamp predates anchor, clamping interval to zero");
                        Duration::ZERO
                    }
                };
                let alpha = 1.0 - self.decay_factor(dt.as_secs_f64());
                sample.mul_add(alpha, average * (1.0 - alpha))
            }
        };

        state.average = Some(average);
        if t > state.anchor {
            state.anchor = t;
        }
        average
    }

    /// Overwrites the average and re-anchors at `t`.
    pub fn set_at(&self, t: Instant, value: f64) {
        let mut state = self.lock_state();
        state.average = Some(value);
        state.anchor = t;
    }

    /// Returns the last blended average, or `None` before the first
    /// sample. Reading does not project or mutate anything.
    pub fn average(&self) -> Option<f64> {
        self.lock_state().average
    }

    /// Blends a sample at the current wall-clock time. See
    /// [`update_at`](Self::update_at).
    pub fn update_now(&self, sample: f64) -> f64 {
        self.update_at(Instant::now(), sample)
    }

    /// Fraction of the previous average surviving after `dt_secs` seconds.
    #[inline(always)]
    fn decay_factor(&self, dt_secs: f64) -> f64 {
        (-dt_secs / self.half_life.as_secs_f64()).exp2()
    }

    fn lock_state(&self) -> MutexGuard<'_, EwmaCoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Configuration structure for creating an `EwmaCore` averager.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EwmaCoreConfig {
    /// Interval after which a sample's influence on the average halves.
    pub half_life: Duration,
}

impl EwmaCoreConfig {
    /// Creates a new configuration instance.
    pub fn new(half_life: Duration) -> Self {
        Self { half_life }
    }
}

impl From<EwmaCoreConfig> for EwmaCore {
    /// Converts an `EwmaCoreConfig` into an `EwmaCore` instance.
    ///
    /// # Panics
    /// Panics if the configured half-life is zero; deserialized configs
    /// should go through [`EwmaCore::try_new`].
    #[inline(always)]
    fn from(config: EwmaCoreConfig) -> Self {
        EwmaCore::new(config.half_life)
    }
}
