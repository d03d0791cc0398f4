use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::trace;

use crate::{EstimatorError, EstimatorResult};

/// Core implementation of a continuous-time EWMA rate estimator.
///
/// The estimator maintains a single decaying scalar: an estimate of event
/// rate in events per second (or weighted-events per second). Each
/// recorded event first decays the stored estimate by `2^(-Δt / half_life)`
/// for the elapsed interval `Δt`, then folds in the event's contribution
/// normalized by that interval. Querying projects the stored estimate to
/// the query time without mutating anything, so polling frequency never
/// affects the trajectory.
///
/// # Algorithm Behavior
///
/// - With no events, the estimate halves every `half_life` of idle time
/// - A steady train of unit events spaced `Δt` apart converges to `1/Δt`
///   events per second, independent of `Δt`
/// - A burst of many closely-spaced events and a single heavy event over
///   the same wall-clock window converge to comparable magnitudes; the
///   `(1 - d)/Δt` normalization makes this a rate, not a count
///
/// # Update Formula
///
/// For an event of weight `w` after elapsed interval `Δt > 0`:
///
/// ```text
/// d     = 2^(-Δt / half_life)
/// value = value * d + w * (1 - d) / Δt
/// ```
///
/// A zero-length interval has no defined instantaneous rate, so a second
/// event at the same timestamp folds its weight in undecayed.
///
/// # Example
///
/// ```rust
/// use std::time::{Duration, Instant};
/// use ewma_rate_core::estimators::EwmaRateCore;
///
/// let start = Instant::now();
/// let rate = EwmaRateCore::new_at(Duration::from_secs(1), start);
///
/// // Unit events one second apart converge toward 1 event/s
/// rate.record_one_at(start + Duration::from_secs(1));
/// rate.record_one_at(start + Duration::from_secs(2));
/// rate.record_one_at(start + Duration::from_secs(3));
///
/// let estimate = rate.current_at(start + Duration::from_secs(3));
/// assert!((estimate - 0.875).abs() < 1e-9);
/// ```
pub struct EwmaRateCore {
    /// Interval over which an unrefreshed estimate decays to half
    half_life: Duration,
    /// Internal state protected by mutex for thread safety
    state: Mutex<EwmaRateCoreState>,
}

/// Internal state of the rate estimator
struct EwmaRateCoreState {
    /// Current decaying rate estimate, in events per second
    value: f64,
    /// Timestamp of the last mutation, reference point for decay
    anchor: Instant,
}

impl EwmaRateCore {
    /// Creates a new rate estimator with the given half-life, anchored at
    /// the current wall-clock time with an estimate of zero.
    ///
    /// # Parameters
    ///
    /// * `half_life` - Interval over which an unrefreshed estimate decays
    ///   to half its magnitude
    ///
    /// # Panics
    ///
    /// Panics if `half_life` is zero. Use [`try_new`](Self::try_new) for a
    /// non-panicking variant.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::time::Duration;
    /// use ewma_rate_core::estimators::EwmaRateCore;
    ///
    /// let rate = EwmaRateCore::new(Duration::from_secs(30));
    /// assert_eq!(rate.current_now(), 0.0);
    /// ```
    pub fn new(half_life: Duration) -> Self {
        Self::new_at(half_life, Instant::now())
    }

    /// Creates a new rate estimator anchored at an explicit start time.
    ///
    /// The explicit anchor makes trajectories fully deterministic: decay
    /// for the first recorded event is measured from `start`, not from
    /// whenever the constructor happened to run.
    ///
    /// # Parameters
    ///
    /// * `half_life` - Interval over which an unrefreshed estimate decays
    ///   to half its magnitude
    /// * `start` - Initial anchor timestamp
    ///
    /// # Panics
    ///
    /// Panics if `half_life` is zero.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::time::{Duration, Instant};
    /// use ewma_rate_core::estimators::EwmaRateCore;
    ///
    /// let start = Instant::now();
    /// let rate = EwmaRateCore::new_at(Duration::from_secs(1), start);
    ///
    /// // A unit event after exactly one half-life contributes 0.5 events/s
    /// let v = rate.record_at(start + Duration::from_secs(1), 1.0);
    /// assert!((v - 0.5).abs() < 1e-9);
    /// ```
    pub fn new_at(half_life: Duration, start: Instant) -> Self {
        assert!(!half_life.is_zero(), "half-life must be greater than zero");

        EwmaRateCore {
            half_life,
            state: Mutex::new(EwmaRateCoreState {
                value: 0.0,
                anchor: start,
            }),
        }
    }

    /// Fallible construction for config-driven callers.
    ///
    /// # Returns
    ///
    /// * `Ok(estimator)` - Anchored at the current time with estimate zero
    /// * `Err(EstimatorError::ZeroHalfLife)` - If `half_life` is zero
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

    /// Records one event of magnitude `weight` observed at time `t`.
    ///
    /// The stored estimate is decayed for the interval since the last
    /// mutation, the event's normalized contribution is folded in, and the
    /// anchor advances to `t`.
    ///
    /// Timestamps must be non-decreasing per estimator. A `t` behind the
    /// current anchor is tolerated: the interval is clamped to zero, the
    /// weight folds in undecayed, and the anchor stays put rather than
    /// moving backward. Negative or non-finite weights are input misuse
    /// with undefined results; they are only caught by a `debug_assert!`.
    ///
    /// # Parameters
    ///
    /// * `t` - Timestamp of the event
    /// * `weight` - Magnitude of the event, `>= 0` (use 1.0 to count bare
    ///   occurrences, or see [`record_one_at`](Self::record_one_at))
    ///
    /// # Returns
    ///
    /// The updated rate estimate at time `t`, for convenience.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::time::{Duration, Instant};
    /// use ewma_rate_core::estimators::EwmaRateCore;
    ///
    /// let start = Instant::now();
    /// let bytes_per_sec = EwmaRateCore::new_at(Duration::from_secs(1), start);
    ///
    /// // 1500 bytes after one second: estimate is 750 B/s
    /// let v = bytes_per_sec.record_at(start + Duration::from_secs(1), 1500.0);
    /// assert!((v - 750.0).abs() < 1e-6);
    /// ```
    #[inline(always)]
    pub fn record_at(&self, t: Instant, weight: f64) -> f64 {
        debug_assert!(
            weight.is_finite() && weight >= 0.0,
            "weight must be finite and non-negative, got {}",
            weight
        );

        let mut state = self.lock_state();

        match t.checked_duration_since(state.anchor) {
            Some(dt) if !dt.is_zero() => {
                let dt_secs = dt.as_secs_f64();
                let d = self.decay_factor(dt_secs);
                // Normalizing the additive term by dt makes one event's
                // contribution independent of how densely events are packed.
                state.value = state.value * d + weight * (1.0 - d) / dt_secs;
                state.anchor = t;
            }
            Some(_) => {
                // Same timestamp as the last mutation: (1 - d)/dt has no
                // value at dt = 0, fold the weight in undecayed.
                state.value += weight;
            }
            None => {
                // Timestamp behind the anchor. Clamp to a zero-length
                // interval and keep the anchor; decay never runs backward.
                trace!("record timestamp predates anchor, clamping interval to zero");
                state.value += weight;
            }
        }

        state.value
    }

    /// Records one unweighted event at time `t`.
    ///
    /// Equivalent to `record_at(t, 1.0)`; counts bare occurrences.
    ///
    /// # Returns
    ///
    /// The updated rate estimate at time `t`.
    #[inline(always)]
    pub fn record_one_at(&self, t: Instant) -> f64 {
        self.record_at(t, 1.0)
    }

    /// Returns the rate estimate projected to time `t` without mutating
    /// any state.
    ///
    /// Projection applies decay from the anchor to `t`; it never advances
    /// the anchor, so repeated queries do not compound decay and polling
    /// frequency cannot affect the trajectory. A `t` at or before the
    /// anchor returns the stored estimate unmodified, which tolerates
    /// clock jitter between recording and reporting threads.
    ///
    /// # Parameters
    ///
    /// * `t` - Timestamp to project the estimate to
    ///
    /// # Returns
    ///
    /// The decayed rate estimate at `t`, always `>= 0` for non-negative
    /// recorded weights.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::time::{Duration, Instant};
    /// use ewma_rate_core::estimators::EwmaRateCore;
    ///
    /// let start = Instant::now();
    /// let rate = EwmaRateCore::new_at(Duration::from_secs(2), start);
    /// rate.set_at(start, 8.0);
    ///
    /// // One half-life later the projection is half the stored value
    /// let projected = rate.current_at(start + Duration::from_secs(2));
    /// assert!((projected - 4.0).abs() < 1e-9);
    ///
    /// // Reads are pure: asking again changes nothing
    /// assert_eq!(rate.current_at(start + Duration::from_secs(2)), projected);
    /// ```
    #[inline(always)]
    pub fn current_at(&self, t: Instant) -> f64 {
        let state = self.lock_state();
        let dt = t.saturating_duration_since(state.anchor);
        state.value * self.decay_factor(dt.as_secs_f64())
    }

    /// Overwrites the estimate and re-anchors decay at `t`.
    ///
    /// Useful for seeding a known starting value (for example when
    /// restoring a counter) and for driving deterministic tests.
    ///
    /// # Parameters
    ///
    /// * `t` - New anchor timestamp
    /// * `value` - New rate estimate, in events per second
    pub fn set_at(&self, t: Instant, value: f64) {
        let mut state = self.lock_state();
        state.value = value;
        state.anchor = t;
    }

    /// Records one event of magnitude `weight` at the current wall-clock
    /// time. See [`record_at`](Self::record_at).
    pub fn record_now(&self, weight: f64) -> f64 {
        self.record_at(Instant::now(), weight)
    }

    /// Records one unweighted event at the current wall-clock time.
    pub fn record_one_now(&self) -> f64 {
        self.record_at(Instant::now(), 1.0)
    }

    /// Returns the rate estimate projected to the current wall-clock time.
    /// See [`current_at`](Self::current_at).
    pub fn current_now(&self) -> f64 {
        self.current_at(Instant::now())
    }

    /// Fraction of the estimate surviving after `dt_secs` idle seconds.
    #[inline(always)]
    fn decay_factor(&self, dt_secs: f64) -> f64 {
        (-dt_secs / self.half_life.as_secs_f64()).exp2()
    }

    /// Locks the state pair, absorbing poisoning.
    ///
    /// Nothing between the field writes of an update can panic, so a
    /// poisoned lock still holds a consistent `(value, anchor)` pair.
    fn lock_state(&self) -> MutexGuard<'_, EwmaRateCoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Configuration structure for creating an `EwmaRateCore` estimator.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EwmaRateCoreConfig {
    /// Interval over which an unrefreshed estimate decays to half.
    pub half_life: Duration,
}

impl EwmaRateCoreConfig {
    /// Creates a new configuration instance.
    pub fn new(half_life: Duration) -> Self {
        Self { half_life }
    }
}

impl From<EwmaRateCoreConfig> for EwmaRateCore {
    /// Converts an `EwmaRateCoreConfig` into an `EwmaRateCore` instance.
    ///
    /// # Panics
    /// This method will panic if the configured half-life is zero. It is
    /// intended for use with validated or hardcoded input; deserialized
    /// configs should go through [`EwmaRateCore::try_new`].
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::time::Duration;
    /// use ewma_rate_core::estimators::{EwmaRateCore, EwmaRateCoreConfig};
    ///
    /// let rate: EwmaRateCore = EwmaRateCoreConfig {
    ///     half_life: Duration::from_secs(10),
    /// }.into();
    /// ```
    #[inline(always)]
    fn from(config: EwmaRateCoreConfig) -> Self {
        EwmaRateCore::new(config.half_life)
    }
}
