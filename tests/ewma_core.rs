use std::time::{Duration, Instant};

use approx::assert_abs_diff_eq;
use ewma_rate_core::estimators::{EwmaCore, EwmaCoreConfig};
use ewma_rate_core::EstimatorError;

const HALF_LIFE: Duration = Duration::from_secs(1);

#[test]
#[should_panic(expected = "half-life must be greater than zero")]
fn test_new_with_zero_half_life() {
    EwmaCore::new(Duration::ZERO);
}

#[test]
fn test_try_new_rejects_zero_half_life() {
    assert_eq!(
        EwmaCore::try_new(Duration::ZERO).unwrap_err(),
        EstimatorError::ZeroHalfLife
    );
}

#[test]
fn test_config_into() {
    let avg: EwmaCore = EwmaCoreConfig::new(Duration::from_secs(5)).into();
    assert_eq!(avg.half_life(), Duration::from_secs(5));
}

#[test]
fn test_no_average_before_first_sample() {
    let avg = EwmaCore::new(HALF_LIFE);
    assert_eq!(avg.average(), None);
}

#[test]
fn test_first_sample_seeds_average() {
    let t0 = Instant::now();
    let avg = EwmaCore::new_at(HALF_LIFE, t0);

    assert_eq!(avg.update_at(t0 + Duration::from_secs(7), 12.5), 12.5);
    assert_eq!(avg.average(), Some(12.5));
}

#[test]
fn test_half_life_blend() {
    let t0 = Instant::now();
    let avg = EwmaCore::new_at(HALF_LIFE, t0);
    avg.update_at(t0, 8.0);

    // After one half-life the new sample carries weight 0.5:
    // 8 * 0.5 + 0 * 0.5 = 4
    let v = avg.update_at(t0 + Duration::from_secs(1), 0.0);
    assert_abs_diff_eq!(v, 4.0, epsilon = 1e-9);

    // And again: 4 * 0.5 + 0 * 0.5 = 2
    let v = avg.update_at(t0 + Duration::from_secs(2), 0.0);
    assert_abs_diff_eq!(v, 2.0, epsilon = 1e-9);
}

#[test]
fn test_fractional_interval_blend() {
    let t0 = Instant::now();
    let avg = EwmaCore::new_at(HALF_LIFE, t0);
    avg.update_at(t0, 8.0);

    // Half a half-life: the old average keeps weight 2^-0.5
    let v = avg.update_at(t0 + Duration::from_millis(500), 0.0);
    assert_abs_diff_eq!(v, 8.0 * 0.5f64.sqrt(), epsilon = 1e-9);
}

#[test]
fn test_idle_holds_level() {
    let t0 = Instant::now();
    let avg = EwmaCore::new_at(HALF_LIFE, t0);
    avg.update_at(t0, 6.0);

    // A level is not a rate: reading after any amount of idle time
    // reports the last blended average, undecayed
    assert_eq!(avg.average(), Some(6.0));
    assert_eq!(avg.average(), Some(6.0));
}

#[test]
fn test_same_timestamp_sample_leaves_average() {
    let t0 = Instant::now();
    let avg = EwmaCore::new_at(HALF_LIFE, t0);
    avg.update_at(t0 + Duration::from_secs(1), 8.0);

    // Zero interval means zero blend weight
    let v = avg.update_at(t0 + Duration::from_secs(1), 100.0);
    assert_eq!(v, 8.0);
}

#[test]
fn test_sample_behind_anchor_leaves_average() {
    let t0 = Instant::now();
    let avg = EwmaCore::new_at(HALF_LIFE, t0);
    avg.update_at(t0 + Duration::from_secs(2), 8.0);

    // Regressed timestamp clamps to a zero interval
    let v = avg.update_at(t0 + Duration::from_secs(1), 100.0);
    assert_eq!(v, 8.0);

    // And the anchor did not move backward: a sample one second after the
    // original still blends at weight 0.5
    let v = avg.update_at(t0 + Duration::from_secs(3), 0.0);
    assert_abs_diff_eq!(v, 4.0, epsilon = 1e-9);
}

#[test]
fn test_set_at_overwrites() {
    let t0 = Instant::now();
    let avg = EwmaCore::new_at(HALF_LIFE, t0);
    avg.update_at(t0, 8.0);

    let t5 = t0 + Duration::from_secs(5);
    avg.set_at(t5, 1.0);
    assert_eq!(avg.average(), Some(1.0));

    // Blending resumes from the new anchor
    let v = avg.update_at(t5 + Duration::from_secs(1), 0.0);
    assert_abs_diff_eq!(v, 0.5, epsilon = 1e-9);
}

#[test]
fn test_update_now_seeds() {
    let avg = EwmaCore::new(HALF_LIFE);
    assert_eq!(avg.update_now(5.0), 5.0);
    assert_eq!(avg.average(), Some(5.0));
}
