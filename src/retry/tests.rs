//! Tests for the backoff schedule.

use std::time::Duration;

use rstest::rstest;

use super::Backoff;

#[rstest]
#[case(0, 1_000_000)]
#[case(1, 1_500_000)]
#[case(2, 2_250_000)]
#[case(3, 3_375_000)]
#[case(4, 5_062_500)]
fn default_schedule_matches_expected_sequence(#[case] attempt: u32, #[case] micros: u64) {
    let backoff = Backoff::default();
    assert_eq!(backoff.delay(attempt), Duration::from_micros(micros));
}

#[test]
fn delay_never_exceeds_cap() {
    let backoff = Backoff::default();
    for attempt in 0..64 {
        assert!(
            backoff.delay(attempt) <= Duration::from_secs(10),
            "attempt {attempt} exceeded the cap"
        );
    }
}

#[test]
fn schedule_is_monotonically_non_decreasing() {
    let backoff = Backoff::default();
    let mut previous = Duration::ZERO;
    for attempt in 0..32 {
        let delay = backoff.delay(attempt);
        assert!(
            delay >= previous,
            "attempt {attempt} regressed: {delay:?} < {previous:?}"
        );
        previous = delay;
    }
}

#[test]
fn schedule_is_constant_after_reaching_cap() {
    let backoff = Backoff::default();
    assert_eq!(backoff.delay(6), Duration::from_secs(10));
    assert_eq!(backoff.delay(7), Duration::from_secs(10));
    assert_eq!(backoff.delay(u32::MAX), Duration::from_secs(10));
}

#[test]
fn custom_parameters_drive_the_schedule() {
    let backoff = Backoff::new(
        Duration::from_millis(10),
        Duration::from_millis(35),
        2.0,
    );
    assert_eq!(backoff.delay(0), Duration::from_millis(10));
    assert_eq!(backoff.delay(1), Duration::from_millis(20));
    assert_eq!(backoff.delay(2), Duration::from_millis(35));
}
