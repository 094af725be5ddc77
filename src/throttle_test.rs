use super::*;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[test]
fn first_call_is_always_accepted() {
    let mut throttle = Throttle::new(ms(50));
    assert!(throttle.ready(Instant::now()));
}

#[test]
fn calls_within_interval_are_dropped() {
    let mut throttle = Throttle::new(ms(50));
    let t0 = Instant::now();
    assert!(throttle.ready(t0));
    assert!(!throttle.ready(t0 + ms(10)));
    assert!(!throttle.ready(t0 + ms(49)));
    assert!(throttle.ready(t0 + ms(50)));
    // The window restarts from the last accepted call, not the dropped ones.
    assert!(!throttle.ready(t0 + ms(99)));
    assert!(throttle.ready(t0 + ms(100)));
}

#[test]
fn reset_lets_next_call_through() {
    let mut throttle = Throttle::new(ms(50));
    let t0 = Instant::now();
    assert!(throttle.ready(t0));
    throttle.reset();
    assert!(throttle.ready(t0 + ms(1)));
}

#[test]
fn earlier_instant_is_not_accepted() {
    let mut throttle = Throttle::new(ms(50));
    let t0 = Instant::now() + ms(200);
    assert!(throttle.ready(t0));
    assert!(!throttle.ready(t0 - ms(100)));
}

#[test]
fn zero_interval_accepts_everything() {
    let mut throttle = Throttle::new(Duration::ZERO);
    let t0 = Instant::now();
    assert!(throttle.ready(t0));
    assert!(throttle.ready(t0));
    assert_eq!(throttle.interval(), Duration::ZERO);
}
