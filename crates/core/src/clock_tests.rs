// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn system_clock_epoch_is_recent() {
    // 2023-11-14
    assert!(SystemClock.epoch_secs() > 1_700_000_000);
}

#[test]
fn fake_clock_advances_both_readings() {
    let clock = FakeClock::new();
    let t1 = clock.now();
    let e1 = clock.epoch_secs();
    clock.advance(Duration::from_secs(90));
    assert!(clock.now().duration_since(t1) >= Duration::from_secs(90));
    assert_eq!(clock.epoch_secs(), e1 + 90);
}

#[test]
fn fake_clock_clones_share_time() {
    let clock1 = FakeClock::new();
    let clock2 = clock1.clone();
    clock2.advance(Duration::from_secs(30));
    assert_eq!(clock1.epoch_secs(), clock2.epoch_secs());
}

#[test]
fn fake_clock_set_epoch() {
    let clock = FakeClock::default();
    clock.set_epoch_secs(42);
    assert_eq!(clock.epoch_secs(), 42);
}
