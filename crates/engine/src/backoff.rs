// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retry backoff for retryable staging failures.

use rand::Rng;

/// Attempts consumed so far, given the configured budget and what is left.
pub fn attempt(max_retries: u32, retries_left: u32) -> u32 {
    max_retries.saturating_sub(retries_left).max(1)
}

/// Seconds to wait before the next attempt: `base * attempt²` with uniform
/// jitter of up to half that in either direction. Never negative.
pub fn retry_delay<R: Rng + ?Sized>(base_secs: u64, attempt: u32, rng: &mut R) -> u64 {
    let attempt = u64::from(attempt);
    let wait = base_secs.saturating_mul(attempt.saturating_mul(attempt));
    let wait = i64::try_from(wait).unwrap_or(i64::MAX / 2);
    let half = wait / 2;
    let jitter = if half > 0 { rng.gen_range(-half..=half) } else { 0 };
    u64::try_from(wait.saturating_add(jitter)).unwrap_or(0)
}

#[cfg(test)]
#[path = "backoff_tests.rs"]
mod tests;
