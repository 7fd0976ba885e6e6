// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    seconds = { 1_000, 1_045, "45s" },
    minutes = { 1_000, 1_000 + 180, "3m" },
    hours = { 1_000, 1_000 + 7_200, "2h" },
    days = { 1_000, 1_000 + 5 * 86_400, "5d" },
    clock_skew = { 2_000, 1_000, "0s" },
    never = { 0, 1_000, "-" },
)]
fn time_ago(epoch: u64, now: u64, expected: &str) {
    assert_eq!(format_time_ago(epoch, now), expected);
}

#[test]
fn absolute_time_is_utc() {
    assert_eq!(format_time(0), "-");
    assert_eq!(format_time(86_400), "1970-01-02T00:00:00Z");
}

#[test]
fn empty_columns_show_a_dash() {
    assert_eq!(or_dash(""), "-");
    assert_eq!(or_dash("atlas"), "atlas");
}

#[test]
fn json_flag_selects_format() {
    assert_eq!(OutputFormat::from_json_flag(true), OutputFormat::Json);
    assert_eq!(OutputFormat::from_json_flag(false), OutputFormat::Text);
}
