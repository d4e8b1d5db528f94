//! Display helpers for yen amounts and dates.

use chrono::{Datelike, NaiveDate};

/// Group digits in threes with commas, the way ja-JP renders integers.
pub fn group_thousands(n: i64) -> String {
    let grouped = group_digits(n.unsigned_abs());
    if n < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

/// `¥1,234`. Negative amounts put the sign before the symbol: `-¥500`.
pub fn format_yen(n: i64) -> String {
    let grouped = group_digits(n.unsigned_abs());
    if n < 0 {
        format!("-¥{grouped}")
    } else {
        format!("¥{grouped}")
    }
}

fn group_digits(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// `3月15日`.
pub fn format_month_day(date: NaiveDate) -> String {
    format!("{}月{}日", date.month(), date.day())
}
