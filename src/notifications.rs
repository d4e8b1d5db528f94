//! Threshold and filing-deadline reminders.
//!
//! The caller passes today's date, so the output is deterministic for a given day.

use crate::format::format_yen;
use crate::tax::{Yen, FILING_THRESHOLD};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;

/// Net income from which the "approaching the threshold" reminder is shown.
pub const APPROACHING_FROM: Yen = 180_000;

/// Month and day of the annual filing deadline.
const DEADLINE_MONTH: u32 = 3;
const DEADLINE_DAY: u32 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ThresholdExceeded,
    ThresholdApproaching,
    Deadline30d,
    Deadline7d,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
    pub severity: Severity,
}

/// March 15 of `today`'s year.
pub fn filing_deadline(today: NaiveDate) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(today.year(), DEADLINE_MONTH, DEADLINE_DAY)
}

/// Reminders to show for `annual_net` as of `today`, threshold reminder first.
pub fn generate_notifications(annual_net: Yen, today: NaiveDate) -> Vec<Notification> {
    let mut out = Vec::new();

    // Strictly above, same as `evaluate_filing_requirement`: exactly at the
    // threshold still reads as approaching with ¥0 left.
    if annual_net > FILING_THRESHOLD {
        out.push(Notification {
            kind: NotificationKind::ThresholdExceeded,
            message: "副業所得が20万円を超えました。確定申告が必要です".to_string(),
            severity: Severity::Warning,
        });
    } else if annual_net >= APPROACHING_FROM {
        out.push(Notification {
            kind: NotificationKind::ThresholdApproaching,
            message: format!(
                "確定申告ラインまであと{}です",
                format_yen(FILING_THRESHOLD - annual_net)
            ),
            severity: Severity::Info,
        });
    }

    if let Some(deadline) = filing_deadline(today) {
        let days = (deadline - today).num_days();
        match days {
            1..=7 => out.push(Notification {
                kind: NotificationKind::Deadline7d,
                message: format!("確定申告期限まであと{}日です！", days),
                severity: Severity::Warning,
            }),
            8..=30 => out.push(Notification {
                kind: NotificationKind::Deadline30d,
                message: format!("確定申告期限まであと{}日を切りました", days),
                severity: Severity::Info,
            }),
            _ => {}
        }
    }

    out
}
