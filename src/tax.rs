//! Filing-threshold engine for side income.
//!
//! A salaried worker whose side income (income minus expenses) for the year exceeds
//! [`FILING_THRESHOLD`] must file a tax return. Everything here is pure integer
//! arithmetic over yen amounts, so it is safe to call from any number of tasks.
//!
//! ```rust
//! use fukugyo::tax::{evaluate_filing_requirement, FilingStatus};
//!
//! let decision = evaluate_filing_requirement(300_000, 99_999).unwrap();
//! assert!(decision.required);
//! assert_eq!(decision.net_income, 200_001);
//! assert_eq!(decision.status, FilingStatus::Required);
//! ```

use crate::error::TaxError;
use crate::format::group_thousands;
use serde::Serialize;

/// Integer yen. Sums of recorded amounts are non-negative; net income may not be.
pub type Yen = i64;

/// Net side income above which filing is mandatory. Exactly this amount does not trigger it.
pub const FILING_THRESHOLD: Yen = 200_000;

/// Withholding rate for designated freelance payments, in units of 1/10000 (10.21%).
const WITHHOLDING_RATE_BPS: u128 = 1021;
const RATE_DENOMINATOR: u128 = 10_000;

/// Which side of the threshold a net income falls on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilingStatus {
    /// Expenses exceed income.
    Deficit,
    /// `0 ..= FILING_THRESHOLD`.
    BelowThreshold,
    /// Above the threshold; a return must be filed.
    Required,
}

/// Outcome of [`evaluate_filing_requirement`]. Recomputed on every call, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilingDecision {
    pub required: bool,
    pub net_income: Yen,
    pub status: FilingStatus,
    pub reason: String,
}

impl FilingDecision {
    /// Progress toward the threshold for this decision's net income.
    pub fn progress_percent(&self) -> u8 {
        compute_progress_percent(self.net_income)
    }
}

/// Decide whether the year's side income requires a tax return.
///
/// # Errors
/// Returns [`TaxError::NegativeAmount`] if either total is below zero. Non-negative
/// inputs always produce a decision.
pub fn evaluate_filing_requirement(
    total_income: Yen,
    total_expense: Yen,
) -> Result<FilingDecision, TaxError> {
    if total_income < 0 {
        return Err(TaxError::NegativeAmount { field: "total_income", value: total_income });
    }
    if total_expense < 0 {
        return Err(TaxError::NegativeAmount { field: "total_expense", value: total_expense });
    }

    // Both operands are non-negative, so this cannot overflow.
    let net_income = total_income - total_expense;
    let status = classify(net_income);
    let reason = match status {
        FilingStatus::Deficit => {
            "赤字のため申告は不要ですが、損失の繰越には申告が必要な場合があります。".to_string()
        }
        FilingStatus::Required => {
            format!("副業所得が{}円のため、確定申告が必要です。", group_thousands(net_income))
        }
        FilingStatus::BelowThreshold => {
            "副業所得が20万円以下のため申告は不要です。ただし住民税の申告は必要な場合があります。"
                .to_string()
        }
    };

    Ok(FilingDecision {
        required: status == FilingStatus::Required,
        net_income,
        status,
        reason,
    })
}

/// Place a net income relative to the threshold.
pub fn classify(net_income: Yen) -> FilingStatus {
    if net_income < 0 {
        FilingStatus::Deficit
    } else if net_income > FILING_THRESHOLD {
        FilingStatus::Required
    } else {
        FilingStatus::BelowThreshold
    }
}

/// Withholding tax at 10.21%, truncated to whole yen.
///
/// Integer arithmetic keeps this exact over the whole `u64` range; `10` yields `1`, not a
/// rounded `1.02`.
pub fn compute_withholding_tax(amount: u64) -> u64 {
    // amount * 1021 fits in u128, and the quotient is smaller than amount.
    (u128::from(amount) * WITHHOLDING_RATE_BPS / RATE_DENOMINATOR) as u64
}

/// Percentage of the threshold reached, rounded half-up and clamped to `0..=100`.
pub fn compute_progress_percent(net_income: Yen) -> u8 {
    if net_income <= 0 {
        return 0;
    }
    if net_income >= FILING_THRESHOLD {
        return 100;
    }
    // 0 < net_income < FILING_THRESHOLD, so the product stays tiny.
    ((net_income * 100 + FILING_THRESHOLD / 2) / FILING_THRESHOLD) as u8
}
