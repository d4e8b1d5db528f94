use fukugyo::tax::{
    classify, compute_progress_percent, compute_withholding_tax, evaluate_filing_requirement,
    FilingStatus, FILING_THRESHOLD,
};
use fukugyo::TaxError;

mod filing_requirement {
    use super::*;

    #[test]
    fn net_income_is_exact_difference() {
        for (income, expense) in [(0, 0), (1_500_000, 500_000), (100_000, 200_000), (7, 3)] {
            let d = evaluate_filing_requirement(income, expense).unwrap();
            assert_eq!(d.net_income, income - expense);
        }
    }

    #[test]
    fn boundary_around_threshold() {
        // Net incomes 199,999 / 200,000 / 200,001 with a non-zero expense held fixed.
        let expense = 50_000;
        let cases = [(199_999, false), (200_000, false), (200_001, true)];
        for (net, required) in cases {
            let d = evaluate_filing_requirement(net + expense, expense).unwrap();
            assert_eq!(d.required, required, "net {net}");
            assert_eq!(d.net_income, net);
        }
    }

    #[test]
    fn required_above_threshold() {
        let d = evaluate_filing_requirement(300_000, 99_999).unwrap();
        assert!(d.required);
        assert_eq!(d.net_income, 200_001);
        assert_eq!(d.status, FilingStatus::Required);
        assert!(d.reason.contains("確定申告が必要"));

        let d = evaluate_filing_requirement(500_000, 250_000).unwrap();
        assert!(d.required);
        assert_eq!(d.net_income, 250_000);
    }

    #[test]
    fn exactly_at_threshold_is_not_required() {
        let d = evaluate_filing_requirement(FILING_THRESHOLD, 0).unwrap();
        assert!(!d.required);
        assert_eq!(d.status, FilingStatus::BelowThreshold);
        assert!(d.reason.contains("申告は不要"));
        assert!(d.reason.contains("住民税"));
    }

    #[test]
    fn zero_income_is_below_threshold() {
        let d = evaluate_filing_requirement(0, 0).unwrap();
        assert!(!d.required);
        assert_eq!(d.net_income, 0);
        assert_eq!(d.status, FilingStatus::BelowThreshold);
    }

    #[test]
    fn deficit_is_its_own_category() {
        let d = evaluate_filing_requirement(100_000, 200_000).unwrap();
        assert!(!d.required);
        assert_eq!(d.net_income, -100_000);
        assert_eq!(d.status, FilingStatus::Deficit);
        assert!(d.reason.contains("赤字"));
        assert!(d.reason.contains("損失の繰越"));

        let below = evaluate_filing_requirement(150_000, 0).unwrap();
        assert_ne!(d.status, below.status);

        let d = evaluate_filing_requirement(0, 50_000).unwrap();
        assert_eq!(d.status, FilingStatus::Deficit);
        assert_eq!(d.net_income, -50_000);
    }

    #[test]
    fn negative_totals_are_rejected() {
        assert!(matches!(
            evaluate_filing_requirement(-100, 0),
            Err(TaxError::NegativeAmount { field: "total_income", .. })
        ));
        assert!(matches!(
            evaluate_filing_requirement(0, -1),
            Err(TaxError::NegativeAmount { field: "total_expense", .. })
        ));
    }

    #[test]
    fn required_iff_net_exceeds_threshold() {
        let expense = 12_345;
        for net in (-5_000..=FILING_THRESHOLD + 5_000).step_by(997) {
            let income = net + expense;
            if income < 0 {
                continue;
            }
            let d = evaluate_filing_requirement(income, expense).unwrap();
            assert_eq!(d.required, net > FILING_THRESHOLD, "net {net}");
            assert_eq!(d.status, classify(net));
        }
    }
}

mod withholding {
    use super::*;

    #[test]
    fn known_values() {
        assert_eq!(compute_withholding_tax(100_000), 10_210);
        assert_eq!(compute_withholding_tax(10), 1);
        assert_eq!(compute_withholding_tax(1), 0);
        assert_eq!(compute_withholding_tax(0), 0);
        assert_eq!(compute_withholding_tax(50_000), 5_105);
    }

    #[test]
    fn truncates_at_bucket_boundaries() {
        // Amounts where amount * 1021 lands exactly on, or one short of, a multiple of 10_000.
        for k in [1u64, 7, 1021, 99_991, 9_999_999, 97_943_192] {
            let exact = k * 10_000;
            assert_eq!(compute_withholding_tax(exact), k * 1021);
            assert_eq!(compute_withholding_tax(exact - 1), (k * 10_000 - 1) * 1021 / 10_000);
        }
        assert_eq!(compute_withholding_tax(1_000_000_000), 102_100_000);
    }
}

mod progress {
    use super::*;

    #[test]
    fn clamps_to_percent_range() {
        assert_eq!(compute_progress_percent(0), 0);
        assert_eq!(compute_progress_percent(100_000), 50);
        assert_eq!(compute_progress_percent(200_000), 100);
        assert_eq!(compute_progress_percent(300_000), 100);
        assert_eq!(compute_progress_percent(-50_000), 0);
        assert_eq!(compute_progress_percent(i64::MIN), 0);
        assert_eq!(compute_progress_percent(i64::MAX), 100);
    }

    #[test]
    fn decision_exposes_progress() {
        let d = evaluate_filing_requirement(150_000, 50_000).unwrap();
        assert_eq!(d.progress_percent(), 50);
    }
}
