use accounts_types::Account;

/// Continuous-compounding accrual: value of `k` principal-plus-
/// interest units at `t0`, after `delta_years` at annual rate `r` percent,
/// is `k · exp(ln(1 + r/100) · Δy)`.
pub fn accrue(k: f64, rate_percent: f64, delta_years: f64) -> f64 {
    if delta_years <= 0.0 {
        return k;
    }
    k * ((1.0 + rate_percent / 100.0).ln() * delta_years).exp()
}

/// `principal + interest`, accrued from `account.last_change_ts` up to `at`
/// using the account's current `interest_rate`, without mutating anything.
/// Shared by `PrepareTransfer` processing (which must see today's accrual
/// before deciding how much to lock) and read-only views.
pub fn project_available_amount(account: &Account, delta_years: f64) -> f64 {
    let k = account.principal as f64 + account.interest;
    let grown = accrue(k, account.interest_rate, delta_years);
    grown - account.total_locked_amount as f64
}

/// Result of capitalizing interest into principal: interest accrued up to
/// the capitalization moment is folded into `principal`, subject to i64
/// saturation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Capitalization {
    pub new_principal: i64,
    pub remaining_interest: f64,
    pub overflowed: bool,
}

/// Capitalizes whole-unit interest into `principal`; the fractional part
/// stays in `interest`. Used on rate change and by the account
/// scanner when principal/interest drift exceeds policy.
pub fn capitalize(principal: i64, interest: f64) -> Capitalization {
    let whole = interest.trunc();
    let remaining_interest = interest - whole;

    let (new_principal, overflowed) = sat_add_f64(principal, whole);
    Capitalization {
        new_principal,
        remaining_interest: if overflowed { 0.0 } else { remaining_interest },
        overflowed,
    }
}

/// Adds a (possibly huge) `f64` delta to an `i64`, saturating at the `i64`
/// bounds instead of wrapping, and reporting whether it saturated.
pub fn sat_add_f64(base: i64, delta: f64) -> (i64, bool) {
    let sum = base as f64 + delta;
    if sum >= i64::MAX as f64 {
        (i64::MAX, true)
    } else if sum <= i64::MIN as f64 {
        (i64::MIN, true)
    } else {
        (sum as i64, false)
    }
}

/// Saturating `i64` subtraction reporting whether it clamped, used when
/// debiting the sender's principal on commit.
pub fn sat_sub_i64(a: i64, b: i64) -> (i64, bool) {
    match a.checked_sub(b) {
        Some(v) => (v, false),
        None => (a.saturating_sub(b), true),
    }
}

/// Saturating `i64` addition reporting whether it clamped, used when
/// crediting the recipient's principal on a committed transfer.
pub fn sat_add_i64(a: i64, b: i64) -> (i64, bool) {
    match a.checked_add(b) {
        Some(v) => (v, false),
        None => (a.saturating_add(b), true),
    }
}

/// The demurrage bound applied at commit time: if the sender's
/// current `principal + interest` is less than
/// `locked_amount · exp(ln(1 + demurrage_rate/100) · Δy)`, the effective
/// committed amount is clamped down to what's actually available. Returns
/// `None` when even zero is infeasible (current principal+interest is not
/// positive), meaning the commit must fail with a non-OK status.
pub fn demurrage_clamped_commit(
    requested_amount: i64,
    locked_amount: i64,
    current_principal_plus_interest: f64,
    demurrage_rate: f64,
    delta_years_since_prepared: f64,
) -> Option<i64> {
    if current_principal_plus_interest <= 0.0 {
        return None;
    }

    let worst_case_locked_value = accrue(
        locked_amount as f64,
        demurrage_rate,
        delta_years_since_prepared,
    );

    let available = if current_principal_plus_interest < worst_case_locked_value {
        current_principal_plus_interest
    } else {
        worst_case_locked_value
    };

    if available <= 0.0 {
        return None;
    }

    let bounded = (requested_amount as f64).min(locked_amount as f64).min(available);
    Some(bounded.floor() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn zero_delta_is_identity() {
        assert_eq!(accrue(1000.0, 12.5, 0.0), 1000.0);
    }

    /// accrue(accrue(k, t0→t1), t1→t2) ≈ accrue(k, t0→t2).
    #[test]
    fn accrual_composes_over_intervals() {
        let k = 10_000.0;
        let rate = 7.25;
        let total = accrue(k, rate, 2.0);
        let composed = accrue(accrue(k, rate, 0.75), rate, 1.25);
        assert!((total - composed).abs() < 1e-6, "{total} vs {composed}");
    }

    proptest! {
        #[test]
        fn composition_law(k in 1.0f64..1_000_000.0, rate in -49.0f64..99.0, t0 in 0.0f64..5.0, t1 in 0.0f64..5.0) {
            let total = accrue(k, rate, t0 + t1);
            let composed = accrue(accrue(k, rate, t0), rate, t1);
            prop_assert!((total - composed).abs() < total.abs() * 1e-9 + 1e-6);
        }
    }

    #[test]
    fn capitalize_handles_overflow() {
        let cap = capitalize(i64::MAX - 1, 10.0);
        assert!(cap.overflowed);
        assert_eq!(cap.new_principal, i64::MAX);
    }

    #[test]
    fn capitalize_splits_fraction() {
        let cap = capitalize(100, 5.7);
        assert_eq!(cap.new_principal, 105);
        assert!((cap.remaining_interest - 0.7).abs() < 1e-9);
    }

    #[test]
    fn demurrage_squeeze_rejects_when_unavailable() {
        // Scenario 6: rate -50%, locked 100, committed after 180 days.
        let delta_years = 180.0 / 365.25;
        let clamped = demurrage_clamped_commit(100, 100, 0.0, -50.0, delta_years);
        assert_eq!(clamped, None);
    }

    #[test]
    fn demurrage_clamps_down_not_to_zero_when_something_remains() {
        let delta_years = 180.0 / 365.25;
        let clamped = demurrage_clamped_commit(100, 100, 40.0, -50.0, delta_years);
        assert_eq!(clamped, Some(40));
    }
}
