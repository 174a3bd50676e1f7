use accounts_constants::MILLISECONDS_PER_YEAR;
use time::{Date, OffsetDateTime};

/// Current calendar date in UTC, used as `Account::creation_date` on
/// account creation.
pub fn today() -> Date {
    OffsetDateTime::now_utc().date()
}

/// `Δy = (t1 − t0) / 365.25 days`. Negative when `t1` precedes
/// `t0`; callers that only ever accrue forward in time should clamp at the
/// call site (see `accrual::accrue`, which treats non-positive deltas as a
/// no-op).
pub fn year_fraction(t0: OffsetDateTime, t1: OffsetDateTime) -> f64 {
    let millis = (t1 - t0).whole_milliseconds() as f64;
    millis / MILLISECONDS_PER_YEAR
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn one_year_is_one() {
        let t0 = datetime!(2024-01-01 0:00 UTC);
        let t1 = t0 + time::Duration::days(365) + time::Duration::hours(6);
        let delta = year_fraction(t0, t1);
        assert!((delta - 1.0).abs() < 1e-6, "{delta}");
    }
}
