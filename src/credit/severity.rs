//! Severity: discounted exposure of the outstanding loan balance
//!
//! Two formulas are in use and both stay selectable:
//! - `Simplified`: for t = 1..n, `(1 + loan)^-t * (1 + inv)^-(t-1)`, summed
//! - `ScheduleAverage`: average outstanding balance per policy year from a
//!   monthly repayment schedule, discounted at `(1 + inv)^-(t-1)`, summed

use serde::{Deserialize, Serialize};

/// Repayment profile of the insured loan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepaymentSchedule {
    /// Level monthly installment
    #[default]
    Annuity,
    /// Equal principal each month
    StraightLine,
}

/// Severity formula
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityPolicy {
    #[default]
    Simplified,
    ScheduleAverage { schedule: RepaymentSchedule },
}

impl SeverityPolicy {
    pub fn severity(&self, loan_rate: f64, investment_rate: f64, tenor_years: u32) -> f64 {
        match self {
            SeverityPolicy::Simplified => simplified_severity(loan_rate, investment_rate, tenor_years),
            SeverityPolicy::ScheduleAverage { schedule } => {
                schedule_average_severity(loan_rate, investment_rate, tenor_years, *schedule)
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SeverityPolicy::Simplified => "simplified",
            SeverityPolicy::ScheduleAverage { schedule: RepaymentSchedule::Annuity } => {
                "schedule_average_annuity"
            }
            SeverityPolicy::ScheduleAverage { schedule: RepaymentSchedule::StraightLine } => {
                "schedule_average_straight_line"
            }
        }
    }
}

/// One month of a unit-principal repayment schedule
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScheduleRow {
    /// 1-based month
    pub month: u32,
    /// 1-based policy year containing the month
    pub year: u32,
    pub opening_balance: f64,
    pub interest: f64,
    pub principal: f64,
    pub closing_balance: f64,
}

/// Monthly schedule for a loan of 1.0 at `loan_rate` (annual, nominal) over `tenor_years`
pub fn amortization_schedule(loan_rate: f64, tenor_years: u32, schedule: RepaymentSchedule) -> Vec<ScheduleRow> {
    let n = tenor_years * 12;
    if n == 0 {
        return Vec::new();
    }

    let r = loan_rate / 12.0;
    // A zero-rate annuity is a straight-line repayment
    let level_payment = match schedule {
        RepaymentSchedule::Annuity if r.abs() > 1e-12 => Some(r / (1.0 - (1.0 + r).powi(-(n as i32)))),
        _ => None,
    };

    let mut rows = Vec::with_capacity(n as usize);
    let mut balance = 1.0_f64;

    for month in 1..=n {
        let interest = balance * r;
        let principal = match level_payment {
            Some(payment) => payment - interest,
            None => 1.0 / n as f64,
        };
        // Final month clears the balance exactly
        let principal = if month == n { balance } else { principal.min(balance) };
        let closing = balance - principal;

        rows.push(ScheduleRow {
            month,
            year: (month - 1) / 12 + 1,
            opening_balance: balance,
            interest,
            principal,
            closing_balance: closing,
        });

        balance = closing;
    }

    rows
}

/// Average opening balance of each policy year
pub fn yearly_average_balances(rows: &[ScheduleRow], tenor_years: u32) -> Vec<f64> {
    (1..=tenor_years)
        .map(|year| {
            let (sum, count) = rows
                .iter()
                .filter(|r| r.year == year)
                .fold((0.0, 0u32), |(s, c), r| (s + r.opening_balance, c + 1));
            if count == 0 { 0.0 } else { sum / count as f64 }
        })
        .collect()
}

pub fn simplified_severity(loan_rate: f64, investment_rate: f64, tenor_years: u32) -> f64 {
    (1..=tenor_years)
        .map(|t| {
            (1.0 + loan_rate).powi(-(t as i32)) * (1.0 + investment_rate).powi(-(t as i32 - 1))
        })
        .sum()
}

pub fn schedule_average_severity(
    loan_rate: f64,
    investment_rate: f64,
    tenor_years: u32,
    schedule: RepaymentSchedule,
) -> f64 {
    let rows = amortization_schedule(loan_rate, tenor_years, schedule);
    yearly_average_balances(&rows, tenor_years)
        .iter()
        .enumerate()
        .map(|(i, avg)| avg * (1.0 + investment_rate).powi(-(i as i32)))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_simplified_single_year() {
        let s = simplified_severity(0.11, 0.061, 1);
        assert_abs_diff_eq!(s, 0.900901, epsilon = 1e-6);
    }

    #[test]
    fn test_simplified_three_years() {
        let expected = 1.0 / 1.11 + 1.0 / (1.11_f64.powi(2) * 1.061) + 1.0 / (1.11_f64.powi(3) * 1.061_f64.powi(2));
        assert_abs_diff_eq!(simplified_severity(0.11, 0.061, 3), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_annuity_schedule_repays_in_full() {
        let rows = amortization_schedule(0.11, 5, RepaymentSchedule::Annuity);
        assert_eq!(rows.len(), 60);
        assert_eq!(rows[0].opening_balance, 1.0);
        assert_abs_diff_eq!(rows[59].closing_balance, 0.0, epsilon = 1e-12);

        let principal: f64 = rows.iter().map(|r| r.principal).sum();
        assert_abs_diff_eq!(principal, 1.0, epsilon = 1e-12);

        // Level installment: interest + principal constant before the final month
        let p0 = rows[0].interest + rows[0].principal;
        let p30 = rows[30].interest + rows[30].principal;
        assert_abs_diff_eq!(p0, p30, epsilon = 1e-12);
    }

    #[test]
    fn test_straight_line_year_average() {
        let rows = amortization_schedule(0.11, 1, RepaymentSchedule::StraightLine);
        let avg = yearly_average_balances(&rows, 1);
        // (12 + 11 + ... + 1) / 12 / 12
        assert_abs_diff_eq!(avg[0], 78.0 / 144.0, epsilon = 1e-12);
        assert_abs_diff_eq!(
            schedule_average_severity(0.11, 0.061, 1, RepaymentSchedule::StraightLine),
            78.0 / 144.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_zero_rate_annuity_degrades_to_straight_line() {
        let a = amortization_schedule(0.0, 2, RepaymentSchedule::Annuity);
        let s = amortization_schedule(0.0, 2, RepaymentSchedule::StraightLine);
        assert_eq!(a, s);
    }

    #[test]
    fn test_annuity_balance_above_straight_line() {
        // Annuities repay principal later, so the average exposure is higher
        let annuity = schedule_average_severity(0.11, 0.061, 3, RepaymentSchedule::Annuity);
        let straight = schedule_average_severity(0.11, 0.061, 3, RepaymentSchedule::StraightLine);
        assert!(annuity > straight);
    }

    #[test]
    fn test_policy_dispatch() {
        let p = SeverityPolicy::default();
        assert_eq!(p.name(), "simplified");
        assert_eq!(p.severity(0.11, 0.061, 2), simplified_severity(0.11, 0.061, 2));

        let p = SeverityPolicy::ScheduleAverage { schedule: RepaymentSchedule::StraightLine };
        assert_eq!(
            p.severity(0.11, 0.061, 2),
            schedule_average_severity(0.11, 0.061, 2, RepaymentSchedule::StraightLine)
        );
    }

    #[test]
    fn test_policy_serde() {
        let p: SeverityPolicy = serde_json::from_str(r#"{"schedule_average":{"schedule":"straight_line"}}"#).unwrap();
        assert_eq!(p, SeverityPolicy::ScheduleAverage { schedule: RepaymentSchedule::StraightLine });
        let p: SeverityPolicy = serde_json::from_str(r#""simplified""#).unwrap();
        assert_eq!(p, SeverityPolicy::Simplified);
    }
}
