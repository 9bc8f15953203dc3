//! Pricing assumptions supplied fresh with every calculation

mod acquisition;

pub use acquisition::{AcquisitionPolicy, DEFAULT_MAX_ACQUISITION};

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};

/// Loading and economic assumptions for one calculation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingAssumptions {
    /// Expense loading as a fraction of gross premium
    #[serde(default = "default_expense")]
    pub expense: f64,

    /// Profit loading as a fraction of gross premium
    #[serde(default = "default_profit")]
    pub profit: f64,

    /// Risk margin applied to the pure rate (credit only)
    #[serde(default = "default_risk_margin")]
    pub risk_margin: f64,

    /// Acquisition assumed when the reference rates were set
    #[serde(default = "default_max_acquisition")]
    pub max_acquisition: f64,

    /// Expected recovery on a claim, as a fraction of the claim
    #[serde(default)]
    pub recovery: f64,

    /// Annual investment rate used to discount severity
    #[serde(default = "default_investment_rate")]
    pub investment_rate: f64,

    /// Portion of a consumptive portfolio relevant to claim frequency (Porsi Non-ND)
    #[serde(default = "default_non_disbursed_portion")]
    pub non_disbursed_portion: f64,
}

fn default_expense() -> f64 { 0.15 }
fn default_profit() -> f64 { 0.10 }
fn default_risk_margin() -> f64 { 0.25 }
fn default_max_acquisition() -> f64 { DEFAULT_MAX_ACQUISITION }
fn default_investment_rate() -> f64 { 0.061 }
fn default_non_disbursed_portion() -> f64 { 0.40 }

impl Default for PricingAssumptions {
    /// Credit pricing defaults
    fn default() -> Self {
        Self {
            expense: default_expense(),
            profit: default_profit(),
            risk_margin: default_risk_margin(),
            max_acquisition: default_max_acquisition(),
            recovery: 0.0,
            investment_rate: default_investment_rate(),
            non_disbursed_portion: default_non_disbursed_portion(),
        }
    }
}

impl PricingAssumptions {
    /// Locked bundling assumptions: 15% expense, 5% profit, rates set at 20% acquisition
    pub fn bundling() -> Self {
        Self {
            expense: 0.15,
            profit: 0.05,
            risk_margin: 0.0,
            ..Self::default()
        }
    }

    /// Checks for the bundling path: loadings in range and a positive matrix denominator
    pub fn validate_bundling(&self) -> Result<(), ValidationError> {
        check_below("expense", self.expense, 0.0, 1.0)?;
        check_below("profit", self.profit, 0.0, 1.0)?;
        check_below("max_acquisition", self.max_acquisition, 0.0, 1.0)?;
        check_sum("expense + profit", &[self.expense, self.profit])?;
        check_sum(
            "expense + profit + max_acquisition",
            &[self.expense, self.profit, self.max_acquisition],
        )?;
        Ok(())
    }

    /// Checks for the credit path; the margin counts toward the 100% ceiling
    pub fn validate_credit(&self) -> Result<(), ValidationError> {
        check_below("expense", self.expense, 0.0, 1.0)?;
        check_below("profit", self.profit, 0.0, 1.0)?;
        check_below("risk_margin", self.risk_margin, 0.0, 1.0)?;
        check_bounds("recovery", self.recovery, 0.0, 1.0)?;
        check_open("investment_rate", self.investment_rate, -1.0, 1.0)?;
        check_bounds("non_disbursed_portion", self.non_disbursed_portion, 0.0, 1.0)?;
        check_sum(
            "expense + profit + risk_margin",
            &[self.expense, self.profit, self.risk_margin],
        )?;
        Ok(())
    }
}

/// `[min, max]`; NaN is always out of bounds
pub fn check_bounds(field: &str, value: f64, min: f64, max: f64) -> Result<(), ValidationError> {
    check_with(field, value, min, max, (min..=max).contains(&value))
}

/// `[min, max)`
pub fn check_below(field: &str, value: f64, min: f64, max: f64) -> Result<(), ValidationError> {
    check_with(field, value, min, max, (min..max).contains(&value))
}

/// `(min, max)`
pub fn check_open(field: &str, value: f64, min: f64, max: f64) -> Result<(), ValidationError> {
    check_with(field, value, min, max, value > min && value < max)
}

fn check_with(field: &str, value: f64, min: f64, max: f64, inside: bool) -> Result<(), ValidationError> {
    if inside {
        Ok(())
    } else {
        Err(ValidationError::OutOfBounds {
            field: field.to_string(),
            value,
            min,
            max,
        })
    }
}

/// Loadings taken out of the premium must leave something behind
fn check_sum(terms: &str, values: &[f64]) -> Result<(), ValidationError> {
    let sum: f64 = values.iter().sum();
    if sum < 1.0 {
        Ok(())
    } else {
        Err(ValidationError::AssumptionSumTooHigh {
            terms: terms.to_string(),
            sum,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(PricingAssumptions::default().validate_credit().is_ok());
        assert!(PricingAssumptions::bundling().validate_bundling().is_ok());
    }

    #[test]
    fn test_serde_defaults_fill_missing_fields() {
        let a: PricingAssumptions = serde_json::from_str(r#"{"expense": 0.2}"#).unwrap();
        assert_eq!(a.expense, 0.2);
        assert_eq!(a.profit, 0.10);
        assert_eq!(a.non_disbursed_portion, 0.40);
    }

    #[test]
    fn test_expense_plus_profit_at_one_rejected() {
        let a = PricingAssumptions {
            expense: 0.6,
            profit: 0.4,
            ..PricingAssumptions::bundling()
        };
        assert!(matches!(
            a.validate_bundling(),
            Err(ValidationError::AssumptionSumTooHigh { .. })
        ));
    }

    #[test]
    fn test_credit_margin_counts_toward_ceiling() {
        let a = PricingAssumptions {
            expense: 0.40,
            profit: 0.30,
            risk_margin: 0.30,
            ..PricingAssumptions::default()
        };
        let err = a.validate_credit().unwrap_err();
        assert!(matches!(err, ValidationError::AssumptionSumTooHigh { ref terms, .. } if terms.contains("risk_margin")));
    }

    #[test]
    fn test_nan_is_out_of_bounds() {
        assert!(check_bounds("recovery", f64::NAN, 0.0, 1.0).is_err());
        assert!(check_below("expense", f64::NAN, 0.0, 1.0).is_err());
        assert!(check_open("investment_rate", f64::NAN, -1.0, 1.0).is_err());
    }

    #[test]
    fn test_investment_rate_open_interval() {
        let at = |investment_rate| PricingAssumptions {
            investment_rate,
            ..PricingAssumptions::default()
        };
        assert!(at(-0.9).validate_credit().is_ok());
        assert!(at(0.99).validate_credit().is_ok());
        assert!(at(-1.0).validate_credit().is_err());
        assert!(at(1.0).validate_credit().is_err());
    }

    #[test]
    fn test_loading_of_one_rejected_before_sum() {
        let a = PricingAssumptions {
            expense: 1.0,
            profit: 0.0,
            risk_margin: 0.0,
            ..PricingAssumptions::default()
        };
        assert!(matches!(
            a.validate_credit(),
            Err(ValidationError::OutOfBounds { ref field, .. }) if field == "expense"
        ));
    }
}
