//! Credit risk inputs chosen by the user

use crate::assumptions::{check_below, check_bounds};
use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Longest tenor the pricing tables are calibrated for
pub const MAX_TENOR_YEARS: u32 = 40;

/// Credit type; selects the province table and the non-disbursed adjustment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditType {
    /// Kredit produktif (working capital / investment)
    #[default]
    #[serde(alias = "produktif")]
    Productive,
    /// Kredit konsumtif
    #[serde(alias = "konsumtif")]
    Consumptive,
}

impl CreditType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CreditType::Productive => "productive",
            CreditType::Consumptive => "consumptive",
        }
    }
}

impl fmt::Display for CreditType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CreditType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "productive" | "produktif" => Ok(CreditType::Productive),
            "consumptive" | "konsumtif" => Ok(CreditType::Consumptive),
            other => Err(format!("Unknown credit type: {}", other)),
        }
    }
}

/// Identity fields printed on the exported quote; not used in pricing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyIdentity {
    #[serde(default)]
    pub insured_name: String,
    #[serde(default)]
    pub bank_name: String,
    #[serde(default)]
    pub policy_number: String,
    #[serde(default)]
    pub pks_number: String,
}

/// Categorical and loan inputs for one credit insurance quote
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditRiskInputs {
    /// Province (wilayah) of the debtor
    pub province: String,

    /// Bank type of the lender
    pub bank_type: String,

    /// Economic sector of the loan
    pub sector: String,

    #[serde(default)]
    pub credit_type: CreditType,

    /// Share of the outstanding balance covered
    pub coverage: f64,

    /// Annual loan interest rate
    pub loan_rate: f64,

    /// Loan tenor in whole years
    pub tenor_years: u32,

    #[serde(default)]
    pub identity: Option<PolicyIdentity>,
}

impl CreditRiskInputs {
    /// Required selections present and numeric inputs within bounds
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("province", &self.province),
            ("bank_type", &self.bank_type),
            ("sector", &self.sector),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::MissingInput {
                    field: field.to_string(),
                });
            }
        }

        check_bounds("coverage", self.coverage, 0.0, 1.0)?;
        if self.coverage == 0.0 {
            return Err(ValidationError::OutOfBounds {
                field: "coverage".to_string(),
                value: 0.0,
                min: f64::MIN_POSITIVE,
                max: 1.0,
            });
        }
        check_below("loan_rate", self.loan_rate, 0.0, 1.0)?;
        if self.tenor_years == 0 || self.tenor_years > MAX_TENOR_YEARS {
            return Err(ValidationError::OutOfBounds {
                field: "tenor_years".to_string(),
                value: self.tenor_years as f64,
                min: 1.0,
                max: MAX_TENOR_YEARS as f64,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs() -> CreditRiskInputs {
        CreditRiskInputs {
            province: "Jawa Barat".into(),
            bank_type: "BPD".into(),
            sector: "Perdagangan".into(),
            credit_type: CreditType::Consumptive,
            coverage: 0.75,
            loan_rate: 0.11,
            tenor_years: 3,
            identity: None,
        }
    }

    #[test]
    fn test_valid_inputs() {
        assert!(inputs().validate().is_ok());
    }

    #[test]
    fn test_missing_sector() {
        let mut i = inputs();
        i.sector = "  ".into();
        assert_eq!(
            i.validate(),
            Err(ValidationError::MissingInput { field: "sector".into() })
        );
    }

    #[test]
    fn test_tenor_bounds() {
        let mut i = inputs();
        i.tenor_years = 0;
        assert!(i.validate().is_err());
        i.tenor_years = MAX_TENOR_YEARS + 1;
        assert!(i.validate().is_err());
    }

    #[test]
    fn test_coverage_above_one_rejected() {
        let mut i = inputs();
        i.coverage = 1.2;
        assert!(matches!(i.validate(), Err(ValidationError::OutOfBounds { .. })));
    }

    #[test]
    fn test_loan_rate_of_one_rejected() {
        let mut i = inputs();
        i.loan_rate = 0.999;
        assert!(i.validate().is_ok());
        i.loan_rate = 1.0;
        assert!(matches!(
            i.validate(),
            Err(ValidationError::OutOfBounds { ref field, .. }) if field == "loan_rate"
        ));
    }

    #[test]
    fn test_credit_type_parsing() {
        assert_eq!("Konsumtif".parse::<CreditType>().unwrap(), CreditType::Consumptive);
        assert_eq!("productive".parse::<CreditType>().unwrap(), CreditType::Productive);
        assert!("mortgage".parse::<CreditType>().is_err());

        let t: CreditType = serde_json::from_str("\"konsumtif\"").unwrap();
        assert_eq!(t, CreditType::Consumptive);
    }
}
