//! Credit insurance pricing pipeline
//!
//! NPL and relativities -> probability -> severity -> pure rate -> gross rate
//! for each acquisition scenario in the menu.

use super::inputs::{CreditRiskInputs, CreditType};
use super::severity::SeverityPolicy;
use crate::assumptions::{check_bounds, PricingAssumptions};
use crate::error::Result;
use crate::loading::{gross_up, loading_denominator};
use crate::reference::CreditTables;
use serde::{Deserialize, Serialize};

/// Cap on the product of the three relativities
pub const MAX_RELATIVITY: f64 = 3.5;

/// Acquisition percentages quoted for every credit request
pub const DEFAULT_ACQUISITION_MENU: [f64; 5] = [0.0, 0.025, 0.05, 0.075, 0.10];

/// Where the coverage share enters the rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageApplication {
    /// `pure = probability * severity * coverage`
    #[default]
    OnPureRate,
    /// `probability = npl * rel * coverage * ...`
    OnProbability,
    /// Both of the above
    OnBoth,
}

impl CoverageApplication {
    fn probability_factor(&self, coverage: f64) -> f64 {
        match self {
            CoverageApplication::OnProbability | CoverageApplication::OnBoth => coverage,
            CoverageApplication::OnPureRate => 1.0,
        }
    }

    fn pure_rate_factor(&self, coverage: f64) -> f64 {
        match self {
            CoverageApplication::OnPureRate | CoverageApplication::OnBoth => coverage,
            CoverageApplication::OnProbability => 1.0,
        }
    }
}

fn default_max_relativity() -> f64 { MAX_RELATIVITY }
fn default_acquisition_menu() -> Vec<f64> { DEFAULT_ACQUISITION_MENU.to_vec() }

/// Formula choices for the credit engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditPricingConfig {
    #[serde(default)]
    pub severity: SeverityPolicy,

    #[serde(default)]
    pub coverage: CoverageApplication,

    #[serde(default = "default_max_relativity")]
    pub max_relativity: f64,

    #[serde(default = "default_acquisition_menu")]
    pub acquisition_menu: Vec<f64>,
}

impl Default for CreditPricingConfig {
    fn default() -> Self {
        Self {
            severity: SeverityPolicy::default(),
            coverage: CoverageApplication::default(),
            max_relativity: default_max_relativity(),
            acquisition_menu: default_acquisition_menu(),
        }
    }
}

/// Intermediate values of one calculation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateBreakdown {
    pub npl: f64,
    pub rel_province: f64,
    pub rel_bank: f64,
    pub rel_sector: f64,
    /// Product of the relativities after the cap
    pub total_relativity: f64,
    pub relativity_capped: bool,
    pub probability: f64,
    pub severity: f64,
    pub pure_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScenarioStatus {
    Valid,
    /// Loading denominator was not positive; this row has no rate
    Invalid { denominator: f64 },
}

/// Gross rate under one acquisition assumption
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScenarioRate {
    pub acquisition: f64,
    pub gross_rate: Option<f64>,
    pub status: ScenarioStatus,
}

impl ScenarioRate {
    pub fn is_valid(&self) -> bool {
        matches!(self.status, ScenarioStatus::Valid)
    }
}

/// Complete credit quote
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreditQuote {
    pub inputs: CreditRiskInputs,
    pub breakdown: RateBreakdown,
    pub scenarios: Vec<ScenarioRate>,
}

/// `min(rel_province * rel_bank * rel_sector, cap)` and whether the cap bit
pub fn total_relativity(rel_province: f64, rel_bank: f64, rel_sector: f64, cap: f64) -> (f64, bool) {
    let product = rel_province * rel_bank * rel_sector;
    if product > cap {
        (cap, true)
    } else {
        (product, false)
    }
}

/// Gross rate for every acquisition in `menu`; an invalid row does not stop the others
pub fn scenario_rates(pure_rate: f64, assumptions: &PricingAssumptions, menu: &[f64]) -> Vec<ScenarioRate> {
    menu.iter()
        .map(|&acquisition| {
            match gross_up(
                pure_rate,
                assumptions.risk_margin,
                assumptions.expense,
                assumptions.profit,
                acquisition,
            ) {
                Ok(rate) => ScenarioRate {
                    acquisition,
                    gross_rate: Some(rate),
                    status: ScenarioStatus::Valid,
                },
                Err(_) => {
                    let denominator =
                        loading_denominator(assumptions.expense, assumptions.profit, acquisition);
                    log::warn!(
                        "Acquisition {:.4}: denominator {:.4} is not positive, scenario marked invalid",
                        acquisition,
                        denominator
                    );
                    ScenarioRate {
                        acquisition,
                        gross_rate: None,
                        status: ScenarioStatus::Invalid { denominator },
                    }
                }
            }
        })
        .collect()
}

/// Prices credit insurance against loaded reference tables
#[derive(Debug, Clone)]
pub struct CreditPricingEngine<'a> {
    tables: &'a CreditTables,
    config: CreditPricingConfig,
}

impl<'a> CreditPricingEngine<'a> {
    pub fn new(tables: &'a CreditTables, config: CreditPricingConfig) -> Self {
        Self { tables, config }
    }

    pub fn config(&self) -> &CreditPricingConfig {
        &self.config
    }

    /// Inputs, assumptions and the configured menu within bounds
    pub fn validate(&self, inputs: &CreditRiskInputs, assumptions: &PricingAssumptions) -> Result<()> {
        inputs.validate()?;
        assumptions.validate_credit()?;
        check_bounds("max_relativity", self.config.max_relativity, 0.0, f64::MAX)?;
        for &acquisition in &self.config.acquisition_menu {
            check_bounds("acquisition_menu", acquisition, 0.0, 1.0)?;
        }
        Ok(())
    }

    /// Lookups and the probability / severity / pure rate chain
    pub fn breakdown(&self, inputs: &CreditRiskInputs, assumptions: &PricingAssumptions) -> Result<RateBreakdown> {
        let province_table = self.tables.province_table(inputs.credit_type);
        let npl = province_table.npl(&inputs.province)?;
        let rel_province = province_table.relativity(&inputs.province)?;
        let rel_bank = self.tables.bank_type.relativity(&inputs.bank_type)?;
        let rel_sector = self.tables.sector.relativity(&inputs.sector)?;

        let (total_relativity, relativity_capped) =
            total_relativity(rel_province, rel_bank, rel_sector, self.config.max_relativity);
        if relativity_capped {
            log::debug!(
                "Relativity {:.4} capped at {:.4}",
                rel_province * rel_bank * rel_sector,
                total_relativity
            );
        }

        let portion = match inputs.credit_type {
            CreditType::Consumptive => assumptions.non_disbursed_portion,
            CreditType::Productive => 1.0,
        };

        let probability = npl
            * total_relativity
            * (1.0 - assumptions.recovery)
            * portion
            * self.config.coverage.probability_factor(inputs.coverage);

        let severity = self
            .config
            .severity
            .severity(inputs.loan_rate, assumptions.investment_rate, inputs.tenor_years);

        let pure_rate = probability * severity * self.config.coverage.pure_rate_factor(inputs.coverage);

        log::debug!(
            "{} / {} / {}: npl {:.6}, rel {:.4}, probability {:.6}, severity {:.6} ({}), pure {:.6}",
            inputs.province,
            inputs.bank_type,
            inputs.sector,
            npl,
            total_relativity,
            probability,
            severity,
            self.config.severity.name(),
            pure_rate
        );

        Ok(RateBreakdown {
            npl,
            rel_province,
            rel_bank,
            rel_sector,
            total_relativity,
            relativity_capped,
            probability,
            severity,
            pure_rate,
        })
    }

    /// Validate, compute the pure rate, gross it up across the acquisition menu
    pub fn price(&self, inputs: &CreditRiskInputs, assumptions: &PricingAssumptions) -> Result<CreditQuote> {
        self.validate(inputs, assumptions)?;
        let breakdown = self.breakdown(inputs, assumptions)?;
        let scenarios = scenario_rates(breakdown.pure_rate, assumptions, &self.config.acquisition_menu);

        let valid = scenarios.iter().filter(|s| s.is_valid()).count();
        log::info!(
            "Credit quote for {} priced: pure {:.6}, {}/{} scenarios valid",
            inputs.province,
            breakdown.pure_rate,
            valid,
            scenarios.len()
        );

        Ok(CreditQuote {
            inputs: inputs.clone(),
            breakdown,
            scenarios,
        })
    }
}

/// Scenario table for one credit request
pub fn compute_credit_rate(
    tables: &CreditTables,
    inputs: &CreditRiskInputs,
    assumptions: &PricingAssumptions,
    config: &CreditPricingConfig,
) -> Result<Vec<ScenarioRate>> {
    CreditPricingEngine::new(tables, config.clone())
        .price(inputs, assumptions)
        .map(|quote| quote.scenarios)
}
