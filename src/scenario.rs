//! Scenario runner for batch pricing
//!
//! Loads the reference store once, then prices any number of credit or
//! bundling requests against it without re-reading the CSV files.

use crate::assumptions::{AcquisitionPolicy, PricingAssumptions};
use crate::bundling::{BundleEngine, BundleResult, ProductSelection};
use crate::credit::{CreditPricingConfig, CreditPricingEngine, CreditQuote, CreditRiskInputs, CreditType, PolicyIdentity};
use crate::error::Result;
use crate::reference::{ColumnPolicy, ReferenceStore};
use rayon::prelude::*;
use serde::Deserialize;
use std::path::Path;

fn default_bundling_assumptions() -> PricingAssumptions {
    PricingAssumptions::bundling()
}

/// Credit request as read from a JSON file
#[derive(Debug, Clone, Deserialize)]
pub struct CreditRequest {
    #[serde(default)]
    pub id: String,

    pub inputs: CreditRiskInputs,

    #[serde(default)]
    pub assumptions: PricingAssumptions,
}

/// Bundling request as read from a JSON file
#[derive(Debug, Clone, Deserialize)]
pub struct BundleRequest {
    pub products: Vec<ProductSelection>,

    #[serde(default = "default_bundling_assumptions")]
    pub assumptions: PricingAssumptions,

    #[serde(default)]
    pub identity: PolicyIdentity,
}

/// One row of a batch CSV; assumptions left blank fall back to the credit defaults
#[derive(Debug, Clone, Deserialize)]
pub struct CreditRequestRow {
    pub id: String,
    pub province: String,
    pub bank_type: String,
    pub sector: String,
    pub credit_type: CreditType,
    pub coverage: f64,
    pub loan_rate: f64,
    pub tenor_years: u32,
    #[serde(default)]
    pub expense: Option<f64>,
    #[serde(default)]
    pub profit: Option<f64>,
    #[serde(default)]
    pub risk_margin: Option<f64>,
    #[serde(default)]
    pub recovery: Option<f64>,
}

impl From<CreditRequestRow> for CreditRequest {
    fn from(row: CreditRequestRow) -> Self {
        let defaults = PricingAssumptions::default();
        Self {
            id: row.id,
            inputs: CreditRiskInputs {
                province: row.province,
                bank_type: row.bank_type,
                sector: row.sector,
                credit_type: row.credit_type,
                coverage: row.coverage,
                loan_rate: row.loan_rate,
                tenor_years: row.tenor_years,
                identity: None,
            },
            assumptions: PricingAssumptions {
                expense: row.expense.unwrap_or(defaults.expense),
                profit: row.profit.unwrap_or(defaults.profit),
                risk_margin: row.risk_margin.unwrap_or(defaults.risk_margin),
                recovery: row.recovery.unwrap_or(defaults.recovery),
                ..defaults
            },
        }
    }
}

/// Result of one batch request; failures stay with their request
#[derive(Debug)]
pub struct BatchOutcome {
    pub id: String,
    pub result: Result<CreditQuote>,
}

/// Pre-loaded pricing runner
#[derive(Debug, Clone)]
pub struct ScenarioRunner {
    store: ReferenceStore,
    config: CreditPricingConfig,
    policy: AcquisitionPolicy,
}

impl ScenarioRunner {
    /// Load the reference store from `dir`
    pub fn from_reference_dir(dir: &Path, policy: ColumnPolicy) -> Result<Self> {
        Ok(Self::with_store(ReferenceStore::load_from(dir, policy)?))
    }

    /// Runner over an already-loaded store
    pub fn with_store(store: ReferenceStore) -> Self {
        Self {
            store,
            config: CreditPricingConfig::default(),
            policy: AcquisitionPolicy::default(),
        }
    }

    pub fn with_config(mut self, config: CreditPricingConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_acquisition_policy(mut self, policy: AcquisitionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn store(&self) -> &ReferenceStore {
        &self.store
    }

    pub fn config(&self) -> &CreditPricingConfig {
        &self.config
    }

    pub fn price_credit(&self, inputs: &CreditRiskInputs, assumptions: &PricingAssumptions) -> Result<CreditQuote> {
        let tables = self.store.credit()?;
        CreditPricingEngine::new(tables, self.config.clone()).price(inputs, assumptions)
    }

    pub fn price_bundle(&self, products: &[ProductSelection], assumptions: &PricingAssumptions) -> Result<BundleResult> {
        let matrix = self.store.rate_matrix()?;
        BundleEngine::new(matrix, self.policy.clone()).price(products, assumptions)
    }

    /// Price requests in order
    pub fn run_batch(&self, requests: &[CreditRequest]) -> Vec<BatchOutcome> {
        requests.iter().map(|r| self.run_one(r)).collect()
    }

    /// Price requests across the rayon pool; output order matches input order
    pub fn run_batch_parallel(&self, requests: &[CreditRequest]) -> Vec<BatchOutcome> {
        requests.par_iter().map(|r| self.run_one(r)).collect()
    }

    fn run_one(&self, request: &CreditRequest) -> BatchOutcome {
        let result = self.price_credit(&request.inputs, &request.assumptions);
        if let Err(err) = &result {
            log::warn!("Request {}: {}", request.id, err);
        }
        BatchOutcome {
            id: request.id.clone(),
            result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PricingError;
    use crate::reference::DEFAULT_REFERENCE_PATH;

    fn runner() -> ScenarioRunner {
        ScenarioRunner::from_reference_dir(Path::new(DEFAULT_REFERENCE_PATH), ColumnPolicy::Exact)
            .expect("bundled reference data should load")
    }

    fn request(id: &str, province: &str) -> CreditRequest {
        CreditRequest {
            id: id.to_string(),
            inputs: CreditRiskInputs {
                province: province.to_string(),
                bank_type: "BUMN".into(),
                sector: "Perdagangan".into(),
                credit_type: CreditType::Productive,
                coverage: 0.75,
                loan_rate: 0.11,
                tenor_years: 3,
                identity: None,
            },
            assumptions: PricingAssumptions::default(),
        }
    }

    #[test]
    fn test_batch_failure_does_not_stop_others() {
        let r = runner();
        let requests = vec![
            request("a", "Jawa Barat"),
            request("b", "Atlantis"),
            request("c", "DKI Jakarta"),
        ];
        let outcomes = r.run_batch(&requests);
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].result.is_ok());
        assert!(matches!(outcomes[1].result, Err(PricingError::LookupNotFound { .. })));
        assert!(outcomes[2].result.is_ok());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let r = runner();
        let requests: Vec<CreditRequest> = ["Jawa Barat", "DKI Jakarta", "Bali", "Papua"]
            .iter()
            .enumerate()
            .map(|(i, p)| request(&i.to_string(), p))
            .collect();

        let seq = r.run_batch(&requests);
        let par = r.run_batch_parallel(&requests);
        for (a, b) in seq.iter().zip(par.iter()) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.result.as_ref().ok(), b.result.as_ref().ok());
        }
    }

    #[test]
    fn test_bundle_request_defaults() {
        let req: BundleRequest = serde_json::from_str(
            r#"{"products": [{"coverage": "Property", "subcover": "Fire", "factors": {"Okupasi": "Rumah Tinggal"}}]}"#,
        )
        .unwrap();
        assert_eq!(req.assumptions, PricingAssumptions::bundling());
        assert_eq!(req.products[0].acquisition, 0.20);
    }

    #[test]
    fn test_row_conversion_uses_credit_defaults() {
        let row = CreditRequestRow {
            id: "1".into(),
            province: "Bali".into(),
            bank_type: "BPR".into(),
            sector: "Pertanian".into(),
            credit_type: CreditType::Consumptive,
            coverage: 0.5,
            loan_rate: 0.12,
            tenor_years: 2,
            expense: Some(0.20),
            profit: None,
            risk_margin: None,
            recovery: None,
        };
        let req = CreditRequest::from(row);
        assert_eq!(req.assumptions.expense, 0.20);
        assert_eq!(req.assumptions.profit, 0.10);
        assert_eq!(req.assumptions.non_disbursed_portion, 0.40);
    }

    #[test]
    fn test_store_without_matrix_rejects_bundles() {
        let r = ScenarioRunner::with_store(ReferenceStore::default());
        let err = r
            .price_bundle(&[ProductSelection::new("Property", "Fire")], &PricingAssumptions::bundling())
            .unwrap_err();
        assert!(matches!(err, PricingError::MissingTable { .. }));
    }
}
