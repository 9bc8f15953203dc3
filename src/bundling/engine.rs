//! Bundle pricing: per-product base rate lookup, acquisition rescaling, additive total

use super::matrix::{FactorSelection, RateMatrix};
use super::product::ProductSelection;
use crate::assumptions::{AcquisitionPolicy, PricingAssumptions};
use crate::error::{Result, ValidationError};
use crate::loading::adjust_for_acquisition;
use serde::Serialize;

/// Priced line item
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BundleLine {
    /// 1-based position in the bundle
    pub number: usize,
    pub coverage: String,
    pub subcover: String,
    pub factors: FactorSelection,
    /// Matrix rate, set under `max_acquisition`
    pub base_rate: f64,
    /// Acquisition actually priced (locked value for regulated coverages)
    pub acquisition: f64,
    pub adjusted_rate: f64,
}

/// Result of a bundle calculation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BundleResult {
    pub lines: Vec<BundleLine>,
    /// Sum of adjusted rates; no diversification credit
    pub total_rate: f64,
}

/// Prices bundles against a loaded rate matrix
#[derive(Debug, Clone)]
pub struct BundleEngine<'a> {
    matrix: &'a RateMatrix,
    policy: AcquisitionPolicy,
}

impl<'a> BundleEngine<'a> {
    pub fn new(matrix: &'a RateMatrix, policy: AcquisitionPolicy) -> Self {
        Self { matrix, policy }
    }

    pub fn policy(&self) -> &AcquisitionPolicy {
        &self.policy
    }

    /// Check every product before any lookup; the first failure is reported
    pub fn validate(&self, products: &[ProductSelection], max_acquisition: f64) -> std::result::Result<(), ValidationError> {
        self.check(&normalize(products), max_acquisition)
    }

    fn check(&self, products: &[ProductSelection], max_acquisition: f64) -> std::result::Result<(), ValidationError> {
        if products.is_empty() {
            return Err(ValidationError::NoProducts);
        }

        for (idx, product) in products.iter().enumerate() {
            let number = idx + 1;

            if product.coverage.is_empty() {
                return Err(ValidationError::MissingSelection {
                    product: number,
                    field: "coverage".to_string(),
                });
            }
            if product.subcover.is_empty() {
                return Err(ValidationError::MissingSelection {
                    product: number,
                    field: "subcover".to_string(),
                });
            }

            if let Some(column) = product
                .factors
                .keys()
                .find(|c| !self.matrix.factor_columns().contains(c))
            {
                return Err(ValidationError::UnknownFactorColumn {
                    column: column.clone(),
                });
            }

            let missing: Vec<String> = self
                .matrix
                .context_factor_columns(&product.coverage, &product.subcover)
                .into_iter()
                .filter(|c| product.factors.get(c).map_or(true, |v| v.is_empty()))
                .collect();
            if !missing.is_empty() {
                return Err(ValidationError::IncompleteFactors {
                    product: number,
                    missing,
                });
            }

            self.policy
                .validate(number, &product.coverage, product.acquisition, max_acquisition)?;
        }

        Ok(())
    }

    /// Price a bundle. Validation and lookup failures abort the whole calculation.
    pub fn price(&self, products: &[ProductSelection], assumptions: &PricingAssumptions) -> Result<BundleResult> {
        assumptions.validate_bundling()?;
        let products = normalize(products);
        self.check(&products, assumptions.max_acquisition)?;

        let mut lines = Vec::with_capacity(products.len());
        let mut total_rate = 0.0;

        for (idx, product) in products.iter().enumerate() {
            let base_rate = self
                .matrix
                .lookup(&product.coverage, &product.subcover, &product.factors)?;

            let acquisition = self
                .policy
                .effective_acquisition(&product.coverage, product.acquisition);

            let adjusted_rate = adjust_for_acquisition(
                base_rate,
                assumptions.expense,
                assumptions.profit,
                assumptions.max_acquisition,
                acquisition,
            )?;

            log::debug!(
                "Product {}: {} / {} base {:.6} at acquisition {:.4} -> {:.6}",
                idx + 1,
                product.coverage,
                product.subcover,
                base_rate,
                acquisition,
                adjusted_rate
            );

            total_rate += adjusted_rate;
            lines.push(BundleLine {
                number: idx + 1,
                coverage: product.coverage.clone(),
                subcover: product.subcover.clone(),
                factors: product.factors.clone(),
                base_rate,
                acquisition,
                adjusted_rate,
            });
        }

        log::info!("Bundle of {} products priced at {:.6}", lines.len(), total_rate);

        Ok(BundleResult { lines, total_rate })
    }
}

fn normalize(products: &[ProductSelection]) -> Vec<ProductSelection> {
    products.iter().map(ProductSelection::normalized).collect()
}

/// Validate a bundle against `matrix` without pricing it
pub fn validate_products(
    matrix: &RateMatrix,
    policy: &AcquisitionPolicy,
    products: &[ProductSelection],
    max_acquisition: f64,
) -> std::result::Result<(), ValidationError> {
    BundleEngine::new(matrix, policy.clone()).validate(products, max_acquisition)
}

/// Price a bundle against `matrix`
pub fn compute_bundle_rate(
    matrix: &RateMatrix,
    products: &[ProductSelection],
    assumptions: &PricingAssumptions,
    policy: &AcquisitionPolicy,
) -> Result<BundleResult> {
    BundleEngine::new(matrix, policy.clone()).price(products, assumptions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PricingError;
    use crate::reference::ColumnPolicy;
    use approx::assert_relative_eq;

    const MATRIX: &str = "Coverage,Subcover,Okupasi,Jenis Kendaraan,Rate\n\
        Property,Fire,Rumah Tinggal,,0.0030\n\
        Property,Fire,Gudang,,0.0060\n\
        Motorvehicle,Comprehensive,,Sedan,0.0300\n\
        Personal Accident,Basic,,,0.0010\n";

    fn matrix() -> RateMatrix {
        RateMatrix::from_reader(MATRIX.as_bytes(), ColumnPolicy::Exact).unwrap()
    }

    #[test]
    fn test_locked_acquisition_ignores_override() {
        let m = matrix();
        let engine = BundleEngine::new(&m, AcquisitionPolicy::default());
        let products = vec![ProductSelection::new("Property", "Fire")
            .with_factor("Okupasi", "Rumah Tinggal")
            .with_acquisition(0.18)];

        let result = engine.price(&products, &PricingAssumptions::bundling()).unwrap();
        let line = &result.lines[0];
        assert_eq!(line.acquisition, 0.15);
        // 0.0030 * 0.60 / 0.65
        assert_relative_eq!(line.adjusted_rate, 0.0030 * 0.60 / 0.65, epsilon = 1e-15);
    }

    #[test]
    fn test_total_is_sum_of_adjusted_rates() {
        let m = matrix();
        let engine = BundleEngine::new(&m, AcquisitionPolicy::default());
        let products = vec![
            ProductSelection::new("Property", "Fire").with_factor("Okupasi", "Gudang"),
            ProductSelection::new("Motorvehicle", "Comprehensive").with_factor("Jenis Kendaraan", "Sedan"),
            ProductSelection::new("Personal Accident", "Basic").with_acquisition(0.10),
        ];

        let result = engine.price(&products, &PricingAssumptions::bundling()).unwrap();
        let sum: f64 = result.lines.iter().map(|l| l.adjusted_rate).sum();
        assert_relative_eq!(result.total_rate, sum, epsilon = 1e-15);
        assert_relative_eq!(result.lines[1].adjusted_rate, 0.03 * 0.60 / 0.55, epsilon = 1e-15);
        assert_relative_eq!(result.lines[2].adjusted_rate, 0.001 * 0.60 / 0.70, epsilon = 1e-15);
    }

    #[test]
    fn test_unlocked_at_maximum_is_identity() {
        let m = matrix();
        let engine = BundleEngine::new(&m, AcquisitionPolicy::default());
        let products = vec![ProductSelection::new("Personal Accident", "Basic")];
        let result = engine.price(&products, &PricingAssumptions::bundling()).unwrap();
        assert_eq!(result.lines[0].adjusted_rate, 0.0010);
    }

    #[test]
    fn test_incomplete_factors_rejected() {
        let m = matrix();
        let engine = BundleEngine::new(&m, AcquisitionPolicy::default());
        let products = vec![
            ProductSelection::new("Personal Accident", "Basic"),
            ProductSelection::new("Property", "Fire"),
        ];
        let err = engine.price(&products, &PricingAssumptions::bundling()).unwrap_err();
        assert!(matches!(
            err,
            PricingError::Validation(ValidationError::IncompleteFactors { product: 2, ref missing })
                if missing == &vec!["Okupasi".to_string()]
        ));
    }

    #[test]
    fn test_acquisition_above_maximum_rejected() {
        let m = matrix();
        let engine = BundleEngine::new(&m, AcquisitionPolicy::default());
        let products = vec![ProductSelection::new("Personal Accident", "Basic").with_acquisition(0.25)];
        let err = engine.price(&products, &PricingAssumptions::bundling()).unwrap_err();
        assert!(matches!(
            err,
            PricingError::Validation(ValidationError::AcquisitionAboveMaximum { product: 1, .. })
        ));
    }

    #[test]
    fn test_free_functions_match_engine() {
        let m = matrix();
        let policy = AcquisitionPolicy::default();
        let products = vec![ProductSelection::new("Motorvehicle", "Comprehensive")
            .with_factor("Jenis Kendaraan", "Sedan")];
        assert!(validate_products(&m, &policy, &products, 0.20).is_ok());

        let direct = compute_bundle_rate(&m, &products, &PricingAssumptions::bundling(), &policy).unwrap();
        let via_engine = BundleEngine::new(&m, policy)
            .price(&products, &PricingAssumptions::bundling())
            .unwrap();
        assert_eq!(direct, via_engine);
    }

    #[test]
    fn test_empty_bundle_rejected() {
        let m = matrix();
        let engine = BundleEngine::new(&m, AcquisitionPolicy::default());
        let err = engine.price(&[], &PricingAssumptions::bundling()).unwrap_err();
        assert!(matches!(err, PricingError::Validation(ValidationError::NoProducts)));
    }

    #[test]
    fn test_unknown_pair_surfaces_rate_not_found() {
        let m = matrix();
        let engine = BundleEngine::new(&m, AcquisitionPolicy::default());
        let products = vec![ProductSelection::new("Marine", "Cargo")];
        let err = engine.price(&products, &PricingAssumptions::bundling()).unwrap_err();
        assert!(matches!(err, PricingError::RateNotFound { .. }));
    }

    #[test]
    fn test_expense_plus_profit_at_one_rejected_before_lookup() {
        let m = matrix();
        let engine = BundleEngine::new(&m, AcquisitionPolicy::default());
        let assumptions = PricingAssumptions {
            expense: 0.7,
            profit: 0.3,
            ..PricingAssumptions::bundling()
        };
        let products = vec![ProductSelection::new("Marine", "Cargo")];
        let err = engine.price(&products, &assumptions).unwrap_err();
        assert!(matches!(
            err,
            PricingError::Validation(ValidationError::AssumptionSumTooHigh { .. })
        ));
    }

    #[test]
    fn test_padded_factor_keys_are_trimmed() {
        let m = matrix();
        let engine = BundleEngine::new(&m, AcquisitionPolicy::default());
        let mut product = ProductSelection::new(" Property ", "Fire");
        product.factors.insert(" Okupasi".to_string(), "Gudang ".to_string());
        let products = vec![product];

        assert!(engine.validate(&products, 0.20).is_ok());
        let result = engine.price(&products, &PricingAssumptions::bundling()).unwrap();
        assert_eq!(result.lines[0].coverage, "Property");
        assert_eq!(result.lines[0].factors["Okupasi"], "Gudang");
        assert_eq!(result.lines[0].base_rate, 0.0060);
    }
}
