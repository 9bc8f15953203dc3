//! Insurance Pricing - rate engines for bundled general insurance and credit insurance
//!
//! This library provides:
//! - Reference table loading with exact or keyword column binding
//! - Most-specific-match rate lookup over a sparse product rate matrix
//! - Acquisition rescaling and gross-up of pure rates
//! - Credit insurance pricing from NPL, relativities and loan severity
//! - Request-scoped calculation sessions and quote export
//! - Batch pricing over a pre-loaded reference store

pub mod assumptions;
pub mod bundling;
pub mod credit;
pub mod error;
pub mod loading;
pub mod reference;
pub mod report;
pub mod scenario;
pub mod session;

// Re-export commonly used types
pub use assumptions::{AcquisitionPolicy, PricingAssumptions};
pub use bundling::{BundleEngine, BundleResult, ProductList, ProductSelection, RateMatrix};
pub use credit::{CreditPricingConfig, CreditPricingEngine, CreditQuote, CreditRiskInputs, CreditType};
pub use error::{ErrorScope, PricingError, Result, ValidationError};
pub use reference::{ColumnPolicy, ReferenceStore};
pub use report::QuoteDocument;
pub use scenario::ScenarioRunner;
pub use session::{BundleSession, CalculationState, CreditSession};
