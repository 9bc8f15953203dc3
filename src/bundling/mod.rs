//! Bundling variant: property, motor and other lines priced from a flat rate matrix

mod engine;
mod matrix;
mod product;

pub use engine::{compute_bundle_rate, validate_products, BundleEngine, BundleLine, BundleResult};
pub use matrix::{FactorChoice, FactorSelection, RateMatrix, RateMatrixRow};
pub use product::{Product, ProductId, ProductList, ProductSelection};
