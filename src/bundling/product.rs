//! Bundling product rows: an ordered, id-keyed list independent of any form rendering

use super::matrix::{FactorChoice, FactorSelection, RateMatrix};
use crate::assumptions::DEFAULT_MAX_ACQUISITION;
use serde::{Deserialize, Serialize};

pub type ProductId = u32;

fn default_requested_acquisition() -> f64 {
    DEFAULT_MAX_ACQUISITION
}

/// What the user picked for one line item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSelection {
    #[serde(default)]
    pub coverage: String,

    #[serde(default)]
    pub subcover: String,

    #[serde(default)]
    pub factors: FactorSelection,

    /// Requested acquisition; ignored for coverages with a locked value
    #[serde(default = "default_requested_acquisition")]
    pub acquisition: f64,
}

impl Default for ProductSelection {
    fn default() -> Self {
        Self {
            coverage: String::new(),
            subcover: String::new(),
            factors: FactorSelection::new(),
            acquisition: default_requested_acquisition(),
        }
    }
}

impl ProductSelection {
    pub fn new(coverage: &str, subcover: &str) -> Self {
        Self {
            coverage: coverage.to_string(),
            subcover: subcover.to_string(),
            ..Self::default()
        }
    }

    pub fn with_factor(mut self, column: &str, value: &str) -> Self {
        self.factors.insert(column.trim().to_string(), value.trim().to_string());
        self
    }

    /// Copy with coverage, subcover and every factor key and value trimmed
    pub fn normalized(&self) -> Self {
        Self {
            coverage: self.coverage.trim().to_string(),
            subcover: self.subcover.trim().to_string(),
            factors: self
                .factors
                .iter()
                .map(|(column, value)| (column.trim().to_string(), value.trim().to_string()))
                .collect(),
            acquisition: self.acquisition,
        }
    }

    pub fn with_acquisition(mut self, acquisition: f64) -> Self {
        self.acquisition = acquisition;
        self
    }
}

/// A user-configured line item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub selection: ProductSelection,
}

impl Product {
    /// Empty row, as created by "add product"
    pub fn new(id: ProductId) -> Self {
        Self {
            id,
            selection: ProductSelection::default(),
        }
    }

    /// Changing coverage invalidates subcover and factor picks
    pub fn select_coverage(&mut self, coverage: &str) {
        let coverage = coverage.trim();
        if self.selection.coverage != coverage {
            self.selection.coverage = coverage.to_string();
            self.selection.subcover.clear();
            self.selection.factors.clear();
        }
    }

    /// Changing subcover invalidates factor picks
    pub fn select_subcover(&mut self, subcover: &str) {
        let subcover = subcover.trim();
        if self.selection.subcover != subcover {
            self.selection.subcover = subcover.to_string();
            self.selection.factors.clear();
        }
    }

    pub fn select_factor(&mut self, column: &str, value: &str) {
        self.selection
            .factors
            .insert(column.trim().to_string(), value.trim().to_string());
    }

    pub fn set_acquisition(&mut self, acquisition: f64) {
        self.selection.acquisition = acquisition;
    }

    /// Current dropdown state, recomputed from the selections
    pub fn choices(&self, matrix: &RateMatrix) -> Vec<FactorChoice> {
        matrix.factor_choices(&self.selection.coverage, &self.selection.subcover, &self.selection.factors)
    }

    /// Drop factor picks that are no longer reachable under the earlier picks
    pub fn prune_factors(&mut self, matrix: &RateMatrix) {
        let kept: FactorSelection = self
            .choices(matrix)
            .into_iter()
            .filter_map(|c| c.selected.map(|v| (c.column, v)))
            .collect();
        self.selection.factors = kept;
    }
}

/// Ordered product rows; ids are never reused
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductList {
    products: Vec<Product>,
    next_id: ProductId,
}

impl Default for ProductList {
    fn default() -> Self {
        Self::new()
    }
}

impl ProductList {
    /// A list starts with one empty row
    pub fn new() -> Self {
        Self {
            products: vec![Product::new(1)],
            next_id: 2,
        }
    }

    /// Build from request-side selections
    pub fn from_selections(selections: Vec<ProductSelection>) -> Self {
        let products: Vec<Product> = selections
            .into_iter()
            .zip(1..)
            .map(|(selection, id)| Product { id, selection })
            .collect();
        let next_id = products.len() as ProductId + 1;
        Self { products, next_id }
    }

    /// Append an empty row and return its id
    pub fn add(&mut self) -> ProductId {
        let id = self.next_id;
        self.next_id += 1;
        self.products.push(Product::new(id));
        id
    }

    /// Remove a row. The last remaining row cannot be removed.
    pub fn remove(&mut self, id: ProductId) -> bool {
        if self.products.len() <= 1 {
            return false;
        }
        let before = self.products.len();
        self.products.retain(|p| p.id != id);
        self.products.len() != before
    }

    pub fn get(&self, id: ProductId) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    pub fn get_mut(&mut self, id: ProductId) -> Option<&mut Product> {
        self.products.iter_mut().find(|p| p.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Product> {
        self.products.iter()
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn selections(&self) -> Vec<ProductSelection> {
        self.products.iter().map(|p| p.selection.clone()).collect()
    }
}
