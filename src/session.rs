//! Request-scoped calculation sessions
//!
//! A session owns what the user has entered so far and the last successful
//! result. State moves `Idle -> InputsCollected -> Validated -> Computed ->
//! Displayed`; any edit drops back to `InputsCollected`. Field edits and failed
//! attempts keep the last result on display, marked stale by the state, until a
//! recompute replaces it. Adding or removing a product row discards it.

use crate::assumptions::{AcquisitionPolicy, PricingAssumptions};
use crate::bundling::{BundleEngine, BundleResult, FactorChoice, Product, ProductId, ProductList, RateMatrix};
use crate::credit::{CreditPricingConfig, CreditPricingEngine, CreditQuote, CreditRiskInputs};
use crate::error::{PricingError, Result, ValidationError};
use crate::reference::CreditTables;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum CalculationState {
    #[default]
    Idle,
    InputsCollected,
    Validated,
    Computed,
    Displayed,
    /// Last attempt failed; the message is what the user is shown
    ValidationFailed(String),
}

impl CalculationState {
    /// `Computed -> Displayed`; any other starting state is refused
    pub fn mark_displayed(&mut self) -> bool {
        if *self == CalculationState::Computed {
            *self = CalculationState::Displayed;
            true
        } else {
            false
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, CalculationState::ValidationFailed(_))
    }

    /// True while a stored result reflects the current inputs
    pub fn is_current(&self) -> bool {
        matches!(self, CalculationState::Computed | CalculationState::Displayed)
    }
}

/// Bundling form: product rows, assumptions and the last priced bundle
#[derive(Debug, Clone)]
pub struct BundleSession {
    products: ProductList,
    assumptions: PricingAssumptions,
    policy: AcquisitionPolicy,
    state: CalculationState,
    result: Option<BundleResult>,
}

impl Default for BundleSession {
    fn default() -> Self {
        Self::new(PricingAssumptions::bundling(), AcquisitionPolicy::default())
    }
}

impl BundleSession {
    pub fn new(assumptions: PricingAssumptions, policy: AcquisitionPolicy) -> Self {
        Self {
            products: ProductList::new(),
            assumptions,
            policy,
            state: CalculationState::Idle,
            result: None,
        }
    }

    pub fn state(&self) -> &CalculationState {
        &self.state
    }

    pub fn products(&self) -> &ProductList {
        &self.products
    }

    pub fn assumptions(&self) -> &PricingAssumptions {
        &self.assumptions
    }

    pub fn result(&self) -> Option<&BundleResult> {
        self.result.as_ref()
    }

    pub fn add_product(&mut self) -> ProductId {
        self.reset();
        self.products.add()
    }

    /// Returns false for unknown ids and for the last remaining row
    pub fn remove_product(&mut self, id: ProductId) -> bool {
        let removed = self.products.remove(id);
        if removed {
            self.reset();
        }
        removed
    }

    pub fn select_coverage(&mut self, id: ProductId, coverage: &str) -> bool {
        self.edit(id, |p| p.select_coverage(coverage))
    }

    pub fn select_subcover(&mut self, id: ProductId, subcover: &str) -> bool {
        self.edit(id, |p| p.select_subcover(subcover))
    }

    pub fn select_factor(&mut self, id: ProductId, column: &str, value: &str, matrix: &RateMatrix) -> bool {
        self.edit(id, |p| {
            p.select_factor(column, value);
            p.prune_factors(matrix);
        })
    }

    pub fn set_acquisition(&mut self, id: ProductId, acquisition: f64) -> bool {
        self.edit(id, |p| p.set_acquisition(acquisition))
    }

    pub fn set_assumptions(&mut self, assumptions: PricingAssumptions) {
        self.assumptions = assumptions;
        self.touch();
    }

    /// Candidate values for each factor of a product, given its current picks
    pub fn choices(&self, id: ProductId, matrix: &RateMatrix) -> Option<Vec<FactorChoice>> {
        self.products.get(id).map(|p| p.choices(matrix))
    }

    /// Validate and price every row; on failure the previous result stays
    pub fn calculate(&mut self, matrix: &RateMatrix) -> Result<&BundleResult> {
        let selections = self.products.selections();
        let engine = BundleEngine::new(matrix, self.policy.clone());

        let checked = self
            .assumptions
            .validate_bundling()
            .and_then(|_| engine.validate(&selections, self.assumptions.max_acquisition));
        if let Err(err) = checked {
            return Err(self.fail(err.into()));
        }
        self.state = CalculationState::Validated;

        match engine.price(&selections, &self.assumptions) {
            Ok(result) => {
                self.state = CalculationState::Computed;
                Ok(&*self.result.insert(result))
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    pub fn mark_displayed(&mut self) -> bool {
        self.state.mark_displayed()
    }

    fn edit(&mut self, id: ProductId, f: impl FnOnce(&mut Product)) -> bool {
        match self.products.get_mut(id) {
            Some(product) => {
                f(product);
                self.touch();
                true
            }
            None => false,
        }
    }

    fn touch(&mut self) {
        self.state = CalculationState::InputsCollected;
    }

    /// Row structure changed; the old lines no longer match the form
    fn reset(&mut self) {
        self.result = None;
        self.touch();
    }

    fn fail(&mut self, err: PricingError) -> PricingError {
        log::debug!("Bundle calculation failed: {}", err);
        self.state = CalculationState::ValidationFailed(err.to_string());
        err
    }
}

/// Credit form: risk inputs, assumptions and the last quote
#[derive(Debug, Clone, Default)]
pub struct CreditSession {
    inputs: Option<CreditRiskInputs>,
    assumptions: PricingAssumptions,
    config: CreditPricingConfig,
    state: CalculationState,
    quote: Option<CreditQuote>,
}

impl CreditSession {
    pub fn new(assumptions: PricingAssumptions, config: CreditPricingConfig) -> Self {
        Self {
            assumptions,
            config,
            ..Self::default()
        }
    }

    pub fn state(&self) -> &CalculationState {
        &self.state
    }

    pub fn inputs(&self) -> Option<&CreditRiskInputs> {
        self.inputs.as_ref()
    }

    pub fn quote(&self) -> Option<&CreditQuote> {
        self.quote.as_ref()
    }

    pub fn set_inputs(&mut self, inputs: CreditRiskInputs) {
        self.inputs = Some(inputs);
        self.touch();
    }

    pub fn set_assumptions(&mut self, assumptions: PricingAssumptions) {
        self.assumptions = assumptions;
        self.touch();
    }

    pub fn set_config(&mut self, config: CreditPricingConfig) {
        self.config = config;
        self.touch();
    }

    pub fn calculate(&mut self, tables: &CreditTables) -> Result<&CreditQuote> {
        let Some(inputs) = self.inputs.clone() else {
            let err = ValidationError::MissingInput {
                field: "credit inputs".to_string(),
            };
            return Err(self.fail(err.into()));
        };

        let engine = CreditPricingEngine::new(tables, self.config.clone());
        if let Err(err) = engine.validate(&inputs, &self.assumptions) {
            return Err(self.fail(err));
        }
        self.state = CalculationState::Validated;

        match engine.price(&inputs, &self.assumptions) {
            Ok(quote) => {
                self.state = CalculationState::Computed;
                Ok(&*self.quote.insert(quote))
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    pub fn mark_displayed(&mut self) -> bool {
        self.state.mark_displayed()
    }

    fn touch(&mut self) {
        self.state = CalculationState::InputsCollected;
    }

    fn fail(&mut self, err: PricingError) -> PricingError {
        log::debug!("Credit calculation failed: {}", err);
        self.state = CalculationState::ValidationFailed(err.to_string());
        err
    }
}
