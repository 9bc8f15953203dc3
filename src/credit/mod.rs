//! Credit variant: credit insurance priced from NPL, relativities and loan terms

mod engine;
mod inputs;
mod severity;

pub use engine::{
    compute_credit_rate, scenario_rates, total_relativity, CoverageApplication, CreditPricingConfig, CreditPricingEngine,
    CreditQuote, RateBreakdown, ScenarioRate, ScenarioStatus, DEFAULT_ACQUISITION_MENU, MAX_RELATIVITY,
};
pub use inputs::{CreditRiskInputs, CreditType, PolicyIdentity, MAX_TENOR_YEARS};
pub use severity::{
    amortization_schedule, schedule_average_severity, simplified_severity, yearly_average_balances,
    RepaymentSchedule, ScheduleRow, SeverityPolicy,
};
