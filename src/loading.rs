//! Premium loading: acquisition rescaling and gross-up of pure rates
//!
//! Both engines divide by the share of premium left after expense, profit and
//! acquisition. That share must be strictly positive before any division.

use crate::error::{PricingError, Result, ValidationError};

/// `1 - expense - profit - acquisition`
pub fn loading_denominator(expense: f64, profit: f64, acquisition: f64) -> f64 {
    1.0 - expense - profit - acquisition
}

/// Rescale a rate set under `locked_acquisition` to `user_acquisition`.
///
/// `adjusted = base * (1 - e - p - locked) / (1 - e - p - user)`
pub fn adjust_for_acquisition(
    base_rate: f64,
    expense: f64,
    profit: f64,
    locked_acquisition: f64,
    user_acquisition: f64,
) -> Result<f64> {
    let denom_locked = positive_denominator(expense, profit, locked_acquisition)?;
    let denom_user = positive_denominator(expense, profit, user_acquisition)?;

    Ok(base_rate * (denom_locked / denom_user))
}

/// Gross rate for one acquisition scenario: `pure * (1 + margin) / (1 - e - p - a)`
pub fn gross_up(pure_rate: f64, risk_margin: f64, expense: f64, profit: f64, acquisition: f64) -> Result<f64> {
    let denominator = loading_denominator(expense, profit, acquisition);
    if denominator <= 0.0 || denominator.is_nan() {
        return Err(PricingError::InvalidScenario {
            acquisition,
            denominator,
        });
    }
    Ok(pure_rate * (1.0 + risk_margin) / denominator)
}

fn positive_denominator(expense: f64, profit: f64, acquisition: f64) -> Result<f64> {
    let denominator = loading_denominator(expense, profit, acquisition);
    if denominator > 0.0 {
        Ok(denominator)
    } else {
        Err(ValidationError::NonPositiveDenominator {
            acquisition,
            denominator,
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_adjustment_identity_at_locked_acquisition() {
        let adjusted = adjust_for_acquisition(0.0123, 0.15, 0.05, 0.20, 0.20).unwrap();
        assert_eq!(adjusted, 0.0123);
    }

    #[test]
    fn test_adjustment_lower_acquisition_lowers_rate() {
        // 0.60 / 0.70
        let adjusted = adjust_for_acquisition(0.01, 0.15, 0.05, 0.20, 0.10).unwrap();
        assert_relative_eq!(adjusted, 0.01 * 0.6 / 0.7, epsilon = 1e-15);
        assert!(adjusted < 0.01);
    }

    #[test]
    fn test_adjustment_rejects_non_positive_user_denominator() {
        let err = adjust_for_acquisition(0.01, 0.15, 0.05, 0.20, 0.80).unwrap_err();
        assert!(matches!(
            err,
            PricingError::Validation(ValidationError::NonPositiveDenominator { .. })
        ));
    }

    #[test]
    fn test_gross_up_worked_example() {
        let pure = 0.02 * 0.75 / 1.11;
        let gross = gross_up(pure, 0.25, 0.15, 0.10, 0.0).unwrap();
        assert_relative_eq!(gross, 0.022523, epsilon = 1e-6);
    }

    #[test]
    fn test_gross_up_strictly_increasing_in_acquisition() {
        let rates: Vec<f64> = [0.0, 0.025, 0.05, 0.075, 0.10]
            .iter()
            .map(|&a| gross_up(0.0135, 0.25, 0.15, 0.10, a).unwrap())
            .collect();
        assert!(rates.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn test_gross_up_invalid_scenario() {
        let err = gross_up(0.0135, 0.25, 0.50, 0.45, 0.10).unwrap_err();
        assert!(matches!(err, PricingError::InvalidScenario { .. }));
    }
}
