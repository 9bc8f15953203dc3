//! Acquisition cost policy: regulated (locked) coverages and the global maximum

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Maximum acquisition for coverages without a regulated value
pub const DEFAULT_MAX_ACQUISITION: f64 = 0.20;

/// Coverages whose acquisition is fixed by regulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionPolicy {
    locked: BTreeMap<String, f64>,
}

impl Default for AcquisitionPolicy {
    fn default() -> Self {
        let mut locked = BTreeMap::new();
        locked.insert("Property".to_string(), 0.15);
        locked.insert("Motorvehicle".to_string(), 0.25);
        Self { locked }
    }
}

impl AcquisitionPolicy {
    pub fn new(locked: BTreeMap<String, f64>) -> Self {
        Self { locked }
    }

    /// Policy without regulated coverages
    pub fn unlocked() -> Self {
        Self::new(BTreeMap::new())
    }

    pub fn locked_for(&self, coverage: &str) -> Option<f64> {
        self.locked.get(coverage.trim()).copied()
    }

    pub fn is_locked(&self, coverage: &str) -> bool {
        self.locked_for(coverage).is_some()
    }

    /// Acquisition actually priced: the locked value wins over any request
    pub fn effective_acquisition(&self, coverage: &str, requested: f64) -> f64 {
        self.locked_for(coverage).unwrap_or(requested)
    }

    /// Reject a negative acquisition, or one above `maximum` on a non-locked coverage
    pub fn validate(
        &self,
        product: usize,
        coverage: &str,
        acquisition: f64,
        maximum: f64,
    ) -> Result<(), ValidationError> {
        if self.is_locked(coverage) {
            return Ok(());
        }
        if acquisition.is_nan() || acquisition < 0.0 {
            return Err(ValidationError::OutOfBounds {
                field: format!("product {} acquisition", product),
                value: acquisition,
                min: 0.0,
                max: maximum,
            });
        }
        if acquisition > maximum {
            return Err(ValidationError::AcquisitionAboveMaximum {
                product,
                acquisition,
                maximum,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locked_value_overrides_request() {
        let policy = AcquisitionPolicy::default();
        assert_eq!(policy.effective_acquisition("Property", 0.18), 0.15);
        assert_eq!(policy.effective_acquisition("Motorvehicle", 0.05), 0.25);
        assert_eq!(policy.effective_acquisition("Engineering", 0.125), 0.125);
    }

    #[test]
    fn test_maximum_applies_only_to_unlocked() {
        let policy = AcquisitionPolicy::default();
        assert!(policy.validate(1, "Motorvehicle", 0.25, 0.20).is_ok());
        assert!(policy.validate(2, "Engineering", 0.20, 0.20).is_ok());
        assert_eq!(
            policy.validate(3, "Engineering", 0.21, 0.20),
            Err(ValidationError::AcquisitionAboveMaximum {
                product: 3,
                acquisition: 0.21,
                maximum: 0.20
            })
        );
    }

    #[test]
    fn test_negative_acquisition_rejected() {
        let policy = AcquisitionPolicy::unlocked();
        assert!(policy.validate(1, "Property", -0.01, 0.20).is_err());
    }
}
