//! Bundling rate matrix and most-specific-match lookup
//!
//! Each row carries `Coverage`, `Subcover`, `Rate` and a set of nullable factor
//! columns. A null factor is a wildcard. Among the rows that survive filtering,
//! the one with the fewest wildcards wins; ties go to the earliest row.

use crate::error::{PricingError, Result, ValidationError};
use crate::reference::{ColumnPolicy, Field, Table};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;

/// Selected factor values keyed by factor column
pub type FactorSelection = BTreeMap<String, String>;

/// One row of the rate matrix
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateMatrixRow {
    /// 1-based data row in the source sheet
    pub row_number: usize,
    pub coverage: String,
    pub subcover: String,
    pub rate: f64,
    /// Aligned with `RateMatrix::factor_columns`; `None` is a wildcard
    pub factors: Vec<Option<String>>,
}

impl RateMatrixRow {
    /// Number of wildcard factors; lower is more specific
    pub fn specificity_score(&self) -> usize {
        self.factors.iter().filter(|f| f.is_none()).count()
    }

    fn is_context(&self, coverage: &str, subcover: &str) -> bool {
        self.coverage == coverage && self.subcover == subcover
    }

    /// Stored value equals the selection, or is a wildcard
    fn accepts(&self, column: usize, value: &str) -> bool {
        match &self.factors[column] {
            Some(stored) => stored == value,
            None => true,
        }
    }
}

/// Dropdown state for one factor column, derived from the current selections
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactorChoice {
    pub column: String,
    /// Sorted distinct non-null values still reachable
    pub values: Vec<String>,
    /// The current selection, if it is still one of `values`
    pub selected: Option<String>,
}

/// Flat rate matrix keyed by coverage / subcover / factor columns
#[derive(Debug, Clone)]
pub struct RateMatrix {
    name: String,
    factor_columns: Vec<String>,
    rows: Vec<RateMatrixRow>,
}

impl RateMatrix {
    /// Bind a raw sheet. Every column other than coverage, subcover and rate is a factor.
    pub fn from_table(table: &Table, policy: ColumnPolicy) -> Result<Self> {
        let coverage_idx = policy.resolve(table, Field::Coverage)?;
        let subcover_idx = policy.resolve(table, Field::Subcover)?;
        let rate_idx = policy.resolve(table, Field::Rate)?;
        let fixed = [coverage_idx, subcover_idx, rate_idx];

        let factor_idx: Vec<usize> = (0..table.headers().len())
            .filter(|i| !fixed.contains(i))
            .collect();
        let factor_columns = factor_idx
            .iter()
            .map(|&i| table.headers()[i].clone())
            .collect();

        let mut rows = Vec::with_capacity(table.len());
        for row in 0..table.len() {
            if table.rows()[row].iter().all(Option::is_none) {
                continue;
            }

            let required = |idx: usize| {
                table
                    .cell(row, idx)
                    .map(str::to_string)
                    .ok_or_else(|| PricingError::InvalidReferenceValue {
                        table: table.name().to_string(),
                        row: row + 1,
                        column: table.headers()[idx].clone(),
                        value: String::new(),
                        reason: "required cell is empty".to_string(),
                    })
            };

            let coverage = required(coverage_idx)?;
            let subcover = required(subcover_idx)?;
            let rate = table.number(row, rate_idx)?;
            if rate < 0.0 {
                return Err(PricingError::InvalidReferenceValue {
                    table: table.name().to_string(),
                    row: row + 1,
                    column: table.headers()[rate_idx].clone(),
                    value: rate.to_string(),
                    reason: "rate must be >= 0".to_string(),
                });
            }

            let factors = factor_idx
                .iter()
                .map(|&i| table.cell(row, i).map(str::to_string))
                .collect();

            rows.push(RateMatrixRow {
                row_number: row + 1,
                coverage,
                subcover,
                rate,
                factors,
            });
        }

        log::info!(
            "Rate matrix '{}': {} rows, factor columns {:?}",
            table.name(),
            rows.len(),
            factor_columns
        );

        Ok(Self {
            name: table.name().to_string(),
            factor_columns,
            rows,
        })
    }

    /// Load from any CSV reader
    pub fn from_reader<R: Read>(reader: R, policy: ColumnPolicy) -> Result<Self> {
        Self::from_table(&Table::from_reader("rate_matrix_produk", reader)?, policy)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn factor_columns(&self) -> &[String] {
        &self.factor_columns
    }

    pub fn rows(&self) -> &[RateMatrixRow] {
        &self.rows
    }

    /// Distinct coverages, sorted
    pub fn coverages(&self) -> Vec<String> {
        let set: BTreeSet<&str> = self.rows.iter().map(|r| r.coverage.as_str()).collect();
        set.into_iter().map(str::to_string).collect()
    }

    /// Distinct subcovers of a coverage, sorted
    pub fn subcovers(&self, coverage: &str) -> Vec<String> {
        let coverage = coverage.trim();
        let set: BTreeSet<&str> = self
            .rows
            .iter()
            .filter(|r| r.coverage == coverage)
            .map(|r| r.subcover.as_str())
            .collect();
        set.into_iter().map(str::to_string).collect()
    }

    /// Factor columns with at least one non-null value for this coverage/subcover, in sheet order
    pub fn context_factor_columns(&self, coverage: &str, subcover: &str) -> Vec<String> {
        let (coverage, subcover) = (coverage.trim(), subcover.trim());
        self.factor_columns
            .iter()
            .enumerate()
            .filter(|(i, _)| {
                self.rows
                    .iter()
                    .any(|r| r.is_context(coverage, subcover) && r.factors[*i].is_some())
            })
            .map(|(_, c)| c.clone())
            .collect()
    }

    /// Dropdown values per context factor column.
    ///
    /// Each column's values come from the context already narrowed by the
    /// selections made in earlier columns (match-or-wildcard), so the result is
    /// a pure function of the current selections.
    pub fn factor_choices(
        &self,
        coverage: &str,
        subcover: &str,
        selections: &FactorSelection,
    ) -> Vec<FactorChoice> {
        let (coverage, subcover) = (coverage.trim(), subcover.trim());
        let mut context: Vec<&RateMatrixRow> = self
            .rows
            .iter()
            .filter(|r| r.is_context(coverage, subcover))
            .collect();

        let mut choices = Vec::new();
        for column in self.context_factor_columns(coverage, subcover) {
            let Some(idx) = self.factor_index(&column) else {
                continue;
            };

            let values: Vec<String> = context
                .iter()
                .filter_map(|r| r.factors[idx].as_deref())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .map(str::to_string)
                .collect();

            let selected = selections
                .get(&column)
                .map(|v| v.trim().to_string())
                .filter(|v| values.contains(v));

            if let Some(value) = &selected {
                context.retain(|r| r.accepts(idx, value));
            }

            choices.push(FactorChoice {
                column,
                values,
                selected,
            });
        }

        choices
    }

    /// Most specific row for a complete selection
    pub fn lookup_row(
        &self,
        coverage: &str,
        subcover: &str,
        factors: &FactorSelection,
    ) -> Result<&RateMatrixRow> {
        let (coverage, subcover) = (coverage.trim(), subcover.trim());

        let mut constraints = Vec::with_capacity(factors.len());
        for (column, value) in factors {
            let idx = self
                .factor_index(column)
                .ok_or_else(|| ValidationError::UnknownFactorColumn {
                    column: column.clone(),
                })?;
            constraints.push((idx, value.trim()));
        }

        // min_by_key keeps the first of equal minima, so ties resolve to sheet order
        let best = self
            .rows
            .iter()
            .filter(|r| r.is_context(coverage, subcover))
            .filter(|r| constraints.iter().all(|&(idx, value)| r.accepts(idx, value)))
            .min_by_key(|r| r.specificity_score());

        match best {
            Some(row) => {
                log::debug!(
                    "{} / {} matched row {} (score {}, rate {})",
                    coverage,
                    subcover,
                    row.row_number,
                    row.specificity_score(),
                    row.rate
                );
                Ok(row)
            }
            None => Err(PricingError::RateNotFound {
                coverage: coverage.to_string(),
                subcover: subcover.to_string(),
            }),
        }
    }

    /// Base rate of the most specific matching row
    pub fn lookup(&self, coverage: &str, subcover: &str, factors: &FactorSelection) -> Result<f64> {
        self.lookup_row(coverage, subcover, factors).map(|r| r.rate)
    }

    fn factor_index(&self, column: &str) -> Option<usize> {
        let column = column.trim();
        self.factor_columns.iter().position(|c| c == column)
    }
}
