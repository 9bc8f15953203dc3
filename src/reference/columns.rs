//! Binding of logical fields to physical sheet columns
//!
//! Reference files are exported by hand and their headers drift. `Exact` accepts
//! only the known header names; `Keyword` prefers those and otherwise accepts any
//! header containing a keyword, so renamed headers ("Avg. Relativity (2024)")
//! still bind without code changes.

use super::table::Table;
use crate::error::{PricingError, Result};
use serde::{Deserialize, Serialize};

/// Logical reference columns the engines read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Province,
    AverageNpl,
    AverageRelativity,
    BankType,
    Sector,
    Coverage,
    Subcover,
    Rate,
}

impl Field {
    /// Name reported when the column cannot be found
    pub fn canonical_name(&self) -> &'static str {
        match self {
            Field::Province => "Provinsi",
            Field::AverageNpl => "Average NPL",
            Field::AverageRelativity => "Average Relativity",
            Field::BankType => "Jenis Bank",
            Field::Sector => "Sektor",
            Field::Coverage => "Coverage",
            Field::Subcover => "Subcover",
            Field::Rate => "Rate",
        }
    }

    fn exact_names(&self) -> &'static [&'static str] {
        match self {
            Field::Province => &["Provinsi", "Wilayah"],
            Field::AverageNpl => &["Average NPL"],
            Field::AverageRelativity => &["Average Relativity"],
            Field::BankType => &["Jenis Bank"],
            Field::Sector => &["Sektor"],
            Field::Coverage => &["Coverage"],
            Field::Subcover => &["Subcover"],
            Field::Rate => &["Rate"],
        }
    }

    /// Lowercase substrings accepted under the keyword policy
    fn keywords(&self) -> &'static [&'static str] {
        match self {
            Field::Province => &["provinsi", "wilayah", "province"],
            Field::AverageNpl => &["npl"],
            Field::AverageRelativity => &["relativ"],
            Field::BankType => &["bank"],
            Field::Sector => &["sektor", "sector"],
            Field::Coverage => &["coverage"],
            Field::Subcover => &["subcover"],
            Field::Rate => &["rate"],
        }
    }
}

/// Column resolution policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnPolicy {
    /// Header must equal one of the known names
    #[default]
    Exact,
    /// A known header name if present, else the first header (in sheet order)
    /// containing a keyword, case-insensitive
    Keyword,
}

impl ColumnPolicy {
    /// Resolve `field` to a column position in `table`
    pub fn resolve(&self, table: &Table, field: Field) -> Result<usize> {
        let headers = table.headers();
        let exact = field
            .exact_names()
            .iter()
            .find_map(|name| headers.iter().position(|h| h == name));
        let found = match self {
            ColumnPolicy::Exact => exact,
            ColumnPolicy::Keyword => exact.or_else(|| {
                headers.iter().position(|h| {
                    let lower = h.to_lowercase();
                    field.keywords().iter().any(|kw| lower.contains(kw))
                })
            }),
        };

        match found {
            Some(idx) => {
                log::debug!(
                    "Bound {:?} to column '{}' of '{}'",
                    field,
                    headers[idx],
                    table.name()
                );
                Ok(idx)
            }
            None => Err(PricingError::MissingReferenceColumn {
                table: table.name().to_string(),
                column: field.canonical_name().to_string(),
            }),
        }
    }
}
