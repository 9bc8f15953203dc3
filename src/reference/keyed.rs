//! Relativity / NPL tables keyed by a single categorical column

use super::columns::{ColumnPolicy, Field};
use super::table::Table;
use crate::error::{PricingError, Result};
use std::collections::HashMap;

/// One validated row of a keyed reference table
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceEntry {
    pub key: String,
    /// Present only on province tables
    pub average_npl: Option<f64>,
    pub average_relativity: f64,
}

/// Province, bank-type or sector table bound to its key and value columns
#[derive(Debug, Clone)]
pub struct ReferenceTable {
    name: String,
    key_column: String,
    entries: Vec<ReferenceEntry>,
    index: HashMap<String, usize>,
}

impl ReferenceTable {
    /// Bind and validate a raw table.
    ///
    /// Relativity must be a non-negative number and NPL (when required) a
    /// probability; anything else is fatal. Duplicate keys keep the first row.
    pub fn from_table(table: &Table, key: Field, with_npl: bool, policy: ColumnPolicy) -> Result<Self> {
        let key_idx = policy.resolve(table, key)?;
        let rel_idx = policy.resolve(table, Field::AverageRelativity)?;
        let npl_idx = if with_npl {
            Some(policy.resolve(table, Field::AverageNpl)?)
        } else {
            None
        };

        let mut entries = Vec::with_capacity(table.len());
        let mut index = HashMap::new();

        for row in 0..table.len() {
            let Some(key_value) = table.cell(row, key_idx) else {
                log::debug!("Skipping row {} of '{}': empty key", row + 1, table.name());
                continue;
            };

            let relativity = table.number(row, rel_idx)?;
            if relativity < 0.0 {
                return Err(invalid(table, row, rel_idx, "relativity must be >= 0"));
            }

            let average_npl = match npl_idx {
                Some(idx) => {
                    let npl = table.number(row, idx)?;
                    if !(0.0..=1.0).contains(&npl) {
                        return Err(invalid(table, row, idx, "NPL must lie in [0, 1]"));
                    }
                    Some(npl)
                }
                None => None,
            };

            if index.contains_key(key_value) {
                log::warn!(
                    "Duplicate key '{}' in '{}' (row {}), keeping the first occurrence",
                    key_value,
                    table.name(),
                    row + 1
                );
                continue;
            }

            index.insert(key_value.to_string(), entries.len());
            entries.push(ReferenceEntry {
                key: key_value.to_string(),
                average_npl,
                average_relativity: relativity,
            });
        }

        log::info!("Bound '{}': {} keys", table.name(), entries.len());

        Ok(Self {
            name: table.name().to_string(),
            key_column: table.headers()[key_idx].clone(),
            entries,
            index,
        })
    }

    /// Province table (`Provinsi`/`Wilayah`, `Average NPL`, `Average Relativity`)
    pub fn province(table: &Table, policy: ColumnPolicy) -> Result<Self> {
        Self::from_table(table, Field::Province, true, policy)
    }

    /// Bank-type table (`Jenis Bank`, `Average Relativity`)
    pub fn bank_type(table: &Table, policy: ColumnPolicy) -> Result<Self> {
        Self::from_table(table, Field::BankType, false, policy)
    }

    /// Sector table (`Sektor`, `Average Relativity`)
    pub fn sector(table: &Table, policy: ColumnPolicy) -> Result<Self> {
        Self::from_table(table, Field::Sector, false, policy)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Keys in sheet order, first occurrence only
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.key.as_str())
    }

    pub fn entries(&self) -> &[ReferenceEntry] {
        &self.entries
    }

    /// Entry for a key, matched exactly after trimming
    pub fn entry(&self, key: &str) -> Result<&ReferenceEntry> {
        let key = key.trim();
        self.index
            .get(key)
            .map(|&idx| &self.entries[idx])
            .ok_or_else(|| PricingError::LookupNotFound {
                table: self.name.clone(),
                column: self.key_column.clone(),
                key: key.to_string(),
            })
    }

    pub fn relativity(&self, key: &str) -> Result<f64> {
        Ok(self.entry(key)?.average_relativity)
    }

    pub fn npl(&self, key: &str) -> Result<f64> {
        self.entry(key)?
            .average_npl
            .ok_or_else(|| PricingError::MissingReferenceColumn {
                table: self.name.clone(),
                column: Field::AverageNpl.canonical_name().to_string(),
            })
    }
}

fn invalid(table: &Table, row: usize, column: usize, reason: &str) -> PricingError {
    PricingError::InvalidReferenceValue {
        table: table.name().to_string(),
        row: row + 1,
        column: table.headers()[column].clone(),
        value: table.cell(row, column).unwrap_or("").to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROVINCES: &str = "Provinsi,Average NPL,Average Relativity\n\
        DKI Jakarta,0.0310,0.90\n\
        Jawa Barat ,0.0500,1.00\n\
        Jawa Barat,0.0900,1.40\n\
        ,0.0400,1.00\n";

    fn provinces() -> ReferenceTable {
        let table = Table::from_reader("provinsi_konsumtif", PROVINCES.as_bytes()).unwrap();
        ReferenceTable::province(&table, ColumnPolicy::Exact).unwrap()
    }

    #[test]
    fn test_entries_agree_with_raw_sheet() {
        let table = Table::from_reader("provinsi_konsumtif", PROVINCES.as_bytes()).unwrap();
        let bound = ReferenceTable::province(&table, ColumnPolicy::Exact).unwrap();
        for key in bound.keys() {
            assert_eq!(
                bound.npl(key).unwrap(),
                table.value_of("Provinsi", key, "Average NPL").unwrap()
            );
            assert_eq!(
                bound.relativity(key).unwrap(),
                table.value_of("Provinsi", key, "Average Relativity").unwrap()
            );
        }
        assert!(bound.relativity("Bali").is_err());
        assert!(table.value_of("Provinsi", "Bali", "Average Relativity").is_err());
    }

    #[test]
    fn test_duplicate_key_keeps_first_row() {
        let t = provinces();
        assert_eq!(t.npl("Jawa Barat").unwrap(), 0.05);
        assert_eq!(t.relativity(" Jawa Barat ").unwrap(), 1.00);
        assert_eq!(t.keys().collect::<Vec<_>>(), vec!["DKI Jakarta", "Jawa Barat"]);
    }

    #[test]
    fn test_repeated_lookups_are_deterministic() {
        let t = provinces();
        let first = t.npl("Jawa Barat").unwrap();
        for _ in 0..10 {
            assert_eq!(t.npl("Jawa Barat").unwrap(), first);
        }
    }

    #[test]
    fn test_unknown_key_never_defaults() {
        let t = provinces();
        let err = t.relativity("Papua").unwrap_err();
        assert!(matches!(err, PricingError::LookupNotFound { ref column, .. } if column == "Provinsi"));
    }

    #[test]
    fn test_negative_relativity_rejected() {
        let csv = "Jenis Bank,Average Relativity\nBPR,-0.5\n";
        let table = Table::from_reader("jenis_bank", csv.as_bytes()).unwrap();
        let err = ReferenceTable::bank_type(&table, ColumnPolicy::Exact).unwrap_err();
        assert!(matches!(err, PricingError::InvalidReferenceValue { .. }));
        assert!(err.is_session_fatal());
    }

    #[test]
    fn test_npl_missing_on_bank_table() {
        let csv = "Jenis Bank,Average Relativity\nBUMN,0.85\n";
        let table = Table::from_reader("jenis_bank", csv.as_bytes()).unwrap();
        let t = ReferenceTable::bank_type(&table, ColumnPolicy::Exact).unwrap();
        assert!(t.npl("BUMN").is_err());
        assert_eq!(t.relativity("BUMN").unwrap(), 0.85);
    }

    #[test]
    fn test_missing_relativity_column_is_fatal() {
        let csv = "Sektor,Relatif\nPertanian,1.1\n";
        let table = Table::from_reader("sektor", csv.as_bytes()).unwrap();
        let err = ReferenceTable::sector(&table, ColumnPolicy::Exact).unwrap_err();
        assert!(matches!(err, PricingError::MissingReferenceColumn { .. }));
    }
}
