//! CSV-based reference loader
//!
//! Loads the workbook sheets exported as CSV files from data/reference/

use super::columns::ColumnPolicy;
use super::keyed::ReferenceTable;
use super::table::Table;
use crate::bundling::RateMatrix;
use crate::credit::CreditType;
use crate::error::{PricingError, Result};
use std::path::Path;

/// Default path to the reference directory
pub const DEFAULT_REFERENCE_PATH: &str = "data/reference";

pub const PROVINCE_PRODUCTIVE_FILE: &str = "provinsi_produktif.csv";
pub const PROVINCE_CONSUMPTIVE_FILE: &str = "provinsi_konsumtif.csv";
pub const BANK_TYPE_FILE: &str = "jenis_bank.csv";
pub const SECTOR_FILE: &str = "sektor.csv";
pub const RATE_MATRIX_FILE: &str = "rate_matrix_produk.csv";

const CREDIT_FILES: [&str; 4] = [
    PROVINCE_PRODUCTIVE_FILE,
    PROVINCE_CONSUMPTIVE_FILE,
    BANK_TYPE_FILE,
    SECTOR_FILE,
];

/// The four tables the credit engine reads
#[derive(Debug, Clone)]
pub struct CreditTables {
    pub province_productive: ReferenceTable,
    pub province_consumptive: ReferenceTable,
    pub bank_type: ReferenceTable,
    pub sector: ReferenceTable,
}

impl CreditTables {
    /// Load all four credit tables from a directory; any failure aborts the load
    pub fn load_from(path: &Path, policy: ColumnPolicy) -> Result<Self> {
        Ok(Self {
            province_productive: ReferenceTable::province(
                &load_sheet(path, PROVINCE_PRODUCTIVE_FILE)?,
                policy,
            )?,
            province_consumptive: ReferenceTable::province(
                &load_sheet(path, PROVINCE_CONSUMPTIVE_FILE)?,
                policy,
            )?,
            bank_type: ReferenceTable::bank_type(&load_sheet(path, BANK_TYPE_FILE)?, policy)?,
            sector: ReferenceTable::sector(&load_sheet(path, SECTOR_FILE)?, policy)?,
        })
    }

    /// Province table for the credit type
    pub fn province_table(&self, credit_type: CreditType) -> &ReferenceTable {
        match credit_type {
            CreditType::Productive => &self.province_productive,
            CreditType::Consumptive => &self.province_consumptive,
        }
    }
}

/// All reference data for a session: loaded once, read-only afterwards
#[derive(Debug, Clone, Default)]
pub struct ReferenceStore {
    credit: Option<CreditTables>,
    rate_matrix: Option<RateMatrix>,
}

impl ReferenceStore {
    pub fn new(credit: Option<CreditTables>, rate_matrix: Option<RateMatrix>) -> Self {
        Self { credit, rate_matrix }
    }

    /// Load from the default path with exact column names
    pub fn load_default() -> Result<Self> {
        Self::load_from(Path::new(DEFAULT_REFERENCE_PATH), ColumnPolicy::Exact)
    }

    /// Load whichever table groups are present in `path`.
    ///
    /// A group is all-or-nothing: if some credit files exist but others are
    /// missing, the load fails rather than leaving a half-populated store.
    pub fn load_from(path: &Path, policy: ColumnPolicy) -> Result<Self> {
        let present: Vec<&str> = CREDIT_FILES
            .iter()
            .copied()
            .filter(|f| path.join(f).is_file())
            .collect();

        let credit = match present.len() {
            0 => None,
            n if n == CREDIT_FILES.len() => Some(CreditTables::load_from(path, policy)?),
            _ => {
                let missing = CREDIT_FILES
                    .iter()
                    .find(|f| !present.contains(*f))
                    .copied()
                    .unwrap_or_default();
                return Err(PricingError::MissingTable {
                    table: table_name(missing).to_string(),
                });
            }
        };

        let rate_matrix = if path.join(RATE_MATRIX_FILE).is_file() {
            Some(RateMatrix::from_table(&load_sheet(path, RATE_MATRIX_FILE)?, policy)?)
        } else {
            None
        };

        if credit.is_none() && rate_matrix.is_none() {
            return Err(PricingError::MissingTable {
                table: path.display().to_string(),
            });
        }

        log::info!(
            "Reference store loaded from {} (credit tables: {}, rate matrix: {})",
            path.display(),
            credit.is_some(),
            rate_matrix.is_some()
        );

        Ok(Self { credit, rate_matrix })
    }

    pub fn credit(&self) -> Result<&CreditTables> {
        self.credit.as_ref().ok_or_else(|| PricingError::MissingTable {
            table: "credit reference tables".to_string(),
        })
    }

    pub fn rate_matrix(&self) -> Result<&RateMatrix> {
        self.rate_matrix.as_ref().ok_or_else(|| PricingError::MissingTable {
            table: table_name(RATE_MATRIX_FILE).to_string(),
        })
    }
}

/// Table name derived from its file name
fn table_name(file: &str) -> &str {
    file.strip_suffix(".csv").unwrap_or(file)
}

fn load_sheet(path: &Path, file: &str) -> Result<Table> {
    Table::from_path(table_name(file), &path.join(file))
}
