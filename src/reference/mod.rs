//! Reference table store: categorical lookup tables loaded from the workbook export

mod columns;
mod keyed;
mod table;
pub mod loader;

pub use columns::{ColumnPolicy, Field};
pub use keyed::{ReferenceEntry, ReferenceTable};
pub use loader::{CreditTables, ReferenceStore, DEFAULT_REFERENCE_PATH};
pub use table::{normalize_cell, parse_number, Table};
