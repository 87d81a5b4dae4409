//! Kanto Inventory - seller export ingestion, reporting and owner allocations
//!
//! Sales exports are loaded into SQLite, grouped into product identities,
//! and split between owners from an allocation sheet or the web dashboard.

pub mod allocation;
pub mod catalog;
pub mod database;
pub mod error;
pub mod ingestion;
pub mod inventory;
pub mod reporting;
pub mod sales_csv;
pub mod web;

pub use allocation::{
    allocation_summary, import_allocations, load_allocation_sheets, AllocationSummary,
    ImportSummary,
};
pub use database::{backup_to, init_schema, open_database};
pub use error::{Error, InventoryError, Result};
pub use ingestion::{ingest_csv_files, IngestResult};
pub use reporting::{build_report, item_counts, ItemCount, ItemReport, ReportOptions};
