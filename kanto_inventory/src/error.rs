//! Error types for kanto_inventory

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for kanto_inventory operations
#[derive(Debug, Error)]
pub enum InventoryError {
    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// CSV file could not be read or decoded
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    /// Allocation workbook could not be opened
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Input path does not exist
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),
    /// Allocation sheet extension not recognised
    #[error("Unsupported allocation sheet: {}", .0.display())]
    UnsupportedSheet(PathBuf),
    /// Caller supplied a value the operation cannot accept
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// Item or allocation does not exist
    #[error("Not found: {0}")]
    NotFound(String),
    /// Allocating would exceed the sold stock of an item
    #[error("Cannot allocate {requested} of '{item}': only {available} available")]
    OverAllocated {
        item: String,
        requested: i64,
        available: i64,
    },
    /// A thread panicked while holding the database lock
    #[error("Database lock poisoned")]
    LockPoisoned,
    #[error(transparent)]
    Common(#[from] kanto_common::CommonError),
}

/// Short alias used across the crate
pub type Error = InventoryError;

/// Result alias for kanto_inventory operations
pub type Result<T> = std::result::Result<T, InventoryError>;
