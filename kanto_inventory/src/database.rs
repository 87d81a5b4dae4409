//! SQLite store for sales transactions, allocations and the product catalog
//!
//! Uses parameterized queries exclusively (no SQL string concatenation).
//! Multi-row writes go through a transaction.

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use crate::error::{InventoryError, Result};

/// Result type for database operations
pub type DbResult<T> = rusqlite::Result<T>;

/// Timestamp layout stored in TEXT columns
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Open (or create) the database at `path` and initialise the schema
pub fn open_database(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
            log::info!("Created directory: {}", parent.display());
        }
    }
    let conn = Connection::open(path)?;
    log::info!("Opened database: {}", path.display());
    init_schema(&conn)?;
    Ok(conn)
}

/// Initialize the database schema
///
/// Creates tables if they don't exist:
/// - `transactions`: one row per seller order line, unique by order id
/// - `allocations`: owner shares of an item, unique per (item, owner)
/// - `products`: catalog of display names, images and unit costs
pub fn init_schema(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            order_id TEXT NOT NULL UNIQUE,
            listing_title TEXT NOT NULL,
            listing_description TEXT,
            product_category TEXT,
            buy_format TEXT,
            sale_type TEXT,
            quantity_sold INTEGER NOT NULL DEFAULT 1,
            transaction_amount REAL NOT NULL DEFAULT 0,
            buyer_paid REAL NOT NULL DEFAULT 0,
            original_item_price REAL NOT NULL DEFAULT 0,
            transaction_type TEXT NOT NULL,
            buyer_name TEXT,
            buyer_state TEXT,
            buyer_country TEXT,
            order_placed_at TEXT,
            transaction_completed_at TEXT,
            source_file TEXT NOT NULL,
            is_sale INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_transactions_title ON transactions(listing_title);
        CREATE INDEX IF NOT EXISTS idx_transactions_buyer ON transactions(buyer_name);

        CREATE TABLE IF NOT EXISTS allocations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            normalized_item_name TEXT NOT NULL,
            owner TEXT NOT NULL,
            allocated_quantity INTEGER NOT NULL,
            unit_cost REAL NOT NULL DEFAULT 0,
            sheet_item_name TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE (normalized_item_name, owner)
        );

        CREATE INDEX IF NOT EXISTS idx_allocations_owner ON allocations(owner);

        CREATE TABLE IF NOT EXISTS products (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            normalized_item_name TEXT NOT NULL UNIQUE,
            description TEXT,
            image_url TEXT,
            thumbnail_url TEXT,
            unit_cost REAL NOT NULL DEFAULT 0,
            set_name TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        ",
    )?;

    log::debug!("Database schema initialized");
    Ok(())
}

/// A transaction row ready to be stored
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    pub order_id: String,
    pub listing_title: String,
    pub listing_description: Option<String>,
    pub product_category: Option<String>,
    pub buy_format: Option<String>,
    pub sale_type: Option<String>,
    pub quantity_sold: i64,
    pub transaction_amount: f64,
    pub buyer_paid: f64,
    pub original_item_price: f64,
    pub transaction_type: String,
    pub buyer_name: Option<String>,
    pub buyer_state: Option<String>,
    pub buyer_country: Option<String>,
    pub order_placed_at: Option<NaiveDateTime>,
    pub transaction_completed_at: Option<NaiveDateTime>,
    pub source_file: String,
    pub is_sale: bool,
}

/// The columns reporting needs from a stored transaction
#[derive(Debug, Clone, PartialEq)]
pub struct SoldLine {
    pub id: i64,
    pub listing_title: String,
    pub buyer_name: Option<String>,
    pub quantity_sold: i64,
}

fn format_timestamp(value: Option<NaiveDateTime>) -> Option<String> {
    value.map(|t| t.format(TIMESTAMP_FORMAT).to_string())
}

/// Insert a transaction unless its order id is already stored
///
/// Returns `false` when the order id was a duplicate.
pub fn insert_transaction(conn: &Connection, record: &TransactionRecord) -> DbResult<bool> {
    let mut stmt = conn.prepare_cached(
        "INSERT OR IGNORE INTO transactions
         (order_id, listing_title, listing_description, product_category, buy_format, sale_type,
          quantity_sold, transaction_amount, buyer_paid, original_item_price, transaction_type,
          buyer_name, buyer_state, buyer_country, order_placed_at, transaction_completed_at,
          source_file, is_sale)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
    )?;

    let changed = stmt.execute(params![
        &record.order_id,
        &record.listing_title,
        &record.listing_description,
        &record.product_category,
        &record.buy_format,
        &record.sale_type,
        record.quantity_sold,
        record.transaction_amount,
        record.buyer_paid,
        record.original_item_price,
        &record.transaction_type,
        &record.buyer_name,
        &record.buyer_state,
        &record.buyer_country,
        format_timestamp(record.order_placed_at),
        format_timestamp(record.transaction_completed_at),
        &record.source_file,
        record.is_sale,
    ])?;
    Ok(changed > 0)
}

/// Check whether an order id is already stored
pub fn order_exists(conn: &Connection, order_id: &str) -> DbResult<bool> {
    conn.query_row(
        "SELECT 1 FROM transactions WHERE order_id = ?1",
        params![order_id],
        |_| Ok(()),
    )
    .optional()
    .map(|found| found.is_some())
}

/// Load sold lines, optionally including giveaways and other non-sales
pub fn sold_lines(conn: &Connection, include_non_sales: bool) -> DbResult<Vec<SoldLine>> {
    let mut stmt = conn.prepare(
        "SELECT id, listing_title, buyer_name, quantity_sold
         FROM transactions
         WHERE is_sale = 1 OR ?1
         ORDER BY id",
    )?;

    let lines: DbResult<Vec<SoldLine>> = stmt
        .query_map(params![include_non_sales], |row| {
            Ok(SoldLine {
                id: row.get(0)?,
                listing_title: row.get(1)?,
                buyer_name: row.get(2)?,
                quantity_sold: row.get(3)?,
            })
        })?
        .collect();
    lines
}

/// Overwrite the stored quantity of one transaction
pub fn set_transaction_quantity(conn: &Connection, id: i64, quantity: i64) -> DbResult<usize> {
    conn.execute(
        "UPDATE transactions SET quantity_sold = ?2 WHERE id = ?1",
        params![id, quantity],
    )
}

/// Delete one transaction by row id
pub fn delete_transaction(conn: &Connection, id: i64) -> DbResult<usize> {
    conn.execute("DELETE FROM transactions WHERE id = ?1", params![id])
}

/// Get total count of stored transactions
pub fn get_transaction_count(conn: &Connection) -> DbResult<i64> {
    conn.query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))
}

/// Write a consistent copy of the database to `destination`
pub fn backup_to(conn: &Connection, destination: &Path) -> Result<()> {
    if destination.exists() {
        return Err(InventoryError::InvalidInput(format!(
            "backup destination already exists: {}",
            destination.display()
        )));
    }
    let target = destination.to_string_lossy().to_string();
    conn.execute("VACUUM INTO ?1", params![target])?;
    log::info!("Database backed up to {}", destination.display());
    Ok(())
}
