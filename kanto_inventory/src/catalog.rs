//! Product catalog: display names, images, unit costs and set overrides
//!
//! Entries are keyed by the Custom-normalized item name, the same key used by
//! allocations. Every setter is an upsert so a product can be described
//! before or after it first sells.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use crate::database::DbResult;
use crate::error::{InventoryError, Result};
use crate::reporting::inventory_items;

/// URL prefix for images served from the local images directory
pub const LOCAL_IMAGE_PREFIX: &str = "/images/";

/// One catalog row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductEntry {
    pub normalized_item_name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub unit_cost: f64,
    pub set_name: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl ProductEntry {
    fn from_row(row: &Row<'_>) -> DbResult<Self> {
        Ok(ProductEntry {
            normalized_item_name: row.get(0)?,
            description: row.get(1)?,
            image_url: row.get(2)?,
            thumbnail_url: row.get(3)?,
            unit_cost: row.get(4)?,
            set_name: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }
}

const SELECT_PRODUCT: &str = "SELECT normalized_item_name, description, image_url, thumbnail_url,
        unit_cost, set_name, created_at, updated_at
 FROM products";

/// Look up the catalog entry for a normalized name
pub fn get_product(conn: &Connection, normalized: &str) -> DbResult<Option<ProductEntry>> {
    let mut stmt = conn.prepare_cached(&format!("{SELECT_PRODUCT} WHERE normalized_item_name = ?1"))?;
    stmt.query_row(params![normalized], ProductEntry::from_row)
        .optional()
}

/// All catalog entries, ordered by name
pub fn all_products(conn: &Connection) -> DbResult<Vec<ProductEntry>> {
    let mut stmt = conn.prepare(&format!("{SELECT_PRODUCT} ORDER BY normalized_item_name"))?;
    let products: DbResult<Vec<ProductEntry>> =
        stmt.query_map([], ProductEntry::from_row)?.collect();
    products
}

/// Catalog unit cost, 0.00 when the product has no entry
pub fn unit_cost_for(conn: &Connection, normalized: &str) -> DbResult<f64> {
    conn.query_row(
        "SELECT unit_cost FROM products WHERE normalized_item_name = ?1",
        params![normalized],
        |row| row.get(0),
    )
    .optional()
    .map(|cost| cost.unwrap_or(0.0))
}

fn require_name(normalized: &str) -> Result<&str> {
    let trimmed = normalized.trim();
    if trimmed.is_empty() {
        return Err(InventoryError::InvalidInput(
            "item name must not be empty".to_string(),
        ));
    }
    Ok(trimmed)
}

fn blank_to_none(value: &str) -> Option<&str> {
    Some(value.trim()).filter(|v| !v.is_empty())
}

/// Set or clear the image of a product
pub fn set_image(
    conn: &Connection,
    normalized: &str,
    image_url: &str,
    thumbnail_url: Option<&str>,
) -> Result<()> {
    let name = require_name(normalized)?;
    conn.execute(
        "INSERT INTO products (normalized_item_name, image_url, thumbnail_url)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(normalized_item_name) DO UPDATE SET
            image_url = excluded.image_url,
            thumbnail_url = excluded.thumbnail_url,
            updated_at = datetime('now')",
        params![name, blank_to_none(image_url), thumbnail_url.and_then(blank_to_none)],
    )?;
    log::info!("Updated image for '{}'", name);
    Ok(())
}

/// Set the display name shown instead of the normalized title
pub fn set_display_name(conn: &Connection, normalized: &str, display_name: &str) -> Result<()> {
    let name = require_name(normalized)?;
    let display = blank_to_none(display_name).ok_or_else(|| {
        InventoryError::InvalidInput("display name must not be empty".to_string())
    })?;
    conn.execute(
        "INSERT INTO products (normalized_item_name, description)
         VALUES (?1, ?2)
         ON CONFLICT(normalized_item_name) DO UPDATE SET
            description = excluded.description,
            updated_at = datetime('now')",
        params![name, display],
    )?;
    log::info!("Renamed '{}' to '{}'", name, display);
    Ok(())
}

/// Set the unit cost used when valuing allocations
pub fn set_unit_cost(conn: &Connection, normalized: &str, unit_cost: f64) -> Result<()> {
    let name = require_name(normalized)?;
    if !unit_cost.is_finite() || unit_cost < 0.0 {
        return Err(InventoryError::InvalidInput(format!(
            "unit cost must be a non-negative number, got {unit_cost}"
        )));
    }
    conn.execute(
        "INSERT INTO products (normalized_item_name, unit_cost)
         VALUES (?1, ?2)
         ON CONFLICT(normalized_item_name) DO UPDATE SET
            unit_cost = excluded.unit_cost,
            updated_at = datetime('now')",
        params![name, unit_cost],
    )?;
    log::info!("Set unit cost of '{}' to {:.2}", name, unit_cost);
    Ok(())
}

/// Override the set a product is grouped under
pub fn set_set_name(conn: &Connection, normalized: &str, set_name: &str) -> Result<()> {
    let name = require_name(normalized)?;
    conn.execute(
        "INSERT INTO products (normalized_item_name, set_name)
         VALUES (?1, ?2)
         ON CONFLICT(normalized_item_name) DO UPDATE SET
            set_name = excluded.set_name,
            updated_at = datetime('now')",
        params![name, blank_to_none(set_name)],
    )?;
    Ok(())
}

/// Inventory items (Custom names) that have no catalog entry yet
pub fn products_without_entry(conn: &Connection) -> Result<Vec<String>> {
    let mut missing = Vec::new();
    for item in inventory_items(conn)? {
        if get_product(conn, &item.normalized_name)?.is_none() {
            missing.push(item.normalized_name);
        }
    }
    missing.sort();
    missing.dedup();
    Ok(missing)
}

/// Browser-facing URL for a stored image reference
///
/// Remote and absolute urls pass through; a bare file name is served from
/// the images directory.
pub fn public_image_url(stored: Option<&str>) -> Option<String> {
    let stored = stored.map(str::trim).filter(|s| !s.is_empty())?;
    if stored.starts_with("http://") || stored.starts_with("https://") || stored.starts_with('/') {
        return Some(stored.to_string());
    }
    let file_name = stored.rsplit(['/', '\\']).next().unwrap_or(stored);
    Some(format!("{LOCAL_IMAGE_PREFIX}{file_name}"))
}
