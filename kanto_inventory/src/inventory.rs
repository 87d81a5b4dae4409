//! Direct edits of the sold stock from the dashboard

use rusqlite::{params, Connection};
use serde::Serialize;

use kanto_common::{normalize_title, TitleMatch};

use crate::allocation::{allocated_total, delete_item_allocations};
use crate::catalog::get_product;
use crate::database::{
    delete_transaction, insert_transaction, set_transaction_quantity, sold_lines,
    TransactionRecord,
};
use crate::error::{InventoryError, Result};
use crate::sales_csv::ORDER_EARNINGS;

/// Source file recorded on hand-entered stock
pub const MANUAL_SOURCE: &str = "MANUAL";
/// Buyer recorded on hand-entered stock
pub const MANUAL_BUYER: &str = "MANUAL_ENTRY";

/// A hand-entered inventory item
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManualItem {
    pub order_id: String,
    pub normalized_name: String,
    pub quantity: i64,
}

/// Row ids of every transaction whose title normalizes (Custom) to `normalized`
fn matching_transactions(conn: &Connection, normalized: &str) -> Result<Vec<i64>> {
    let ids: Vec<i64> = sold_lines(conn, true)?
        .into_iter()
        .filter(|line| normalize_title(&line.listing_title, TitleMatch::Custom) == normalized)
        .map(|line| line.id)
        .collect();
    if ids.is_empty() {
        return Err(InventoryError::NotFound(format!(
            "no transactions for '{normalized}'"
        )));
    }
    Ok(ids)
}

/// Overwrite the stock of an item
///
/// The earliest matching transaction takes the whole quantity and the rest
/// drop to zero, so the item total equals `quantity`. Stock may not drop
/// below what is already allocated to owners.
pub fn set_item_quantity(conn: &mut Connection, normalized: &str, quantity: i64) -> Result<usize> {
    if quantity < 0 {
        return Err(InventoryError::InvalidInput(format!(
            "quantity must not be negative, got {quantity}"
        )));
    }
    let ids = matching_transactions(conn, normalized)?;
    let allocated = allocated_total(conn, normalized)?;
    if quantity < allocated {
        return Err(InventoryError::OverAllocated {
            item: normalized.to_string(),
            requested: allocated,
            available: quantity,
        });
    }

    let tx = conn.transaction()?;
    for (i, id) in ids.iter().enumerate() {
        set_transaction_quantity(&tx, *id, if i == 0 { quantity } else { 0 })?;
    }
    tx.commit()?;

    log::info!(
        "Set quantity of '{}' to {} across {} transaction(s)",
        normalized,
        quantity,
        ids.len()
    );
    Ok(ids.len())
}

/// Remove an item: its transactions and every allocation of it
pub fn delete_item(conn: &mut Connection, normalized: &str) -> Result<usize> {
    let ids = matching_transactions(conn, normalized)?;

    let tx = conn.transaction()?;
    for id in &ids {
        delete_transaction(&tx, *id)?;
    }
    let allocations = delete_item_allocations(&tx, normalized)?;
    tx.commit()?;

    log::info!(
        "Deleted '{}': {} transaction(s), {} allocation(s)",
        normalized,
        ids.len(),
        allocations
    );
    Ok(ids.len())
}

/// Add stock that never went through a sales export
pub fn add_manual_item(
    conn: &mut Connection,
    name: &str,
    quantity: i64,
    unit_cost: f64,
    set_name: Option<&str>,
    image_url: Option<&str>,
) -> Result<ManualItem> {
    let name = name.trim();
    if name.is_empty() {
        return Err(InventoryError::InvalidInput("item name must not be empty".to_string()));
    }
    if quantity <= 0 {
        return Err(InventoryError::InvalidInput(format!(
            "quantity must be positive, got {quantity}"
        )));
    }
    if !unit_cost.is_finite() || unit_cost < 0.0 {
        return Err(InventoryError::InvalidInput(format!(
            "unit cost must be a non-negative number, got {unit_cost}"
        )));
    }

    let normalized = normalize_title(name, TitleMatch::Custom);
    let simple = uuid::Uuid::new_v4().simple().to_string();
    let order_id = format!("MANUAL-{}", &simple[..8]);
    let amount = unit_cost * quantity as f64;

    let record = TransactionRecord {
        order_id: order_id.clone(),
        listing_title: kanto_common::collapse_whitespace(name),
        listing_description: None,
        product_category: None,
        buy_format: None,
        sale_type: None,
        quantity_sold: quantity,
        transaction_amount: amount,
        buyer_paid: amount,
        original_item_price: unit_cost,
        transaction_type: ORDER_EARNINGS.to_string(),
        buyer_name: Some(MANUAL_BUYER.to_string()),
        buyer_state: None,
        buyer_country: None,
        order_placed_at: Some(chrono::Utc::now().naive_utc()),
        transaction_completed_at: None,
        source_file: MANUAL_SOURCE.to_string(),
        is_sale: true,
    };

    let existing = get_product(conn, &normalized)?;
    let tx = conn.transaction()?;
    insert_transaction(&tx, &record)?;
    tx.execute(
        "INSERT INTO products (normalized_item_name, description, image_url, unit_cost, set_name)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(normalized_item_name) DO UPDATE SET
            description = COALESCE(products.description, excluded.description),
            image_url = COALESCE(excluded.image_url, products.image_url),
            unit_cost = excluded.unit_cost,
            set_name = COALESCE(excluded.set_name, products.set_name),
            updated_at = datetime('now')",
        params![
            &normalized,
            name,
            image_url.map(str::trim).filter(|u| !u.is_empty()),
            unit_cost,
            set_name.map(str::trim).filter(|s| !s.is_empty()),
        ],
    )?;
    tx.commit()?;

    log::info!(
        "Added {} x '{}' as {}{}",
        quantity,
        name,
        order_id,
        if existing.is_some() { " (catalog updated)" } else { "" }
    );
    Ok(ManualItem {
        order_id,
        normalized_name: normalized,
        quantity,
    })
}
