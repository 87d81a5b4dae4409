//! Owner allocations of sold inventory
//!
//! Stock is split between owners. An allocation row says how many units of
//! one normalized item belong to one owner and what each unit cost them.

pub mod commands;
pub mod import;
pub mod summary;
pub mod workbook;

pub use commands::{
    assign, clear_allocations, move_allocation, remove_allocation, set_allocated_quantity,
};
pub use import::{import_allocations, ImportSummary};
pub use summary::{allocation_summary, AllocationSummary};
pub use workbook::{load_allocation_sheets, AllocationSheet, SheetRow};

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use crate::database::DbResult;

/// A stored allocation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Allocation {
    pub id: i64,
    pub normalized_item_name: String,
    pub owner: String,
    pub allocated_quantity: i64,
    pub unit_cost: f64,
    pub sheet_item_name: String,
    pub created_at: String,
}

impl Allocation {
    fn from_row(row: &Row<'_>) -> DbResult<Self> {
        Ok(Allocation {
            id: row.get(0)?,
            normalized_item_name: row.get(1)?,
            owner: row.get(2)?,
            allocated_quantity: row.get(3)?,
            unit_cost: row.get(4)?,
            sheet_item_name: row.get(5)?,
            created_at: row.get(6)?,
        })
    }
}

const SELECT_ALLOCATION: &str =
    "SELECT id, normalized_item_name, owner, allocated_quantity, unit_cost, sheet_item_name, created_at
     FROM allocations";

/// Every allocation, grouped by item then owner
pub fn list_allocations(conn: &Connection) -> DbResult<Vec<Allocation>> {
    let mut stmt = conn.prepare(&format!(
        "{SELECT_ALLOCATION} ORDER BY normalized_item_name, owner"
    ))?;
    let rows: DbResult<Vec<Allocation>> = stmt.query_map([], Allocation::from_row)?.collect();
    rows
}

/// The allocation of one item to one owner, if any
pub fn get_allocation(conn: &Connection, item: &str, owner: &str) -> DbResult<Option<Allocation>> {
    let mut stmt = conn.prepare_cached(&format!(
        "{SELECT_ALLOCATION} WHERE normalized_item_name = ?1 AND owner = ?2"
    ))?;
    stmt.query_row(params![item, owner], Allocation::from_row)
        .optional()
}

/// Units of an item allocated across all owners
pub fn allocated_total(conn: &Connection, item: &str) -> DbResult<i64> {
    conn.query_row(
        "SELECT COALESCE(SUM(allocated_quantity), 0) FROM allocations WHERE normalized_item_name = ?1",
        params![item],
        |row| row.get(0),
    )
}

/// Insert or overwrite the quantity and cost of an allocation
pub fn upsert_allocation(
    conn: &Connection,
    item: &str,
    owner: &str,
    quantity: i64,
    unit_cost: f64,
    sheet_item_name: &str,
) -> DbResult<usize> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO allocations (normalized_item_name, owner, allocated_quantity, unit_cost, sheet_item_name)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(normalized_item_name, owner) DO UPDATE SET
            allocated_quantity = excluded.allocated_quantity,
            unit_cost = excluded.unit_cost",
    )?;
    stmt.execute(params![item, owner, quantity, unit_cost, sheet_item_name])
}

/// Delete one allocation, returning the number of rows removed
pub fn delete_allocation(conn: &Connection, item: &str, owner: &str) -> DbResult<usize> {
    conn.execute(
        "DELETE FROM allocations WHERE normalized_item_name = ?1 AND owner = ?2",
        params![item, owner],
    )
}

/// Delete every allocation of an item
pub fn delete_item_allocations(conn: &Connection, item: &str) -> DbResult<usize> {
    conn.execute(
        "DELETE FROM allocations WHERE normalized_item_name = ?1",
        params![item],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::tests::test_db;

    #[test]
    fn upsert_overwrites_per_item_and_owner() {
        let conn = test_db();
        upsert_allocation(&conn, "surging sparks sleeve", "misty", 3, 4.0, "Surging Sparks").unwrap();
        upsert_allocation(&conn, "surging sparks sleeve", "misty", 5, 4.5, "Surging Sparks").unwrap();
        upsert_allocation(&conn, "surging sparks sleeve", "brock", 2, 4.0, "Surging Sparks").unwrap();

        let misty = get_allocation(&conn, "surging sparks sleeve", "misty").unwrap().unwrap();
        assert_eq!(misty.allocated_quantity, 5);
        assert_eq!(misty.unit_cost, 4.5);
        assert_eq!(allocated_total(&conn, "surging sparks sleeve").unwrap(), 7);
        assert_eq!(list_allocations(&conn).unwrap().len(), 2);
    }

    #[test]
    fn deletes() {
        let conn = test_db();
        upsert_allocation(&conn, "a", "misty", 1, 0.0, "A").unwrap();
        upsert_allocation(&conn, "a", "brock", 1, 0.0, "A").unwrap();
        upsert_allocation(&conn, "b", "brock", 1, 0.0, "B").unwrap();

        assert_eq!(delete_allocation(&conn, "a", "misty").unwrap(), 1);
        assert_eq!(delete_allocation(&conn, "a", "misty").unwrap(), 0);
        assert_eq!(delete_item_allocations(&conn, "a").unwrap(), 1);
        assert_eq!(allocated_total(&conn, "a").unwrap(), 0);
        assert_eq!(list_allocations(&conn).unwrap().len(), 1);
    }
}
