//! Import owner allocations from a sheet
//!
//! Every sheet row is fuzzy-matched against the inventory by display
//! title. A row is accepted only while the running total for its item stays
//! within the sold stock; an accepted import replaces all stored
//! allocations.

use rusqlite::Connection;
use serde::Serialize;
use std::collections::HashMap;

use kanto_common::match_item_name;

use super::workbook::AllocationSheet;
use crate::catalog::unit_cost_for;
use crate::error::Result;
use crate::reporting::{inventory_items, ItemCount};

/// A sheet row matched to an inventory item within stock
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedRow {
    pub owner: String,
    pub sheet_item_name: String,
    pub inventory_title: String,
    pub normalized_item_name: String,
    pub quantity: i64,
    pub unit_cost: f64,
    pub available: i64,
}

/// A sheet row with no inventory match
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnmatchedRow {
    pub owner: String,
    pub sheet_item_name: String,
    pub quantity: i64,
    pub unit_cost: f64,
}

/// A matched row that would push its item past the sold stock
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverAllocatedRow {
    pub owner: String,
    pub sheet_item_name: String,
    pub inventory_title: String,
    pub normalized_item_name: String,
    pub quantity: i64,
    pub unit_cost: f64,
    pub available: i64,
    /// Already accepted for the item plus this row
    pub total_requested: i64,
}

/// Outcome of an allocation import
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportSummary {
    pub matched: Vec<MatchedRow>,
    pub unmatched: Vec<UnmatchedRow>,
    pub over_allocated: Vec<OverAllocatedRow>,
    pub total_allocated: i64,
    pub total_unmatched: i64,
    pub total_over_allocated: i64,
    pub dry_run: bool,
}

/// Match sheet rows to inventory and, unless `dry_run`, store them
///
/// Rows are matched against Custom identities, the same keys the dashboard
/// edits and the summary reads.
pub fn import_allocations(
    conn: &mut Connection,
    sheets: &[AllocationSheet],
    dry_run: bool,
) -> Result<ImportSummary> {
    let inventory = inventory_items(conn)?;
    let titles: Vec<&str> = inventory.iter().map(|i| i.listing_title.as_str()).collect();

    let mut summary = ImportSummary {
        dry_run,
        ..ImportSummary::default()
    };
    let mut accepted_per_item: HashMap<&str, i64> = HashMap::new();

    for sheet in sheets {
        for row in &sheet.rows {
            let Some(item) = match_item_name(&row.item_name, &titles)
                .and_then(|title| find_by_title(&inventory, title))
            else {
                log::debug!("No inventory match for '{}' ({})", row.item_name, sheet.owner);
                summary.total_unmatched += row.count;
                summary.unmatched.push(UnmatchedRow {
                    owner: sheet.owner.clone(),
                    sheet_item_name: row.item_name.clone(),
                    quantity: row.count,
                    unit_cost: row.cost,
                });
                continue;
            };

            let catalog_cost = unit_cost_for(conn, &item.normalized_name)?;
            let unit_cost = if catalog_cost > 0.0 {
                catalog_cost
            } else {
                row.cost
            };

            let accepted = accepted_per_item
                .entry(item.normalized_name.as_str())
                .or_insert(0);
            let total_requested = *accepted + row.count;
            if total_requested > item.quantity_sold {
                log::warn!(
                    "'{}' for {} exceeds stock of '{}': {} requested, {} available",
                    row.item_name,
                    sheet.owner,
                    item.listing_title,
                    total_requested,
                    item.quantity_sold
                );
                summary.total_over_allocated += row.count;
                summary.over_allocated.push(OverAllocatedRow {
                    owner: sheet.owner.clone(),
                    sheet_item_name: row.item_name.clone(),
                    inventory_title: item.listing_title.clone(),
                    normalized_item_name: item.normalized_name.clone(),
                    quantity: row.count,
                    unit_cost,
                    available: item.quantity_sold,
                    total_requested,
                });
                continue;
            }

            *accepted = total_requested;
            summary.total_allocated += row.count;
            summary.matched.push(MatchedRow {
                owner: sheet.owner.clone(),
                sheet_item_name: row.item_name.clone(),
                inventory_title: item.listing_title.clone(),
                normalized_item_name: item.normalized_name.clone(),
                quantity: row.count,
                unit_cost,
                available: item.quantity_sold,
            });
        }
    }

    if !dry_run {
        store_matched(conn, &summary.matched)?;
    }

    log::info!(
        "Allocation import{}: {} matched, {} unmatched, {} over-allocated",
        if dry_run { " (dry run)" } else { "" },
        summary.matched.len(),
        summary.unmatched.len(),
        summary.over_allocated.len()
    );
    Ok(summary)
}

fn find_by_title<'a>(inventory: &'a [ItemCount], title: &str) -> Option<&'a ItemCount> {
    inventory.iter().find(|item| item.listing_title == title)
}

/// Replace every stored allocation with the matched rows
fn store_matched(conn: &mut Connection, matched: &[MatchedRow]) -> Result<()> {
    // Repeated (item, owner) rows merge; the first row's cost and name stick
    let mut merged: Vec<MatchedRow> = Vec::new();
    for row in matched {
        match merged.iter_mut().find(|m| {
            m.normalized_item_name == row.normalized_item_name && m.owner == row.owner
        }) {
            Some(existing) => existing.quantity += row.quantity,
            None => merged.push(row.clone()),
        }
    }

    let tx = conn.transaction()?;
    tx.execute("DELETE FROM allocations", [])?;
    for row in &merged {
        super::upsert_allocation(
            &tx,
            &row.normalized_item_name,
            &row.owner,
            row.quantity,
            row.unit_cost,
            &row.sheet_item_name,
        )?;
    }
    tx.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::workbook::SheetRow;
    use crate::allocation::{get_allocation, list_allocations, upsert_allocation};
    use crate::catalog::set_unit_cost;
    use crate::database::insert_transaction;
    use crate::database::tests::{make_test_record, test_db};

    fn stocked_db() -> Connection {
        let conn = test_db();
        insert_transaction(&conn, &make_test_record("001", "Phantasmal Flames Sleeve", 100)).unwrap();
        insert_transaction(&conn, &make_test_record("002", "Phantasmal Flames ETB", 5)).unwrap();
        insert_transaction(&conn, &make_test_record("003", "Mega Evolutions Sleeve", 20)).unwrap();
        conn
    }

    fn sheet(owner: &str, rows: &[(&str, f64, i64)]) -> AllocationSheet {
        AllocationSheet {
            owner: owner.to_string(),
            rows: rows
                .iter()
                .map(|(name, cost, count)| SheetRow {
                    item_name: name.to_string(),
                    cost: *cost,
                    count: *count,
                })
                .collect(),
        }
    }

    #[test]
    fn dry_run_reports_without_writing() {
        let mut conn = stocked_db();
        upsert_allocation(&conn, "mega evolutions sleeve", "Old", 1, 0.0, "x").unwrap();
        let sheets = vec![
            sheet(
                "Cihan",
                &[("Phantasma Flames Sleeve", 5.29, 50), ("Mega Evolutions Sleeve", 5.29, 10)],
            ),
            sheet("Nima", &[("Phantasma Flames ETB", 53.0, 2)]),
        ];

        let summary = import_allocations(&mut conn, &sheets, true).unwrap();
        assert_eq!(summary.matched.len(), 3);
        assert_eq!(summary.total_allocated, 62);
        assert!(summary.unmatched.is_empty());
        assert_eq!(list_allocations(&conn).unwrap().len(), 1);
    }

    #[test]
    fn real_import_replaces_allocations() {
        let mut conn = stocked_db();
        upsert_allocation(&conn, "mega evolutions sleeve", "Old", 1, 0.0, "x").unwrap();
        let sheets = vec![sheet("Cihan", &[("Phantasma Flames Sleeve", 5.29, 50)])];

        let summary = import_allocations(&mut conn, &sheets, false).unwrap();
        assert_eq!(summary.total_allocated, 50);

        let stored = list_allocations(&conn).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].owner, "Cihan");
        assert_eq!(stored[0].normalized_item_name, "phantasmal flames sleeve");
        assert_eq!(stored[0].allocated_quantity, 50);
        assert_eq!(stored[0].unit_cost, 5.29);
        assert_eq!(stored[0].sheet_item_name, "Phantasma Flames Sleeve");
    }

    #[test]
    fn over_allocation_does_not_consume_stock() {
        let mut conn = stocked_db();
        let sheets = vec![
            sheet("Cihan", &[("Phantasmal Flames ETB", 0.0, 4)]),
            sheet("Nima", &[("Phantasmal Flames ETB", 0.0, 3)]),
            sheet("Askar", &[("Phantasmal Flames ETB", 0.0, 1)]),
        ];

        let summary = import_allocations(&mut conn, &sheets, true).unwrap();
        let accepted: Vec<_> = summary.matched.iter().map(|m| m.owner.as_str()).collect();
        assert_eq!(accepted, vec!["Cihan", "Askar"]);
        assert_eq!(summary.over_allocated.len(), 1);
        assert_eq!(summary.over_allocated[0].total_requested, 7);
        assert_eq!(summary.over_allocated[0].available, 5);
        assert_eq!(summary.total_over_allocated, 3);
    }

    #[test]
    fn unmatched_rows_are_reported() {
        let mut conn = stocked_db();
        let sheets = vec![sheet("Nima", &[("Random Item That Doesn't Exist", 2.0, 3)])];

        let summary = import_allocations(&mut conn, &sheets, false).unwrap();
        assert_eq!(summary.unmatched.len(), 1);
        assert_eq!(summary.total_unmatched, 3);
        assert!(list_allocations(&conn).unwrap().is_empty());
    }

    #[test]
    fn catalog_cost_wins_over_sheet_cost() {
        let mut conn = stocked_db();
        set_unit_cost(&conn, "phantasmal flames etb", 48.0).unwrap();
        let sheets = vec![sheet("Nima", &[("Phantasmal Flames Elite Trainer Box", 53.0, 2)])];

        let summary = import_allocations(&mut conn, &sheets, false).unwrap();
        assert_eq!(summary.matched[0].unit_cost, 48.0);
        let stored = get_allocation(&conn, "phantasmal flames etb", "Nima").unwrap().unwrap();
        assert_eq!(stored.unit_cost, 48.0);
    }

    #[test]
    fn repeated_rows_merge() {
        let mut conn = stocked_db();
        let sheets = vec![sheet(
            "Cihan",
            &[("Mega Evolutions Sleeve", 5.0, 4), ("Mega Evolutions Sleeve", 5.0, 6)],
        )];

        import_allocations(&mut conn, &sheets, false).unwrap();
        let stored = get_allocation(&conn, "mega evolutions sleeve", "Cihan").unwrap().unwrap();
        assert_eq!(stored.allocated_quantity, 10);
    }
}
