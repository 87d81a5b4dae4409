//! Manual allocation edits from the dashboard
//!
//! Every edit is checked against the Custom-normalized inventory: an item
//! can never be allocated beyond what was sold of it.

use rusqlite::Connection;

use super::{
    allocated_total, delete_allocation, get_allocation, upsert_allocation, Allocation,
};
use crate::catalog::unit_cost_for;
use crate::error::{InventoryError, Result};
use crate::reporting::{inventory_items, ItemCount};

fn inventory_entry(conn: &Connection, item: &str) -> Result<ItemCount> {
    inventory_items(conn)?
        .into_iter()
        .find(|entry| entry.normalized_name == item)
        .ok_or_else(|| InventoryError::NotFound(format!("item '{item}'")))
}

fn existing_allocation(conn: &Connection, item: &str, owner: &str) -> Result<Allocation> {
    get_allocation(conn, item, owner)?
        .ok_or_else(|| InventoryError::NotFound(format!("allocation of '{item}' to {owner}")))
}

fn require_owner(owner: &str) -> Result<&str> {
    let owner = owner.trim();
    if owner.is_empty() {
        return Err(InventoryError::InvalidInput("owner must not be empty".to_string()));
    }
    Ok(owner)
}

/// Give `quantity` more units of an item to an owner
pub fn assign(conn: &Connection, item: &str, owner: &str, quantity: i64) -> Result<Allocation> {
    let owner = require_owner(owner)?;
    if quantity <= 0 {
        return Err(InventoryError::InvalidInput(format!(
            "quantity must be positive, got {quantity}"
        )));
    }
    let entry = inventory_entry(conn, item)?;
    let already = allocated_total(conn, item)?;
    let available = entry.quantity_sold - already;
    if quantity > available {
        return Err(InventoryError::OverAllocated {
            item: item.to_string(),
            requested: quantity,
            available,
        });
    }

    let existing = get_allocation(conn, item, owner)?;
    let catalog_cost = unit_cost_for(conn, item)?;
    let (current, unit_cost, sheet_name) = match &existing {
        Some(a) if catalog_cost <= 0.0 => (a.allocated_quantity, a.unit_cost, a.sheet_item_name.clone()),
        Some(a) => (a.allocated_quantity, catalog_cost, a.sheet_item_name.clone()),
        None => (0, catalog_cost, entry.listing_title.clone()),
    };

    upsert_allocation(conn, item, owner, current + quantity, unit_cost, &sheet_name)?;
    log::info!("Assigned {} of '{}' to {}", quantity, item, owner);
    existing_allocation(conn, item, owner)
}

/// Overwrite an owner's quantity; 0 removes the allocation
pub fn set_allocated_quantity(
    conn: &Connection,
    item: &str,
    owner: &str,
    quantity: i64,
) -> Result<Option<Allocation>> {
    if quantity < 0 {
        return Err(InventoryError::InvalidInput(format!(
            "quantity must not be negative, got {quantity}"
        )));
    }
    let current = existing_allocation(conn, item, owner)?;
    if quantity == 0 {
        remove_allocation(conn, item, owner)?;
        return Ok(None);
    }

    let stock = match inventory_entry(conn, item) {
        Ok(entry) => entry.quantity_sold,
        Err(InventoryError::NotFound(_)) => 0,
        Err(e) => return Err(e),
    };
    let others = allocated_total(conn, item)? - current.allocated_quantity;
    if others + quantity > stock {
        return Err(InventoryError::OverAllocated {
            item: item.to_string(),
            requested: quantity,
            available: stock - others,
        });
    }

    upsert_allocation(
        conn,
        item,
        owner,
        quantity,
        current.unit_cost,
        &current.sheet_item_name,
    )?;
    log::info!("Set allocation of '{}' for {} to {}", item, owner, quantity);
    existing_allocation(conn, item, owner).map(Some)
}

/// Move units (all when `quantity` is `None`) from one owner to another
pub fn move_allocation(
    conn: &mut Connection,
    item: &str,
    from: &str,
    to: &str,
    quantity: Option<i64>,
) -> Result<Allocation> {
    let to = require_owner(to)?;
    if from.trim() == to {
        return Err(InventoryError::InvalidInput(
            "source and target owner are the same".to_string(),
        ));
    }
    let source = existing_allocation(conn, item, from)?;
    let moved = quantity.unwrap_or(source.allocated_quantity);
    if moved <= 0 || moved > source.allocated_quantity {
        return Err(InventoryError::InvalidInput(format!(
            "cannot move {moved} of {} allocated to {}",
            source.allocated_quantity, source.owner
        )));
    }

    let tx = conn.transaction()?;
    if moved == source.allocated_quantity {
        delete_allocation(&tx, item, &source.owner)?;
    } else {
        upsert_allocation(
            &tx,
            item,
            &source.owner,
            source.allocated_quantity - moved,
            source.unit_cost,
            &source.sheet_item_name,
        )?;
    }
    let target = get_allocation(&tx, item, to)?;
    let (current, unit_cost, sheet_name) = match &target {
        Some(t) => (t.allocated_quantity, t.unit_cost, t.sheet_item_name.as_str()),
        None => (0, source.unit_cost, source.sheet_item_name.as_str()),
    };
    upsert_allocation(&tx, item, to, current + moved, unit_cost, sheet_name)?;
    tx.commit()?;

    log::info!("Moved {} of '{}' from {} to {}", moved, item, source.owner, to);
    existing_allocation(conn, item, to)
}

/// Delete one owner's allocation of an item
pub fn remove_allocation(conn: &Connection, item: &str, owner: &str) -> Result<()> {
    if delete_allocation(conn, item, owner)? == 0 {
        return Err(InventoryError::NotFound(format!(
            "allocation of '{item}' to {owner}"
        )));
    }
    log::info!("Removed allocation of '{}' from {}", item, owner);
    Ok(())
}

/// Delete every allocation, returning how many were removed
pub fn clear_allocations(conn: &Connection) -> Result<usize> {
    let removed = conn.execute("DELETE FROM allocations", [])?;
    log::info!("Cleared {} allocations", removed);
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::list_allocations;
    use crate::catalog::set_unit_cost;
    use crate::database::insert_transaction;
    use crate::database::tests::{make_test_record, test_db};

    const ETB: &str = "phantasmal flames etb";

    fn stocked_db() -> Connection {
        let conn = test_db();
        insert_transaction(&conn, &make_test_record("1", "Phantasmal Flames ETB", 5)).unwrap();
        conn
    }

    #[test]
    fn assign_adds_to_existing_allocation() {
        let conn = stocked_db();
        set_unit_cost(&conn, ETB, 48.0).unwrap();

        assign(&conn, ETB, "Cihan", 2).unwrap();
        let allocation = assign(&conn, ETB, "Cihan", 1).unwrap();
        assert_eq!(allocation.allocated_quantity, 3);
        assert_eq!(allocation.unit_cost, 48.0);
        assert_eq!(allocation.sheet_item_name, "Phantasmal Flames ETB");
    }

    #[test]
    fn assign_refuses_past_stock() {
        let conn = stocked_db();
        assign(&conn, ETB, "Cihan", 4).unwrap();

        let err = assign(&conn, ETB, "Nima", 2).unwrap_err();
        assert!(matches!(
            err,
            InventoryError::OverAllocated { requested: 2, available: 1, .. }
        ));
    }

    #[test]
    fn assign_validates_input() {
        let conn = stocked_db();
        assert!(matches!(assign(&conn, ETB, "Cihan", 0), Err(InventoryError::InvalidInput(_))));
        assert!(matches!(assign(&conn, ETB, " ", 1), Err(InventoryError::InvalidInput(_))));
        assert!(matches!(assign(&conn, "unknown", "Cihan", 1), Err(InventoryError::NotFound(_))));
    }

    #[test]
    fn set_quantity_checks_other_owners() {
        let conn = stocked_db();
        assign(&conn, ETB, "Cihan", 2).unwrap();
        assign(&conn, ETB, "Nima", 2).unwrap();

        let updated = set_allocated_quantity(&conn, ETB, "Cihan", 3).unwrap().unwrap();
        assert_eq!(updated.allocated_quantity, 3);
        assert!(matches!(
            set_allocated_quantity(&conn, ETB, "Cihan", 4),
            Err(InventoryError::OverAllocated { available: 3, .. })
        ));
    }

    #[test]
    fn set_quantity_zero_removes() {
        let conn = stocked_db();
        assign(&conn, ETB, "Cihan", 2).unwrap();

        assert_eq!(set_allocated_quantity(&conn, ETB, "Cihan", 0).unwrap(), None);
        assert!(list_allocations(&conn).unwrap().is_empty());
        assert!(matches!(
            set_allocated_quantity(&conn, ETB, "Cihan", 1),
            Err(InventoryError::NotFound(_))
        ));
    }

    #[test]
    fn move_partial_and_full() {
        let mut conn = stocked_db();
        assign(&conn, ETB, "Cihan", 4).unwrap();
        assign(&conn, ETB, "Nima", 1).unwrap();

        let target = move_allocation(&mut conn, ETB, "Cihan", "Nima", Some(1)).unwrap();
        assert_eq!(target.allocated_quantity, 2);
        assert_eq!(get_allocation(&conn, ETB, "Cihan").unwrap().unwrap().allocated_quantity, 3);

        let target = move_allocation(&mut conn, ETB, "Cihan", "Askar", None).unwrap();
        assert_eq!(target.allocated_quantity, 3);
        assert!(get_allocation(&conn, ETB, "Cihan").unwrap().is_none());
    }

    #[test]
    fn move_rejects_bad_requests() {
        let mut conn = stocked_db();
        assign(&conn, ETB, "Cihan", 2).unwrap();

        assert!(matches!(
            move_allocation(&mut conn, ETB, "Cihan", "Nima", Some(3)),
            Err(InventoryError::InvalidInput(_))
        ));
        assert!(matches!(
            move_allocation(&mut conn, ETB, "Cihan", "Cihan", None),
            Err(InventoryError::InvalidInput(_))
        ));
        assert!(matches!(
            move_allocation(&mut conn, ETB, "Askar", "Nima", None),
            Err(InventoryError::NotFound(_))
        ));
    }

    #[test]
    fn remove_and_clear() {
        let conn = stocked_db();
        assign(&conn, ETB, "Cihan", 1).unwrap();
        assign(&conn, ETB, "Nima", 1).unwrap();

        remove_allocation(&conn, ETB, "Cihan").unwrap();
        assert!(matches!(
            remove_allocation(&conn, ETB, "Cihan"),
            Err(InventoryError::NotFound(_))
        ));
        assert_eq!(clear_allocations(&conn).unwrap(), 1);
    }
}
