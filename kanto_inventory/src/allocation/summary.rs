//! Allocated versus available stock, per item and per owner

use rusqlite::Connection;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use super::{list_allocations, Allocation};
use crate::error::Result;
use crate::reporting::inventory_items;

/// One owner's share of an item
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OwnerShare {
    pub owner: String,
    pub quantity: i64,
    pub unit_cost: f64,
}

/// Stock position of one item
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemAllocation {
    pub item_name: String,
    pub normalized_name: String,
    pub total_quantity: i64,
    pub total_allocated: i64,
    pub remaining: i64,
    pub set_name: Option<String>,
    pub image_url: Option<String>,
    pub unit_cost: f64,
    pub allocations: Vec<OwnerShare>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OwnerTotals {
    /// Units allocated
    pub count: i64,
    /// Distinct items allocated
    pub items: usize,
    /// Sum of quantity x unit cost
    pub cost: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AllocationSummary {
    pub items: Vec<ItemAllocation>,
    pub allocated_items: Vec<ItemAllocation>,
    pub unallocated_items: Vec<ItemAllocation>,
    pub over_allocated_items: Vec<ItemAllocation>,
    pub owner_totals: BTreeMap<String, OwnerTotals>,
    pub total_inventory: i64,
    pub total_allocated: i64,
    pub total_unallocated: i64,
}

/// Summarise stored allocations against the inventory
///
/// Allocations for names the inventory no longer has show up as items with
/// zero stock, so they are always reported as over-allocated.
pub fn allocation_summary(conn: &Connection) -> Result<AllocationSummary> {
    let inventory = inventory_items(conn)?;
    let allocations = list_allocations(conn)?;

    let mut by_item: HashMap<&str, Vec<&Allocation>> = HashMap::new();
    for allocation in &allocations {
        by_item
            .entry(allocation.normalized_item_name.as_str())
            .or_default()
            .push(allocation);
    }

    let mut items: Vec<ItemAllocation> = inventory
        .iter()
        .map(|item| {
            let shares = by_item.remove(item.normalized_name.as_str()).unwrap_or_default();
            item_allocation(
                item.listing_title.clone(),
                item.normalized_name.clone(),
                item.quantity_sold,
                item.set_name.clone(),
                item.image_url.clone(),
                item.unit_cost,
                &shares,
            )
        })
        .collect();

    let mut orphans: Vec<(&str, Vec<&Allocation>)> = by_item.into_iter().collect();
    orphans.sort_by(|a, b| a.0.cmp(b.0));
    for (name, shares) in orphans {
        log::warn!("Allocations reference '{}' which is not in inventory", name);
        items.push(item_allocation(
            name.to_string(),
            name.to_string(),
            0,
            None,
            None,
            0.0,
            &shares,
        ));
    }

    let mut summary = AllocationSummary::default();
    for allocation in &allocations {
        let totals = summary
            .owner_totals
            .entry(allocation.owner.clone())
            .or_default();
        totals.count += allocation.allocated_quantity;
        totals.items += 1;
        totals.cost += allocation.allocated_quantity as f64 * allocation.unit_cost;
    }

    for item in &items {
        summary.total_inventory += item.total_quantity;
        summary.total_allocated += item.total_allocated;
        if item.total_allocated > 0 {
            summary.allocated_items.push(item.clone());
        }
        if item.remaining > 0 {
            summary.total_unallocated += item.remaining;
            summary.unallocated_items.push(item.clone());
        }
        if item.remaining < 0 {
            summary.over_allocated_items.push(item.clone());
        }
    }
    summary.items = items;
    Ok(summary)
}

fn item_allocation(
    item_name: String,
    normalized_name: String,
    total_quantity: i64,
    set_name: Option<String>,
    image_url: Option<String>,
    unit_cost: f64,
    shares: &[&Allocation],
) -> ItemAllocation {
    let total_allocated: i64 = shares.iter().map(|a| a.allocated_quantity).sum();
    ItemAllocation {
        item_name,
        normalized_name,
        total_quantity,
        total_allocated,
        remaining: total_quantity - total_allocated,
        set_name,
        image_url,
        unit_cost,
        allocations: shares
            .iter()
            .map(|a| OwnerShare {
                owner: a.owner.clone(),
                quantity: a.allocated_quantity,
                unit_cost: a.unit_cost,
            })
            .collect(),
    }
}
