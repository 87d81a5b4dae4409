//! Aggregate stored sales into per-item counts

use rusqlite::Connection;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

use kanto_common::{display_title, normalize_title, set_name_for, TitleMatch};

use crate::catalog::{get_product, public_image_url};
use crate::database::sold_lines;
use crate::error::Result;

/// Grouping options for [`item_counts`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportOptions {
    pub group_by_buyer: bool,
    pub include_non_sales: bool,
    pub title_match: TitleMatch,
}

/// One aggregated item (optionally per buyer)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemCount {
    pub listing_title: String,
    pub quantity_sold: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buyer_name: Option<String>,
    pub set_name: Option<String>,
    pub image_url: Option<String>,
    pub unit_cost: f64,
    pub normalized_name: String,
}

/// Report wrapper printed by the CLI
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemReport {
    /// Units across all results, not the number of rows
    pub total_items: i64,
    pub results: Vec<ItemCount>,
}

#[derive(Default)]
struct Group {
    quantity: i64,
    /// Raw titles in first-seen order with their occurrence counts
    raw_titles: Vec<(String, usize)>,
}

impl Group {
    fn add(&mut self, raw_title: &str, quantity: i64) {
        self.quantity += quantity;
        match self.raw_titles.iter_mut().find(|(t, _)| t == raw_title) {
            Some((_, seen)) => *seen += 1,
            None => self.raw_titles.push((raw_title.to_string(), 1)),
        }
    }

    /// Most frequent raw title, earliest on ties
    fn most_common_title(&self) -> Option<&str> {
        let mut best: Option<&(String, usize)> = None;
        for entry in &self.raw_titles {
            if best.map_or(true, |b| entry.1 > b.1) {
                best = Some(entry);
            }
        }
        best.map(|(title, _)| title.as_str())
    }
}

/// Count sold quantities per normalized title
pub fn item_counts(conn: &Connection, options: ReportOptions) -> Result<Vec<ItemCount>> {
    let lines = sold_lines(conn, options.include_non_sales)?;

    let mut order: Vec<(String, Option<String>)> = Vec::new();
    let mut groups: HashMap<(String, Option<String>), Group> = HashMap::new();
    for line in &lines {
        let normalized = normalize_title(&line.listing_title, options.title_match);
        let buyer = if options.group_by_buyer {
            line.buyer_name.clone()
        } else {
            None
        };
        let key = (normalized, buyer);
        if !groups.contains_key(&key) {
            order.push(key.clone());
        }
        groups
            .entry(key)
            .or_default()
            .add(&line.listing_title, line.quantity_sold);
    }

    let mut results = Vec::with_capacity(order.len());
    for key in order {
        let Some(group) = groups.remove(&key) else {
            continue;
        };
        let (normalized, buyer_name) = key;
        let product = get_product(conn, &normalized)?;

        let listing_title = match product.as_ref().and_then(|p| p.description.clone()) {
            Some(name) => name,
            None if options.title_match == TitleMatch::Exact => group
                .most_common_title()
                .unwrap_or(&normalized)
                .to_string(),
            None => display_title(&normalized, options.title_match),
        };

        let set_name = match product.as_ref().and_then(|p| p.set_name.clone()) {
            Some(set) => Some(set),
            None if options.title_match == TitleMatch::Custom => Some(set_name_for(&normalized)),
            None => None,
        };

        results.push(ItemCount {
            listing_title,
            quantity_sold: group.quantity,
            buyer_name,
            set_name,
            image_url: product
                .as_ref()
                .and_then(|p| public_image_url(p.image_url.as_deref())),
            unit_cost: product.as_ref().map_or(0.0, |p| p.unit_cost),
            normalized_name: normalized,
        });
    }

    results.sort_by(compare_items);
    Ok(results)
}

/// Set name (absent last), then title, then buyer
fn compare_items(a: &ItemCount, b: &ItemCount) -> Ordering {
    let set_order = match (&a.set_name, &b.set_name) {
        (Some(x), Some(y)) => x.cmp(y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    set_order
        .then_with(|| a.listing_title.cmp(&b.listing_title))
        .then_with(|| a.buyer_name.cmp(&b.buyer_name))
}

/// Aggregate and wrap the counts for output
pub fn build_report(conn: &Connection, options: ReportOptions) -> Result<ItemReport> {
    let results = item_counts(conn, options)?;
    Ok(ItemReport {
        total_items: results.iter().map(|item| item.quantity_sold).sum(),
        results,
    })
}

/// Inventory identities used by allocations: Custom names, giveaways included
pub fn inventory_items(conn: &Connection) -> Result<Vec<ItemCount>> {
    item_counts(
        conn,
        ReportOptions {
            group_by_buyer: false,
            include_non_sales: true,
            title_match: TitleMatch::Custom,
        },
    )
}

/// Sold stock of one Custom-normalized item (0 when unknown)
pub fn stock_for(conn: &Connection, normalized: &str) -> Result<i64> {
    Ok(inventory_items(conn)?
        .into_iter()
        .find(|item| item.normalized_name == normalized)
        .map_or(0, |item| item.quantity_sold))
}
