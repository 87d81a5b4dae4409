//! Load seller CSV exports into the transactions table

use rusqlite::Connection;
use serde::Serialize;
use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};

use kanto_common::{collapse_whitespace, effective_quantity};

use crate::database::{insert_transaction, order_exists, TransactionRecord};
use crate::error::{InventoryError, Result};
use crate::sales_csv::{read_sale_rows, SaleRow};

/// Counts reported after an ingestion run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestResult {
    pub files_processed: usize,
    pub rows_loaded: usize,
    pub rows_skipped: usize,
}

/// Expand directories to the `*.csv` files they contain, sorted
///
/// Plain file paths pass through unchanged. Missing paths are kept so the
/// run can report them.
pub fn expand_inputs(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found: Vec<PathBuf> = std::fs::read_dir(path)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && is_csv(p))
                .collect();
            found.sort();
            files.extend(found);
        } else {
            files.push(path.clone());
        }
    }
    Ok(files)
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

fn to_record(row: SaleRow, source_file: &str) -> TransactionRecord {
    let is_sale = row.is_sale();
    let listing_title = collapse_whitespace(&row.listing_title);
    TransactionRecord {
        quantity_sold: effective_quantity(row.quantity_sold, &listing_title),
        order_id: row.order_id,
        listing_title,
        listing_description: row.listing_description,
        product_category: row.product_category,
        buy_format: row.buy_format,
        sale_type: row.sale_type,
        transaction_amount: row.transaction_amount,
        buyer_paid: row.buyer_paid,
        original_item_price: row.original_item_price,
        transaction_type: row.transaction_type,
        buyer_name: row.buyer_name,
        buyer_state: row.buyer_state,
        buyer_country: row.buyer_country,
        order_placed_at: row.order_placed_at,
        transaction_completed_at: row.transaction_completed_at,
        source_file: source_file.to_string(),
        is_sale,
    }
}

/// Ingest CSV exports in one transaction
///
/// Missing files fail the run before anything is written. Rows are skipped
/// when rejected by the parser, when they are not sales (unless
/// `include_non_sales`), or when their order id is already known.
pub fn ingest_csv_files(
    conn: &mut Connection,
    paths: &[PathBuf],
    include_non_sales: bool,
) -> Result<IngestResult> {
    let files = expand_inputs(paths)?;
    if let Some(missing) = files.iter().find(|p| !p.is_file()) {
        return Err(InventoryError::FileNotFound(missing.clone()));
    }

    let tx = conn.transaction()?;
    let mut result = IngestResult::default();
    let mut seen_orders: HashSet<String> = HashSet::new();

    for file in &files {
        let parsed = read_sale_rows(File::open(file)?)?;
        let source_file = file
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| file.display().to_string());

        let mut loaded = 0;
        let mut skipped = parsed.rejected.len();
        for (line, rejection) in &parsed.rejected {
            log::warn!("{}:{} skipped: {}", source_file, line, rejection);
        }

        for row in parsed.rows {
            if !include_non_sales && !row.is_sale() {
                skipped += 1;
                continue;
            }
            if seen_orders.contains(&row.order_id) || order_exists(&tx, &row.order_id)? {
                log::debug!("Duplicate order {} in {}", row.order_id, source_file);
                skipped += 1;
                continue;
            }
            seen_orders.insert(row.order_id.clone());
            if insert_transaction(&tx, &to_record(row, &source_file))? {
                loaded += 1;
            } else {
                skipped += 1;
            }
        }

        log::info!(
            "Ingested {}: {} loaded, {} skipped",
            source_file,
            loaded,
            skipped
        );
        result.files_processed += 1;
        result.rows_loaded += loaded;
        result.rows_skipped += skipped;
    }

    tx.commit()?;
    Ok(result)
}
