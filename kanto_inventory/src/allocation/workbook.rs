//! Allocation sheet loading
//!
//! Spreadsheets carry one worksheet per owner with the columns
//! `item name, cost, count, total` under a header row. A flat CSV with
//! `owner,item_name,cost,count` columns is accepted as well.

use calamine::{open_workbook_auto, Data, Reader};
use serde::Deserialize;
use std::fs::File;
use std::path::Path;

use crate::error::{InventoryError, Result};

/// One requested allocation line
#[derive(Debug, Clone, PartialEq)]
pub struct SheetRow {
    pub item_name: String,
    pub cost: f64,
    pub count: i64,
}

/// Every line requested by one owner
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationSheet {
    pub owner: String,
    pub rows: Vec<SheetRow>,
}

const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Load allocation sheets, choosing the reader from the file extension
pub fn load_allocation_sheets(path: &Path) -> Result<Vec<AllocationSheet>> {
    if !path.is_file() {
        return Err(InventoryError::FileNotFound(path.to_path_buf()));
    }
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let sheets = if extension == "csv" {
        load_csv_sheet(File::open(path)?)?
    } else if SPREADSHEET_EXTENSIONS.contains(&extension.as_str()) {
        load_workbook(path)?
    } else {
        return Err(InventoryError::UnsupportedSheet(path.to_path_buf()));
    };

    log::info!(
        "Loaded {} allocation rows for {} owner(s) from {}",
        sheets.iter().map(|s| s.rows.len()).sum::<usize>(),
        sheets.len(),
        path.display()
    );
    Ok(sheets)
}

/// One worksheet per owner, named after the owner
fn load_workbook(path: &Path) -> Result<Vec<AllocationSheet>> {
    let mut workbook = open_workbook_auto(path)?;
    let mut sheets = Vec::new();

    for owner in workbook.sheet_names() {
        let range = workbook.worksheet_range(&owner)?;
        let mut rows = Vec::new();
        if let Some((last_row, _)) = range.end() {
            // Absolute row 0 is the header
            for r in 1..=last_row {
                let cell = |c: u32| range.get_value((r, c));
                let Some(item_name) = cell(0).and_then(cell_text) else {
                    continue;
                };
                let count = cell(2).and_then(cell_number).unwrap_or(0.0);
                if let Some(row) = sheet_row(item_name, cell(1).and_then(cell_number), count) {
                    rows.push(row);
                }
            }
        }
        let owner = owner.trim().to_string();
        if !owner.is_empty() {
            sheets.push(AllocationSheet { owner, rows });
        }
    }
    Ok(sheets)
}

fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        _ => None,
    }
}

fn cell_number(cell: &Data) -> Option<f64> {
    match cell {
        Data::Float(f) => Some(*f),
        Data::Int(i) => Some(*i as f64),
        Data::String(s) => s.trim().trim_start_matches('$').parse().ok(),
        _ => None,
    }
}

/// Build a row, dropping non-positive counts
fn sheet_row(item_name: String, cost: Option<f64>, count: f64) -> Option<SheetRow> {
    let count = count.trunc();
    if !count.is_finite() || count < 1.0 {
        log::debug!("Ignoring '{}' with count {}", item_name, count);
        return None;
    }
    Some(SheetRow {
        item_name,
        cost: cost.filter(|c| c.is_finite() && *c > 0.0).unwrap_or(0.0),
        count: count as i64,
    })
}

#[derive(Debug, Deserialize)]
struct CsvSheetRow {
    #[serde(default)]
    owner: Option<String>,
    #[serde(default)]
    item_name: Option<String>,
    #[serde(default)]
    cost: Option<String>,
    #[serde(default)]
    count: Option<String>,
}

/// Flat CSV export, grouped by owner in first-seen order
fn load_csv_sheet<R: std::io::Read>(reader: R) -> Result<Vec<AllocationSheet>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut sheets: Vec<AllocationSheet> = Vec::new();
    for record in csv_reader.deserialize::<CsvSheetRow>() {
        let record = record?;
        let owner = record.owner.filter(|o| !o.is_empty());
        let item_name = record.item_name.filter(|n| !n.is_empty());
        let (Some(owner), Some(item_name)) = (owner, item_name) else {
            continue;
        };
        let cost = record.cost.and_then(|c| c.trim_start_matches('$').parse().ok());
        let count = record
            .count
            .and_then(|c| c.parse::<f64>().ok())
            .unwrap_or(0.0);
        let Some(row) = sheet_row(item_name, cost, count) else {
            continue;
        };

        match sheets.iter_mut().find(|s| s.owner == owner) {
            Some(sheet) => sheet.rows.push(row),
            None => sheets.push(AllocationSheet {
                owner,
                rows: vec![row],
            }),
        }
    }
    Ok(sheets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;
    use tempfile::TempDir;

    fn write_owner_workbook(path: &Path) {
        let mut workbook = Workbook::new();
        {
            let sheet = workbook.add_worksheet();
            sheet.set_name("Cihan").unwrap();
            for (col, header) in ["Item", "Cost", "Count", "Total"].iter().enumerate() {
                sheet.write_string(0, col as u16, *header).unwrap();
            }
            sheet.write_string(1, 0, "Phantasma Flames Sleeve").unwrap();
            sheet.write_number(1, 1, 5.29).unwrap();
            sheet.write_number(1, 2, 50).unwrap();
            // Row 2 has no item name
            sheet.write_number(2, 1, 5.29).unwrap();
            sheet.write_number(2, 2, 10).unwrap();
            sheet.write_string(3, 0, "Stellar Crown ETB").unwrap();
            sheet.write_number(3, 1, 40).unwrap();
            sheet.write_number(3, 2, 0).unwrap();
        }
        {
            let sheet = workbook.add_worksheet();
            sheet.set_name("Nima").unwrap();
            sheet.write_string(0, 0, "Item").unwrap();
            sheet.write_string(1, 0, "Mega Evolutions Sleeve").unwrap();
            sheet.write_string(1, 1, "$5.29").unwrap();
            sheet.write_number(1, 2, 20.7).unwrap();
        }
        workbook.save(path).unwrap();
    }

    #[test]
    fn csv_groups_rows_by_owner() {
        let csv = "owner,item_name,cost,count\n\
                   Cihan,Phantasma Flames Sleeve,5.29,50\n\
                   Nima,Phantasma Flames ETB,53.00,2\n\
                   Cihan,Mega Evolutions Sleeve,5.29,10\n";
        let sheets = load_csv_sheet(csv.as_bytes()).unwrap();

        assert_eq!(sheets.len(), 2);
        assert_eq!(sheets[0].owner, "Cihan");
        assert_eq!(sheets[0].rows.len(), 2);
        assert_eq!(
            sheets[1].rows[0],
            SheetRow {
                item_name: "Phantasma Flames ETB".to_string(),
                cost: 53.0,
                count: 2
            }
        );
    }

    #[test]
    fn csv_skips_blank_names_and_counts() {
        let csv = "owner,item_name,cost,count\n\
                   Cihan,,5.29,50\n\
                   Cihan,Stellar Crown ETB,40,0\n\
                   Cihan,Stellar Crown ETB,40,\n\
                   ,Stellar Crown ETB,40,3\n\
                   Cihan,Surging Sparks Sleeve,,4\n";
        let sheets = load_csv_sheet(csv.as_bytes()).unwrap();

        assert_eq!(sheets.len(), 1);
        assert_eq!(
            sheets[0].rows,
            vec![SheetRow {
                item_name: "Surging Sparks Sleeve".to_string(),
                cost: 0.0,
                count: 4
            }]
        );
    }

    #[test]
    fn cell_conversions() {
        assert_eq!(cell_text(&Data::String("  ETB ".to_string())), Some("ETB".to_string()));
        assert_eq!(cell_text(&Data::Float(1.0)), None);
        assert_eq!(cell_number(&Data::Int(3)), Some(3.0));
        assert_eq!(cell_number(&Data::String("$5.29".to_string())), Some(5.29));
        assert_eq!(cell_number(&Data::Empty), None);
    }

    #[test]
    fn fractional_counts_truncate() {
        let row = sheet_row("ETB".to_string(), Some(1.0), 2.9).unwrap();
        assert_eq!(row.count, 2);
        assert!(sheet_row("ETB".to_string(), None, 0.5).is_none());
    }

    #[test]
    fn rejects_missing_and_unknown_files() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.xlsx");
        assert!(matches!(
            load_allocation_sheets(&missing),
            Err(InventoryError::FileNotFound(_))
        ));

        let notes = dir.path().join("allocations.txt");
        std::fs::write(&notes, "x").unwrap();
        assert!(matches!(
            load_allocation_sheets(&notes),
            Err(InventoryError::UnsupportedSheet(_))
        ));
    }

    #[test]
    fn workbook_sheets_are_owners() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("allocations.xlsx");
        write_owner_workbook(&path);

        let sheets = load_allocation_sheets(&path).unwrap();
        assert_eq!(
            sheets,
            vec![
                AllocationSheet {
                    owner: "Cihan".to_string(),
                    rows: vec![SheetRow {
                        item_name: "Phantasma Flames Sleeve".to_string(),
                        cost: 5.29,
                        count: 50
                    }],
                },
                AllocationSheet {
                    owner: "Nima".to_string(),
                    rows: vec![SheetRow {
                        item_name: "Mega Evolutions Sleeve".to_string(),
                        cost: 5.29,
                        count: 20
                    }],
                },
            ]
        );
    }

    #[test]
    fn loads_csv_file_from_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("allocations.CSV");
        std::fs::write(&path, "owner,item_name,cost,count\nAskar,Mega Evolutions Sleeve,5,3\n").unwrap();

        let sheets = load_allocation_sheets(&path).unwrap();
        assert_eq!(sheets[0].owner, "Askar");
        assert_eq!(sheets[0].rows[0].count, 3);
    }
}
