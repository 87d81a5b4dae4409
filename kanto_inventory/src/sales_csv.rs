//! Seller platform CSV export parsing
//!
//! Rows are keyed by header name. Unknown columns are ignored and short rows
//! are tolerated; a row that cannot be turned into a [`SaleRow`] is counted as
//! rejected rather than failing the file.

use chrono::{DateTime, NaiveDateTime};
use serde::Deserialize;
use std::io::Read;
use thiserror::Error;

use crate::error::Result;

/// Transaction type the seller platform uses for completed orders
pub const ORDER_EARNINGS: &str = "ORDER_EARNINGS";

/// One CSV row exactly as exported, every column optional
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawSaleRow {
    #[serde(rename = "ORDER_ID")]
    pub order_id: Option<String>,
    #[serde(rename = "LISTING_TITLE")]
    pub listing_title: Option<String>,
    #[serde(rename = "LISTING_DESCRIPTION")]
    pub listing_description: Option<String>,
    #[serde(rename = "PRODUCT_CATEGORY")]
    pub product_category: Option<String>,
    #[serde(rename = "BUY_FORMAT")]
    pub buy_format: Option<String>,
    #[serde(rename = "SALE_TYPE")]
    pub sale_type: Option<String>,
    #[serde(rename = "QUANTITY_SOLD")]
    pub quantity_sold: Option<String>,
    #[serde(rename = "TRANSACTION_TYPE")]
    pub transaction_type: Option<String>,
    #[serde(rename = "TRANSACTION_AMOUNT")]
    pub transaction_amount: Option<String>,
    #[serde(rename = "BUYER_PAID")]
    pub buyer_paid: Option<String>,
    #[serde(rename = "ORIGINAL_ITEM_PRICE")]
    pub original_item_price: Option<String>,
    #[serde(rename = "BUYER_NAME")]
    pub buyer_name: Option<String>,
    #[serde(rename = "BUYER_STATE")]
    pub buyer_state: Option<String>,
    #[serde(rename = "BUYER_COUNTRY")]
    pub buyer_country: Option<String>,
    #[serde(rename = "ORDER_PLACED_AT_UTC")]
    pub order_placed_at: Option<String>,
    #[serde(rename = "TRANSACTION_COMPLETED_AT_UTC")]
    pub transaction_completed_at: Option<String>,
}

/// A validated sale row
#[derive(Debug, Clone, PartialEq)]
pub struct SaleRow {
    pub order_id: String,
    pub listing_title: String,
    pub listing_description: Option<String>,
    pub product_category: Option<String>,
    pub buy_format: Option<String>,
    pub sale_type: Option<String>,
    pub quantity_sold: i64,
    pub transaction_type: String,
    pub transaction_amount: f64,
    pub buyer_paid: f64,
    pub original_item_price: f64,
    pub buyer_name: Option<String>,
    pub buyer_state: Option<String>,
    pub buyer_country: Option<String>,
    pub order_placed_at: Option<NaiveDateTime>,
    pub transaction_completed_at: Option<NaiveDateTime>,
}

/// Why a CSV row was not accepted
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RowRejection {
    #[error("missing {0}")]
    MissingField(&'static str),
    #[error("invalid quantity '{0}'")]
    InvalidQuantity(String),
    #[error("invalid {field} '{value}'")]
    InvalidAmount { field: &'static str, value: String },
    #[error("invalid {field} '{value}'")]
    InvalidTimestamp { field: &'static str, value: String },
    #[error("unreadable row: {0}")]
    Unreadable(String),
}

/// Rows accepted from one CSV, plus rejections with their 1-based line
#[derive(Debug, Default)]
pub struct ParsedSales {
    pub rows: Vec<SaleRow>,
    pub rejected: Vec<(u64, RowRejection)>,
}

impl SaleRow {
    /// Completed orders that actually moved money
    pub fn is_sale(&self) -> bool {
        self.transaction_type == ORDER_EARNINGS
            && (self.transaction_amount > 0.0
                || self.buyer_paid > 0.0
                || self.original_item_price > 0.0)
    }
}

impl TryFrom<RawSaleRow> for SaleRow {
    type Error = RowRejection;

    fn try_from(raw: RawSaleRow) -> std::result::Result<Self, Self::Error> {
        let order_id = clean(raw.order_id).ok_or(RowRejection::MissingField("ORDER_ID"))?;
        let listing_title =
            clean(raw.listing_title).ok_or(RowRejection::MissingField("LISTING_TITLE"))?;
        let transaction_type =
            clean(raw.transaction_type).ok_or(RowRejection::MissingField("TRANSACTION_TYPE"))?;

        let quantity_sold = match clean(raw.quantity_sold) {
            None => 1,
            Some(text) => text
                .parse::<i64>()
                .map_err(|_| RowRejection::InvalidQuantity(text))?,
        };

        Ok(SaleRow {
            order_id,
            listing_title,
            listing_description: clean(raw.listing_description),
            product_category: clean(raw.product_category),
            buy_format: clean(raw.buy_format),
            sale_type: clean(raw.sale_type),
            quantity_sold,
            transaction_type,
            transaction_amount: parse_money("TRANSACTION_AMOUNT", raw.transaction_amount)?,
            buyer_paid: parse_money("BUYER_PAID", raw.buyer_paid)?,
            original_item_price: parse_money("ORIGINAL_ITEM_PRICE", raw.original_item_price)?,
            buyer_name: clean(raw.buyer_name),
            buyer_state: clean(raw.buyer_state),
            buyer_country: clean(raw.buyer_country),
            order_placed_at: parse_timestamp("ORDER_PLACED_AT_UTC", raw.order_placed_at)?,
            transaction_completed_at: parse_timestamp(
                "TRANSACTION_COMPLETED_AT_UTC",
                raw.transaction_completed_at,
            )?,
        })
    }
}

/// Trim a text field; blank becomes absent
fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_money(field: &'static str, value: Option<String>) -> std::result::Result<f64, RowRejection> {
    let Some(text) = clean(value) else {
        return Ok(0.0);
    };
    let digits: String = text.chars().filter(|c| *c != '$' && *c != ',').collect();
    digits
        .parse::<f64>()
        .ok()
        .filter(|amount| amount.is_finite())
        .ok_or(RowRejection::InvalidAmount { field, value: text })
}

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];
const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"];

/// Parse an export timestamp into UTC wall time
pub fn parse_timestamp(
    field: &'static str,
    value: Option<String>,
) -> std::result::Result<Option<NaiveDateTime>, RowRejection> {
    let Some(text) = clean(value) else {
        return Ok(None);
    };

    if let Ok(parsed) = DateTime::parse_from_rfc3339(&text) {
        return Ok(Some(parsed.naive_utc()));
    }
    for format in OFFSET_FORMATS {
        if let Ok(parsed) = DateTime::parse_from_str(&text, format) {
            return Ok(Some(parsed.naive_utc()));
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(&text, format) {
            return Ok(Some(parsed));
        }
    }
    Err(RowRejection::InvalidTimestamp { field, value: text })
}

/// Read every row of a sales export
pub fn read_sale_rows<R: Read>(reader: R) -> Result<ParsedSales> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    // Header errors fail the file; row errors only reject the row
    csv_reader.headers()?;

    let mut parsed = ParsedSales::default();
    for (index, record) in csv_reader.deserialize::<RawSaleRow>().enumerate() {
        let line = index as u64 + 2;
        let outcome = record
            .map_err(|e| RowRejection::Unreadable(e.to_string()))
            .and_then(SaleRow::try_from);
        match outcome {
            Ok(row) => parsed.rows.push(row),
            Err(rejection) => {
                log::debug!("Rejected row {}: {}", line, rejection);
                parsed.rejected.push((line, rejection));
            }
        }
    }
    Ok(parsed)
}
