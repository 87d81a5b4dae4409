//! Pack-count multipliers in listing titles
//!
//! A listing titled "2x Pack - Surging Sparks" sold once moves two packs.
//! "3 Pack Blister" is one product and "#4" is a shipping tag; neither
//! multiplies.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref BLISTER_PRODUCT: Regex = Regex::new(r"\b\d+\s*-?\s*pack\s+blister\b").unwrap();
    static ref COUNT_X_PACK: Regex = Regex::new(r"\b(\d+)x\s*pack\b").unwrap();
    static ref COUNT_X: Regex = Regex::new(r"\b(\d+)x\b").unwrap();
    static ref PACK_X_COUNT: Regex = Regex::new(r"\bpacks?\s*x\s*(\d+)\b").unwrap();
}

/// Extract the pack multiplier from a raw listing title (1 when absent)
pub fn quantity_multiplier(title: &str) -> u32 {
    let lowered = title.to_lowercase();
    let has_blister = lowered.contains("blister");

    if has_blister && BLISTER_PRODUCT.is_match(&lowered) {
        return 1;
    }
    if let Some(count) = captured_count(&COUNT_X_PACK, &lowered) {
        return count;
    }
    if !has_blister {
        if let Some(count) = captured_count(&COUNT_X, &lowered) {
            return count;
        }
    }
    captured_count(&PACK_X_COUNT, &lowered).unwrap_or(1)
}

/// Units actually moved by a sale line
pub fn effective_quantity(quantity_sold: i64, title: &str) -> i64 {
    quantity_sold.saturating_mul(i64::from(quantity_multiplier(title)))
}

fn captured_count(pattern: &Regex, text: &str) -> Option<u32> {
    let count: u32 = pattern.captures(text)?.get(1)?.as_str().parse().ok()?;
    (count > 0).then_some(count)
}
