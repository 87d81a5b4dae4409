//! Listing title normalization
//!
//! Seller titles are free text: mixed casing, emoji, event prefixes, pack
//! counts and `#N` shipping tags. Each [`TitleMatch`] mode decides how much
//! of that noise is stripped before titles are grouped together.

use crate::error::CommonError;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use unicode_normalization::UnicodeNormalization;

/// Canonical identity shared by giveaways and random packs
pub const GIVEAWAY_IDENTITY: &str = "random asian pack";

/// Substrings marking a giveaway or mystery pack listing
const GIVEAWAY_MARKERS: &[&str] = &[
    "giv",
    "giveaway",
    "random asian pack",
    "random pokemon pack",
    "asian pokemon pack",
    "free",
];

/// Show/event names sellers prepend to listings
const EVENT_PREFIXES: &[&str] = &[
    "friday fiesta",
    "friday surprise",
    "new years spin out",
    "kanto christmas gifts",
];

/// Product type detection, first matching rule wins.
///
/// A bare "pack" is a single sleeved booster; N-pack listings were already
/// multiplied out at ingestion, so they share the per-pack identity.
const PRODUCT_TYPES: &[(&[&str], &str)] = &[
    (&["elite trainer box", "etb"], "etb"),
    (&["booster bundle"], "booster bundle"),
    (&["ultra premium collection", "upc"], "upc"),
    (&["premium collection"], "premium collection"),
    (&["plush collection"], "plush collection"),
    (&["figure collection"], "figure collection"),
    (&["battle deck"], "battle deck"),
    (&["blister"], "blister"),
    (&["sleeve"], "sleeve"),
    (&["poke ball tin", "pokeball tin"], "poke ball tin"),
    (&["pack"], "sleeve"),
];

lazy_static! {
    static ref NON_TOKEN: Regex = Regex::new(r"[^a-z0-9#]+").unwrap();
    static ref TRAILING_TAG: Regex = Regex::new(r"\s+#\d+$").unwrap();
    static ref LEADING_DASHES: Regex = Regex::new(r"^[\s\-]+").unwrap();
    static ref PRODUCT_WORDS: Regex = Regex::new(
        r"\b(\d+x|1|2|packs?|single|sleeved?|booster|blister|elite|trainer|box|etb|bundle|premium|ultra|collection|figure|plush|battle|deck|pokeball|poke|ball|tin|upc)\b"
    )
    .unwrap();
    static ref HASH_TAG: Regex = Regex::new(r"#\d+").unwrap();
    static ref PUNCTUATION: Regex = Regex::new(r"[^\w\s]").unwrap();
}

/// How strictly listing titles are matched when grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TitleMatch {
    /// Titles must be byte-identical
    #[default]
    Exact,
    /// Ignore casing and whitespace differences
    CaseInsensitive,
    /// Fold accents, drop emoji/punctuation and trailing `#N` tags, then
    /// apply the giveaway and product-type rules
    Aggressive,
    /// Same identities as `Aggressive`, shown title-cased with set names
    Custom,
}

impl TitleMatch {
    pub const ALL: [TitleMatch; 4] = [
        TitleMatch::Exact,
        TitleMatch::CaseInsensitive,
        TitleMatch::Aggressive,
        TitleMatch::Custom,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TitleMatch::Exact => "exact",
            TitleMatch::CaseInsensitive => "case_insensitive",
            TitleMatch::Aggressive => "aggressive",
            TitleMatch::Custom => "custom",
        }
    }
}

impl fmt::Display for TitleMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TitleMatch {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        TitleMatch::ALL
            .into_iter()
            .find(|mode| mode.as_str() == wanted)
            .ok_or_else(|| CommonError::UnknownTitleMatch(s.to_string()))
    }
}

/// Trim and collapse every whitespace run to a single space
pub fn collapse_whitespace(title: &str) -> String {
    title.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize a listing title for grouping under the given mode
pub fn normalize_title(title: &str, mode: TitleMatch) -> String {
    match mode {
        TitleMatch::Exact => title.to_string(),
        TitleMatch::CaseInsensitive => collapse_whitespace(title).to_lowercase(),
        TitleMatch::Aggressive | TitleMatch::Custom => {
            strip_trailing_tag(&apply_product_rules(&lexical_clean(title)))
        }
    }
}

/// Human-facing form of a normalized title
pub fn display_title(normalized: &str, mode: TitleMatch) -> String {
    if mode != TitleMatch::Custom {
        return normalized.to_string();
    }
    title_case(normalized)
        .split(' ')
        .map(|word| match word {
            "Etb" => "ETB",
            "Upc" => "UPC",
            other => other,
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lowercase ASCII tokens only: accents folded, emoji and punctuation gone
fn lexical_clean(title: &str) -> String {
    let folded: String = collapse_whitespace(title)
        .nfkd()
        .filter(char::is_ascii)
        .collect::<String>()
        .to_ascii_lowercase();
    collapse_whitespace(&NON_TOKEN.replace_all(&folded, " "))
}

fn strip_trailing_tag(text: &str) -> String {
    TRAILING_TAG.replace(text, "").into_owned()
}

/// Map a lexically cleaned title onto "<set words> <product type>"
fn apply_product_rules(cleaned: &str) -> String {
    if GIVEAWAY_MARKERS.iter().any(|marker| cleaned.contains(marker)) {
        return GIVEAWAY_IDENTITY.to_string();
    }

    let mut text = cleaned.to_string();
    for prefix in EVENT_PREFIXES {
        if text.contains(prefix) {
            text = text.replace(prefix, "");
            text = LEADING_DASHES.replace(text.trim(), "").into_owned();
        }
    }

    let product = product_type(&text);

    let words = PRODUCT_WORDS.replace_all(&text, " ");
    let words = HASH_TAG.replace_all(&words, "");
    let words = collapse_whitespace(&PUNCTUATION.replace_all(&words, " "));

    match product {
        Some(product) if !words.is_empty() => format!("{words} {product}"),
        Some(product) => product.to_string(),
        None if !words.is_empty() => words,
        None => text,
    }
}

fn product_type(text: &str) -> Option<&'static str> {
    PRODUCT_TYPES
        .iter()
        .find(|(needles, _)| needles.iter().any(|needle| text.contains(needle)))
        .map(|(_, product)| *product)
}

/// Upper-case the first letter of every alphabetic run
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_word = false;
    for ch in text.chars() {
        if ch.is_alphabetic() {
            if in_word {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(ch);
            in_word = false;
        }
    }
    out
}

#[cfg(test)]
#[path = "title_tests.rs"]
mod tests;
