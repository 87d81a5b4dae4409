//! Fuzzy matching of allocation-sheet item names onto inventory titles
//!
//! Sheets are typed by hand ("Phantasma Flames Elite Trainer Box") while
//! inventory titles come out of the normalizer ("Phantasmal Flames ETB").
//! Names are rewritten through a synonym table, then scored by shared
//! keywords. Anything under [`MIN_SCORE`] is left unmatched.

use lazy_static::lazy_static;
use regex::{NoExpand, Regex};
use std::collections::HashSet;

/// Lowest score accepted as a match
pub const MIN_SCORE: i32 = 4;

/// Whole-word rewrites applied in order (misspellings and synonyms)
const REWRITES: &[(&str, &str)] = &[
    ("phantasma", "phantasmal"),
    ("venasaur", "venusaur"),
    ("pokeball", "poke ball"),
    ("khangaskhan", "kangaskhan"),
    ("kanghaskan", "kangaskhan"),
    ("masqurade", "masquerade"),
    ("masqerade", "masquerade"),
    ("booster box", "booster bundle"),
    ("3xpack", "3 pack"),
    ("upc", "ultra premium collection"),
    ("elite trainer box", "etb"),
];

const NOISE_WORDS: &[&str] = &["ex", "pokemon", "the"];

const SET_KEYWORDS: &[&str] = &[
    "phantasmal", "destined", "prismatic", "mega", "surging", "twilight", "stellar", "crown",
    "paldean", "black", "white", "shrouded", "unova", "charizard", "venusaur", "latias",
    "lucario", "kangaskhan", "diancie", "moltres", "melmetal", "kyurem", "hydreigon",
    "dragapult", "armarouge", "sneasel", "cottonee", "whimsicott", "flames", "evolutions",
    "bolt", "flare", "fables", "sparks", "masquerade", "fates",
];

const PRODUCT_KEYWORDS: &[&str] = &[
    "sleeve", "blister", "etb", "bundle", "tin", "collection", "deck", "chest", "figure",
    "plush", "booster", "elite", "trainer", "box", "premium", "ultra", "battle",
];

lazy_static! {
    static ref REWRITE_PATTERNS: Vec<(Regex, &'static str)> = REWRITES
        .iter()
        .map(|(from, to)| {
            let pattern = format!(r"\b{}\b", regex::escape(from));
            (Regex::new(&pattern).unwrap(), *to)
        })
        .collect();
    static ref NON_WORD: Regex = Regex::new(r"[^a-z0-9\s]+").unwrap();
}

/// Lowercase, strip punctuation and collapse spacing
fn plain_words(text: &str) -> String {
    let lowered = text.trim().to_lowercase();
    NON_WORD
        .replace_all(&lowered, " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Rewrite a sheet item name through the synonym table and drop noise words
pub fn rewrite_item_name(name: &str) -> String {
    let mut text = plain_words(name);
    for (pattern, replacement) in REWRITE_PATTERNS.iter() {
        text = pattern.replace_all(&text, NoExpand(replacement)).into_owned();
    }
    text.split_whitespace()
        .filter(|word| !NOISE_WORDS.contains(word))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Find the inventory title a sheet item name refers to
///
/// Exact matches (raw or rewritten, ignoring case) win outright. Otherwise
/// the highest-scoring candidate sharing at least one set or product
/// keyword is returned; ties go to the earliest candidate.
pub fn match_item_name<'a, S: AsRef<str>>(sheet_name: &str, candidates: &'a [S]) -> Option<&'a str> {
    let raw = sheet_name.trim().to_lowercase();
    let rewritten = rewrite_item_name(sheet_name);

    let exact = candidates.iter().map(|c| c.as_ref()).find(|candidate| {
        let lowered = candidate.to_lowercase();
        lowered == raw || lowered == rewritten
    });
    if exact.is_some() {
        return exact;
    }

    let sheet_words: HashSet<&str> = rewritten.split_whitespace().collect();
    let mut best: Option<(&'a str, i32)> = None;

    for candidate in candidates.iter().map(|c| c.as_ref()) {
        let Some(score) = score_candidate(&rewritten, &sheet_words, candidate) else {
            continue;
        };
        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((candidate, score));
        }
    }

    match best {
        Some((candidate, score)) if score >= MIN_SCORE => {
            log::debug!("Matched '{}' -> '{}' (score {})", sheet_name, candidate, score);
            Some(candidate)
        }
        _ => {
            log::debug!("No inventory match for '{}'", sheet_name);
            None
        }
    }
}

/// Score one candidate; `None` when it shares no set or product keyword
fn score_candidate(rewritten: &str, sheet_words: &HashSet<&str>, candidate: &str) -> Option<i32> {
    let lowered = plain_words(candidate);
    let candidate_words: HashSet<&str> = lowered.split_whitespace().collect();

    let shared: Vec<&str> = sheet_words
        .iter()
        .filter(|word| candidate_words.contains(*word))
        .copied()
        .collect();
    let shared_sets = shared.iter().filter(|w| SET_KEYWORDS.contains(*w)).count() as i32;
    let shared_products = shared.iter().filter(|w| PRODUCT_KEYWORDS.contains(*w)).count() as i32;

    if shared_sets == 0 && shared_products == 0 {
        return None;
    }

    let mut score = shared_sets * 3 + shared_products * 2 + shared.len() as i32;
    if lowered.contains(rewritten) || rewritten.contains(lowered.as_str()) {
        score += 2;
    }
    if (sheet_words.len() as i32 - candidate_words.len() as i32).abs() > 3 {
        score -= 1;
    }
    Some(score)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inventory() -> Vec<String> {
        vec![
            "Phantasmal Flames Sleeve".to_string(),
            "Phantasmal Flames ETB".to_string(),
            "Mega Evolutions Sleeve".to_string(),
        ]
    }

    #[test]
    fn exact_match() {
        let items = inventory();
        assert_eq!(
            match_item_name("Phantasmal Flames Sleeve", &items),
            Some("Phantasmal Flames Sleeve")
        );
        assert_eq!(
            match_item_name("  mega evolutions sleeve ", &items),
            Some("Mega Evolutions Sleeve")
        );
    }

    #[test]
    fn misspelling_is_corrected() {
        let items = inventory();
        assert_eq!(
            match_item_name("Phantasma Flames Sleeve", &items),
            Some("Phantasmal Flames Sleeve")
        );
    }

    #[test]
    fn elite_trainer_box_becomes_etb() {
        let items = inventory();
        assert_eq!(
            match_item_name("Phantasmal Flames Elite Trainer Box", &items),
            Some("Phantasmal Flames ETB")
        );
    }

    #[test]
    fn scored_match_prefers_more_shared_keywords() {
        let items = inventory();
        assert_eq!(
            match_item_name("Phantasmal ETB", &items),
            Some("Phantasmal Flames ETB")
        );
    }

    #[test]
    fn unrelated_name_has_no_match() {
        let items = inventory();
        assert_eq!(match_item_name("Random Item That Doesn't Exist", &items), None);
    }

    #[test]
    fn weak_overlap_stays_below_threshold() {
        let items = vec!["Lucario Figure Collection".to_string()];
        assert_eq!(match_item_name("Box", &items), None);
    }

    #[test]
    fn rewrite_is_whole_word() {
        assert_eq!(rewrite_item_name("Phantasmal Flames"), "phantasmal flames");
        assert_eq!(rewrite_item_name("Phantasma Flames"), "phantasmal flames");
        assert_eq!(rewrite_item_name("The Pokeball Tin EX"), "poke ball tin");
        assert_eq!(rewrite_item_name("Charizard UPC"), "charizard ultra premium collection");
    }

    #[test]
    fn works_with_str_slices() {
        let items = ["Surging Sparks Sleeve", "Surging Sparks ETB"];
        assert_eq!(
            match_item_name("Surging Sparks Elite Trainer Box", &items),
            Some("Surging Sparks ETB")
        );
    }
}
