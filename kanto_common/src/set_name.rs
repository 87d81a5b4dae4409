//! Set / product line inference for normalized titles

use lazy_static::lazy_static;
use regex::Regex;

/// Fallback bucket for titles no rule recognises
pub const OTHER_SET: &str = "Other";

/// Expansion keywords, checked in order
const SET_RULES: &[(&[&str], &str)] = &[
    (&["random asian pack", "giv"], "Giveaways"),
    (&["phantasmal"], "Phantasmal Flames"),
    (&["destined rival"], "Destined Rivals"),
    (&["prismatic"], "Prismatic Evolutions"),
    (&["mega evolution", "mega heroes"], "Mega Evolutions"),
    (&["crown zenith"], "Crown Zenith"),
    (&["paldean fates", "paldaen fates"], "Paldean Fates"),
    (&["surging sparks"], "Surging Sparks"),
    (&["twilight masquerade", "twilight masqerade"], "Twilight Masquerade"),
    (&["stellar crown"], "Stellar Crown"),
    (&["shrouded fables"], "Shrouded Fables"),
    (&["journey together"], "Journey Together"),
    (&["black bolt"], "Black Bolt"),
    (&["white flare"], "White Flare"),
    (&["trick or treat"], "Trick or Treat"),
];

/// Product lines that span expansions, checked after One Piece
const LINE_RULES: &[(&[&str], &str)] = &[
    (&["plush collection"], "Plush Collections"),
    (&["figure collection"], "Figure Collections"),
];

const PREMIUM_RULES: &[(&str, &str)] = &[
    ("charizard", "Charizard Collections"),
    ("venusaur", "Venusaur Collections"),
    ("moltres", "Moltres Collections"),
];

const TAIL_RULES: &[(&[&str], &str)] = &[
    (&["battle deck"], "Battle Decks"),
    (&["poke ball tin", "pokeball tin"], "Poke Ball Tins"),
    (&["lunch chest", "collector chest"], "Storage/Chests"),
    (&["single", "card"], "Singles/Cards"),
    (&["unova heavy hitters"], "Unova Heavy Hitters"),
];

lazy_static! {
    static ref ONE_PIECE: Regex = Regex::new(r"\bone piece\b|\bop\s?\d+\b").unwrap();
    static ref ONE_PIECE_NUMBER: Regex = Regex::new(r"\bop\s?(\d+)\b").unwrap();
}

/// Name the set or product line a normalized title belongs to
pub fn set_name_for(normalized: &str) -> String {
    let lowered = normalized.to_lowercase();

    if let Some(name) = first_rule(SET_RULES, &lowered) {
        return name.to_string();
    }
    if ONE_PIECE.is_match(&lowered) {
        return one_piece_set(&lowered);
    }
    if let Some(name) = first_rule(LINE_RULES, &lowered) {
        return name.to_string();
    }
    if lowered.contains("premium collection") || lowered.contains("upc") {
        let name = PREMIUM_RULES
            .iter()
            .find(|(needle, _)| lowered.contains(needle))
            .map_or("Premium Collections", |(_, name)| *name);
        return name.to_string();
    }
    first_rule(TAIL_RULES, &lowered)
        .unwrap_or(OTHER_SET)
        .to_string()
}

fn first_rule(rules: &[(&[&str], &'static str)], text: &str) -> Option<&'static str> {
    rules
        .iter()
        .find(|(needles, _)| needles.iter().any(|needle| text.contains(needle)))
        .map(|(_, name)| *name)
}

fn one_piece_set(lowered: &str) -> String {
    if lowered.contains("azure sea") {
        return "One Piece - Azure Sea".to_string();
    }
    match ONE_PIECE_NUMBER
        .captures(lowered)
        .and_then(|caps| caps.get(1))
        .and_then(|number| number.as_str().parse::<u32>().ok())
    {
        Some(number) => format!("One Piece - OP{number:02}"),
        None => "One Piece".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pokemon_sets() {
        assert_eq!(set_name_for("phantasmal flames sleeve"), "Phantasmal Flames");
        assert_eq!(set_name_for("destined rivals etb"), "Destined Rivals");
        assert_eq!(set_name_for("twilight masqerade sleeve"), "Twilight Masquerade");
        assert_eq!(set_name_for("mega heroes blister"), "Mega Evolutions");
    }

    #[test]
    fn giveaways() {
        assert_eq!(set_name_for("random asian pack"), "Giveaways");
    }

    #[test]
    fn one_piece_numbers() {
        assert_eq!(set_name_for("op14 booster"), "One Piece - OP14");
        assert_eq!(set_name_for("one piece op 8 sleeve"), "One Piece - OP08");
        assert_eq!(set_name_for("one piece azure sea op13"), "One Piece - Azure Sea");
        assert_eq!(set_name_for("one piece starter"), "One Piece");
    }

    #[test]
    fn op_inside_words_is_not_one_piece() {
        assert_eq!(set_name_for("top loader single"), "Singles/Cards");
    }

    #[test]
    fn premium_collections() {
        assert_eq!(set_name_for("charizard upc"), "Charizard Collections");
        assert_eq!(set_name_for("lucario premium collection"), "Premium Collections");
    }

    #[test]
    fn product_lines() {
        assert_eq!(set_name_for("pikachu plush collection"), "Plush Collections");
        assert_eq!(set_name_for("mega poke ball tin"), "Poke Ball Tins");
        assert_eq!(set_name_for("lunch chest"), "Storage/Chests");
    }

    #[test]
    fn unknown_is_other() {
        assert_eq!(set_name_for("mystery box"), OTHER_SET);
    }
}
