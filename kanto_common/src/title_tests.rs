//! Unit tests for title normalization.

use super::*;

mod mode_parsing_tests {
    use super::*;

    #[test]
    fn parses_all_mode_names() {
        assert_eq!("exact".parse::<TitleMatch>().unwrap(), TitleMatch::Exact);
        assert_eq!(
            "case_insensitive".parse::<TitleMatch>().unwrap(),
            TitleMatch::CaseInsensitive
        );
        assert_eq!(
            "aggressive".parse::<TitleMatch>().unwrap(),
            TitleMatch::Aggressive
        );
        assert_eq!("Custom".parse::<TitleMatch>().unwrap(), TitleMatch::Custom);
    }

    #[test]
    fn accepts_kebab_case() {
        assert_eq!(
            "case-insensitive".parse::<TitleMatch>().unwrap(),
            TitleMatch::CaseInsensitive
        );
    }

    #[test]
    fn rejects_unknown_mode() {
        let err = "fuzzy".parse::<TitleMatch>().unwrap_err();
        assert_eq!(err, CommonError::UnknownTitleMatch("fuzzy".to_string()));
    }

    #[test]
    fn serializes_snake_case() {
        let json = serde_json::to_string(&TitleMatch::CaseInsensitive).unwrap();
        assert_eq!(json, "\"case_insensitive\"");
    }

    #[test]
    fn display_matches_as_str() {
        for mode in TitleMatch::ALL {
            assert_eq!(mode.to_string(), mode.as_str());
        }
    }
}

mod lexical_mode_tests {
    use super::*;

    #[test]
    fn exact_keeps_title() {
        assert_eq!(
            normalize_title("  Pikachu V  ", TitleMatch::Exact),
            "  Pikachu V  "
        );
    }

    #[test]
    fn case_insensitive_collapses_spacing() {
        assert_eq!(
            normalize_title("  phantasmal  Flames pack #1  ", TitleMatch::CaseInsensitive),
            "phantasmal flames pack #1"
        );
        assert_eq!(
            normalize_title("Phantasmal Flames Pack #1", TitleMatch::CaseInsensitive),
            "phantasmal flames pack #1"
        );
    }

    #[test]
    fn aggressive_drops_emoji_and_punctuation() {
        assert_eq!(
            normalize_title("🔥 Crown Zenith - Booster Bundle! 🔥", TitleMatch::Aggressive),
            "crown zenith booster bundle"
        );
    }

    #[test]
    fn aggressive_folds_accents() {
        assert_eq!(
            normalize_title("Pokémon Café Mix", TitleMatch::Aggressive),
            "pokemon cafe mix"
        );
    }

    #[test]
    fn aggressive_strips_trailing_shipping_tag() {
        assert_eq!(
            normalize_title("Surging Sparks Pack #11", TitleMatch::Aggressive),
            "surging sparks sleeve"
        );
    }

    #[test]
    fn aggressive_applies_product_rules() {
        let title = "Friday Fiesta - Elite Trainer Box - Fantasmal Flames #3";
        assert_eq!(normalize_title(title, TitleMatch::Aggressive), "fantasmal flames etb");
        assert_eq!(
            normalize_title(title, TitleMatch::Aggressive),
            normalize_title(title, TitleMatch::Custom)
        );
        assert_eq!(normalize_title("Givyyyyy", TitleMatch::Aggressive), GIVEAWAY_IDENTITY);
    }

    #[test]
    fn aggressive_keeps_product_words() {
        assert_eq!(
            normalize_title("Stellar Crown ETB", TitleMatch::Aggressive),
            "stellar crown etb"
        );
    }
}

mod custom_mode_tests {
    use super::*;

    fn custom(title: &str) -> String {
        normalize_title(title, TitleMatch::Custom)
    }

    #[test]
    fn giveaways_share_one_identity() {
        assert_eq!(custom("Givyyyyy"), GIVEAWAY_IDENTITY);
        assert_eq!(custom("Free.99 - Random Pokemon Pack #2"), GIVEAWAY_IDENTITY);
        assert_eq!(custom("Friday Fiesta - Random Pokemon Pack!"), GIVEAWAY_IDENTITY);
        assert_eq!(
            custom("Kanto Christmas Gifts - Asian Pokemon Pack"),
            GIVEAWAY_IDENTITY
        );
    }

    #[test]
    fn numbered_packs_become_sleeves() {
        assert_eq!(
            custom("1X Pack - Phantasmal Flames #10"),
            "phantasmal flames sleeve"
        );
        assert_eq!(
            custom("1x Pack - Phantasmal Flames #11"),
            "phantasmal flames sleeve"
        );
        assert_eq!(
            custom("Phantasmal Flames Sleeved Booster Pack"),
            "phantasmal flames sleeve"
        );
    }

    #[test]
    fn pack_counts_do_not_split_identity() {
        assert_eq!(custom("5x Pack - Surging Sparks"), "surging sparks sleeve");
        assert_eq!(custom("Surging Sparks Pack"), "surging sparks sleeve");
        assert_eq!(custom("Surging Sparks 12x Packs"), "surging sparks sleeve");
    }

    #[test]
    fn blister_is_a_product() {
        assert_eq!(
            custom("Phantasmal Flames Single Pack Blister"),
            "phantasmal flames blister"
        );
        assert_eq!(
            custom("3 Pack Blister - Phantasmal Flames"),
            "3 phantasmal flames blister"
        );
    }

    #[test]
    fn event_prefix_and_emoji_are_removed() {
        assert_eq!(
            custom("Friday Fiesta - 🌀🧿🐉🔥 Elite Trainer Box - Fantasmal Flames 🌀🧿🐉🔥"),
            "fantasmal flames etb"
        );
    }

    #[test]
    fn booster_bundle_kept_whole() {
        assert_eq!(
            custom("Prismatic Evolutions Booster Bundle"),
            "prismatic evolutions booster bundle"
        );
    }

    #[test]
    fn ultra_premium_is_not_plain_premium() {
        assert_eq!(
            custom("Charizard Ultra Premium Collection"),
            "charizard upc"
        );
        assert_eq!(
            custom("Moltres Premium Collection"),
            "moltres premium collection"
        );
    }

    #[test]
    fn pokeball_spellings_merge() {
        assert_eq!(custom("Pokeball Tin - Mega"), "mega poke ball tin");
        assert_eq!(custom("Poke Ball Tin Mega"), "mega poke ball tin");
    }

    #[test]
    fn product_only_title() {
        assert_eq!(custom("Elite Trainer Box"), "etb");
    }

    #[test]
    fn unknown_product_keeps_words() {
        assert_eq!(custom("Lunch Chest #3"), "lunch chest");
    }
}

mod display_tests {
    use super::*;

    #[test]
    fn custom_title_cases_and_keeps_acronyms() {
        assert_eq!(
            display_title("fantasmal flames etb", TitleMatch::Custom),
            "Fantasmal Flames ETB"
        );
        assert_eq!(
            display_title("charizard upc", TitleMatch::Custom),
            "Charizard UPC"
        );
        assert_eq!(
            display_title(GIVEAWAY_IDENTITY, TitleMatch::Custom),
            "Random Asian Pack"
        );
    }

    #[test]
    fn other_modes_show_normalized_text() {
        assert_eq!(
            display_title("phantasmal flames pack", TitleMatch::CaseInsensitive),
            "phantasmal flames pack"
        );
        assert_eq!(
            display_title("fantasmal flames etb", TitleMatch::Aggressive),
            "fantasmal flames etb"
        );
    }

    #[test]
    fn collapse_whitespace_trims() {
        assert_eq!(collapse_whitespace("  a \t b\n c "), "a b c");
        assert_eq!(collapse_whitespace("   "), "");
    }
}
