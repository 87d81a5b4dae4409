//! Shared listing logic for Kanto inventory
//!
//! Everything in here is pure string work: no database, no I/O. The
//! `kanto_inventory` crate feeds it listing titles from seller exports and
//! item names from allocation sheets.

pub mod error;
pub mod matching;
pub mod multiplier;
pub mod set_name;
pub mod title;

pub use error::{CommonError, Result};
pub use matching::{match_item_name, rewrite_item_name};
pub use multiplier::{effective_quantity, quantity_multiplier};
pub use set_name::set_name_for;
pub use title::{collapse_whitespace, display_title, normalize_title, TitleMatch, GIVEAWAY_IDENTITY};
