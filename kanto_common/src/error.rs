//! Error types for kanto_common

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommonError {
    /// Title match mode name not recognised
    #[error("unknown title match mode '{0}' (expected exact, case_insensitive, aggressive or custom)")]
    UnknownTitleMatch(String),
}

pub type Result<T> = std::result::Result<T, CommonError>;
