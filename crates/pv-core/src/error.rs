//! Unified error types for the PV sizing toolkit
//!
//! Calculations never fail: degenerate inputs produce sentinel values and
//! warnings instead. [`PvError`] covers the places that do fail, namely
//! equipment validation, catalog loading and configuration.
//!
//! # Example
//!
//! ```ignore
//! use pv_core::{PvError, PvResult};
//!
//! fn size_project(path: &str) -> PvResult<()> {
//!     let project = load_project(path)?;
//!     project.module.validate()?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Unified error type for all PV sizing operations.
#[derive(Error, Debug)]
pub enum PvError {
    /// I/O errors (file access, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing/deserialization errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Equipment or input validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Cable catalog errors (empty table, unknown size)
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Generic errors (for wrapping external errors)
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Results using PvError.
pub type PvResult<T> = Result<T, PvError>;

// Conversion from anyhow::Error
impl From<anyhow::Error> for PvError {
    fn from(err: anyhow::Error) -> Self {
        PvError::Other(err.to_string())
    }
}

// Conversion from string-like types for convenience
impl From<String> for PvError {
    fn from(s: String) -> Self {
        PvError::Other(s)
    }
}

impl From<&str> for PvError {
    fn from(s: &str) -> Self {
        PvError::Other(s.to_string())
    }
}

// JSON parsing errors
impl From<serde_json::Error> for PvError {
    fn from(err: serde_json::Error) -> Self {
        PvError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PvError::Validation("mppt_voltage_min must be below mppt_voltage_max".into());
        assert!(err.to_string().contains("Validation error"));
        assert!(err.to_string().contains("mppt_voltage_min"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "catalog not found");
        let pv_err: PvError = io_err.into();
        assert!(matches!(pv_err, PvError::Io(_)));
    }

    #[test]
    fn test_json_error_is_parse() {
        let json_err = serde_json::from_str::<f64>("not a number").unwrap_err();
        let pv_err: PvError = json_err.into();
        assert!(matches!(pv_err, PvError::Parse(_)));
    }

    #[test]
    fn test_question_mark_operator() {
        fn inner() -> PvResult<()> {
            Err(PvError::Catalog("empty cable table".into()))
        }

        fn outer() -> PvResult<()> {
            inner()?;
            Ok(())
        }

        assert!(outer().is_err());
    }
}
