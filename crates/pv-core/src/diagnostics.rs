//! Structured warnings for sizing calculations.
//!
//! Out-of-range configurations are never errors: an oversized string, an
//! undersized cable or an excessive voltage drop is reported as an issue and
//! the caller decides whether to block. Issues carry:
//!
//! - Severity levels (Warning, Error)
//! - Categories for grouping issues (voltage, margin, ampacity, ...)
//! - Optional entity references (e.g., "MPPT 2", "10 mm² Cu")
//! - Serialization for JSON output
//!
//! # Example
//!
//! ```
//! use pv_core::diagnostics::{category, Diagnostics};
//!
//! let mut diag = Diagnostics::new();
//! diag.add_warning(category::MARGIN, "Low safety margin on maximum voltage (3.2%)");
//! diag.add_error_with_entity(category::MPPT, "Current exceeds limit", "MPPT 1");
//!
//! assert_eq!(diag.warning_count(), 1);
//! assert_eq!(diag.error_count(), 1);
//! assert_eq!(diag.messages().len(), 2);
//! ```

use serde::{Deserialize, Serialize};

/// Well-known issue categories
pub mod category {
    /// String voltage outside inverter limits
    pub const VOLTAGE: &str = "voltage";
    /// Safety margin below policy threshold
    pub const MARGIN: &str = "margin";
    /// Cable ampacity shortfall
    pub const AMPACITY: &str = "ampacity";
    /// Voltage drop above limit
    pub const VOLTAGE_DROP: &str = "voltage_drop";
    /// Inconsistent or degenerate configuration
    pub const CONFIGURATION: &str = "configuration";
    /// MPPT channel assignment problems
    pub const MPPT: &str = "mppt";
    /// Derating table fallbacks
    pub const DERATING: &str = "derating";
}

/// Severity level for diagnostic issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Design is usable but close to a limit, or a value was defaulted
    Warning,
    /// Design violates a hard equipment limit
    Error,
}

/// A single diagnostic issue raised by a calculation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticIssue {
    /// Severity of the issue
    pub severity: Severity,
    /// Category for grouping (see [`category`])
    pub category: String,
    /// Human-readable description of the issue
    pub message: String,
    /// Optional entity reference (e.g., "MPPT 2")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
}

impl DiagnosticIssue {
    /// Create a new diagnostic issue
    pub fn new(
        severity: Severity,
        category: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category: category.into(),
            message: message.into(),
            entity: None,
        }
    }

    /// Add entity reference to the issue
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }
}

impl std::fmt::Display for DiagnosticIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let severity = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };

        write!(f, "[{}:{}] {}", severity, self.category, self.message)?;

        if let Some(entity) = &self.entity {
            write!(f, " ({})", entity)?;
        }

        Ok(())
    }
}

/// Collection of diagnostic issues for a calculation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// All collected issues
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<DiagnosticIssue>,
}

impl Diagnostics {
    /// Create new empty diagnostics
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a raw issue directly
    pub fn add(&mut self, issue: DiagnosticIssue) {
        self.issues.push(issue);
    }

    // =========================================================================
    // Warning Methods
    // =========================================================================

    /// Add a warning with category and message
    pub fn add_warning(&mut self, category: &str, message: &str) {
        self.issues
            .push(DiagnosticIssue::new(Severity::Warning, category, message));
    }

    /// Add a warning with entity reference
    pub fn add_warning_with_entity(&mut self, category: &str, message: &str, entity: &str) {
        self.issues
            .push(DiagnosticIssue::new(Severity::Warning, category, message).with_entity(entity));
    }

    // =========================================================================
    // Error Methods
    // =========================================================================

    /// Add an error with category and message
    pub fn add_error(&mut self, category: &str, message: &str) {
        self.issues
            .push(DiagnosticIssue::new(Severity::Error, category, message));
    }

    /// Add an error with entity reference
    pub fn add_error_with_entity(&mut self, category: &str, message: &str, entity: &str) {
        self.issues
            .push(DiagnosticIssue::new(Severity::Error, category, message).with_entity(entity));
    }

    // =========================================================================
    // Query Methods
    // =========================================================================

    /// Count warning issues
    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count()
    }

    /// Count error issues
    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count()
    }

    /// Check if there are any issues
    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    /// Check if there are any errors
    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    /// Get issues filtered by category
    pub fn issues_by_category<'a>(
        &'a self,
        category: &'a str,
    ) -> impl Iterator<Item = &'a DiagnosticIssue> {
        self.issues.iter().filter(move |i| i.category == category)
    }

    /// Plain message strings, in the order they were raised
    pub fn messages(&self) -> Vec<String> {
        self.issues.iter().map(|i| i.message.clone()).collect()
    }

    /// True if any issue message contains the given fragment
    pub fn mentions(&self, fragment: &str) -> bool {
        self.issues.iter().any(|i| i.message.contains(fragment))
    }

    // =========================================================================
    // Utility Methods
    // =========================================================================

    /// Merge another diagnostics into this one
    pub fn merge(&mut self, other: Diagnostics) {
        self.issues.extend(other.issues);
    }

    /// Merge another diagnostics, tagging untagged issues with an entity
    pub fn merge_with_entity(&mut self, other: Diagnostics, entity: &str) {
        self.issues.extend(other.issues.into_iter().map(|mut issue| {
            if issue.entity.is_none() {
                issue.entity = Some(entity.to_string());
            }
            issue
        }));
    }

    /// Get summary string
    pub fn summary(&self) -> String {
        let warnings = self.warning_count();
        let errors = self.error_count();

        match (warnings, errors) {
            (0, 0) => "No issues".to_string(),
            (w, 0) => format!("{} warning{}", w, if w == 1 { "" } else { "s" }),
            (0, e) => format!("{} error{}", e, if e == 1 { "" } else { "s" }),
            (w, e) => format!(
                "{} warning{}, {} error{}",
                w,
                if w == 1 { "" } else { "s" },
                e,
                if e == 1 { "" } else { "s" }
            ),
        }
    }
}

impl std::fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Diagnostics: {}", self.summary())?;
        for issue in &self.issues {
            writeln!(f, "  {}", issue)?;
        }
        Ok(())
    }
}
