//! Diagnostics collected while applying a change table.
//!
//! Scaling never fails because a zone group is empty or a category omits a
//! scope; those entries are skipped. This module gives the skipped entries a
//! place to go so callers can tell the two cases apart:
//!
//! - `empty_match`: a (zone, type) or (zone, zone) group matched no asset
//! - `missing_scope`: a category is present but lacks a scope sub-key
//!
//! # Example
//!
//! ```
//! use gridscale_core::diagnostics::{categories, ScaleDiagnostics};
//!
//! let mut diag = ScaleDiagnostics::new();
//! diag.add_warning_with_entity(categories::EMPTY_MATCH, "no plants matched", "coal zone 3");
//! diag.stats.plants_scaled += 2;
//!
//! assert_eq!(diag.warning_count(), 1);
//! assert_eq!(diag.issues_by_category(categories::EMPTY_MATCH).count(), 1);
//! ```

use serde::Serialize;

/// Well-known diagnostic categories emitted by the scaler.
pub mod categories {
    pub const EMPTY_MATCH: &str = "empty_match";
    pub const MISSING_SCOPE: &str = "missing_scope";
}

/// A skipped change-table entry. Every issue is a warning: the entry was
/// ignored and the pass continued.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticIssue {
    /// Category for grouping (see [`categories`])
    pub category: String,
    /// Human-readable description of the issue
    pub message: String,
    /// Optional entity reference (e.g., "wind zone 301", "branch")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
}

impl DiagnosticIssue {
    pub fn new(category: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            message: message.into(),
            entity: None,
        }
    }

    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }
}

impl std::fmt::Display for DiagnosticIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[warning:{}] {}", self.category, self.message)?;

        if let Some(entity) = &self.entity {
            write!(f, " ({})", entity)?;
        }

        Ok(())
    }
}

/// Counts of grid elements touched by one scaling pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScaleStats {
    pub plants_scaled: usize,
    pub branches_scaled: usize,
    pub dclines_scaled: usize,
    pub dclines_deactivated: usize,
    pub storage_added: usize,
    pub dclines_added: usize,
    pub profile_columns_scaled: usize,
}

/// Complete diagnostics for one scaling pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScaleDiagnostics {
    pub stats: ScaleStats,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<DiagnosticIssue>,
}

impl ScaleDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_warning_with_entity(&mut self, category: &str, message: &str, entity: &str) {
        self.issues
            .push(DiagnosticIssue::new(category, message).with_entity(entity));
    }

    pub fn warning_count(&self) -> usize {
        self.issues.len()
    }

    /// Get issues filtered by category
    pub fn issues_by_category<'a>(
        &'a self,
        category: &'a str,
    ) -> impl Iterator<Item = &'a DiagnosticIssue> {
        self.issues.iter().filter(move |i| i.category == category)
    }

    pub fn summary(&self) -> String {
        let warnings = self.warning_count();
        let issue_summary = match warnings {
            0 => "No issues".to_string(),
            w => format!("{} warning{}", w, if w == 1 { "" } else { "s" }),
        };

        format!(
            "{} plants, {} branches, {} dclines scaled, {} storage and {} dclines added | {}",
            self.stats.plants_scaled,
            self.stats.branches_scaled,
            self.stats.dclines_scaled + self.stats.dclines_deactivated,
            self.stats.storage_added,
            self.stats.dclines_added,
            issue_summary
        )
    }
}

impl std::fmt::Display for ScaleDiagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Scaling: {}", self.summary())?;
        for issue in &self.issues {
            writeln!(f, "  {}", issue)?;
        }
        Ok(())
    }
}
