//! Parameter engine: the 7-dimension parameter set and its validation.
//!
//! Validation is a pure function over the catalog-supplied enumerations.
//! Free-form extension keys (context, constraints, success_criteria, ...) are
//! recorded as-is and never shape-validated.

use crate::catalog::Catalog;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The fixed required configuration dimensions.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Domain,
    Scale,
    Urgency,
    Complexity,
    Resources,
    Application,
    Output,
}

impl Dimension {
    pub const ALL: [Dimension; 7] = [
        Dimension::Domain,
        Dimension::Scale,
        Dimension::Urgency,
        Dimension::Complexity,
        Dimension::Resources,
        Dimension::Application,
        Dimension::Output,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Domain => "domain",
            Dimension::Scale => "scale",
            Dimension::Urgency => "urgency",
            Dimension::Complexity => "complexity",
            Dimension::Resources => "resources",
            Dimension::Application => "application",
            Dimension::Output => "output",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured configuration: one enumerated value per required dimension
/// plus an open map of free-form extensions. Unknown keys live only in
/// `extensions`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    #[serde(default)]
    pub dimensions: BTreeMap<Dimension, String>,
    #[serde(default)]
    pub extensions: BTreeMap<String, String>,
}

impl ParameterSet {
    /// Value for a dimension; whitespace-only values count as absent.
    pub fn get(&self, dim: Dimension) -> Option<&str> {
        self.dimensions
            .get(&dim)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn is_populated(&self, dim: Dimension) -> bool {
        self.get(dim).is_some()
    }

    /// Number of required dimensions carrying a non-empty value.
    pub fn populated_count(&self) -> usize {
        Dimension::ALL
            .iter()
            .filter(|d| self.is_populated(**d))
            .count()
    }

    pub fn set(&mut self, dim: Dimension, value: impl Into<String>) {
        self.dimensions.insert(dim, value.into());
    }

    /// Append guidance text to a free-form extension key, preserving any
    /// user-entered text already there. Required dimensions are untouchable
    /// through this path.
    pub fn append_extension(&mut self, key: &str, text: &str) {
        let entry = self.extensions.entry(key.to_string()).or_default();
        if entry.is_empty() {
            *entry = text.to_string();
        } else {
            entry.push('\n');
            entry.push_str(text);
        }
    }
}

/// Field-level failure for one dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldError {
    MissingRequired,
    InvalidOption,
}

/// One field-level message with its machine-readable kind.
#[derive(Debug, Clone, Serialize)]
pub struct FieldMessage {
    pub kind: FieldError,
    pub message: String,
}

/// Outcome of parameter validation; `errors` is keyed by dimension name.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: BTreeMap<Dimension, FieldMessage>,
}

impl ValidationReport {
    /// Missing dimensions only lower the completeness score; a value outside
    /// its enumeration means no score may be computed at all, so generation
    /// must stop.
    pub fn has_invalid_option(&self) -> bool {
        self.errors
            .values()
            .any(|e| e.kind == FieldError::InvalidOption)
    }
}

/// Validate a parameter set against the catalog enumerations.
///
/// Per required dimension: `MissingRequired` when absent or empty,
/// `InvalidOption` when present but outside the catalog's option list.
pub fn validate(params: &ParameterSet, catalog: &Catalog) -> ValidationReport {
    let mut errors = BTreeMap::new();
    for dim in Dimension::ALL {
        match params.get(dim) {
            None => {
                errors.insert(
                    dim,
                    FieldMessage {
                        kind: FieldError::MissingRequired,
                        message: format!("{dim} is required"),
                    },
                );
            }
            Some(value) => {
                if !catalog.is_valid_option(dim, value) {
                    errors.insert(
                        dim,
                        FieldMessage {
                            kind: FieldError::InvalidOption,
                            message: format!("'{value}' is not a recognized {dim} option"),
                        },
                    );
                }
            }
        }
    }
    ValidationReport {
        is_valid: errors.is_empty(),
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    fn full_set(catalog: &Catalog) -> ParameterSet {
        let mut params = ParameterSet::default();
        for dim in Dimension::ALL {
            params.set(dim, catalog.default_option(dim));
        }
        params
    }

    #[test]
    fn empty_set_fails_every_dimension() {
        let catalog = Catalog::embedded();
        let report = validate(&ParameterSet::default(), &catalog);
        assert!(!report.is_valid);
        assert_eq!(report.errors.len(), 7);
        // Missing keys lower the score; they do not block scoring.
        assert!(!report.has_invalid_option());
    }

    #[test]
    fn catalog_defaults_validate_clean() {
        let catalog = Catalog::embedded();
        let report = validate(&full_set(&catalog), &catalog);
        assert!(report.is_valid, "errors: {:?}", report.errors);
    }

    #[test]
    fn out_of_catalog_value_is_invalid_option() {
        let catalog = Catalog::embedded();
        let mut params = full_set(&catalog);
        params.set(Dimension::Urgency, "apocalyptic");
        let report = validate(&params, &catalog);
        assert!(!report.is_valid);
        assert!(report.has_invalid_option());
        assert_eq!(report.errors.len(), 1);
        assert_eq!(
            report.errors[&Dimension::Urgency].kind,
            FieldError::InvalidOption
        );
    }

    #[test]
    fn whitespace_value_counts_as_missing() {
        let catalog = Catalog::embedded();
        let mut params = full_set(&catalog);
        params.set(Dimension::Domain, "   ");
        assert!(!params.is_populated(Dimension::Domain));
        let report = validate(&params, &catalog);
        assert!(report.errors.contains_key(&Dimension::Domain));
    }

    #[test]
    fn extensions_are_never_validated() {
        let catalog = Catalog::embedded();
        let mut params = full_set(&catalog);
        params
            .extensions
            .insert("anything_goes".into(), "\u{1F980} arbitrary".into());
        assert!(validate(&params, &catalog).is_valid);
    }

    #[test]
    fn append_extension_preserves_existing_text() {
        let mut params = ParameterSet::default();
        params.append_extension("context", "first");
        params.append_extension("context", "second");
        assert_eq!(params.extensions["context"], "first\nsecond");
    }
}
