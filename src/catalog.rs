//! Read-only catalog: parameter option enumerations, export formats with
//! their minimum plans, and the module list.
//!
//! Loaded once at startup and shared as `Arc<Catalog>` for the process
//! lifetime. The pipeline never consults scattered literals; this document is
//! the single source of truth for options and plan/format rules.

use crate::entitlement::Plan;
use crate::error::{PromptGateError, Result};
use crate::params::Dimension;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

const DEFAULT_CATALOG: &str = include_str!("default_catalog.toml");

/// Option list for one required dimension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionSpec {
    pub options: Vec<String>,
    pub default: String,
}

/// An export format and the minimum plan that unlocks it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatSpec {
    pub id: String,
    pub label: String,
    pub min_plan: Plan,
}

/// A catalog module entry. Immutable after catalog load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    pub id: String,
    pub title: String,
    pub vector: String,
    pub min_plan: Plan,
    pub formats: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    pub version: String,
    pub dimensions: BTreeMap<Dimension, DimensionSpec>,
    pub formats: Vec<FormatSpec>,
    pub modules: Vec<Module>,
}

impl Catalog {
    /// Load from a TOML file when a path is given, otherwise parse the
    /// embedded document.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let catalog: Catalog = match path {
            Some(p) => {
                let content =
                    std::fs::read_to_string(p).map_err(|e| PromptGateError::Catalog {
                        message: format!("cannot read catalog file {}: {e}", p.display()),
                    })?;
                toml::from_str(&content)?
            }
            None => toml::from_str(DEFAULT_CATALOG)?,
        };
        catalog.check()?;
        Ok(catalog)
    }

    /// The embedded catalog. The document ships inside the binary, so a parse
    /// failure is a build defect, not a runtime condition.
    pub fn embedded() -> Self {
        let catalog: Catalog =
            toml::from_str(DEFAULT_CATALOG).expect("embedded catalog should parse");
        catalog
            .check()
            .expect("embedded catalog should be internally consistent");
        catalog
    }

    /// Internal consistency: every dimension present, defaults inside their
    /// option lists, module format references resolvable.
    fn check(&self) -> Result<()> {
        for dim in Dimension::ALL {
            let spec = self.dimensions.get(&dim).ok_or_else(|| {
                PromptGateError::Catalog {
                    message: format!("catalog is missing the '{dim}' dimension"),
                }
            })?;
            if spec.options.is_empty() {
                return Err(PromptGateError::Catalog {
                    message: format!("dimension '{dim}' has no options"),
                });
            }
            if !spec.options.iter().any(|o| o == &spec.default) {
                return Err(PromptGateError::Catalog {
                    message: format!(
                        "dimension '{dim}' default '{}' is not one of its options",
                        spec.default
                    ),
                });
            }
        }
        for module in &self.modules {
            for format in &module.formats {
                if self.format(format).is_none() {
                    return Err(PromptGateError::Catalog {
                        message: format!(
                            "module '{}' references unknown format '{format}'",
                            module.id
                        ),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn module(&self, id: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.id == id)
    }

    pub fn format(&self, id: &str) -> Option<&FormatSpec> {
        self.formats.iter().find(|f| f.id == id)
    }

    /// Formats supported by a module, with their minimum plans. Empty when
    /// the module is unknown.
    pub fn formats_for(&self, module_id: &str) -> Vec<&FormatSpec> {
        match self.module(module_id) {
            Some(module) => module
                .formats
                .iter()
                .filter_map(|id| self.format(id))
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn is_valid_option(&self, dim: Dimension, value: &str) -> bool {
        self.dimensions
            .get(&dim)
            .map(|spec| spec.options.iter().any(|o| o == value))
            .unwrap_or(false)
    }

    pub fn options(&self, dim: Dimension) -> &[String] {
        self.dimensions
            .get(&dim)
            .map(|spec| spec.options.as_slice())
            .unwrap_or(&[])
    }

    /// Catalog default value for a dimension.
    pub fn default_option(&self, dim: Dimension) -> &str {
        self.dimensions
            .get(&dim)
            .map(|spec| spec.default.as_str())
            .unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_catalog_parses_and_checks() {
        let catalog = Catalog::embedded();
        assert_eq!(catalog.dimensions.len(), 7);
        assert!(!catalog.formats.is_empty());
        assert!(!catalog.modules.is_empty());
    }

    #[test]
    fn module_lookup_and_format_join() {
        let catalog = Catalog::embedded();
        let module = catalog.module("precision-brief").unwrap();
        assert_eq!(module.vector, "strategy");
        let formats = catalog.formats_for("precision-brief");
        assert_eq!(formats.len(), module.formats.len());
        assert!(formats.iter().any(|f| f.id == "pdf" && f.min_plan == Plan::Pro));
    }

    #[test]
    fn unknown_module_yields_no_formats() {
        let catalog = Catalog::embedded();
        assert!(catalog.formats_for("nope").is_empty());
    }

    #[test]
    fn pdf_is_pro_minimum_and_bundle_enterprise() {
        let catalog = Catalog::embedded();
        assert_eq!(catalog.format("pdf").unwrap().min_plan, Plan::Pro);
        assert_eq!(catalog.format("bundle").unwrap().min_plan, Plan::Enterprise);
        assert_eq!(catalog.format("text").unwrap().min_plan, Plan::Free);
    }

    #[test]
    fn bad_default_is_rejected() {
        let mut catalog = Catalog::embedded();
        if let Some(spec) = catalog.dimensions.get_mut(&Dimension::Urgency) {
            spec.default = "apocalyptic".into();
        }
        assert!(catalog.check().is_err());
    }
}
