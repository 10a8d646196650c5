//! Content renderer seam.
//!
//! The pipeline treats generation as an opaque string producer: given a
//! parameter set and a module, hand back text. Quality of that text is out of
//! scope here; the pipeline only snapshots it onto the run and checksums it
//! at export time.

use crate::catalog::Module;
use crate::error::{PromptGateError, Result};
use crate::params::{Dimension, ParameterSet};

pub trait ContentRenderer: Send + Sync {
    fn render(&self, params: &ParameterSet, module: &Module) -> Result<String>;
}

/// Default deterministic template assembler. Stands in for the real
/// generation backend; deliberately boring so checksums are reproducible.
pub struct TemplateRenderer;

impl ContentRenderer for TemplateRenderer {
    fn render(&self, params: &ParameterSet, module: &Module) -> Result<String> {
        let mut out = String::new();
        out.push_str(&format!("# {} ({})\n\n", module.title, module.vector));
        for dim in Dimension::ALL {
            if let Some(value) = params.get(dim) {
                out.push_str(&format!("- {dim}: {value}\n"));
            }
        }
        if !params.extensions.is_empty() {
            out.push('\n');
            for (key, value) in &params.extensions {
                out.push_str(&format!("## {key}\n{value}\n\n"));
            }
        }
        if out.is_empty() {
            return Err(PromptGateError::Render {
                message: "renderer produced no content".into(),
            });
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    #[test]
    fn render_is_deterministic() {
        let catalog = Catalog::embedded();
        let module = catalog.module("precision-brief").unwrap();
        let mut params = ParameterSet::default();
        params.set(Dimension::Domain, "finance");
        params.append_extension("context", "quarterly close");

        let a = TemplateRenderer.render(&params, module).unwrap();
        let b = TemplateRenderer.render(&params, module).unwrap();
        assert_eq!(a, b);
        assert!(a.contains("Precision Brief"));
        assert!(a.contains("domain: finance"));
        assert!(a.contains("quarterly close"));
    }
}
