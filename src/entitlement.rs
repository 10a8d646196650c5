//! Entitlement gate: plan tiers and the capabilities they grant.
//!
//! Plan affects which export formats are reachable; the minimum export score
//! is uniform across every plan. The gate never mutates state, it only
//! answers queries, and it is deliberately ignorant of content quality.

use crate::catalog::Catalog;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Minimum composite score required for any export, on every plan.
pub const EXPORT_SCORE_THRESHOLD: u8 = 80;

/// Subscription tiers, ordered. Each tier's format set is a superset of the
/// one below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Free,
    Creator,
    Pro,
    Enterprise,
}

impl Plan {
    /// Numeric rank used for the strict partial order over plans.
    pub fn rank(&self) -> u8 {
        match self {
            Plan::Free => 0,
            Plan::Creator => 1,
            Plan::Pro => 2,
            Plan::Enterprise => 3,
        }
    }

    /// True when this plan sits at or above `required` in the tier order.
    pub fn satisfies(&self, required: Plan) -> bool {
        self.rank() >= required.rank()
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Plan::Free => write!(f, "free"),
            Plan::Creator => write!(f, "creator"),
            Plan::Pro => write!(f, "pro"),
            Plan::Enterprise => write!(f, "enterprise"),
        }
    }
}

impl FromStr for Plan {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(Plan::Free),
            "creator" => Ok(Plan::Creator),
            "pro" => Ok(Plan::Pro),
            "enterprise" => Ok(Plan::Enterprise),
            other => Err(format!("unknown plan '{other}'")),
        }
    }
}

/// Capability snapshot for one plan, derived from the catalog's per-format
/// minimum-plan attributes so the catalog stays the single source of truth.
#[derive(Debug, Clone, Serialize)]
pub struct Entitlement {
    pub plan: Plan,
    pub can_export_json: bool,
    pub can_export_pdf: bool,
    pub can_export_bundle: bool,
    pub can_run_live_test: bool,
    pub min_export_score: u8,
}

impl Entitlement {
    pub fn for_plan(plan: Plan, catalog: &Catalog) -> Self {
        let format_ok = |id: &str| {
            catalog
                .format(id)
                .map(|f| plan.satisfies(f.min_plan))
                .unwrap_or(false)
        };
        Self {
            plan,
            can_export_json: format_ok("json"),
            can_export_pdf: format_ok("pdf"),
            can_export_bundle: format_ok("bundle"),
            can_run_live_test: can_run_live_test(plan),
            min_export_score: EXPORT_SCORE_THRESHOLD,
        }
    }
}

/// Is `plan` allowed to export `format`? Consults the requested format's
/// catalog-defined minimum plan; unknown formats are never exportable.
/// Independent of score by design intent: this answers "is this plan allowed
/// this format", never "is this content good enough".
pub fn can_export(plan: Plan, format: &str, catalog: &Catalog) -> bool {
    catalog
        .format(format)
        .map(|f| plan.satisfies(f.min_plan))
        .unwrap_or(false)
}

/// Minimum plan for a concrete module/format pair: the format's floor raised
/// by the module's own floor.
pub fn required_plan(module: &crate::catalog::Module, format: &crate::catalog::FormatSpec) -> Plan {
    format.min_plan.max(module.min_plan)
}

/// Live re-testing is an advanced action reserved for pro and enterprise.
pub fn can_run_live_test(plan: Plan) -> bool {
    plan.satisfies(Plan::Pro)
}
