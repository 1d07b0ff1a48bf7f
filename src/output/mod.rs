pub mod console;
pub mod json;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::rules::builtin::Catalogs;
use crate::rules::metadata::RuleMetadata;
use crate::AnalysisReport;

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Console,
    Json,
}

impl OutputFormat {
    pub fn from_str_lenient(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "console" | "text" => Some(Self::Console),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Render a report into the specified format.
///
/// Display text is looked up in `catalogs` by rule id; a finding whose id
/// no catalog knows is still rendered, without its display text.
pub fn render(report: &AnalysisReport, catalogs: &Catalogs, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Console => Ok(console::render(report, catalogs)),
        OutputFormat::Json => json::render(report, catalogs),
    }
}

fn lookup<'a>(catalogs: &'a Catalogs, rule_id: &str) -> Option<&'a RuleMetadata> {
    match catalogs.resolve(rule_id) {
        Ok(meta) => Some(meta),
        Err(e) => {
            tracing::warn!(error = %e, "finding without catalog entry");
            None
        }
    }
}
