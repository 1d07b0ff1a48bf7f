use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::Result;
use crate::rules::builtin::Catalogs;
use crate::rules::metadata::RuleMetadata;
use crate::rules::policy::PolicyVerdict;
use crate::rules::{Finding, RuleFailure};
use crate::AnalysisReport;

#[derive(Serialize)]
struct JsonReport<'a> {
    run_id: Uuid,
    generated_at: DateTime<Utc>,
    pass: bool,
    targets: Vec<JsonTarget<'a>>,
}

#[derive(Serialize)]
struct JsonTarget<'a> {
    source: String,
    content_hash: &'a str,
    kind: String,
    target_name: &'a str,
    rules_evaluated: usize,
    verdict: &'a PolicyVerdict,
    findings: Vec<JsonFinding<'a>>,
    failures: &'a [RuleFailure],
}

#[derive(Serialize)]
struct JsonFinding<'a> {
    #[serde(flatten)]
    finding: &'a Finding,
    rule: Option<&'a RuleMetadata>,
}

/// Render a report as JSON, each effective finding joined with its rule metadata.
pub fn render(report: &AnalysisReport, catalogs: &Catalogs) -> Result<String> {
    let targets = report
        .targets
        .iter()
        .map(|t| JsonTarget {
            source: t.source.display().to_string(),
            content_hash: &t.content_hash,
            kind: t.evaluation.fact_kind.to_string(),
            target_name: &t.evaluation.target_name,
            rules_evaluated: t.evaluation.rules_evaluated,
            verdict: &t.verdict,
            findings: t
                .effective_findings
                .iter()
                .map(|finding| JsonFinding {
                    finding,
                    rule: super::lookup(catalogs, &finding.rule_id),
                })
                .collect(),
            failures: &t.evaluation.failures,
        })
        .collect();

    let json = serde_json::to_string_pretty(&JsonReport {
        run_id: report.run_id,
        generated_at: report.generated_at,
        pass: report.pass(),
        targets,
    })?;
    Ok(json)
}
