use crate::rules::builtin::Catalogs;
use crate::rules::metadata::Category;
use crate::rules::{Finding, RuleFailure};
use crate::{AnalysisReport, TargetReport};

/// Details shown per finding before the list is elided.
const MAX_DETAILS: usize = 10;

/// Render a report as plain console text, one section per target.
pub fn render(report: &AnalysisReport, catalogs: &Catalogs) -> String {
    let mut output = String::new();

    for target in &report.targets {
        render_target(&mut output, target, catalogs);
    }

    let status = if report.pass() { "PASS" } else { "FAIL" };
    output.push_str(&format!(
        "  Result: {} ({} target(s), run {})\n\n",
        status,
        report.targets.len(),
        report.run_id
    ));
    output
}

fn render_target(output: &mut String, target: &TargetReport, catalogs: &Catalogs) {
    let evaluation = &target.evaluation;
    output.push_str(&format!(
        "\n  {} [{}] from {}\n",
        evaluation.target_name,
        evaluation.fact_kind,
        target.source.display()
    ));

    let verdict = &target.verdict;
    output.push_str(&format!(
        "  Score: {}/100 (fail above {}), maturity level {}\n",
        verdict.global_score, verdict.fail_above, verdict.maturity_level
    ));
    for category in Category::ALL {
        let score = verdict.category_scores.get(&category).copied().unwrap_or(0);
        output.push_str(&format!("    {:<22} {:>3}\n", category.to_string(), score));
    }
    output.push('\n');

    if target.effective_findings.is_empty() {
        output.push_str("  No risk rule triggered.\n\n");
    } else {
        // Heaviest first, then by id
        let mut sorted: Vec<&Finding> = target.effective_findings.iter().collect();
        sorted.sort_by(|a, b| b.weight.cmp(&a.weight).then_with(|| a.rule_id.cmp(&b.rule_id)));

        output.push_str(&format!(
            "  {} rule(s) triggered out of {} evaluated:\n\n",
            sorted.len(),
            evaluation.rules_evaluated
        ));
        for finding in sorted {
            render_finding(output, finding, catalogs);
        }
    }

    if !evaluation.failures.is_empty() {
        render_failures(output, &evaluation.failures);
    }
}

fn render_finding(output: &mut String, finding: &Finding, catalogs: &Catalogs) {
    let meta = super::lookup(catalogs, &finding.rule_id);
    let title = meta.map(|m| m.display().title.as_str()).unwrap_or("-");

    output.push_str(&format!(
        "  [+{:>3}] {} {}\n",
        finding.weight, finding.rule_id, title
    ));
    output.push_str(&format!(
        "          {} / {}, maturity {}\n",
        finding.category, finding.classification, finding.maturity
    ));
    if let Some(rationale) = &finding.rationale {
        output.push_str(&format!("          {}\n", rationale));
    }
    push_details(output, &finding.details, "          - ");

    for sub_graph in &finding.sub_graphs {
        output.push_str(&format!("          {}:", sub_graph.description));
        match &sub_graph.rationale {
            Some(rationale) => output.push_str(&format!(" {}\n", rationale)),
            None => output.push('\n'),
        }
        push_details(output, &sub_graph.details, "            - ");
    }

    if let Some(meta) = meta {
        let solution = &meta.display().solution;
        if !solution.is_empty() {
            output.push_str(&format!("          fix: {}\n", solution));
        }
        for reference in meta.references() {
            match reference.url() {
                Some(url) => output.push_str(&format!("          see: {} <{}>\n", reference, url)),
                None => output.push_str(&format!("          see: {}\n", reference)),
            }
        }
    }
    output.push('\n');
}

fn push_details(output: &mut String, details: &[String], prefix: &str) {
    for detail in details.iter().take(MAX_DETAILS) {
        output.push_str(&format!("{}{}\n", prefix, detail));
    }
    if details.len() > MAX_DETAILS {
        output.push_str(&format!(
            "{}... and {} more\n",
            prefix,
            details.len() - MAX_DETAILS
        ));
    }
}

fn render_failures(output: &mut String, failures: &[RuleFailure]) {
    output.push_str(&format!("  {} rule(s) could not be evaluated:\n", failures.len()));
    for failure in failures {
        output.push_str(&format!("    ! {}\n", failure));
    }
    output.push('\n');
}
