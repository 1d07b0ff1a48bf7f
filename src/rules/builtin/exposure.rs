use crate::error::Result;
use crate::facts::graph::ObjectRisk;
use crate::facts::CompromiseGraph;
use crate::rules::metadata::{Category, Computation, FrameworkReference, RiskObjective, RuleMetadata};
use crate::rules::{GraphContext, GraphRule, RuleResult, Signal, Threshold};

/// Exposure of one risk tier of sensitive objects.
///
/// Looks at every sub-analysis of the configured risk. With
/// [`Threshold::Any`] a sub-analysis matches when a path reaches one of
/// its critical objects; with [`Threshold::MoreThan`] it matches when
/// more objects than the bound can take control of it.
pub struct ExposedObjectsRule {
    risk: ObjectRisk,
    threshold: Threshold,
}

impl ExposedObjectsRule {
    pub fn new(risk: ObjectRisk, threshold: Threshold) -> Self {
        Self { risk, threshold }
    }
}

pub(super) fn critical_exposed_metadata() -> Result<RuleMetadata> {
    RuleMetadata::builder("P-CriticalObjectExposed")
        .category(Category::PrivilegedAccounts)
        .objective(RiskObjective::TakeControlOfCriticalObjects)
        .computation(Computation::objective(50))
        .maturity(1)
        .reference(FrameworkReference::mitre("T1098"))
        .rationale_key("graph.exposure")
        .title("A path reaches critical objects")
        .description("Some non-privileged objects can take control of critical objects.")
        .solution(
            "Review the control paths shown for each group and remove the \
             permissions, memberships or sessions they rely on.",
        )
        .technical_explanation(
            "The compromise graph chains ACLs, group memberships, GPO links and \
             logon sessions. Any chain ending in a critical object gives its \
             starting point full control of the domain.",
        )
        .build()
}

pub(super) fn high_exposed_many_metadata() -> Result<RuleMetadata> {
    RuleMetadata::builder("P-HighRiskExposedMany")
        .category(Category::PrivilegedAccounts)
        .objective(RiskObjective::ExposePrivilegedObjects)
        .computation(Computation::objective(25))
        .maturity(3)
        .rationale_key("graph.exposure")
        .title("Many objects can take control of high-risk groups")
        .solution("Reduce the number of indirect members of high-risk groups.")
        .build()
}

impl GraphRule for ExposedObjectsRule {
    fn evaluate(&self, graph: &CompromiseGraph, ctx: &mut GraphContext<'_>) -> RuleResult {
        let mut matched = false;
        for analysis in graph.sub_analyses.iter().filter(|a| a.risk == self.risk) {
            if !self
                .threshold
                .is_met(analysis.objects_impacted, analysis.critical_object_found)
            {
                continue;
            }
            matched = true;
            let detail = match self.threshold {
                Threshold::Any => "critical object reachable".to_string(),
                Threshold::MoreThan(_) => {
                    format!("{} objects can take control", analysis.objects_impacted)
                }
            };
            ctx.record_sub_graph_detail(&analysis.name, &analysis.description, detail);
        }
        Ok(Signal::matched_if(matched))
    }
}
