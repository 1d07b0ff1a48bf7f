use std::collections::BTreeSet;

use crate::error::Result;
use crate::facts::graph::{GraphDependency, Typology};
use crate::facts::CompromiseGraph;
use crate::rules::metadata::{Category, Computation, FrameworkReference, RiskObjective, RuleMetadata};
use crate::rules::{GraphContext, GraphRule, RuleResult, Signal, Threshold};

/// Foreign domains on control paths, filtered by object typology.
///
/// Counts distinct dependency domains whose typology is one of the
/// configured ones. [`Threshold::MoreThan`] compares that count;
/// [`Threshold::Any`] matches when one of them reaches a critical object.
pub struct DependencyRule {
    typologies: Vec<Typology>,
    threshold: Threshold,
}

impl DependencyRule {
    pub fn new(typologies: &[Typology], threshold: Threshold) -> Self {
        Self {
            typologies: typologies.to_vec(),
            threshold,
        }
    }

    fn matches(&self, dependency: &GraphDependency) -> bool {
        self.typologies.contains(&dependency.typology)
    }
}

pub(super) fn privileged_metadata() -> Result<RuleMetadata> {
    RuleMetadata::builder("P-DependencyPrivileged")
        .category(Category::Trusts)
        .objective(RiskObjective::ForeignDomainControl)
        .computation(Computation::objective(30))
        .maturity(2)
        .reference(FrameworkReference::anssi("vuln2_trusts_control", None))
        .rationale_key("graph.dependency")
        .title("Foreign domains control privileged objects")
        .description(
            "Privileged accounts or infrastructure objects of another domain are \
             on a control path into this domain.",
        )
        .solution(
            "Remove foreign principals from privileged groups and ACLs, or treat \
             the foreign domain as part of the same security perimeter.",
        )
        .build()
}

pub(super) fn users_metadata() -> Result<RuleMetadata> {
    RuleMetadata::builder("P-DependencyUserMany")
        .category(Category::Trusts)
        .objective(RiskObjective::IndirectControl)
        .computation(Computation::objective(10))
        .maturity(4)
        .rationale_key("graph.dependency")
        .title("Users of many foreign domains are on control paths")
        .solution("Review the foreign users listed for each control path.")
        .build()
}

impl GraphRule for DependencyRule {
    fn evaluate(&self, graph: &CompromiseGraph, ctx: &mut GraphContext<'_>) -> RuleResult {
        let matching: Vec<&GraphDependency> = graph
            .dependencies
            .iter()
            .filter(|d| self.matches(d))
            .collect();
        let domain_count = matching
            .iter()
            .map(|d| d.domain.to_lowercase())
            .collect::<BTreeSet<_>>()
            .len() as u64;
        let critical = matching.iter().any(|d| d.critical_object_found);

        if !self.threshold.is_met(domain_count, critical) {
            return Ok(Signal::NotMatched);
        }

        for dependency in matching {
            let description = if dependency.sub_graph_description.is_empty() {
                &dependency.sub_graph
            } else {
                &dependency.sub_graph_description
            };
            ctx.record_sub_graph_detail(
                &dependency.sub_graph,
                description,
                format!(
                    "{} ({} {} object(s))",
                    dependency.display_name(),
                    dependency.item_count,
                    dependency.typology
                ),
            );
        }
        Ok(Signal::Matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleContext;

    fn dependency(domain: &str, typology: Typology, sub_graph: &str) -> GraphDependency {
        GraphDependency {
            domain: domain.into(),
            netbios: None,
            sub_graph: sub_graph.into(),
            sub_graph_description: String::new(),
            typology,
            critical_object_found: false,
            item_count: 2,
        }
    }

    fn graph(dependencies: Vec<GraphDependency>) -> CompromiseGraph {
        CompromiseGraph {
            domain_fqdn: "corp.local".into(),
            sub_analyses: vec![],
            dependencies,
        }
    }

    fn privileged_rule() -> DependencyRule {
        DependencyRule::new(
            &[Typology::PrivilegedAccount, Typology::Infrastructure],
            Threshold::try_from(0).unwrap(),
        )
    }

    #[test]
    fn two_privileged_dependencies_exceed_zero() {
        let graph = graph(vec![
            dependency("partner.local", Typology::PrivilegedAccount, "DomainAdmins"),
            dependency("vendor.local", Typology::Infrastructure, "DomainControllers"),
            dependency("users.local", Typology::User, "DomainAdmins"),
        ]);
        let mut ctx = RuleContext::new();
        let signal = privileged_rule()
            .evaluate(&graph, &mut GraphContext::new(&mut ctx))
            .unwrap();
        assert_eq!(signal, Signal::Matched);
        assert_eq!(ctx.sub_graphs().len(), 2);
        assert_eq!(
            ctx.sub_graphs()[0].details,
            ["partner.local (2 privileged account object(s))"]
        );
    }

    #[test]
    fn no_matching_typology_is_not_matched() {
        let graph = graph(vec![dependency("users.local", Typology::User, "DomainAdmins")]);
        let mut ctx = RuleContext::new();
        let signal = privileged_rule()
            .evaluate(&graph, &mut GraphContext::new(&mut ctx))
            .unwrap();
        assert_eq!(signal, Signal::NotMatched);
        assert_eq!(ctx.detail_count(), 0);
    }

    #[test]
    fn same_domain_counts_once() {
        let rule = DependencyRule::new(&[Typology::User], Threshold::MoreThan(1));
        let graph = graph(vec![
            dependency("partner.local", Typology::User, "A"),
            dependency("PARTNER.local", Typology::User, "B"),
        ]);
        let mut ctx = RuleContext::new();
        let signal = rule
            .evaluate(&graph, &mut GraphContext::new(&mut ctx))
            .unwrap();
        assert_eq!(signal, Signal::NotMatched);
    }

    #[test]
    fn any_threshold_requires_critical_dependency() {
        let rule = DependencyRule::new(&[Typology::User], Threshold::Any);
        let mut critical = dependency("partner.local", Typology::User, "A");
        critical.critical_object_found = true;
        let graph = graph(vec![critical]);
        let mut ctx = RuleContext::new();
        let signal = rule
            .evaluate(&graph, &mut GraphContext::new(&mut ctx))
            .unwrap();
        assert_eq!(signal, Signal::Matched);
        assert_eq!(ctx.details(), ["A (A)"]);
    }
}
