//! Evaluation pass: every catalog rule against one fact object.

use std::panic::{self, AssertUnwindSafe};

use rayon::prelude::*;

use super::catalog::{Catalog, CatalogEntry};
use super::finding::{Evaluation, FailureKind, Finding, RuleFailure, SubGraphFinding};
use super::metadata::{ComputationMode, RuleMetadata};
use super::rationale::{self, TemplateSource};
use super::{RuleContext, Signal};
use crate::error::Result;
use crate::facts::Facts;

/// Runs a frozen catalog against fact objects and renders rationales.
pub struct Engine<'a, F> {
    catalog: &'a Catalog<F>,
    templates: &'a dyn TemplateSource,
}

enum Outcome {
    Triggered(Finding),
    NotTriggered,
    Failed(RuleFailure),
}

impl<'a, F: Facts> Engine<'a, F> {
    /// Bind a catalog to its rationale templates. Fails if a rule names a
    /// template the source cannot provide.
    pub fn new(catalog: &'a Catalog<F>, templates: &'a dyn TemplateSource) -> Result<Self> {
        catalog.check_templates(templates)?;
        Ok(Self { catalog, templates })
    }

    pub fn catalog(&self) -> &Catalog<F> {
        self.catalog
    }

    /// Evaluate every rule against `facts`.
    ///
    /// Rules run in parallel, each with its own context; findings come
    /// back in catalog order. A failing rule is reported in
    /// [`Evaluation::failures`] and never stops its siblings.
    pub fn evaluate(&self, facts: &F) -> Evaluation {
        let outcomes: Vec<Outcome> = self
            .catalog
            .all_rules()
            .par_iter()
            .map(|entry| self.evaluate_rule(entry, facts))
            .collect();

        let mut findings = Vec::new();
        let mut failures = Vec::new();
        for outcome in outcomes {
            match outcome {
                Outcome::Triggered(finding) => findings.push(finding),
                Outcome::NotTriggered => {}
                Outcome::Failed(failure) => {
                    tracing::warn!(failure = %failure, "rule evaluation failed");
                    failures.push(failure);
                }
            }
        }

        tracing::info!(
            fact_kind = %F::KIND,
            target = %facts.target_name(),
            rules = self.catalog.len(),
            findings = findings.len(),
            failures = failures.len(),
            "evaluation complete"
        );

        Evaluation {
            fact_kind: F::KIND,
            target_name: facts.target_name().to_string(),
            rules_evaluated: self.catalog.len(),
            findings,
            failures,
        }
    }

    fn evaluate_rule(&self, entry: &CatalogEntry<F>, facts: &F) -> Outcome {
        let metadata = entry.metadata();
        let rule_id = metadata.id().to_string();
        let mut ctx = RuleContext::new();

        let result = panic::catch_unwind(AssertUnwindSafe(|| entry.rule().evaluate(facts, &mut ctx)));
        let signal = match result {
            Ok(Ok(signal)) => signal,
            Ok(Err(err)) => {
                return Outcome::Failed(RuleFailure {
                    rule_id,
                    kind: FailureKind::Error {
                        message: err.to_string(),
                    },
                });
            }
            Err(payload) => {
                return Outcome::Failed(RuleFailure {
                    rule_id,
                    kind: FailureKind::Panic {
                        message: panic_message(payload.as_ref()),
                    },
                });
            }
        };

        let triggered = match (metadata.mode(), signal) {
            (ComputationMode::TriggerOnPresence, Signal::NoSignal) => ctx.detail_count() > 0,
            (ComputationMode::Objective, Signal::Matched) => true,
            (ComputationMode::Objective, Signal::NotMatched) => false,
            (mode, signal) => {
                return Outcome::Failed(RuleFailure {
                    rule_id,
                    kind: FailureKind::ProtocolViolation { mode, signal },
                });
            }
        };
        tracing::debug!(rule_id = %rule_id, signal = %signal, triggered, "rule evaluated");

        if triggered {
            Outcome::Triggered(self.finding(metadata, ctx))
        } else {
            Outcome::NotTriggered
        }
    }

    fn finding(&self, metadata: &RuleMetadata, ctx: RuleContext) -> Finding {
        let template = self.templates.template(metadata.rationale_key());
        let (details, sub_graphs) = ctx.into_parts();

        let sub_graphs = sub_graphs
            .into_iter()
            .map(|sg| SubGraphFinding {
                rationale: template.map(|t| rationale::render(t, sg.details.len())),
                name: sg.name,
                description: sg.description,
                details: sg.details,
            })
            .collect();

        Finding {
            rule_id: metadata.id().to_string(),
            category: metadata.category(),
            classification: metadata.classification(),
            maturity: metadata.maturity(),
            weight: metadata.weight(),
            rationale: template.map(|t| rationale::render(t, details.len())),
            details,
            sub_graphs,
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::healthcheck::SyncFacts;
    use crate::facts::{CompromiseGraph, HealthcheckFacts};
    use crate::rules::catalog::CatalogBuilder;
    use crate::rules::metadata::{Category, Computation, RiskModel, RiskObjective};
    use crate::rules::rationale::TemplateBundle;
    use crate::rules::{GraphContext, GraphRule, Rule, RuleError, RuleResult};
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn facts() -> HealthcheckFacts {
        HealthcheckFacts {
            domain_fqdn: "corp.local".into(),
            generated_at: Utc::now(),
            sync: Some(SyncFacts {
                status: "Enabled".into(),
                version: "1.4.2.0".into(),
                server: None,
            }),
            krbtgt_last_change: None,
            laps_installed: false,
            privileged_accounts: vec![],
            trusts: vec![],
        }
    }

    fn meta(id: &str, computation: Computation) -> RuleMetadata {
        RuleMetadata::builder(id)
            .category(Category::Anomalies)
            .model(RiskModel::ObjectConfig)
            .computation(computation)
            .maturity(3)
            .title(id)
            .build()
            .unwrap()
    }

    /// Records `n` details and returns the given signal.
    struct Fixed {
        details: usize,
        signal: Signal,
    }

    impl Rule<HealthcheckFacts> for Fixed {
        fn evaluate(&self, _: &HealthcheckFacts, ctx: &mut RuleContext) -> RuleResult {
            for i in 0..self.details {
                ctx.record_detail(format!("item{i}"));
            }
            Ok(self.signal)
        }
    }

    struct Failing;

    impl Rule<HealthcheckFacts> for Failing {
        fn evaluate(&self, _: &HealthcheckFacts, ctx: &mut RuleContext) -> RuleResult {
            ctx.record_detail("partial");
            Err(RuleError::MalformedFacts("sync version missing".into()))
        }
    }

    struct Panicking;

    impl Rule<HealthcheckFacts> for Panicking {
        fn evaluate(&self, _: &HealthcheckFacts, _: &mut RuleContext) -> RuleResult {
            panic!("boom")
        }
    }

    fn presence(details: usize) -> Fixed {
        Fixed {
            details,
            signal: Signal::NoSignal,
        }
    }

    #[test]
    fn presence_rule_triggers_on_recorded_details() {
        let mut builder = CatalogBuilder::new();
        builder
            .register(meta("Hit", Computation::on_presence(10)), presence(3))
            .unwrap();
        builder
            .register(meta("Miss", Computation::on_presence(10)), presence(0))
            .unwrap();
        let catalog = builder.build();
        let mut templates = TemplateBundle::new();
        templates.insert("Hit", "{count} objects impacted");
        let engine = Engine::new(&catalog, &templates).unwrap();

        let evaluation = engine.evaluate(&facts());
        assert_eq!(evaluation.rules_evaluated, 2);
        assert_eq!(evaluation.findings.len(), 1);
        let finding = &evaluation.findings[0];
        assert_eq!(finding.rule_id, "Hit");
        assert_eq!(finding.weight, 10);
        assert_eq!(finding.rationale.as_deref(), Some("3 objects impacted"));
        assert_eq!(finding.details, vec!["item0", "item1", "item2"]);
        assert!(evaluation.failures.is_empty());
    }

    #[test]
    fn objective_rule_uses_signal_not_details() {
        let mut builder = CatalogBuilder::new();
        builder
            .register(
                meta("Matched", Computation::objective(15)),
                Fixed {
                    details: 0,
                    signal: Signal::Matched,
                },
            )
            .unwrap();
        builder
            .register(
                meta("NotMatched", Computation::objective(15)),
                Fixed {
                    details: 2,
                    signal: Signal::NotMatched,
                },
            )
            .unwrap();
        let catalog = builder.build();
        let mut templates = TemplateBundle::new();
        templates.insert("Matched", "{count} objects impacted");
        let engine = Engine::new(&catalog, &templates).unwrap();

        let evaluation = engine.evaluate(&facts());
        assert!(evaluation.is_triggered("Matched"));
        assert!(!evaluation.is_triggered("NotMatched"));
        assert_eq!(
            evaluation.finding("Matched").unwrap().rationale.as_deref(),
            Some("0 objects impacted")
        );
    }

    #[test]
    fn missing_template_leaves_rationale_empty() {
        let mut builder = CatalogBuilder::new();
        builder
            .register(meta("Hit", Computation::on_presence(1)), presence(1))
            .unwrap();
        let catalog = builder.build();
        let templates = TemplateBundle::new();
        let engine = Engine::new(&catalog, &templates).unwrap();
        let evaluation = engine.evaluate(&facts());
        assert_eq!(evaluation.findings[0].rationale, None);
    }

    #[test]
    fn protocol_violations_are_reported_not_triggered() {
        let mut builder = CatalogBuilder::new();
        builder
            .register(
                meta("PresenceReturnsMatched", Computation::on_presence(5)),
                Fixed {
                    details: 1,
                    signal: Signal::Matched,
                },
            )
            .unwrap();
        builder
            .register(
                meta("ObjectiveReturnsNothing", Computation::objective(5)),
                Fixed {
                    details: 1,
                    signal: Signal::NoSignal,
                },
            )
            .unwrap();
        let catalog = builder.build();
        let templates = TemplateBundle::new();
        let evaluation = Engine::new(&catalog, &templates)
            .unwrap()
            .evaluate(&facts());

        assert!(evaluation.findings.is_empty());
        assert_eq!(
            evaluation.failures,
            vec![
                RuleFailure {
                    rule_id: "PresenceReturnsMatched".into(),
                    kind: FailureKind::ProtocolViolation {
                        mode: ComputationMode::TriggerOnPresence,
                        signal: Signal::Matched,
                    },
                },
                RuleFailure {
                    rule_id: "ObjectiveReturnsNothing".into(),
                    kind: FailureKind::ProtocolViolation {
                        mode: ComputationMode::Objective,
                        signal: Signal::NoSignal,
                    },
                },
            ]
        );
    }

    #[test]
    fn failing_rule_does_not_abort_siblings() {
        let mut builder = CatalogBuilder::new();
        builder
            .register(meta("Before", Computation::on_presence(1)), presence(1))
            .unwrap();
        builder
            .register(meta("Errors", Computation::on_presence(1)), Failing)
            .unwrap();
        builder
            .register(meta("Panics", Computation::on_presence(1)), Panicking)
            .unwrap();
        builder
            .register(meta("After", Computation::on_presence(1)), presence(2))
            .unwrap();
        let catalog = builder.build();
        let templates = TemplateBundle::new();
        let evaluation = Engine::new(&catalog, &templates)
            .unwrap()
            .evaluate(&facts());

        let triggered: Vec<&str> = evaluation
            .findings
            .iter()
            .map(|f| f.rule_id.as_str())
            .collect();
        assert_eq!(triggered, vec!["Before", "After"]);
        assert_eq!(evaluation.failures.len(), 2);
        assert_eq!(
            evaluation.failures[0].kind,
            FailureKind::Error {
                message: "malformed facts: sync version missing".into()
            }
        );
        assert_eq!(
            evaluation.failures[1].kind,
            FailureKind::Panic {
                message: "boom".into()
            }
        );
    }

    #[test]
    fn engine_rejects_unresolvable_template_reference() {
        let metadata = RuleMetadata::builder("Keyed")
            .category(Category::Anomalies)
            .model(RiskModel::ObjectConfig)
            .computation(Computation::on_presence(1))
            .maturity(1)
            .title("Keyed")
            .rationale_key("missing.key")
            .build()
            .unwrap();
        let mut builder = CatalogBuilder::new();
        builder.register(metadata, presence(1)).unwrap();
        let catalog = builder.build();
        let templates = TemplateBundle::new();
        assert!(Engine::new(&catalog, &templates).is_err());
    }

    struct TwoSubGraphs;

    impl GraphRule for TwoSubGraphs {
        fn evaluate(&self, _: &CompromiseGraph, ctx: &mut GraphContext<'_>) -> RuleResult {
            ctx.add_sub_graph("G1", "desc");
            ctx.add_sub_graph("G1", "desc");
            for i in 0..3 {
                ctx.record_sub_graph_detail("G1", "desc", format!("x{i}"));
            }
            ctx.record_sub_graph_detail("G2", "other", "y");
            Ok(Signal::Matched)
        }
    }

    #[test]
    fn graph_rule_renders_rationale_per_sub_graph() {
        let metadata = RuleMetadata::builder("P-Test")
            .category(Category::PrivilegedAccounts)
            .objective(RiskObjective::IndirectControl)
            .computation(Computation::objective(25))
            .maturity(2)
            .title("Graph test")
            .build()
            .unwrap();
        let mut builder = CatalogBuilder::<CompromiseGraph>::new();
        builder.register_graph(metadata, TwoSubGraphs).unwrap();
        let catalog = builder.build();
        let mut templates = TemplateBundle::new();
        templates.insert("P-Test", "{count} objects impacted");
        let engine = Engine::new(&catalog, &templates).unwrap();

        let evaluation = engine.evaluate(&CompromiseGraph::default());
        let finding = evaluation.finding("P-Test").unwrap();
        assert_eq!(finding.details, vec!["desc (G1)", "other (G2)"]);
        assert_eq!(finding.rationale.as_deref(), Some("2 objects impacted"));
        assert_eq!(finding.sub_graphs.len(), 2);
        assert_eq!(finding.sub_graphs[0].details.len(), 3);
        assert_eq!(
            finding.sub_graphs[0].rationale.as_deref(),
            Some("3 objects impacted")
        );
        assert_eq!(
            finding.sub_graphs[1].rationale.as_deref(),
            Some("1 objects impacted")
        );
    }

    proptest! {
        #[test]
        fn presence_triggered_iff_details_recorded(counts in proptest::collection::vec(0usize..4, 1..8)) {
            let mut builder = CatalogBuilder::new();
            for (i, &n) in counts.iter().enumerate() {
                builder
                    .register(meta(&format!("R{i}"), Computation::on_presence(1)), presence(n))
                    .unwrap();
            }
            let catalog = builder.build();
            let templates = TemplateBundle::new();
            let evaluation = Engine::new(&catalog, &templates).unwrap().evaluate(&facts());

            for (i, &n) in counts.iter().enumerate() {
                let id = format!("R{i}");
                match evaluation.finding(&id) {
                    Some(finding) => prop_assert!(n >= 1 && finding.details.len() == n),
                    None => prop_assert_eq!(n, 0),
                }
            }
        }
    }
}
