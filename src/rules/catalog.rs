//! Rule catalog: the build-once registry of every rule for one fact shape.
//!
//! Rules are registered through a [`CatalogBuilder`] at startup. Once
//! [`CatalogBuilder::build`] has run, the [`Catalog`] is immutable and can
//! be shared across threads for lookups and evaluation.

use std::collections::HashMap;

use super::graph::{GraphRule, GraphRuleAdapter};
use super::metadata::{Classification, RuleMetadata};
use super::rationale::TemplateSource;
use super::Rule;
use crate::error::{DirRiskError, Result};
use crate::facts::{CompromiseGraph, FactKind, Facts};

/// Maximum edit distance for "did you mean" suggestions.
const SUGGESTION_DISTANCE: usize = 3;

/// One registered rule: its metadata plus the shared implementation.
pub struct CatalogEntry<F> {
    metadata: RuleMetadata,
    rule: Box<dyn Rule<F>>,
}

impl<F> CatalogEntry<F> {
    pub fn metadata(&self) -> &RuleMetadata {
        &self.metadata
    }

    pub fn rule(&self) -> &dyn Rule<F> {
        self.rule.as_ref()
    }
}

/// Append-only registration phase of a catalog.
pub struct CatalogBuilder<F> {
    kind: FactKind,
    entries: Vec<CatalogEntry<F>>,
    index: HashMap<String, usize>,
}

impl<F: Facts + 'static> CatalogBuilder<F> {
    pub fn new() -> Self {
        Self {
            kind: F::KIND,
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Register a rule. Fails on a duplicate identifier or on a
    /// classification that does not belong to this fact shape.
    pub fn register(&mut self, metadata: RuleMetadata, rule: impl Rule<F> + 'static) -> Result<()> {
        let id = metadata.id().to_string();
        if self.index.contains_key(&id) {
            return Err(self.error(format!("duplicate rule identifier '{id}'")));
        }

        let graph_catalog = self.kind == FactKind::CompromiseGraph;
        match (metadata.classification(), graph_catalog) {
            (Classification::Model(_), false) | (Classification::Objective(_), true) => {}
            (Classification::Model(_), true) => {
                return Err(self.error(format!(
                    "rule '{id}' declares a model but graph rules must declare an objective"
                )));
            }
            (Classification::Objective(_), false) => {
                return Err(self.error(format!(
                    "rule '{id}' declares an objective but only graph rules may"
                )));
            }
        }

        tracing::debug!(fact_kind = %self.kind, rule_id = %id, "registered rule");
        self.index.insert(id, self.entries.len());
        self.entries.push(CatalogEntry {
            metadata,
            rule: Box::new(rule),
        });
        Ok(())
    }

    pub fn build(self) -> Catalog<F> {
        tracing::debug!(fact_kind = %self.kind, rules = self.entries.len(), "catalog built");
        Catalog {
            kind: self.kind,
            entries: self.entries,
            index: self.index,
        }
    }

    fn error(&self, message: String) -> DirRiskError {
        DirRiskError::Catalog {
            fact_kind: self.kind.to_string(),
            message,
        }
    }
}

impl CatalogBuilder<CompromiseGraph> {
    /// Register a graph-specialised rule.
    pub fn register_graph(
        &mut self,
        metadata: RuleMetadata,
        rule: impl GraphRule + 'static,
    ) -> Result<()> {
        self.register(metadata, GraphRuleAdapter(rule))
    }
}

impl<F: Facts + 'static> Default for CatalogBuilder<F> {
    fn default() -> Self {
        Self::new()
    }
}

/// Frozen rule catalog for fact shape `F`.
pub struct Catalog<F> {
    kind: FactKind,
    entries: Vec<CatalogEntry<F>>,
    index: HashMap<String, usize>,
}

impl<F> Catalog<F> {
    pub fn kind(&self) -> FactKind {
        self.kind
    }

    /// Every registered rule, in registration order.
    pub fn all_rules(&self) -> &[CatalogEntry<F>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&RuleMetadata> {
        self.index.get(id).map(|&i| &self.entries[i].metadata)
    }

    /// Metadata and display text for a rule identifier.
    pub fn resolve(&self, id: &str) -> Result<&RuleMetadata> {
        self.get(id).ok_or_else(|| DirRiskError::UnknownRule {
            id: id.to_string(),
            suggestion: self.suggest(id).map(str::to_string),
        })
    }

    /// Closest registered identifier by edit distance, if any is close enough.
    pub fn suggest(&self, id: &str) -> Option<&str> {
        let needle = id.to_lowercase();
        self.entries
            .iter()
            .map(|e| {
                let candidate = e.metadata.id();
                (levenshtein::levenshtein(&needle, &candidate.to_lowercase()), candidate)
            })
            .filter(|(distance, _)| *distance <= SUGGESTION_DISTANCE)
            .min_by_key(|(distance, _)| *distance)
            .map(|(_, candidate)| candidate)
    }

    /// Every rule that names its rationale template explicitly must find it.
    pub fn check_templates(&self, templates: &dyn TemplateSource) -> Result<()> {
        let missing: Vec<&str> = self
            .entries
            .iter()
            .map(|e| &e.metadata)
            .filter(|m| m.requires_template() && templates.template(m.rationale_key()).is_none())
            .map(|m| m.rationale_key())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(DirRiskError::Catalog {
                fact_kind: self.kind.to_string(),
                message: format!("unresolvable rationale template(s): {}", missing.join(", ")),
            })
        }
    }
}
