pub mod builtin;
pub mod catalog;
pub mod engine;
pub mod finding;
pub mod graph;
pub mod metadata;
pub mod policy;
pub mod rationale;
pub mod threshold;

use serde::Serialize;
use thiserror::Error;

pub use catalog::{Catalog, CatalogBuilder, CatalogEntry};
pub use engine::Engine;
pub use finding::{Evaluation, FailureKind, Finding, RuleFailure, SubGraphFinding};
pub use graph::{GraphContext, GraphRule, SubGraphEvidence};
pub use metadata::{
    Category, Classification, Computation, ComputationMode, FrameworkReference, MaturityLevel,
    RiskModel, RiskObjective, RuleMetadata,
};
pub use threshold::Threshold;

/// Tri-state outcome of one rule evaluation.
///
/// Presence rules return `NoSignal` and let their recorded details decide;
/// objective rules return `Matched` or `NotMatched`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    NoSignal,
    Matched,
    NotMatched,
}

impl Signal {
    /// Objective-mode helper: `Matched` when `condition` holds.
    pub fn matched_if(condition: bool) -> Self {
        if condition {
            Self::Matched
        } else {
            Self::NotMatched
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoSignal => write!(f, "no signal"),
            Self::Matched => write!(f, "matched"),
            Self::NotMatched => write!(f, "not matched"),
        }
    }
}

/// Error a rule raises when it cannot evaluate the facts it was given.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error("malformed facts: {0}")]
    MalformedFacts(String),

    #[error("{0}")]
    Other(String),
}

pub type RuleResult = std::result::Result<Signal, RuleError>;

/// Per-evaluation state of one rule: the evidence it recorded.
///
/// A fresh context is created for every (rule, fact object) pair and
/// dropped once the finding has been built.
#[derive(Debug, Default)]
pub struct RuleContext {
    details: Vec<String>,
    sub_graphs: Vec<SubGraphEvidence>,
}

impl RuleContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one evidence line. Duplicates are kept.
    pub fn record_detail(&mut self, detail: impl Into<String>) {
        self.details.push(detail.into());
    }

    /// Append an evidence line unless an identical one is already present.
    /// Returns whether the line was added.
    pub fn record_unique_detail(&mut self, detail: impl Into<String>) -> bool {
        let detail = detail.into();
        if self.details.contains(&detail) {
            return false;
        }
        self.details.push(detail);
        true
    }

    pub fn details(&self) -> &[String] {
        &self.details
    }

    pub fn detail_count(&self) -> usize {
        self.details.len()
    }

    pub fn sub_graphs(&self) -> &[SubGraphEvidence] {
        &self.sub_graphs
    }

    pub(crate) fn sub_graphs_mut(&mut self) -> &mut Vec<SubGraphEvidence> {
        &mut self.sub_graphs
    }

    pub(crate) fn into_parts(self) -> (Vec<String>, Vec<SubGraphEvidence>) {
        (self.details, self.sub_graphs)
    }
}

/// A rule evaluates one fact shape `F`.
///
/// Implementations are stateless and shared by every evaluation; all
/// per-evaluation state lives in the [`RuleContext`].
pub trait Rule<F>: Send + Sync {
    fn evaluate(&self, facts: &F, ctx: &mut RuleContext) -> RuleResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_detail_keeps_duplicates() {
        let mut ctx = RuleContext::new();
        ctx.record_detail("a");
        ctx.record_detail("a");
        assert_eq!(ctx.detail_count(), 2);
    }

    #[test]
    fn record_unique_detail_deduplicates() {
        let mut ctx = RuleContext::new();
        assert!(ctx.record_unique_detail("trust corp.local"));
        assert!(!ctx.record_unique_detail("trust corp.local"));
        assert_eq!(ctx.details(), ["trust corp.local"]);
    }

    #[test]
    fn matched_if_maps_condition() {
        assert_eq!(Signal::matched_if(true), Signal::Matched);
        assert_eq!(Signal::matched_if(false), Signal::NotMatched);
    }
}
