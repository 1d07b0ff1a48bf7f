use serde::Serialize;

use super::metadata::{Category, Classification, ComputationMode, MaturityLevel};
use super::Signal;
use crate::facts::FactKind;

/// A triggered rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    /// Rule identifier (e.g., "ADConnectVersion1").
    pub rule_id: String,
    pub category: Category,
    pub classification: Classification,
    pub maturity: MaturityLevel,
    /// Points contributed to the category score.
    pub weight: u32,
    /// Rendered rationale; `None` when no template exists for the rule.
    pub rationale: Option<String>,
    /// Evidence recorded during evaluation, in recording order.
    pub details: Vec<String>,
    /// Per-sub-graph evidence (graph rules only).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sub_graphs: Vec<SubGraphFinding>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubGraphFinding {
    pub name: String,
    pub description: String,
    pub rationale: Option<String>,
    pub details: Vec<String>,
}

/// A rule that could not be evaluated. The rule counts as not triggered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleFailure {
    pub rule_id: String,
    pub kind: FailureKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FailureKind {
    /// The rule returned an error.
    Error { message: String },
    /// The rule panicked.
    Panic { message: String },
    /// The returned signal contradicts the rule's computation mode.
    ProtocolViolation {
        mode: ComputationMode,
        signal: Signal,
    },
}

impl std::fmt::Display for RuleFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            FailureKind::Error { message } => write!(f, "{}: {}", self.rule_id, message),
            FailureKind::Panic { message } => {
                write!(f, "{}: panicked: {}", self.rule_id, message)
            }
            FailureKind::ProtocolViolation { mode, signal } => write!(
                f,
                "{}: {} rule returned '{}'",
                self.rule_id, mode, signal
            ),
        }
    }
}

/// Result of evaluating one catalog against one fact object.
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub fact_kind: FactKind,
    pub target_name: String,
    pub rules_evaluated: usize,
    /// Triggered rules, in catalog order.
    pub findings: Vec<Finding>,
    pub failures: Vec<RuleFailure>,
}

impl Evaluation {
    pub fn is_triggered(&self, rule_id: &str) -> bool {
        self.findings.iter().any(|f| f.rule_id == rule_id)
    }

    pub fn finding(&self, rule_id: &str) -> Option<&Finding> {
        self.findings.iter().find(|f| f.rule_id == rule_id)
    }
}
