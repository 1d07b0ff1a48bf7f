//! Graph-specialised rules.
//!
//! Graph rules evaluate a [`CompromiseGraph`] and attribute their evidence
//! to the named sub-graphs (attack paths) it touches, so every touched
//! sub-graph gets its own detail bucket and its own rationale.

use std::ops::{Deref, DerefMut};

use serde::Serialize;

use super::{Rule, RuleContext, RuleResult};
use crate::facts::CompromiseGraph;

/// Evidence recorded against one sub-graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubGraphEvidence {
    pub name: String,
    pub description: String,
    pub details: Vec<String>,
}

/// Rule context with sub-graph bookkeeping.
///
/// Derefs to [`RuleContext`], so `record_detail` stays available for the
/// rule's global detail list.
pub struct GraphContext<'a> {
    inner: &'a mut RuleContext,
}

impl<'a> GraphContext<'a> {
    pub fn new(inner: &'a mut RuleContext) -> Self {
        Self { inner }
    }

    /// Mark a sub-graph as touched and add its `"{description} ({name})"`
    /// line to the global details, once.
    pub fn add_sub_graph(&mut self, name: &str, description: &str) {
        self.sub_graph_index(name, description);
    }

    /// Append one evidence line to the sub-graph's own bucket, registering
    /// the sub-graph first if needed. Lines accumulate without deduplication.
    pub fn record_sub_graph_detail(
        &mut self,
        name: &str,
        description: &str,
        detail: impl Into<String>,
    ) {
        let index = self.sub_graph_index(name, description);
        self.inner.sub_graphs_mut()[index].details.push(detail.into());
    }

    pub fn sub_graph_detail_count(&self, name: &str) -> usize {
        self.inner
            .sub_graphs()
            .iter()
            .find(|sg| sg.name == name)
            .map_or(0, |sg| sg.details.len())
    }

    fn sub_graph_index(&mut self, name: &str, description: &str) -> usize {
        self.inner
            .record_unique_detail(format!("{description} ({name})"));

        let sub_graphs = self.inner.sub_graphs_mut();
        match sub_graphs.iter().position(|sg| sg.name == name) {
            Some(index) => index,
            None => {
                sub_graphs.push(SubGraphEvidence {
                    name: name.to_string(),
                    description: description.to_string(),
                    details: Vec::new(),
                });
                sub_graphs.len() - 1
            }
        }
    }
}

impl Deref for GraphContext<'_> {
    type Target = RuleContext;

    fn deref(&self) -> &RuleContext {
        &*self.inner
    }
}

impl DerefMut for GraphContext<'_> {
    fn deref_mut(&mut self) -> &mut RuleContext {
        &mut *self.inner
    }
}

/// A rule over a compromise graph.
pub trait GraphRule: Send + Sync {
    fn evaluate(&self, graph: &CompromiseGraph, ctx: &mut GraphContext<'_>) -> RuleResult;
}

/// Bridges a [`GraphRule`] into the generic [`Rule`] protocol.
pub(crate) struct GraphRuleAdapter<R>(pub R);

impl<R: GraphRule> Rule<CompromiseGraph> for GraphRuleAdapter<R> {
    fn evaluate(&self, graph: &CompromiseGraph, ctx: &mut RuleContext) -> RuleResult {
        let mut graph_ctx = GraphContext::new(ctx);
        self.0.evaluate(graph, &mut graph_ctx)
    }
}
