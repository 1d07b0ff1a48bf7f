//! Fact shapes consumed by the rule engine.
//!
//! Collectors produce one of these snapshots per analysis target. Rules
//! only ever read them; nothing in this crate mutates a fact object once
//! it has been loaded.

pub mod graph;
pub mod healthcheck;
pub mod tenant;

use serde::{Deserialize, Serialize};

pub use graph::CompromiseGraph;
pub use healthcheck::HealthcheckFacts;
pub use tenant::TenantFacts;

/// Which fact shape a catalog (and every rule in it) is written against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactKind {
    Healthcheck,
    Tenant,
    CompromiseGraph,
}

impl FactKind {
    pub fn from_str_lenient(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "healthcheck" | "ad" | "domain" => Some(Self::Healthcheck),
            "tenant" | "cloud" | "entra" => Some(Self::Tenant),
            "graph" | "compromise_graph" | "compromisegraph" => Some(Self::CompromiseGraph),
            _ => None,
        }
    }
}

impl std::fmt::Display for FactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Healthcheck => write!(f, "healthcheck"),
            Self::Tenant => write!(f, "tenant"),
            Self::CompromiseGraph => write!(f, "compromise_graph"),
        }
    }
}

/// Common surface every fact shape exposes to the engine.
pub trait Facts: Send + Sync {
    const KIND: FactKind;

    /// Human-readable name of the analysed target (domain FQDN, tenant name...).
    fn target_name(&self) -> &str;
}

impl Facts for HealthcheckFacts {
    const KIND: FactKind = FactKind::Healthcheck;

    fn target_name(&self) -> &str {
        &self.domain_fqdn
    }
}

impl Facts for TenantFacts {
    const KIND: FactKind = FactKind::Tenant;

    fn target_name(&self) -> &str {
        &self.tenant_name
    }
}

impl Facts for CompromiseGraph {
    const KIND: FactKind = FactKind::CompromiseGraph;

    fn target_name(&self) -> &str {
        &self.domain_fqdn
    }
}

/// A fact snapshot as stored on disk, tagged by `kind`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FactSet {
    Healthcheck(HealthcheckFacts),
    Tenant(TenantFacts),
    CompromiseGraph(CompromiseGraph),
}

impl FactSet {
    pub fn kind(&self) -> FactKind {
        match self {
            Self::Healthcheck(_) => FactKind::Healthcheck,
            Self::Tenant(_) => FactKind::Tenant,
            Self::CompromiseGraph(_) => FactKind::CompromiseGraph,
        }
    }

    pub fn target_name(&self) -> &str {
        match self {
            Self::Healthcheck(f) => f.target_name(),
            Self::Tenant(f) => f.target_name(),
            Self::CompromiseGraph(f) => f.target_name(),
        }
    }
}
