use serde::{Deserialize, Serialize};

/// Precomputed compromise graph: attack paths toward sensitive objects,
/// split into independently named sub-graphs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompromiseGraph {
    pub domain_fqdn: String,
    /// One entry per analysed group of sensitive objects.
    #[serde(default)]
    pub sub_analyses: Vec<SubAnalysis>,
    /// Foreign domains whose objects appear on a path into this one.
    #[serde(default)]
    pub dependencies: Vec<GraphDependency>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubAnalysis {
    /// Stable sub-graph name (e.g. "DomainAdmins").
    pub name: String,
    pub description: String,
    pub risk: ObjectRisk,
    /// Whether a path reaches one of the critical objects of this sub-graph.
    #[serde(default)]
    pub critical_object_found: bool,
    /// Number of objects that can take control of the sub-graph root.
    #[serde(default)]
    pub objects_impacted: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectRisk {
    Critical,
    High,
    Medium,
    Other,
}

impl std::fmt::Display for ObjectRisk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Critical => write!(f, "critical"),
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Other => write!(f, "other"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphDependency {
    pub domain: String,
    #[serde(default)]
    pub netbios: Option<String>,
    /// Sub-graph through which the dependency was discovered.
    pub sub_graph: String,
    #[serde(default)]
    pub sub_graph_description: String,
    pub typology: Typology,
    #[serde(default)]
    pub critical_object_found: bool,
    /// Number of foreign objects found on the paths.
    #[serde(default)]
    pub item_count: u64,
}

impl GraphDependency {
    pub fn display_name(&self) -> &str {
        self.netbios.as_deref().unwrap_or(&self.domain)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Typology {
    PrivilegedAccount,
    Infrastructure,
    User,
    Unknown,
}

impl std::fmt::Display for Typology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PrivilegedAccount => write!(f, "privileged account"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::User => write!(f, "user"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}
