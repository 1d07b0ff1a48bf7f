//! dirrisk: risk scoring engine for directory services.
//!
//! Scores fact snapshots collected from on-premises domains, cloud tenants
//! and precomputed compromise graphs against a catalog of declarative
//! rules, producing weighted findings with rationale and remediation.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use dirrisk::{AnalyzeOptions, Analyzer};
//!
//! let analyzer = Analyzer::from_options(Path::new("./snapshots"), &AnalyzeOptions::default()).unwrap();
//! let report = analyzer.analyze(Path::new("./snapshots")).unwrap();
//! println!("Pass: {}, Targets: {}", report.pass(), report.targets.len());
//! ```

pub mod config;
pub mod error;
pub mod facts;
pub mod output;
pub mod rules;
pub mod source;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use config::Config;
use error::Result;
use facts::FactSet;
use output::OutputFormat;
use rules::builtin::{self, Catalogs};
use rules::policy::PolicyVerdict;
use rules::rationale::TemplateBundle;
use rules::{Engine, Evaluation, Finding};

/// Options for an analysis run.
#[derive(Debug, Clone, Default)]
pub struct AnalyzeOptions {
    /// Path to config file (defaults to `.dirrisk.toml` next to the snapshots).
    pub config_path: Option<PathBuf>,
    /// CLI override for the fail threshold.
    pub fail_above_override: Option<u32>,
}

/// Evaluation of one snapshot plus its policy verdict.
#[derive(Debug, Clone, Serialize)]
pub struct TargetReport {
    pub source: PathBuf,
    pub content_hash: String,
    pub evaluation: Evaluation,
    /// Findings after the ignore list, maturity cap and weight overrides.
    pub effective_findings: Vec<Finding>,
    pub verdict: PolicyVerdict,
}

/// Complete analysis report.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub targets: Vec<TargetReport>,
}

impl AnalysisReport {
    /// Whether every target passed its policy.
    pub fn pass(&self) -> bool {
        self.targets.iter().all(|t| t.verdict.pass)
    }
}

/// Built catalogs, templates and policy, ready to evaluate snapshots.
pub struct Analyzer {
    config: Config,
    catalogs: Catalogs,
    templates: TemplateBundle,
}

impl Analyzer {
    /// Build catalogs and load templates. Every catalog-level problem
    /// (duplicate id, malformed declaration, missing template) fails here,
    /// before any evaluation.
    pub fn new(config: Config) -> Result<Self> {
        let catalogs = Catalogs::build(&config.rules)?;
        let templates = builtin::templates(&config.rules)?;
        catalogs.check_templates(&templates)?;
        tracing::debug!(templates = templates.len(), "analyzer ready");
        Ok(Self {
            config,
            catalogs,
            templates,
        })
    }

    /// Load the config for `path` (or the explicit one) and build an analyzer.
    pub fn from_options(path: &Path, options: &AnalyzeOptions) -> Result<Self> {
        let config_path = options.config_path.clone().unwrap_or_else(|| {
            let dir = if path.is_dir() {
                path
            } else {
                path.parent().unwrap_or(Path::new("."))
            };
            dir.join(".dirrisk.toml")
        });
        let mut config = Config::load(&config_path)?;

        if let Some(fail_above) = options.fail_above_override {
            config.policy.fail_above = fail_above;
        }
        Self::new(config)
    }

    pub fn catalogs(&self) -> &Catalogs {
        &self.catalogs
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Evaluate one snapshot with the catalog matching its kind.
    pub fn evaluate(&self, facts: &FactSet) -> Result<Evaluation> {
        let evaluation = match facts {
            FactSet::Healthcheck(f) => Engine::new(&self.catalogs.healthcheck, &self.templates)?.evaluate(f),
            FactSet::Tenant(f) => Engine::new(&self.catalogs.tenant, &self.templates)?.evaluate(f),
            FactSet::CompromiseGraph(f) => Engine::new(&self.catalogs.graph, &self.templates)?.evaluate(f),
        };
        Ok(evaluation)
    }

    /// Run a complete analysis: load snapshots, evaluate, apply policy.
    pub fn analyze(&self, path: &Path) -> Result<AnalysisReport> {
        let snapshots = source::load(path)?;

        let mut targets = Vec::with_capacity(snapshots.len());
        for snapshot in snapshots {
            let evaluation = self.evaluate(&snapshot.facts)?;
            let effective_findings = self.config.policy.apply(&evaluation.findings);
            let verdict = self.config.policy.evaluate(&evaluation.findings);
            tracing::info!(
                target = %evaluation.target_name,
                score = verdict.global_score,
                pass = verdict.pass,
                "target scored"
            );
            targets.push(TargetReport {
                source: snapshot.path,
                content_hash: snapshot.content_hash,
                evaluation,
                effective_findings,
                verdict,
            });
        }

        Ok(AnalysisReport {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            targets,
        })
    }

    /// Render a report in the specified format.
    pub fn render(&self, report: &AnalysisReport, format: OutputFormat) -> Result<String> {
        output::render(report, &self.catalogs, format)
    }
}
