//! Declarative rule metadata.
//!
//! Every rule is declared once through [`RuleMetadata::builder`], which
//! validates the classification axes before the catalog ever sees them.
//! The resulting value is immutable: the catalog only hands out shared
//! references to it.

use serde::Serialize;
use url::Url;

use crate::error::{DirRiskError, Result};

/// Coarse bucket a rule belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Anomalies,
    StaleObjects,
    PrivilegedAccounts,
    Trusts,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Self::Anomalies,
        Self::StaleObjects,
        Self::PrivilegedAccounts,
        Self::Trusts,
    ];
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Anomalies => write!(f, "Anomalies"),
            Self::StaleObjects => write!(f, "Stale Objects"),
            Self::PrivilegedAccounts => write!(f, "Privileged Accounts"),
            Self::Trusts => write!(f, "Trusts"),
        }
    }
}

/// Flat taxonomy used by fact-based rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskModel {
    VulnerabilityManagement,
    GoldenTicket,
    AccountTakeOver,
    PasswordRetrieval,
    SidFiltering,
    Authentication,
    ObjectConfig,
}

impl std::fmt::Display for RiskModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::VulnerabilityManagement => write!(f, "Vulnerability Management"),
            Self::GoldenTicket => write!(f, "Golden Ticket"),
            Self::AccountTakeOver => write!(f, "Account Take Over"),
            Self::PasswordRetrieval => write!(f, "Password Retrieval"),
            Self::SidFiltering => write!(f, "SID Filtering"),
            Self::Authentication => write!(f, "Authentication"),
            Self::ObjectConfig => write!(f, "Object Configuration"),
        }
    }
}

/// Attacker-objective taxonomy used by graph rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskObjective {
    TakeControlOfCriticalObjects,
    ExposePrivilegedObjects,
    ForeignDomainControl,
    IndirectControl,
}

impl std::fmt::Display for RiskObjective {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TakeControlOfCriticalObjects => write!(f, "Take control of critical objects"),
            Self::ExposePrivilegedObjects => write!(f, "Expose privileged objects"),
            Self::ForeignDomainControl => write!(f, "Control from a foreign domain"),
            Self::IndirectControl => write!(f, "Indirect control"),
        }
    }
}

/// A rule is classified under exactly one of the two taxonomies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Model(RiskModel),
    Objective(RiskObjective),
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Model(m) => write!(f, "{m}"),
            Self::Objective(o) => write!(f, "{o}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComputationMode {
    /// Triggered iff at least one detail was recorded; the returned signal must be `NoSignal`.
    TriggerOnPresence,
    /// The returned signal is the trigger: exactly `Matched` or `NotMatched`.
    Objective,
}

impl std::fmt::Display for ComputationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TriggerOnPresence => write!(f, "presence"),
            Self::Objective => write!(f, "objective"),
        }
    }
}

/// How a rule decides it triggered, and how many points it is worth when it does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Computation {
    pub mode: ComputationMode,
    pub weight: u32,
}

impl Computation {
    pub const fn on_presence(weight: u32) -> Self {
        Self {
            mode: ComputationMode::TriggerOnPresence,
            weight,
        }
    }

    pub const fn objective(weight: u32) -> Self {
        Self {
            mode: ComputationMode::Objective,
            weight,
        }
    }
}

/// Ordinal rank of defensive sophistication, 1 (basic) to 5 (advanced).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct MaturityLevel(u8);

impl MaturityLevel {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(level: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX)
            .contains(&level)
            .then_some(Self(level))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl std::fmt::Display for MaturityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pointer into an external public security framework. Descriptive only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "framework", rename_all = "snake_case")]
pub enum FrameworkReference {
    /// ANSSI Active Directory control, e.g. `vuln1_krbtgt` in section `2.1`.
    Anssi {
        control: String,
        section: Option<String>,
    },
    /// MITRE ATT&CK technique, e.g. `T1558.001`.
    MitreAttack { technique: String },
    /// DISA STIG finding identifier.
    Stig { id: String },
}

impl FrameworkReference {
    pub fn anssi(control: &str, section: Option<&str>) -> Self {
        Self::Anssi {
            control: control.into(),
            section: section.map(Into::into),
        }
    }

    pub fn mitre(technique: &str) -> Self {
        Self::MitreAttack {
            technique: technique.into(),
        }
    }

    pub fn stig(id: &str) -> Self {
        Self::Stig { id: id.into() }
    }

    /// Canonical page for the reference, where the framework has one.
    pub fn url(&self) -> Option<Url> {
        match self {
            Self::MitreAttack { technique } => {
                let path = technique.replace('.', "/");
                Url::parse("https://attack.mitre.org/techniques/")
                    .and_then(|base| base.join(&format!("{path}/")))
                    .ok()
            }
            Self::Anssi { .. } | Self::Stig { .. } => None,
        }
    }
}

impl std::fmt::Display for FrameworkReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Anssi {
                control,
                section: Some(section),
            } => write!(f, "ANSSI {control} (§{section})"),
            Self::Anssi {
                control,
                section: None,
            } => write!(f, "ANSSI {control}"),
            Self::MitreAttack { technique } => write!(f, "MITRE ATT&CK {technique}"),
            Self::Stig { id } => write!(f, "STIG {id}"),
        }
    }
}

/// Product version a rule first shipped in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct RuleVersion {
    pub major: u16,
    pub minor: u16,
}

impl std::fmt::Display for RuleVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Static text the report renderer shows next to a finding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DisplayText {
    pub title: String,
    pub description: String,
    pub solution: String,
    pub documentation: String,
    pub technical_explanation: String,
}

/// Immutable descriptor of one rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleMetadata {
    id: String,
    category: Category,
    classification: Classification,
    computation: Computation,
    maturity: MaturityLevel,
    references: Vec<FrameworkReference>,
    introduced_in: Option<RuleVersion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rationale_key: Option<String>,
    display: DisplayText,
}

impl RuleMetadata {
    pub fn builder(id: &str) -> RuleBuilder {
        RuleBuilder::new(id)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn classification(&self) -> Classification {
        self.classification
    }

    pub fn computation(&self) -> Computation {
        self.computation
    }

    pub fn mode(&self) -> ComputationMode {
        self.computation.mode
    }

    pub fn weight(&self) -> u32 {
        self.computation.weight
    }

    pub fn maturity(&self) -> MaturityLevel {
        self.maturity
    }

    pub fn references(&self) -> &[FrameworkReference] {
        &self.references
    }

    pub fn introduced_in(&self) -> Option<RuleVersion> {
        self.introduced_in
    }

    /// Key of the rationale template; defaults to the rule id.
    pub fn rationale_key(&self) -> &str {
        self.rationale_key.as_deref().unwrap_or(&self.id)
    }

    /// Whether the declaration explicitly named a template key, which must then exist.
    pub fn requires_template(&self) -> bool {
        self.rationale_key.is_some()
    }

    pub fn display(&self) -> &DisplayText {
        &self.display
    }
}

/// Validating builder for [`RuleMetadata`].
#[derive(Debug, Clone, Default)]
pub struct RuleBuilder {
    id: String,
    category: Option<Category>,
    model: Option<RiskModel>,
    objective: Option<RiskObjective>,
    computation: Option<Computation>,
    maturity: Option<u8>,
    references: Vec<FrameworkReference>,
    introduced_in: Option<RuleVersion>,
    rationale_key: Option<String>,
    display: DisplayText,
}

impl RuleBuilder {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            ..Default::default()
        }
    }

    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn model(mut self, model: RiskModel) -> Self {
        self.model = Some(model);
        self
    }

    pub fn objective(mut self, objective: RiskObjective) -> Self {
        self.objective = Some(objective);
        self
    }

    pub fn computation(mut self, computation: Computation) -> Self {
        self.computation = Some(computation);
        self
    }

    pub fn maturity(mut self, level: u8) -> Self {
        self.maturity = Some(level);
        self
    }

    pub fn reference(mut self, reference: FrameworkReference) -> Self {
        self.references.push(reference);
        self
    }

    pub fn introduced_in(mut self, major: u16, minor: u16) -> Self {
        self.introduced_in = Some(RuleVersion { major, minor });
        self
    }

    pub fn rationale_key(mut self, key: &str) -> Self {
        self.rationale_key = Some(key.to_string());
        self
    }

    pub fn title(mut self, title: &str) -> Self {
        self.display.title = title.to_string();
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.display.description = description.to_string();
        self
    }

    pub fn solution(mut self, solution: &str) -> Self {
        self.display.solution = solution.to_string();
        self
    }

    pub fn documentation(mut self, documentation: &str) -> Self {
        self.display.documentation = documentation.to_string();
        self
    }

    pub fn technical_explanation(mut self, text: &str) -> Self {
        self.display.technical_explanation = text.to_string();
        self
    }

    pub fn build(self) -> Result<RuleMetadata> {
        let invalid = |message: &str| DirRiskError::Declaration {
            rule_id: self.id.clone(),
            message: message.to_string(),
        };

        if self.id.is_empty() || self.id.chars().any(char::is_whitespace) {
            return Err(invalid("identifier must be non-empty and contain no whitespace"));
        }
        let category = self.category.ok_or_else(|| invalid("missing category"))?;
        let classification = match (self.model, self.objective) {
            (Some(model), None) => Classification::Model(model),
            (None, Some(objective)) => Classification::Objective(objective),
            (Some(_), Some(_)) => {
                return Err(invalid("declares both a model and an objective"));
            }
            (None, None) => return Err(invalid("missing model or objective")),
        };
        let computation = self
            .computation
            .ok_or_else(|| invalid("missing computation"))?;
        let maturity = match self.maturity {
            Some(level) => MaturityLevel::new(level).ok_or_else(|| {
                invalid(&format!(
                    "maturity level {level} outside {}..={}",
                    MaturityLevel::MIN,
                    MaturityLevel::MAX
                ))
            })?,
            None => return Err(invalid("missing maturity level")),
        };
        if self.display.title.trim().is_empty() {
            return Err(invalid("missing title"));
        }

        Ok(RuleMetadata {
            id: self.id,
            category,
            classification,
            computation,
            maturity,
            references: self.references,
            introduced_in: self.introduced_in,
            rationale_key: self.rationale_key,
            display: self.display,
        })
    }
}
