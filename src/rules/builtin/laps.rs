use crate::error::Result;
use crate::facts::HealthcheckFacts;
use crate::rules::metadata::{Category, Computation, FrameworkReference, RiskModel, RuleMetadata};
use crate::rules::{Rule, RuleContext, RuleResult, Signal};

/// LapsNotInstalled: local administrator passwords are not managed
pub struct LapsNotInstalledRule;

pub(super) fn metadata() -> Result<RuleMetadata> {
    RuleMetadata::builder("LapsNotInstalled")
        .category(Category::Anomalies)
        .model(RiskModel::PasswordRetrieval)
        .computation(Computation::objective(15))
        .maturity(3)
        .reference(FrameworkReference::anssi("vuln3_laps", Some("4.2")))
        .reference(FrameworkReference::mitre("T1550.002"))
        .title("Local administrator passwords are not randomised")
        .description("No local administrator password solution is deployed in the domain.")
        .solution("Deploy LAPS and apply it to every workstation and member server.")
        .documentation("https://learn.microsoft.com/windows-server/identity/laps/laps-overview")
        .technical_explanation(
            "Without a per-machine random password, one compromised local \
             administrator password usually unlocks every workstation imaged \
             from the same master.",
        )
        .build()
}

impl Rule<HealthcheckFacts> for LapsNotInstalledRule {
    fn evaluate(&self, facts: &HealthcheckFacts, _ctx: &mut RuleContext) -> RuleResult {
        Ok(Signal::matched_if(!facts.laps_installed))
    }
}
