use crate::error::Result;
use crate::facts::HealthcheckFacts;
use crate::rules::metadata::{Category, Computation, FrameworkReference, RiskModel, RuleMetadata};
use crate::rules::{Rule, RuleContext, RuleResult, Signal};

/// TrustSidFilteringDisabled: trusted domains whose SIDs are not filtered
///
/// One detail per partner domain, even when several trust objects point
/// to the same partner.
pub struct TrustSidFilteringRule;

pub(super) fn metadata() -> Result<RuleMetadata> {
    RuleMetadata::builder("TrustSidFilteringDisabled")
        .category(Category::Trusts)
        .model(RiskModel::SidFiltering)
        .computation(Computation::on_presence(20))
        .maturity(1)
        .reference(FrameworkReference::anssi("vuln1_trusts_sidfiltering", None))
        .reference(FrameworkReference::mitre("T1134.005"))
        .title("SID filtering is disabled on a trust")
        .solution("Enable SID filtering (quarantine) on every outbound trust.")
        .technical_explanation(
            "Without SID filtering, an administrator of the trusted domain can add \
             any SID of this domain to the SID history of its own accounts and \
             become domain administrator here.",
        )
        .build()
}

impl Rule<HealthcheckFacts> for TrustSidFilteringRule {
    fn evaluate(&self, facts: &HealthcheckFacts, ctx: &mut RuleContext) -> RuleResult {
        for trust in &facts.trusts {
            if trust.direction.trusts_partner() && !trust.sid_filtering {
                ctx.record_unique_detail(trust.partner.clone());
            }
        }
        Ok(Signal::NoSignal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::healthcheck::{Trust, TrustDirection};
    use chrono::Utc;

    fn trust(partner: &str, direction: TrustDirection, sid_filtering: bool) -> Trust {
        Trust {
            partner: partner.into(),
            direction,
            sid_filtering,
        }
    }

    #[test]
    fn flags_each_unfiltered_partner_once() {
        let facts = HealthcheckFacts {
            domain_fqdn: "corp.local".into(),
            generated_at: Utc::now(),
            sync: None,
            krbtgt_last_change: None,
            laps_installed: true,
            privileged_accounts: vec![],
            trusts: vec![
                trust("partner.local", TrustDirection::Bidirectional, false),
                trust("partner.local", TrustDirection::Outbound, false),
                trust("inbound.local", TrustDirection::Inbound, false),
                trust("safe.local", TrustDirection::Outbound, true),
            ],
        };
        let mut ctx = RuleContext::new();
        TrustSidFilteringRule.evaluate(&facts, &mut ctx).unwrap();
        assert_eq!(ctx.details(), ["partner.local"]);
    }
}
