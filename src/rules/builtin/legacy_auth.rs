use crate::error::Result;
use crate::facts::TenantFacts;
use crate::rules::metadata::{Category, Computation, FrameworkReference, RiskModel, RuleMetadata};
use crate::rules::{Rule, RuleContext, RuleResult, Signal};

/// LegacyAuthNotBlocked: legacy authentication protocols still accepted
///
/// Matched when security defaults are off and no enabled conditional
/// access policy blocks the legacy client app types.
pub struct LegacyAuthNotBlockedRule;

pub(super) fn metadata() -> Result<RuleMetadata> {
    RuleMetadata::builder("LegacyAuthNotBlocked")
        .category(Category::Anomalies)
        .model(RiskModel::Authentication)
        .computation(Computation::objective(20))
        .maturity(2)
        .reference(FrameworkReference::mitre("T1110.003"))
        .introduced_in(3, 1)
        .title("Legacy authentication is not blocked")
        .description("Protocols that cannot perform MFA are still allowed to sign in.")
        .solution(
            "Create a conditional access policy blocking the 'Exchange ActiveSync' \
             and 'Other clients' app types, or enable security defaults.",
        )
        .technical_explanation(
            "Legacy protocols only send a user name and a password. Password spray \
             attacks target them because MFA cannot be enforced on them.",
        )
        .build()
}

impl Rule<TenantFacts> for LegacyAuthNotBlockedRule {
    fn evaluate(&self, facts: &TenantFacts, ctx: &mut RuleContext) -> RuleResult {
        if facts.security_defaults_enabled {
            return Ok(Signal::NotMatched);
        }
        let blocked = facts
            .conditional_access
            .iter()
            .any(|p| p.blocks_legacy_auth());
        if !blocked {
            for policy in facts.conditional_access.iter().filter(|p| p.block) {
                ctx.record_detail(format!("'{}' ({:?})", policy.name, policy.state));
            }
        }
        Ok(Signal::matched_if(!blocked))
    }
}
