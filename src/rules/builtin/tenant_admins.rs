use crate::error::Result;
use crate::facts::TenantFacts;
use crate::rules::metadata::{Category, Computation, FrameworkReference, RiskModel, RuleMetadata};
use crate::rules::{Rule, RuleContext, RuleResult, Signal};

/// GlobalAdminWithoutMfa: global administrators without a registered MFA method
pub struct GlobalAdminWithoutMfaRule;

/// TooManyGlobalAdmins: more global administrators than the configured maximum
pub struct TooManyGlobalAdminsRule {
    pub max: u64,
}

pub(super) fn without_mfa_metadata() -> Result<RuleMetadata> {
    RuleMetadata::builder("GlobalAdminWithoutMfa")
        .category(Category::PrivilegedAccounts)
        .model(RiskModel::Authentication)
        .computation(Computation::on_presence(30))
        .maturity(1)
        .reference(FrameworkReference::mitre("T1078.004"))
        .title("Global administrators without MFA")
        .description("Some global administrators have not registered any MFA method.")
        .solution(
            "Require MFA registration for every privileged role and enforce it \
             with a conditional access policy.",
        )
        .build()
}

pub(super) fn too_many_metadata() -> Result<RuleMetadata> {
    RuleMetadata::builder("TooManyGlobalAdmins")
        .category(Category::PrivilegedAccounts)
        .model(RiskModel::AccountTakeOver)
        .computation(Computation::objective(10))
        .maturity(2)
        .title("Too many global administrators")
        .solution(
            "Reduce the number of global administrators and delegate with \
             least-privilege roles instead.",
        )
        .build()
}

impl Rule<TenantFacts> for GlobalAdminWithoutMfaRule {
    fn evaluate(&self, facts: &TenantFacts, ctx: &mut RuleContext) -> RuleResult {
        for admin in facts.global_admins.iter().filter(|a| !a.mfa_registered) {
            ctx.record_detail(admin.user_principal_name.clone());
        }
        Ok(Signal::NoSignal)
    }
}

impl Rule<TenantFacts> for TooManyGlobalAdminsRule {
    fn evaluate(&self, facts: &TenantFacts, ctx: &mut RuleContext) -> RuleResult {
        let count = facts.global_admins.len() as u64;
        if count > self.max {
            for admin in &facts.global_admins {
                ctx.record_detail(admin.user_principal_name.clone());
            }
        }
        Ok(Signal::matched_if(count > self.max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::tenant::CloudAdmin;

    fn tenant(admins: &[(&str, bool)]) -> TenantFacts {
        TenantFacts {
            tenant_id: "t".into(),
            tenant_name: "contoso".into(),
            security_defaults_enabled: false,
            conditional_access: vec![],
            global_admins: admins
                .iter()
                .map(|&(upn, mfa)| CloudAdmin {
                    user_principal_name: upn.into(),
                    mfa_registered: mfa,
                })
                .collect(),
            applications: vec![],
        }
    }

    #[test]
    fn flags_admins_without_mfa() {
        let facts = tenant(&[("a@contoso.com", true), ("b@contoso.com", false)]);
        let mut ctx = RuleContext::new();
        GlobalAdminWithoutMfaRule.evaluate(&facts, &mut ctx).unwrap();
        assert_eq!(ctx.details(), ["b@contoso.com"]);
    }

    #[test]
    fn too_many_admins_is_strictly_greater() {
        let rule = TooManyGlobalAdminsRule { max: 2 };
        let mut ctx = RuleContext::new();
        let two = tenant(&[("a", true), ("b", true)]);
        assert_eq!(rule.evaluate(&two, &mut ctx).unwrap(), Signal::NotMatched);
        assert_eq!(ctx.detail_count(), 0);

        let three = tenant(&[("a", true), ("b", true), ("c", true)]);
        assert_eq!(rule.evaluate(&three, &mut ctx).unwrap(), Signal::Matched);
        assert_eq!(ctx.detail_count(), 3);
    }
}
