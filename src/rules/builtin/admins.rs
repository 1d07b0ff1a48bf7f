use chrono::Duration;

use crate::error::Result;
use crate::facts::HealthcheckFacts;
use crate::rules::metadata::{Category, Computation, FrameworkReference, RiskModel, RuleMetadata};
use crate::rules::{Rule, RuleContext, RuleResult, Signal};

/// InactiveAdmins: enabled privileged accounts that no longer log on
pub struct InactiveAdminsRule {
    pub max_inactivity: Duration,
}

/// AdminPasswordNeverExpires: privileged accounts exempt from password expiry
pub struct AdminPasswordNeverExpiresRule;

pub(super) fn inactive_metadata() -> Result<RuleMetadata> {
    RuleMetadata::builder("InactiveAdmins")
        .category(Category::PrivilegedAccounts)
        .model(RiskModel::AccountTakeOver)
        .computation(Computation::on_presence(5))
        .maturity(3)
        .reference(FrameworkReference::anssi("vuln3_dormant_admin", None))
        .reference(FrameworkReference::mitre("T1078.002"))
        .title("Inactive privileged accounts are still enabled")
        .description("Privileged accounts have not logged on within the inactivity window.")
        .solution(
            "Disable or remove privileged accounts that are no longer used and \
             review the membership of privileged groups.",
        )
        .technical_explanation(
            "Dormant administrator accounts are rarely monitored. A compromise of \
             their credentials goes unnoticed longer than for active accounts.",
        )
        .build()
}

pub(super) fn never_expires_metadata() -> Result<RuleMetadata> {
    RuleMetadata::builder("AdminPasswordNeverExpires")
        .category(Category::PrivilegedAccounts)
        .model(RiskModel::AccountTakeOver)
        .computation(Computation::on_presence(10))
        .maturity(2)
        .reference(FrameworkReference::stig("V-36432"))
        .title("Privileged accounts have passwords that never expire")
        .solution(
            "Remove the 'password never expires' flag from privileged accounts, or \
             move them to a managed password solution.",
        )
        .build()
}

impl Rule<HealthcheckFacts> for InactiveAdminsRule {
    fn evaluate(&self, facts: &HealthcheckFacts, ctx: &mut RuleContext) -> RuleResult {
        for account in facts.privileged_accounts.iter().filter(|a| a.enabled) {
            match account.last_logon {
                Some(last) if facts.generated_at - last > self.max_inactivity => {
                    ctx.record_detail(format!(
                        "{} (last logon {})",
                        account.sam_account_name,
                        last.date_naive()
                    ));
                }
                Some(_) => {}
                None => ctx.record_detail(format!("{} (never logged on)", account.sam_account_name)),
            }
        }
        Ok(Signal::NoSignal)
    }
}

impl Rule<HealthcheckFacts> for AdminPasswordNeverExpiresRule {
    fn evaluate(&self, facts: &HealthcheckFacts, ctx: &mut RuleContext) -> RuleResult {
        facts
            .privileged_accounts
            .iter()
            .filter(|a| a.enabled && a.password_never_expires)
            .for_each(|a| ctx.record_detail(a.sam_account_name.clone()));
        Ok(Signal::NoSignal)
    }
}
