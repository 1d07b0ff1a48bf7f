use chrono::Duration;

use crate::error::Result;
use crate::facts::HealthcheckFacts;
use crate::rules::metadata::{Category, Computation, FrameworkReference, RiskModel, RuleMetadata};
use crate::rules::{Rule, RuleContext, RuleResult, Signal};

/// KrbtgtPasswordAge: krbtgt password not rotated recently
pub struct KrbtgtPasswordAgeRule {
    pub max_age: Duration,
}

pub(super) fn metadata() -> Result<RuleMetadata> {
    RuleMetadata::builder("KrbtgtPasswordAge")
        .category(Category::Anomalies)
        .model(RiskModel::GoldenTicket)
        .computation(Computation::on_presence(40))
        .maturity(2)
        .reference(FrameworkReference::anssi("vuln2_krbtgt", Some("2.1")))
        .reference(FrameworkReference::mitre("T1558.001"))
        .introduced_in(1, 0)
        .title("The krbtgt password has not been changed recently")
        .description("The password of the krbtgt account is older than the rotation window.")
        .solution(
            "Reset the krbtgt password twice, waiting for full replication between \
             the two resets.",
        )
        .technical_explanation(
            "Every Kerberos ticket is signed with the krbtgt key. Anyone who obtained \
             the key in the past can forge tickets (golden tickets) until the \
             password is rotated.",
        )
        .build()
}

impl Rule<HealthcheckFacts> for KrbtgtPasswordAgeRule {
    fn evaluate(&self, facts: &HealthcheckFacts, ctx: &mut RuleContext) -> RuleResult {
        if let Some(last_change) = facts.krbtgt_last_change {
            let age = facts.generated_at - last_change;
            if age > self.max_age {
                ctx.record_detail(format!(
                    "krbtgt password last changed {} days ago ({})",
                    age.num_days(),
                    last_change.date_naive()
                ));
            }
        }
        Ok(Signal::NoSignal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn facts(days_ago: i64) -> HealthcheckFacts {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        HealthcheckFacts {
            domain_fqdn: "corp.local".into(),
            generated_at: now,
            sync: None,
            krbtgt_last_change: Some(now - Duration::days(days_ago)),
            laps_installed: true,
            privileged_accounts: vec![],
            trusts: vec![],
        }
    }

    fn rule() -> KrbtgtPasswordAgeRule {
        KrbtgtPasswordAgeRule {
            max_age: Duration::days(40),
        }
    }

    #[test]
    fn flags_old_password() {
        let mut ctx = RuleContext::new();
        rule().evaluate(&facts(400), &mut ctx).unwrap();
        assert_eq!(
            ctx.details(),
            ["krbtgt password last changed 400 days ago (2023-04-28)"]
        );
    }

    #[test]
    fn passes_recent_password() {
        let mut ctx = RuleContext::new();
        rule().evaluate(&facts(10), &mut ctx).unwrap();
        assert_eq!(ctx.detail_count(), 0);
    }
}
