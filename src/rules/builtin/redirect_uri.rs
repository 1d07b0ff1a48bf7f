use url::{Host, Url};

use crate::error::Result;
use crate::facts::TenantFacts;
use crate::rules::metadata::{Category, Computation, FrameworkReference, RiskModel, RuleMetadata};
use crate::rules::{Rule, RuleContext, RuleResult, Signal};

/// InsecureRedirectUri: application reply URLs an attacker could capture
///
/// Flags wildcard hosts, plain http outside loopback, and URIs that do
/// not parse at all.
pub struct InsecureRedirectUriRule;

pub(super) fn metadata() -> Result<RuleMetadata> {
    RuleMetadata::builder("InsecureRedirectUri")
        .category(Category::Anomalies)
        .model(RiskModel::ObjectConfig)
        .computation(Computation::on_presence(5))
        .maturity(4)
        .reference(FrameworkReference::mitre("T1528"))
        .title("Applications accept insecure redirect URIs")
        .solution(
            "Remove wildcard and plain-http reply URLs from application \
             registrations. Keep http only for loopback development URIs.",
        )
        .technical_explanation(
            "Authorization codes and tokens are delivered to the reply URL. A \
             wildcard or unencrypted reply URL lets an attacker receive them.",
        )
        .build()
}

fn insecure_reason(uri: &str) -> Option<&'static str> {
    if uri.contains('*') {
        return Some("wildcard");
    }
    let Ok(url) = Url::parse(uri) else {
        return Some("unparseable");
    };
    match url.scheme() {
        "https" => None,
        "http" if is_loopback(&url) => None,
        "http" => Some("plain http"),
        _ => None,
    }
}

fn is_loopback(url: &Url) -> bool {
    match url.host() {
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(ip)) => ip.is_loopback(),
        Some(Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}

impl Rule<TenantFacts> for InsecureRedirectUriRule {
    fn evaluate(&self, facts: &TenantFacts, ctx: &mut RuleContext) -> RuleResult {
        for app in &facts.applications {
            for uri in &app.redirect_uris {
                if let Some(reason) = insecure_reason(uri) {
                    ctx.record_detail(format!("{}: {} ({})", app.display_name, uri, reason));
                }
            }
        }
        Ok(Signal::NoSignal)
    }
}
