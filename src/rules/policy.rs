use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::metadata::{Category, MaturityLevel};
use super::Finding;

/// Score ceiling per category.
pub const MAX_CATEGORY_SCORE: u32 = 100;

/// Policy verdict: the scoring rollup after applying the ignore list,
/// maturity filter and weight overrides to raw findings.
#[derive(Debug, Clone, Serialize)]
pub struct PolicyVerdict {
    pub pass: bool,
    pub total_findings: usize,
    pub effective_findings: usize,
    /// Per-category score, capped at [`MAX_CATEGORY_SCORE`].
    pub category_scores: BTreeMap<Category, u32>,
    /// Highest category score.
    pub global_score: u32,
    /// Lowest maturity level among effective findings (5 when none).
    pub maturity_level: u8,
    pub fail_above: u32,
}

/// Policy configuration loaded from `.dirrisk.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    /// Global score strictly above this fails the run.
    #[serde(default = "default_fail_above")]
    pub fail_above: u32,
    /// Rule IDs to ignore entirely.
    #[serde(default)]
    pub ignore_rules: HashSet<String>,
    /// Drop findings for rules whose maturity level is above this.
    #[serde(default = "default_max_maturity")]
    pub max_maturity: u8,
    /// Per-rule weight overrides.
    #[serde(default)]
    pub weight_overrides: HashMap<String, u32>,
}

fn default_fail_above() -> u32 {
    50
}

fn default_max_maturity() -> u8 {
    MaturityLevel::MAX
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            fail_above: default_fail_above(),
            ignore_rules: HashSet::new(),
            max_maturity: default_max_maturity(),
            weight_overrides: HashMap::new(),
        }
    }
}

impl Policy {
    /// Evaluate findings against this policy and produce a verdict.
    pub fn evaluate(&self, findings: &[Finding]) -> PolicyVerdict {
        let effective = self.apply(findings);

        let mut category_scores: BTreeMap<Category, u32> =
            Category::ALL.iter().map(|&c| (c, 0)).collect();
        for finding in &effective {
            let score = category_scores.entry(finding.category).or_insert(0);
            *score = score.saturating_add(finding.weight).min(MAX_CATEGORY_SCORE);
        }

        let global_score = category_scores.values().copied().max().unwrap_or(0);
        let maturity_level = effective
            .iter()
            .map(|f| f.maturity.get())
            .min()
            .unwrap_or(MaturityLevel::MAX);

        PolicyVerdict {
            pass: global_score <= self.fail_above,
            total_findings: findings.len(),
            effective_findings: effective.len(),
            category_scores,
            global_score,
            maturity_level,
            fail_above: self.fail_above,
        }
    }

    /// Filter findings: remove ignored rules and rules above the maturity
    /// cap, apply weight overrides.
    pub fn apply(&self, findings: &[Finding]) -> Vec<Finding> {
        findings
            .iter()
            .filter(|f| !self.ignore_rules.contains(&f.rule_id))
            .filter(|f| f.maturity.get() <= self.max_maturity)
            .map(|f| {
                let mut f = f.clone();
                if let Some(&weight) = self.weight_overrides.get(&f.rule_id) {
                    f.weight = weight;
                }
                f
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::metadata::{Classification, RiskModel};

    fn make_finding(rule_id: &str, category: Category, weight: u32, maturity: u8) -> Finding {
        Finding {
            rule_id: rule_id.into(),
            category,
            classification: Classification::Model(RiskModel::ObjectConfig),
            maturity: MaturityLevel::new(maturity).unwrap(),
            weight,
            rationale: None,
            details: vec!["x".into()],
            sub_graphs: vec![],
        }
    }

    #[test]
    fn no_findings_passes_with_top_maturity() {
        let verdict = Policy::default().evaluate(&[]);
        assert!(verdict.pass);
        assert_eq!(verdict.global_score, 0);
        assert_eq!(verdict.maturity_level, 5);
        assert_eq!(verdict.category_scores.len(), Category::ALL.len());
    }

    #[test]
    fn category_score_is_capped_and_global_is_max() {
        let findings = vec![
            make_finding("A", Category::Anomalies, 60, 3),
            make_finding("B", Category::Anomalies, 70, 2),
            make_finding("C", Category::Trusts, 20, 4),
        ];
        let verdict = Policy::default().evaluate(&findings);
        assert_eq!(verdict.category_scores[&Category::Anomalies], 100);
        assert_eq!(verdict.category_scores[&Category::Trusts], 20);
        assert_eq!(verdict.global_score, 100);
        assert_eq!(verdict.maturity_level, 2);
        assert!(!verdict.pass);
    }

    #[test]
    fn default_policy_passes_at_threshold() {
        let findings = vec![make_finding("A", Category::StaleObjects, 50, 3)];
        assert!(Policy::default().evaluate(&findings).pass);
    }

    #[test]
    fn ignore_rule_removes_finding() {
        let mut policy = Policy::default();
        policy.ignore_rules.insert("KrbtgtPasswordAge".into());
        let findings = vec![make_finding("KrbtgtPasswordAge", Category::Anomalies, 80, 1)];
        let verdict = policy.evaluate(&findings);
        assert!(verdict.pass);
        assert_eq!(verdict.effective_findings, 0);
        assert_eq!(verdict.total_findings, 1);
    }

    #[test]
    fn override_lowers_weight() {
        let mut policy = Policy::default();
        policy.weight_overrides.insert("A".into(), 0);
        let findings = vec![make_finding("A", Category::Anomalies, 90, 1)];
        let verdict = policy.evaluate(&findings);
        assert!(verdict.pass);
        assert_eq!(policy.apply(&findings)[0].weight, 0);
    }

    #[test]
    fn maturity_cap_drops_advanced_rules() {
        let policy = Policy {
            max_maturity: 2,
            ..Policy::default()
        };
        let findings = vec![
            make_finding("Basic", Category::Anomalies, 10, 1),
            make_finding("Advanced", Category::Anomalies, 90, 4),
        ];
        let effective = policy.apply(&findings);
        assert_eq!(effective.len(), 1);
        assert_eq!(effective[0].rule_id, "Basic");
    }
}
