use serde::{Deserialize, Serialize};

/// Trigger threshold for count-based objective rules.
///
/// Configuration encodes it as an integer: `-1` selects [`Threshold::Any`],
/// any non-negative value `n` selects [`Threshold::MoreThan`]`(n)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Threshold {
    /// Matched when the rule's boolean condition holds, whatever the count.
    Any,
    /// Matched when the count is strictly greater than the bound.
    MoreThan(u64),
}

impl Threshold {
    pub const ANY_SENTINEL: i64 = -1;

    /// Apply the threshold to a count and the rule's "any" condition.
    pub fn is_met(self, count: u64, any_condition: bool) -> bool {
        match self {
            Self::Any => any_condition,
            Self::MoreThan(bound) => count > bound,
        }
    }
}

impl TryFrom<i64> for Threshold {
    type Error = String;

    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        match raw {
            Self::ANY_SENTINEL => Ok(Self::Any),
            n if n >= 0 => Ok(Self::MoreThan(n as u64)),
            n => Err(format!(
                "invalid threshold {n}: expected {} or a non-negative count",
                Self::ANY_SENTINEL
            )),
        }
    }
}

impl From<Threshold> for i64 {
    fn from(threshold: Threshold) -> i64 {
        match threshold {
            Threshold::Any => Threshold::ANY_SENTINEL,
            Threshold::MoreThan(n) => i64::try_from(n).unwrap_or(i64::MAX),
        }
    }
}

impl std::fmt::Display for Threshold {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Any => write!(f, "any"),
            Self::MoreThan(n) => write!(f, "> {n}"),
        }
    }
}
