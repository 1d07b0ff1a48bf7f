use thiserror::Error;

pub type Result<T> = std::result::Result<T, DirRiskError>;

#[derive(Error, Debug)]
pub enum DirRiskError {
    #[error("Catalog build error ({fact_kind}): {message}")]
    Catalog { fact_kind: String, message: String },

    #[error("Unknown rule '{id}'{}", suggestion_hint(.suggestion))]
    UnknownRule {
        id: String,
        suggestion: Option<String>,
    },

    #[error("Invalid rule declaration '{rule_id}': {message}")]
    Declaration { rule_id: String, message: String },

    #[error("Failed to load facts from {path}: {message}")]
    FactLoad { path: String, message: String },

    #[error("No fact snapshot found under: {0}")]
    NoFacts(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Rationale template error: {0}")]
    Template(String),

    #[error("Output error: {0}")]
    Output(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn suggestion_hint(suggestion: &Option<String>) -> String {
    suggestion
        .as_ref()
        .map(|s| format!(" (did you mean '{s}'?)"))
        .unwrap_or_default()
}

impl DirRiskError {
    pub fn exit_code(&self) -> i32 {
        2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_rule_mentions_suggestion() {
        let err = DirRiskError::UnknownRule {
            id: "ADConectVersion1".into(),
            suggestion: Some("ADConnectVersion1".into()),
        };
        assert_eq!(
            err.to_string(),
            "Unknown rule 'ADConectVersion1' (did you mean 'ADConnectVersion1'?)"
        );
    }

    #[test]
    fn unknown_rule_without_suggestion() {
        let err = DirRiskError::UnknownRule {
            id: "Nope".into(),
            suggestion: None,
        };
        assert_eq!(err.to_string(), "Unknown rule 'Nope'");
    }
}
