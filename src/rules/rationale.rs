//! Rationale templates.
//!
//! A template is a sentence keyed by rule id with a `{count}` placeholder.
//! The engine receives its templates through [`TemplateSource`]; the
//! built-in bundle ships as TOML and can be overlaid from configuration.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{DirRiskError, Result};

pub const COUNT_PLACEHOLDER: &str = "{count}";

/// Lookup capability for rationale templates.
pub trait TemplateSource: Send + Sync {
    fn template(&self, key: &str) -> Option<&str>;
}

/// Substitute every `{count}` occurrence with `count`.
pub fn render(template: &str, count: usize) -> String {
    template.replace(COUNT_PLACEHOLDER, &count.to_string())
}

/// In-memory template table, usually parsed from a `[templates]` TOML table.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemplateBundle {
    #[serde(default)]
    templates: HashMap<String, String>,
}

impl TemplateBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let bundle: TemplateBundle = toml::from_str(content)?;
        bundle.validate()?;
        Ok(bundle)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn insert(&mut self, key: &str, template: &str) {
        self.templates.insert(key.to_string(), template.to_string());
    }

    /// Entries of `other` replace entries with the same key.
    pub fn overlay(&mut self, other: TemplateBundle) {
        self.templates.extend(other.templates);
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    fn validate(&self) -> Result<()> {
        for (key, template) in &self.templates {
            if template.trim().is_empty() {
                return Err(DirRiskError::Template(format!(
                    "template '{key}' is empty"
                )));
            }
        }
        Ok(())
    }
}

impl TemplateSource for TemplateBundle {
    fn template(&self, key: &str) -> Option<&str> {
        self.templates.get(key).map(String::as_str)
    }
}
