//! Loading fact snapshots written by the collectors.
//!
//! A snapshot is a JSON document tagged with its `kind`. A path is either
//! one snapshot file or a directory walked recursively for `*.json`.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::error::{DirRiskError, Result};
use crate::facts::FactSet;

/// A parsed snapshot and where it came from.
#[derive(Debug, Clone)]
pub struct LoadedFacts {
    pub path: PathBuf,
    /// SHA-256 of the file bytes, hex encoded.
    pub content_hash: String,
    pub facts: FactSet,
}

/// Parse one snapshot file.
pub fn load_file(path: &Path) -> Result<LoadedFacts> {
    let bytes = std::fs::read(path)?;
    let facts: FactSet = serde_json::from_slice(&bytes).map_err(|e| DirRiskError::FactLoad {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    Ok(LoadedFacts {
        path: path.to_path_buf(),
        content_hash: hex::encode(Sha256::digest(&bytes)),
        facts,
    })
}

/// Load every snapshot under `root`.
///
/// Files that fail to parse are skipped with a warning; finding no
/// snapshot at all is an error.
pub fn load(root: &Path) -> Result<Vec<LoadedFacts>> {
    if root.is_file() {
        return Ok(vec![load_file(root)?]);
    }
    if !root.is_dir() {
        return Err(DirRiskError::FactLoad {
            path: root.display().to_string(),
            message: "no such file or directory".into(),
        });
    }

    let mut paths: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
        })
        .collect();
    paths.sort();

    let mut loaded = Vec::new();
    for path in paths {
        match load_file(&path) {
            Ok(facts) => {
                tracing::debug!(
                    path = %path.display(),
                    kind = %facts.facts.kind(),
                    "loaded fact snapshot"
                );
                loaded.push(facts);
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "not a fact snapshot, skipping");
            }
        }
    }

    if loaded.is_empty() {
        return Err(DirRiskError::NoFacts(root.display().to_string()));
    }
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::FactKind;

    const TENANT: &str = r#"{"kind": "tenant", "tenant_id": "t", "tenant_name": "contoso"}"#;
    const GRAPH: &str = r#"{"kind": "compromise_graph", "domain_fqdn": "corp.local"}"#;

    #[test]
    fn loads_directory_in_path_order_and_skips_garbage() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("b_tenant.json"), TENANT).unwrap();
        std::fs::write(dir.path().join("nested").join("graph.json"), GRAPH).unwrap();
        std::fs::write(dir.path().join("a_broken.json"), "{ not json").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let loaded = load(dir.path()).unwrap();
        let kinds: Vec<FactKind> = loaded.iter().map(|l| l.facts.kind()).collect();
        assert_eq!(kinds, vec![FactKind::Tenant, FactKind::CompromiseGraph]);
        assert_eq!(loaded[0].content_hash.len(), 64);
    }

    #[test]
    fn single_file_error_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, r#"{"kind": "ldap"}"#).unwrap();
        assert!(matches!(load(&path), Err(DirRiskError::FactLoad { .. })));
    }

    #[test]
    fn empty_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(load(dir.path()), Err(DirRiskError::NoFacts(_))));
    }

    #[test]
    fn identical_content_hashes_identically() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.json");
        let b = dir.path().join("b.json");
        std::fs::write(&a, TENANT).unwrap();
        std::fs::write(&b, TENANT).unwrap();
        assert_eq!(
            load_file(&a).unwrap().content_hash,
            load_file(&b).unwrap().content_hash
        );
    }
}
