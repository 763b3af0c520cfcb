// src/config/keywords.rs
//! Keyword file: `{ "keywords": [...], "stock_names": [...] }`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::monitor::terms::{clean_terms, TermSource};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordSet {
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub stock_names: Vec<String>,
}

impl KeywordSet {
    /// Keywords first, then stock names.
    pub fn search_terms(&self) -> Vec<String> {
        clean_terms(self.keywords.iter().chain(self.stock_names.iter()))
    }
}

/// JSON-backed keyword store. Re-read on every cycle so edits made while the
/// monitor runs apply to the next cycle.
#[derive(Debug, Clone)]
pub struct KeywordStore {
    path: PathBuf,
}

impl KeywordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing file is an empty set.
    pub async fn load(&self) -> Result<KeywordSet> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(KeywordSet::default()),
            Err(e) => {
                return Err(e).with_context(|| format!("reading keywords {}", self.path.display()))
            }
        };
        serde_json::from_str(&content)
            .with_context(|| format!("parsing keywords {}", self.path.display()))
    }

    /// Write to a sibling temp file, then rename it over the target, so the
    /// per-cycle reader never sees a truncated file.
    pub async fn save(&self, set: &KeywordSet) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        let body = serde_json::to_vec_pretty(set)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body)
            .await
            .with_context(|| format!("writing keywords {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("replacing keywords {}", self.path.display()))
    }
}

#[async_trait::async_trait]
impl TermSource for KeywordStore {
    async fn current_terms(&self) -> Result<Vec<String>> {
        Ok(self.load().await?.search_terms())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_is_empty_and_save_roundtrips_terms() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeywordStore::new(dir.path().join("config/keywords.json"));
        assert!(store.current_terms().await.unwrap().is_empty());

        store
            .save(&KeywordSet {
                keywords: vec!["리포트 브리핑".into(), " ".into()],
                stock_names: vec!["삼성전자".into(), "리포트 브리핑".into()],
            })
            .await
            .unwrap();
        assert_eq!(
            store.current_terms().await.unwrap(),
            vec!["리포트 브리핑", "삼성전자"]
        );
    }

    #[tokio::test]
    async fn save_replaces_without_leaving_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeywordStore::new(dir.path().join("keywords.json"));
        std::fs::write(store.path(), r#"{"keywords": ["old"]}"#).unwrap();

        store
            .save(&KeywordSet {
                keywords: vec!["new".into()],
                stock_names: vec![],
            })
            .await
            .unwrap();

        assert_eq!(store.current_terms().await.unwrap(), vec!["new"]);
        assert!(!dir.path().join("keywords.json.tmp").exists());
    }

    #[tokio::test]
    async fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("keywords.json");
        std::fs::write(&p, "{ not json").unwrap();
        assert!(KeywordStore::new(p).current_terms().await.is_err());
    }
}
