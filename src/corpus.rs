//! Corpus loading.
//!
//! A corpus is a JSON Lines file with one document per line:
//!
//! ```text
//! {"id": "doc-1", "text": "...", "title": "optional", "metadata": {"lang": "rust"}}
//! ```
//!
//! Blank lines and lines starting with `//` are skipped.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl Document {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            title: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

pub fn load_corpus(path: &Path) -> Result<Vec<Document>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading corpus {}", path.display()))?;
    parse_corpus(&raw).with_context(|| format!("parsing corpus {}", path.display()))
}

pub fn parse_corpus(raw: &str) -> Result<Vec<Document>> {
    let mut docs = Vec::new();
    let mut seen = HashSet::new();

    for (line_no, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with("//") {
            continue;
        }
        let doc: Document = serde_json::from_str(line)
            .with_context(|| format!("line {}: invalid document", line_no + 1))?;
        if doc.id.trim().is_empty() {
            bail!("line {}: document id is empty", line_no + 1);
        }
        if !seen.insert(doc.id.clone()) {
            bail!("line {}: duplicate document id '{}'", line_no + 1, doc.id);
        }
        docs.push(doc);
    }

    Ok(docs)
}
