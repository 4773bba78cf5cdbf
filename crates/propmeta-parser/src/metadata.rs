//! Configuration metadata document parser.
//!
//! A document has three optional arrays: `groups`, `properties` and `hints`.
//! Unknown fields are ignored so documents produced by newer tooling still load.

use propmeta_types::{GroupDecl, HintDecl, PropertyDecl};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from reading a metadata document.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("failed to read metadata file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid metadata document: {0}")]
    Json(#[from] serde_json::Error),
}

/// One parsed metadata document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetadataDocument {
    #[serde(default)]
    pub groups: Vec<GroupDecl>,
    #[serde(default)]
    pub properties: Vec<PropertyDecl>,
    #[serde(default)]
    pub hints: Vec<HintDecl>,
}

impl MetadataDocument {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() && self.properties.is_empty() && self.hints.is_empty()
    }
}

/// Parse a metadata document from its JSON text.
pub fn parse_metadata_str(content: &str) -> Result<MetadataDocument, MetadataError> {
    let doc: MetadataDocument = serde_json::from_str(content)?;
    tracing::debug!(
        "Parsed metadata: {} groups, {} properties, {} hints",
        doc.groups.len(),
        doc.properties.len(),
        doc.hints.len()
    );
    Ok(doc)
}

/// Read and parse a metadata document from disk.
pub fn parse_metadata_file(path: &Path) -> Result<MetadataDocument, MetadataError> {
    let content = std::fs::read_to_string(path).map_err(|source| MetadataError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_metadata_str(&content)
}
