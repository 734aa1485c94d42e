//! Framework configuration, loaded from TOML.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Settings consumed by the schema generator and the dispatch adapter.
///
/// Every field has a default, so an empty TOML document is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameworkConfig {
    pub title: String,
    pub description: String,
    pub version: String,
    /// Route serving the generated document.
    pub doc_route: String,
    /// File written by `save_openapi_json`, relative to the working directory.
    pub doc_file: String,
    /// Logs every parsed request at `info` instead of `debug`.
    pub debug: bool,
    /// Maximum accepted request body, in bytes.
    pub body_limit: usize,
}

impl Default for FrameworkConfig {
    fn default() -> Self {
        FrameworkConfig {
            title: "API Documentation".to_string(),
            description: "API documentation generated by the framework".to_string(),
            version: "1.0.0".to_string(),
            doc_route: "/api-docs/openapi.json".to_string(),
            doc_file: "doc.json".to_string(),
            debug: false,
            body_limit: 2 * 1024 * 1024,
        }
    }
}

impl FrameworkConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}
