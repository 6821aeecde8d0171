use reqwest::Url;
use serde_json::Value;

use crate::{error::Result, registry::registry_url};

/// `{base}/pypi/{name}/json`
pub fn document_url(base: &str, name: &str) -> Result<Url> {
    registry_url(base, &format!("pypi/{name}/json"))
}

/// `info.version` of a project document.
pub fn latest_from_document(doc: &Value) -> Option<String> {
    doc.get("info")?.get("version")?.as_str().map(String::from)
}
