use reqwest::Url;
use serde_json::Value;

use crate::{error::Result, registry::registry_url};

/// `{base}/{name}`; scoped names keep their `@scope/` prefix.
pub fn document_url(base: &str, name: &str) -> Result<Url> {
    registry_url(base, name)
}

/// `dist-tags.latest` of a package document.
pub fn latest_from_document(doc: &Value) -> Option<String> {
    doc.get("dist-tags")?
        .get("latest")?
        .as_str()
        .map(String::from)
}

/// Keys of the `versions` map in publication order.
pub fn versions_from_document(doc: &Value) -> Vec<String> {
    doc.get("versions")
        .and_then(Value::as_object)
        .map(|versions| versions.keys().cloned().collect())
        .unwrap_or_default()
}
