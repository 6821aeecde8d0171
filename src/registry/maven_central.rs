use reqwest::Url;
use serde_json::Value;

use crate::{error::Result, registry::registry_url};

/// Solr search for the newest release of `group:artifact`.
pub fn search_url(base: &str, group: &str, artifact: &str) -> Result<Url> {
    registry_url(
        base,
        &format!(
            "solrsearch/select?q=g:{group}+AND+a:{artifact}&rows=1&wt=json"
        ),
    )
}

/// `response.docs[0].latestVersion` when the search found anything.
pub fn latest_from_search(doc: &Value) -> Option<String> {
    let response = doc.get("response")?;
    if response.get("numFound")?.as_u64()? == 0 {
        return None;
    }
    response
        .get("docs")?
        .get(0)?
        .get("latestVersion")?
        .as_str()
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_latest_version_from_first_doc() {
        let doc = json!({
            "response": {
                "numFound": 1,
                "docs": [{ "g": "junit", "a": "junit", "latestVersion": "4.13.2" }]
            }
        });
        assert_eq!(latest_from_search(&doc).as_deref(), Some("4.13.2"));
    }

    #[test]
    fn empty_search_has_no_version() {
        let doc = json!({ "response": { "numFound": 0, "docs": [] } });
        assert_eq!(latest_from_search(&doc), None);
        assert_eq!(latest_from_search(&json!({})), None);
    }

    #[test]
    fn builds_search_url() {
        let url =
            search_url("https://search.maven.org", "com.google.guava", "guava")
                .unwrap();
        assert!(
            url.as_str()
                .starts_with("https://search.maven.org/solrsearch/select?")
        );
        assert_eq!(
            url.query(),
            Some("q=g:com.google.guava+AND+a:guava&rows=1&wt=json")
        );
    }
}
