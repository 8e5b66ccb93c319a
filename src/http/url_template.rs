//! URL templating: `{placeholder}` substitution and query merging.

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use url::Url;

/// Render a URL template into a percent-encoded [`Url`]
///
/// 1. Every `{name}` placeholder is replaced by the percent-encoded path value.
/// 2. Query parameters already present in the template are kept unless an
///    explicit parameter uses the same key; explicit parameters win.
/// 3. The result is serialized by the `url` crate, which encodes the query.
///
/// A placeholder left without a value is an error rather than a literal `{}`
/// in the request path.
pub fn render_url(
    template: &str,
    path_params: &BTreeMap<String, String>,
    query: &BTreeMap<String, String>,
) -> Result<Url> {
    let mut rendered = template.to_string();
    for (name, value) in path_params {
        rendered = rendered.replace(&format!("{{{}}}", name), &urlencoding::encode(value));
    }

    if let Some(start) = rendered.find('{')
        && rendered[start..].contains('}')
    {
        return Err(Error::InvalidUrl {
            url: rendered,
            reason: "unresolved path placeholder".to_string(),
        });
    }

    let mut url = Url::parse(&rendered).map_err(|e| Error::InvalidUrl {
        url: rendered.clone(),
        reason: e.to_string(),
    })?;

    let mut merged: Vec<(String, String)> = url
        .query_pairs()
        .into_owned()
        .filter(|(key, _)| !query.contains_key(key))
        .collect();
    merged.extend(query.iter().map(|(k, v)| (k.clone(), v.clone())));

    if merged.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(merged);
    }

    Ok(url)
}
