//! Query-string construction for public, render and download URLs.

use url::Url;

use crate::types::UrlOptions;

/// Append the query parameters described by `options` to `base`.
///
/// Parameters are only added for values that are set: `height`, `width` and
/// `quality` when greater than zero, `format` when non-empty, `resize` when it is a
/// recognized mode, and `download` when `true`. The resulting query is sorted by key.
/// With nothing to add, the parsed `base` is returned without a `?`.
///
/// Picking between the plain object path and the image render path is up to the
/// caller; this function never changes the path.
pub fn build_url(base: &str, options: &UrlOptions) -> Result<String, url::ParseError> {
    let mut url = Url::parse(base)?;

    let mut added = options
        .transform
        .as_ref()
        .map(|t| t.query_pairs())
        .unwrap_or_default();
    if options.download {
        added.push(("download", "true".to_string()));
    }
    if added.is_empty() {
        return Ok(url.to_string());
    }

    let mut pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    pairs.extend(added.into_iter().map(|(k, v)| (k.to_string(), v)));
    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    url.query_pairs_mut().clear().extend_pairs(pairs);
    Ok(url.to_string())
}
