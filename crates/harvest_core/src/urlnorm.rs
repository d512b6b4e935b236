//! URL normalization for cache keys and duplicate detection.

use url::Url;

/// Query parameters that only carry tracking state.
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid"];
const TRACKING_PREFIXES: &[&str] = &["utm_"];

/// Normalizes a URL into the canonical form used as a cache key.
///
/// Strips the fragment and tracking parameters, sorts the remaining query
/// parameters lexicographically, and removes trailing slashes from the path
/// (except for the root path). The result is stable: normalizing an already
/// normalized URL returns it unchanged. Inputs that do not parse as absolute
/// URLs are returned trimmed but otherwise untouched.
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let Ok(mut url) = Url::parse(trimmed) else {
        return trimmed.to_string();
    };

    url.set_fragment(None);

    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    params.sort();
    if params.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(&params);
    }

    let path = url.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        let stripped = path.trim_end_matches('/');
        url.set_path(if stripped.is_empty() { "/" } else { stripped });
    }

    url.to_string()
}

fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.iter().any(|p| key == *p)
        || TRACKING_PREFIXES.iter().any(|p| key.starts_with(p))
}
