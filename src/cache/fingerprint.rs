//! Fingerprint Module
//!
//! Derives cache keys from request identity. Keys begin with the request path
//! so that a namespace prefix such as `"posts"` selects every request made
//! against that resource.

use serde_json::Value;
use url::form_urlencoded::Serializer;

// == Fingerprint ==
/// Builds the cache key for a request.
///
/// Format: `{path}:{METHOD}` followed by `?{params}` when there are params.
/// Leading and trailing slashes are trimmed from the path and the method is
/// upper-cased. Param names and values are form-urlencoded, so a value
/// containing `&` or `=` cannot pass for a second param. Object keys in `params` are sorted at every depth, so two
/// call sites building the same params in a different order share one key.
///
/// ```
/// use blog_cache::cache::fingerprint;
/// use serde_json::json;
///
/// let a = fingerprint("get", "/posts", &json!({"page": 1, "limit": 5}));
/// let b = fingerprint("GET", "posts/", &json!({"limit": 5, "page": 1}));
/// assert_eq!(a, "posts:GET?limit=5&page=1");
/// assert_eq!(a, b);
/// ```
pub fn fingerprint(method: &str, path: &str, params: &Value) -> String {
    let mut key = format!(
        "{}:{}",
        path.trim_matches('/'),
        method.trim().to_ascii_uppercase()
    );
    if let Some(rendered) = render_params(params) {
        key.push('?');
        key.push_str(&rendered);
    }
    key
}

// == Cache Key ==
/// Builds a key from a base name and optional params: `base` or `base:k=v&...`.
pub fn cache_key(base: &str, params: &Value) -> String {
    match render_params(params) {
        Some(rendered) => format!("{}:{}", base, rendered),
        None => base.to_string(),
    }
}

// == Namespace ==
/// Returns the first segment of a request path, the prefix writes invalidate.
///
/// `"/posts/42/tags"` yields `"posts"`; an empty path yields `""`.
pub fn namespace_of(path: &str) -> &str {
    path.trim_start_matches('/')
        .split(['/', '?'])
        .next()
        .unwrap_or("")
}

/// Renders params into their canonical text, or None when there are none.
fn render_params(params: &Value) -> Option<String> {
    match params {
        Value::Null => None,
        Value::Object(map) if map.is_empty() => None,
        Value::Object(map) => {
            let mut pairs: Vec<(&String, &Value)> = map.iter().collect();
            pairs.sort_by(|a, b| a.0.cmp(b.0));
            let mut serializer = Serializer::new(String::new());
            for (k, v) in pairs {
                serializer.append_pair(k, &render_scalar(v));
            }
            Some(serializer.finish())
        }
        other => Some(canonical_json(other)),
    }
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => canonical_json(other),
    }
}

/// JSON text with object keys sorted at every depth.
fn canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut pairs: Vec<(&String, &Value)> = map.iter().collect();
            pairs.sort_by(|a, b| a.0.cmp(b.0));
            let body = pairs
                .into_iter()
                .map(|(k, v)| format!("{}:{}", Value::String(k.clone()), canonical_json(v)))
                .collect::<Vec<_>>()
                .join(",");
            format!("{{{}}}", body)
        }
        Value::Array(items) => {
            let body = items
                .iter()
                .map(canonical_json)
                .collect::<Vec<_>>()
                .join(",");
            format!("[{}]", body)
        }
        scalar => scalar.to_string(),
    }
}
