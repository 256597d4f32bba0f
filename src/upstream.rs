//! Upstream Client
//!
//! Thin reqwest wrapper around the blog's JSON API. Supplies the fetchers the
//! cache runs on a miss and forwards writes untouched.

use std::collections::BTreeMap;

use anyhow::{bail, Context};
use reqwest::{header, Client, Method, StatusCode};
use serde_json::Value;

// == Upstream Client ==
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: Client,
    base_url: String,
}

impl UpstreamClient {
    /// Creates a client for the API rooted at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL for an API path such as `posts/42`.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    // == Get JSON ==
    /// Fetches `path` and decodes the body as JSON.
    ///
    /// Transport failures, non-2xx statuses and undecodable bodies are errors.
    pub async fn get_json(&self, path: &str, query: &BTreeMap<String, String>) -> anyhow::Result<Value> {
        let url = self.url(path);
        let response = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;

        let status = response.status();
        if !status.is_success() {
            bail!("upstream returned {status} for GET {url}");
        }

        response
            .json::<Value>()
            .await
            .with_context(|| format!("decoding JSON from GET {url}"))
    }

    // == Forward ==
    /// Sends a write request and returns the upstream status and JSON body.
    ///
    /// Non-2xx statuses are not errors here; they are handed back to the
    /// caller. An empty or non-JSON body is returned as `Value::Null`.
    pub async fn forward(
        &self,
        method: Method,
        path: &str,
        authorization: Option<&str>,
        body: Option<Vec<u8>>,
    ) -> anyhow::Result<(StatusCode, Value)> {
        let url = self.url(path);
        let mut request = self.http.request(method.clone(), &url);
        if let Some(token) = authorization {
            request = request.header(header::AUTHORIZATION, token);
        }
        if let Some(body) = body {
            request = request
                .header(header::CONTENT_TYPE, "application/json")
                .body(body);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("{method} {url}"))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("reading body of {method} {url}"))?;
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        Ok((status, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_paths() {
        let client = UpstreamClient::new("http://127.0.0.1:3007/api/");

        assert_eq!(client.base_url(), "http://127.0.0.1:3007/api");
        assert_eq!(client.url("posts"), "http://127.0.0.1:3007/api/posts");
        assert_eq!(client.url("/posts/42"), "http://127.0.0.1:3007/api/posts/42");
    }

    #[tokio::test]
    async fn test_get_json_unreachable_upstream_is_error() {
        // Grab a free port, then release it so nothing is listening there
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = UpstreamClient::new(format!("http://{addr}"));
        let result = client.get_json("posts", &BTreeMap::new()).await;

        let err = result.unwrap_err();
        assert!(format!("{err:#}").contains(&format!("GET http://{addr}/posts")));
    }
}
