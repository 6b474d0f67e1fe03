//! In-process request helpers for tests. Requests go straight through the
//! router with `oneshot`; no socket is opened.

use std::collections::BTreeMap;

use axum::Router;
use axum::body::{self, Body, Bytes};
use axum::http::{Method, Request, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, value::to_value};
use tower::ServiceExt;

use crate::Site;

pub struct TestClient {
    app: Router,
    site: Site,
}

impl TestClient {
    pub fn new(site: Site) -> Self {
        let app = site.router();
        Self { app, site }
    }

    /// Client over a fresh in-memory site.
    pub async fn memory() -> Self {
        let site = Site::memory().await.expect("Failed to build in-memory site");
        Self::new(site)
    }

    pub fn site(&self) -> &Site {
        &self.site
    }

    pub fn request(&self, method: Method, path: &str) -> TestRequestBuilder {
        TestRequestBuilder::new(self.app.clone(), method, path)
    }

    pub fn get(&self, path: &str) -> TestRequestBuilder {
        self.request(Method::GET, path)
    }
    pub fn post(&self, path: &str) -> TestRequestBuilder {
        self.request(Method::POST, path)
    }
    pub fn put(&self, path: &str) -> TestRequestBuilder {
        self.request(Method::PUT, path)
    }
    pub fn delete(&self, path: &str) -> TestRequestBuilder {
        self.request(Method::DELETE, path)
    }

    pub fn build_query<T: Serialize>(params: &[(&str, T)]) -> String {
        let mut map = BTreeMap::new();
        for (k, v) in params {
            let value: Value = to_value(v).expect("Failed to serialize param");
            let s = match value {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => value.to_string(),
            };
            map.insert(*k, s);
        }
        serde_urlencoded::to_string(&map).expect("Failed to encode query")
    }
}

pub struct TestRequestBuilder {
    app: Router,
    method: Method,
    path: String,
    headers: Vec<(String, String)>,
    body: Option<Body>,
}

impl TestRequestBuilder {
    pub fn new(app: Router, method: Method, path: &str) -> Self {
        Self {
            app,
            method,
            path: path.to_string(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.headers.push((key.to_string(), value.to_string()));
        self
    }

    pub fn json<T: Serialize>(mut self, value: &T) -> Self {
        let json = serde_json::to_vec(value).expect("Failed to serialize JSON");
        self.body = Some(Body::from(json));
        self.headers
            .push(("content-type".to_string(), "application/json".to_string()));
        self
    }

    pub fn query<T: Serialize>(mut self, params: &[(&str, T)]) -> Self {
        let query = TestClient::build_query(params);
        let sep = if self.path.contains('?') { '&' } else { '?' };
        self.path = format!("{}{}{}", self.path, sep, query);
        self
    }

    pub async fn send(self) -> TestResponse {
        let mut req = Request::builder().method(self.method).uri(self.path);
        for (k, v) in self.headers {
            req = req.header(&k, &v);
        }
        let req = req
            .body(self.body.unwrap_or_else(Body::empty))
            .expect("Failed to build request");
        let resp = self.app.oneshot(req).await.expect("Router is infallible");
        TestResponse { resp }
    }
}

#[derive(Debug)]
pub struct TestResponse {
    resp: Response<Body>,
}

impl TestResponse {
    pub fn status(&self) -> StatusCode {
        self.resp.status()
    }

    pub fn header(&self, name: &str) -> Option<String> {
        self.resp
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    pub async fn bytes(self) -> Bytes {
        body::to_bytes(self.resp.into_body(), usize::MAX)
            .await
            .expect("Failed to read body")
    }

    pub async fn text(self) -> String {
        String::from_utf8(self.bytes().await.to_vec()).expect("Response was not valid UTF-8")
    }

    pub async fn json<T: DeserializeOwned>(self) -> T {
        serde_json::from_slice(&self.bytes().await).expect("Response was not valid JSON")
    }

    /// Asserts the status and returns the `data` member of the envelope.
    pub async fn data(self, expected: StatusCode) -> Value {
        assert_eq!(self.status(), expected);
        let mut body: Value = self.json().await;
        assert_eq!(body["success"], true, "unexpected envelope: {body}");
        body["data"].take()
    }

    /// Asserts the status and returns the `error` message.
    pub async fn error(self, expected: StatusCode) -> String {
        assert_eq!(self.status(), expected);
        let body: Value = self.json().await;
        assert_eq!(body["success"], false, "unexpected envelope: {body}");
        body["error"].as_str().unwrap_or_default().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_sorted_query_strings() {
        let q = TestClient::build_query(&[("search", "acme inc"), ("page", "2")]);
        assert_eq!(q, "page=2&search=acme+inc");
    }

    #[tokio::test]
    async fn unknown_route_is_json_404() {
        let client = TestClient::memory().await;
        let msg = client.get("/api/nothing").send().await.error(StatusCode::NOT_FOUND).await;
        assert_eq!(msg, "Route not found");
    }
}
