//! The framework request object.
//!
//! [`HttpRequest`] carries the method, path, parsed GET/POST query dicts, the
//! raw body, and a META map of server variables. Session state travels through
//! META as JSON (`SESSION_DATA`), which is how the session middleware hands
//! data to views without coupling them to a session store.

use std::collections::HashMap;

use http::Method;

use crate::querydict::QueryDict;

/// An HTTP request as seen by view functions.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    method: Method,
    path: String,
    query_string: String,
    content_type: Option<String>,
    scheme: String,
    body: Vec<u8>,
    meta: HashMap<String, String>,
    get: QueryDict,
    post: QueryDict,
}

impl HttpRequest {
    /// Returns a builder for constructing requests (primarily in tests and
    /// server glue).
    pub fn builder() -> HttpRequestBuilder {
        HttpRequestBuilder::new()
    }

    /// The request method.
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// The request path, without the query string.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The raw query string.
    pub fn query_string(&self) -> &str {
        &self.query_string
    }

    /// The `Content-Type`, if one was provided.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Parsed query-string parameters.
    pub const fn get(&self) -> &QueryDict {
        &self.get
    }

    /// Parsed form body parameters (urlencoded POST bodies only).
    pub const fn post(&self) -> &QueryDict {
        &self.post
    }

    /// The raw request body.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Server variables and middleware-provided state.
    pub const fn meta(&self) -> &HashMap<String, String> {
        &self.meta
    }

    /// Mutable access to META, used by session and flash plumbing.
    pub fn meta_mut(&mut self) -> &mut HashMap<String, String> {
        &mut self.meta
    }

    /// The identity set by a trusted reverse proxy, if any.
    pub fn remote_user(&self) -> Option<&str> {
        self.meta.get("REMOTE_USER").map(String::as_str)
    }

    /// The `Host` header as forwarded by the server.
    pub fn get_host(&self) -> &str {
        self.meta.get("HTTP_HOST").map_or("", String::as_str)
    }

    /// Whether the request arrived over HTTPS.
    pub fn is_secure(&self) -> bool {
        self.scheme == "https"
    }

    /// The URL scheme ("http" or "https").
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// The path plus query string, suitable for redirects back to this page.
    pub fn get_full_path(&self) -> String {
        if self.query_string.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, self.query_string)
        }
    }
}

/// Builder for [`HttpRequest`].
#[derive(Debug, Default)]
pub struct HttpRequestBuilder {
    method: Option<Method>,
    path: String,
    query_string: String,
    content_type: Option<String>,
    scheme: Option<String>,
    body: Vec<u8>,
    meta: HashMap<String, String>,
}

impl HttpRequestBuilder {
    fn new() -> Self {
        Self {
            path: "/".to_string(),
            ..Self::default()
        }
    }

    /// Sets the request method (defaults to GET).
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Sets the request path.
    #[must_use]
    pub fn path(mut self, path: &str) -> Self {
        self.path = path.to_string();
        self
    }

    /// Sets the raw query string.
    #[must_use]
    pub fn query_string(mut self, qs: &str) -> Self {
        self.query_string = qs.to_string();
        self
    }

    /// Sets the `Content-Type`.
    #[must_use]
    pub fn content_type(mut self, ct: &str) -> Self {
        self.content_type = Some(ct.to_string());
        self
    }

    /// Sets the URL scheme (defaults to "http").
    #[must_use]
    pub fn scheme(mut self, scheme: &str) -> Self {
        self.scheme = Some(scheme.to_string());
        self
    }

    /// Sets the raw body.
    #[must_use]
    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Sets a urlencoded form body and the matching `Content-Type`.
    #[must_use]
    pub fn form_body(self, body: &str) -> Self {
        self.content_type("application/x-www-form-urlencoded")
            .body(body.as_bytes().to_vec())
    }

    /// Inserts a META entry.
    #[must_use]
    pub fn meta(mut self, key: &str, value: &str) -> Self {
        self.meta.insert(key.to_string(), value.to_string());
        self
    }

    /// Builds the request, parsing GET and POST query dicts.
    pub fn build(self) -> HttpRequest {
        let get = QueryDict::parse(&self.query_string);
        let is_form = self
            .content_type
            .as_deref()
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));
        let post = if is_form {
            QueryDict::parse(&String::from_utf8_lossy(&self.body))
        } else {
            QueryDict::new()
        };

        HttpRequest {
            method: self.method.unwrap_or(Method::GET),
            path: self.path,
            query_string: self.query_string,
            content_type: self.content_type,
            scheme: self.scheme.unwrap_or_else(|| "http".to_string()),
            body: self.body,
            meta: self.meta,
            get,
            post,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── builder tests ───────────────────────────────────────────────

    #[test]
    fn test_builder_defaults() {
        let request = HttpRequest::builder().build();
        assert_eq!(*request.method(), Method::GET);
        assert_eq!(request.path(), "/");
        assert_eq!(request.scheme(), "http");
        assert!(!request.is_secure());
        assert!(request.get().is_empty());
        assert!(request.post().is_empty());
    }

    #[test]
    fn test_builder_query_string_parsed() {
        let request = HttpRequest::builder()
            .path("/login/")
            .query_string("next=%2Fusers%2F")
            .build();
        assert_eq!(request.get().get("next"), Some("/users/"));
    }

    #[test]
    fn test_builder_form_body_parsed() {
        let request = HttpRequest::builder()
            .method(Method::POST)
            .form_body("username=alice&password=pw")
            .build();
        assert_eq!(request.post().get("username"), Some("alice"));
        assert_eq!(request.post().get("password"), Some("pw"));
    }

    #[test]
    fn test_non_form_body_not_parsed() {
        let request = HttpRequest::builder()
            .method(Method::POST)
            .content_type("application/json")
            .body(b"{\"a\":1}".to_vec())
            .build();
        assert!(request.post().is_empty());
        assert_eq!(request.body(), b"{\"a\":1}");
    }

    // ── accessors tests ─────────────────────────────────────────────

    #[test]
    fn test_remote_user() {
        let request = HttpRequest::builder()
            .meta("REMOTE_USER", "proxyuser")
            .build();
        assert_eq!(request.remote_user(), Some("proxyuser"));
    }

    #[test]
    fn test_remote_user_absent() {
        let request = HttpRequest::builder().build();
        assert!(request.remote_user().is_none());
    }

    #[test]
    fn test_get_host() {
        let request = HttpRequest::builder()
            .meta("HTTP_HOST", "example.com")
            .build();
        assert_eq!(request.get_host(), "example.com");
    }

    #[test]
    fn test_full_path_with_query() {
        let request = HttpRequest::builder()
            .path("/resetpassword/")
            .query_string("pk=7")
            .build();
        assert_eq!(request.get_full_path(), "/resetpassword/?pk=7");
    }

    #[test]
    fn test_is_secure_https() {
        let request = HttpRequest::builder().scheme("https").build();
        assert!(request.is_secure());
    }

    #[test]
    fn test_meta_mut() {
        let mut request = HttpRequest::builder().build();
        request
            .meta_mut()
            .insert("SESSION_DATA".to_string(), "{}".to_string());
        assert_eq!(request.meta().get("SESSION_DATA").unwrap(), "{}");
    }
}
