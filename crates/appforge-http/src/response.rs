//! The framework response object.
//!
//! [`HttpResponse`] is a status code, header map, and body. Helper
//! constructors cover the common cases; [`HttpResponseRedirect`] and
//! [`JsonResponse`] mirror their framework-classic namesakes.

use http::{HeaderMap, HeaderValue, StatusCode};

/// An HTTP response produced by a view.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    status: StatusCode,
    headers: HeaderMap,
    content_type: String,
    body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a response with the given status and text body.
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            content_type: "text/html; charset=utf-8".to_string(),
            body: body.into().into_bytes(),
        }
    }

    /// 200 OK.
    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, body)
    }

    /// 400 Bad Request.
    pub fn bad_request(body: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, body)
    }

    /// 401 Unauthorized.
    pub fn unauthorized(body: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, body)
    }

    /// 403 Forbidden.
    pub fn forbidden(body: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, body)
    }

    /// 404 Not Found.
    pub fn not_found(body: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, body)
    }

    /// 500 Internal Server Error.
    pub fn server_error(body: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, body)
    }

    /// 405 Method Not Allowed, with an `Allow` header.
    pub fn not_allowed(permitted_methods: &[&str]) -> Self {
        let mut response = Self::new(StatusCode::METHOD_NOT_ALLOWED, "");
        if let Ok(value) = HeaderValue::from_str(&permitted_methods.join(", ")) {
            response.headers.insert(http::header::ALLOW, value);
        }
        response
    }

    /// The response status code.
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// The response headers.
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable access to the response headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// The response content type.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Overrides the content type.
    pub fn set_content_type(&mut self, content_type: impl Into<String>) {
        self.content_type = content_type.into();
    }

    /// The raw body bytes.
    pub fn content_bytes(&self) -> &[u8] {
        &self.body
    }

    /// The body decoded as UTF-8 (lossily), for assertions and templates.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// The `Location` header for redirect responses, if present.
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(http::header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }

    /// Whether this is a 3xx redirect.
    pub fn is_redirect(&self) -> bool {
        self.status.is_redirection()
    }
}

/// Constructor for 302 redirects.
#[derive(Debug)]
pub struct HttpResponseRedirect;

impl HttpResponseRedirect {
    /// Creates a 302 Found redirect to the given URL.
    pub fn new(url: &str) -> HttpResponse {
        let mut response = HttpResponse::new(StatusCode::FOUND, "");
        if let Ok(value) = HeaderValue::from_str(url) {
            response
                .headers_mut()
                .insert(http::header::LOCATION, value);
        }
        response
    }
}

/// Constructor for JSON responses.
#[derive(Debug)]
pub struct JsonResponse;

impl JsonResponse {
    /// Serializes `data` to a 200 response with a JSON content type.
    pub fn new<T: serde::Serialize>(data: &T) -> HttpResponse {
        Self::with_status(StatusCode::OK, data)
    }

    /// Serializes `data` with an explicit status code.
    pub fn with_status<T: serde::Serialize>(status: StatusCode, data: &T) -> HttpResponse {
        let body = serde_json::to_string(data).unwrap_or_else(|_| "null".to_string());
        let mut response = HttpResponse::new(status, body);
        response.set_content_type("application/json");
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── constructor tests ───────────────────────────────────────────

    #[test]
    fn test_ok_response() {
        let response = HttpResponse::ok("hello");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.text(), "hello");
        assert!(response.content_type().starts_with("text/html"));
    }

    #[test]
    fn test_not_allowed_sets_allow_header() {
        let response = HttpResponse::not_allowed(&["GET", "POST"]);
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            response.headers().get(http::header::ALLOW).unwrap(),
            "GET, POST"
        );
    }

    #[test]
    fn test_error_statuses() {
        assert_eq!(
            HttpResponse::unauthorized("").status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(HttpResponse::forbidden("").status(), StatusCode::FORBIDDEN);
        assert_eq!(HttpResponse::not_found("").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            HttpResponse::server_error("").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    // ── redirect tests ──────────────────────────────────────────────

    #[test]
    fn test_redirect() {
        let response = HttpResponseRedirect::new("/login/");
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.location(), Some("/login/"));
        assert!(response.is_redirect());
    }

    #[test]
    fn test_ok_is_not_redirect() {
        assert!(!HttpResponse::ok("").is_redirect());
    }

    // ── json tests ──────────────────────────────────────────────────

    #[test]
    fn test_json_response() {
        let response = JsonResponse::new(&serde_json::json!({"a": 1}));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.content_type(), "application/json");
        assert_eq!(response.text(), r#"{"a":1}"#);
    }

    #[test]
    fn test_json_with_status() {
        let response =
            JsonResponse::with_status(StatusCode::BAD_REQUEST, &serde_json::json!({"e": "x"}));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
