//! HTTP response handling.
//!
//! [`Response`] is the raw transport response (status, headers, body text).
//! [`Envelope`] pairs it with the result object deserialized from the body.

use std::collections::HashMap;

/// HTTP response with status, headers, and body text.
#[derive(Debug, Clone)]
pub struct Response {
    status: u16,
    headers: HashMap<String, String>,
    body: String,
}

impl Response {
    /// Creates a new response.
    #[must_use]
    pub fn new(status: u16, headers: HashMap<String, String>, body: String) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Response headers.
    #[must_use]
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Single header value by name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// Response body text.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Consume into the body text.
    #[must_use]
    pub fn into_body(self) -> String {
        self.body
    }

    /// Status is 2xx.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Status is 4xx.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        self.status >= 400 && self.status < 500
    }

    /// Status is 5xx.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        self.status >= 500 && self.status < 600
    }
}

/// The pairing of a raw transport response with its deserialized result.
///
/// The result is `None` when the response body was empty; a body that
/// deserialized to a default value is still `Some`.
#[derive(Debug, Clone)]
pub struct Envelope<T> {
    result: Option<T>,
    response: Response,
}

impl<T> Envelope<T> {
    /// Creates an envelope from the final response and its decoded result.
    #[must_use]
    pub fn new(response: Response, result: Option<T>) -> Self {
        Self { result, response }
    }

    /// The deserialized result object, if the body was non-empty.
    #[must_use]
    pub const fn result(&self) -> Option<&T> {
        self.result.as_ref()
    }

    /// The raw transport response.
    #[must_use]
    pub const fn response(&self) -> &Response {
        &self.response
    }

    /// Consume into the result object.
    #[must_use]
    pub fn into_result(self) -> Option<T> {
        self.result
    }

    /// Consume into (result, response).
    #[must_use]
    pub fn into_parts(self) -> (Option<T>, Response) {
        (self.result, self.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_basic() {
        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());

        let response = Response::new(200, headers, r#"{"id":1}"#.to_string());

        assert_eq!(response.status(), 200);
        assert_eq!(response.header("Content-Type"), Some("application/json"));
        assert_eq!(response.body(), r#"{"id":1}"#);
        assert!(response.is_success());
        assert!(!response.is_client_error());
        assert!(!response.is_server_error());
    }

    #[test]
    fn response_status_checks() {
        let response = Response::new(404, HashMap::new(), String::new());
        assert!(response.is_client_error());

        let response = Response::new(502, HashMap::new(), String::new());
        assert!(response.is_server_error());
    }

    #[test]
    fn envelope_distinguishes_absent_result() {
        let response = Response::new(204, HashMap::new(), String::new());
        let envelope: Envelope<u64> = Envelope::new(response, None);
        assert!(envelope.result().is_none());
        assert_eq!(envelope.response().status(), 204);

        let response = Response::new(200, HashMap::new(), "0".to_string());
        let envelope = Envelope::new(response, Some(0_u64));
        assert_eq!(envelope.result(), Some(&0));
        assert_eq!(envelope.into_result(), Some(0));
    }
}
