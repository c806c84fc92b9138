use crate::error::ServerResult;
use serde::Serialize;
use serde_json::Value;

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_TEXT: &str = "text/plain";

/// What `Response::send` accepts: structured data goes out as JSON,
/// everything else as its textual form.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Text(String),
    Json(Value),
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Payload::Text(s.to_string())
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Payload::Text(s)
    }
}

impl From<Value> for Payload {
    fn from(v: Value) -> Self {
        Payload::Json(v)
    }
}

macro_rules! text_payload {
    ($($t:ty),*) => {
        $(impl From<$t> for Payload {
            fn from(v: $t) -> Self {
                Payload::Text(v.to_string())
            }
        })*
    };
}

text_payload!(bool, i32, i64, u32, u64, usize, f64);

/// Mutable outgoing response.
///
/// Every write goes through `status`, `header`, `send`, `json` or `end`,
/// and all of them are no-ops once the response is finalized.
#[derive(Debug)]
pub struct Response {
    status: u16,
    headers: Vec<(String, String)>,
    body: String,
    finalized: bool,
}

impl Default for Response {
    fn default() -> Self {
        Response::new()
    }
}

impl Response {
    pub fn new() -> Response {
        Response {
            status: 200,
            headers: Vec::new(),
            body: String::new(),
            finalized: false,
        }
    }

    // Chainable status setter
    pub fn status(&mut self, status: u16) -> &mut Self {
        if !self.finalized {
            self.status = status;
        }
        self
    }

    pub fn header<K: AsRef<str>, V: AsRef<str>>(&mut self, name: K, value: V) -> &mut Self {
        if self.finalized {
            return self;
        }
        let name = name.as_ref();
        match self
            .headers
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
        {
            Some(entry) => entry.1 = value.as_ref().to_string(),
            None => self
                .headers
                .push((name.to_string(), value.as_ref().to_string())),
        }
        self
    }

    pub fn send<P: Into<Payload>>(&mut self, data: P) -> &mut Self {
        if self.finalized {
            return self;
        }
        match data.into() {
            Payload::Json(value) => {
                self.header("Content-Type", CONTENT_TYPE_JSON);
                self.finish(value.to_string());
            }
            Payload::Text(text) => {
                self.header("Content-Type", CONTENT_TYPE_TEXT);
                self.finish(text);
            }
        }
        self
    }

    pub fn json<T: Serialize + ?Sized>(&mut self, value: &T) -> ServerResult<&mut Self> {
        if self.finalized {
            return Ok(self);
        }
        let body = serde_json::to_string(value)?;
        self.header("Content-Type", CONTENT_TYPE_JSON);
        self.finish(body);
        Ok(self)
    }

    /// Finalizes with an empty body.
    pub fn end(&mut self) -> &mut Self {
        if !self.finalized {
            self.finish(String::new());
        }
        self
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn status_code(&self) -> u16 {
        self.status
    }

    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Parses the body back into JSON; handy for callers that inspect a dispatched response.
    pub fn body_json(&self) -> ServerResult<Value> {
        Ok(serde_json::from_str(&self.body)?)
    }

    fn finish(&mut self, body: String) {
        self.body = body;
        self.finalized = true;
    }
}

pub fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        413 => "Payload Too Large",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        503 => "Service Unavailable",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn send_text_sets_plain_content_type() {
        let mut res = Response::new();
        res.status(202).send("accepted");
        assert!(res.is_finalized());
        assert_eq!(res.status_code(), 202);
        assert_eq!(res.body(), "accepted");
        assert_eq!(res.get_header("content-type"), Some(CONTENT_TYPE_TEXT));
    }

    #[test]
    fn send_structured_value_goes_out_as_json() {
        let mut res = Response::new();
        res.send(json!({ "ok": true }));
        assert_eq!(res.get_header("Content-Type"), Some(CONTENT_TYPE_JSON));
        assert_eq!(res.body_json().unwrap(), json!({ "ok": true }));
    }

    #[test]
    fn numbers_are_sent_as_text() {
        let mut res = Response::new();
        res.send(42);
        assert_eq!(res.body(), "42");
        assert_eq!(res.get_header("content-type"), Some(CONTENT_TYPE_TEXT));
    }

    #[test]
    fn finalized_response_ignores_further_writes() {
        let mut res = Response::new();
        res.status(404).json(&json!({ "error": "nope" })).unwrap();

        res.status(200).send("overwritten");
        res.json(&json!({ "error": "second" })).unwrap();
        res.header("X-Late", "1");
        res.end();

        assert_eq!(res.status_code(), 404);
        assert_eq!(res.body_json().unwrap(), json!({ "error": "nope" }));
        assert_eq!(res.get_header("x-late"), None);
    }

    #[test]
    fn header_replaces_case_insensitively() {
        let mut res = Response::new();
        res.header("content-type", "text/html")
            .header("Content-Type", "text/csv");
        assert_eq!(res.headers().len(), 1);
        assert_eq!(res.get_header("CONTENT-TYPE"), Some("text/csv"));
    }

    #[test]
    fn end_finalizes_with_empty_body() {
        let mut res = Response::new();
        res.status(204).end();
        assert!(res.is_finalized());
        assert_eq!(res.body(), "");
    }
}
