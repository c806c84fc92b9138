use crate::state::State;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

#[derive(Eq, Hash, PartialEq, Copy, Clone, Debug)]
pub enum Method {
    GET,
    POST,
    PUT,
    PATCH,
    DELETE,
    HEAD,
    OPTIONS,
    CONNECT,
    TRACE,
}

impl Method {
    /// Parses a request-line method token. Tokens are case-sensitive per RFC 9110.
    pub fn from_string(s: &str) -> Option<Method> {
        match s {
            "GET" => Some(Method::GET),
            "POST" => Some(Method::POST),
            "PUT" => Some(Method::PUT),
            "PATCH" => Some(Method::PATCH),
            "DELETE" => Some(Method::DELETE),
            "HEAD" => Some(Method::HEAD),
            "OPTIONS" => Some(Method::OPTIONS),
            "CONNECT" => Some(Method::CONNECT),
            "TRACE" => Some(Method::TRACE),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::PATCH => "PATCH",
            Method::DELETE => "DELETE",
            Method::HEAD => "HEAD",
            Method::OPTIONS => "OPTIONS",
            Method::CONNECT => "CONNECT",
            Method::TRACE => "TRACE",
        }
    }

    /// Methods whose body the JSON body parser looks at.
    pub fn carries_body(&self) -> bool {
        matches!(self, Method::POST | Method::PUT | Method::PATCH)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An incoming request as seen by middleware and handlers.
///
/// `path` is the pathname only; the query string is decoded into `query`.
/// `params` stays empty unless a parameterized route matched, and `body`
/// is `{}` until a body-parsing middleware replaces it.
#[derive(Debug)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub query: HashMap<String, String>,
    pub params: HashMap<String, String>,
    pub headers: HashMap<String, String>,
    pub raw_body: Vec<u8>,
    pub body: Value,
    pub state: State,
}

impl Request {
    /// Builds a request from a method and a request target such as `/viewers?isPrime=true`.
    pub fn new(method: Method, target: &str) -> Request {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, Self::parse_query(query)),
            None => (target, HashMap::new()),
        };
        Request {
            method,
            path: path.to_string(),
            query,
            params: HashMap::new(),
            headers: HashMap::new(),
            raw_body: Vec::new(),
            body: Value::Object(Map::new()),
            state: State::default(),
        }
    }

    pub fn with_header<K: AsRef<str>, V: Into<String>>(mut self, name: K, value: V) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_body<B: Into<Vec<u8>>>(mut self, body: B) -> Self {
        self.raw_body = body.into();
        self
    }

    pub fn with_state(mut self, state: State) -> Self {
        self.state = state;
        self
    }

    pub fn get_header(&self, key: &str) -> Option<&str> {
        self.headers
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.get_header("content-type")
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    fn parse_query(query: &str) -> HashMap<String, String> {
        query
            .split('&')
            .filter(|s| !s.is_empty())
            .map(|pair| match pair.split_once('=') {
                Some((key, value)) => (Self::decode(key), Self::decode(value)),
                None => (Self::decode(pair), String::new()),
            })
            .collect()
    }

    fn decode(component: &str) -> String {
        let spaced = component.replace('+', " ");
        match urlencoding::decode(&spaced) {
            Ok(decoded) => decoded.into_owned(),
            Err(_) => spaced,
        }
    }
}
