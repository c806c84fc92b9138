//! Shared utilities for the integration tests.

use std::path::{Path, PathBuf};
use streamhub::api::{self, Stores};
use streamhub::app::Dispatcher;
use streamhub::http::{Method, Response};
use streamhub::Value;

/// A fresh data directory, removed on drop.
pub struct TempDir(PathBuf);

impl TempDir {
    pub fn new() -> Self {
        Self(std::env::temp_dir().join(format!("streamhub-test-{}", uuid::Uuid::new_v4())))
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

/// The full API over its own data directory.
pub fn dispatcher(dir: &TempDir) -> Dispatcher {
    api::application(Stores::open(dir.path())).build()
}

/// Drives the dispatcher directly, without a socket.
#[allow(dead_code)]
pub struct TestApp {
    pub dispatcher: Dispatcher,
    dir: TempDir,
}

#[allow(dead_code)]
impl TestApp {
    pub fn new() -> Self {
        let dir = TempDir::new();
        Self {
            dispatcher: dispatcher(&dir),
            dir,
        }
    }

    pub fn data_dir(&self) -> &Path {
        self.dir.path()
    }

    /// Sends a request without a body.
    pub async fn call(&self, method: Method, target: &str) -> Response {
        let mut req = self.dispatcher.request(method, target);
        let mut res = Response::new();
        self.dispatcher.dispatch(&mut req, &mut res).await;
        res
    }

    /// Sends `body` as `application/json`.
    pub async fn send_json(&self, method: Method, target: &str, body: &Value) -> Response {
        self.send_raw(method, target, body.to_string()).await
    }

    /// Sends raw bytes labelled as JSON, valid or not.
    pub async fn send_raw(&self, method: Method, target: &str, body: impl Into<Vec<u8>>) -> Response {
        let mut req = self
            .dispatcher
            .request(method, target)
            .with_header("Content-Type", "application/json")
            .with_body(body);
        let mut res = Response::new();
        self.dispatcher.dispatch(&mut req, &mut res).await;
        res
    }
}

#[allow(dead_code)]
pub fn json_body(res: &Response) -> Value {
    res.body_json().unwrap()
}
