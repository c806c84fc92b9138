//! # streamhub
//!
//! A small express-style web framework and the streamer/viewer CRUD API
//! built on it.
//!
//! ## Features
//!
//! - Routing with `:name` path parameters, literal routes taking priority
//! - Ordered middleware with an explicit continuation
//! - Error handler pipeline with a JSON 500 fallback
//! - Flat-file JSON collections with serialized writes
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use streamhub::api::{self, Stores};
//! use streamhub::server::Server;
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let dispatcher = api::application(Stores::open("data")).build();
//!     Server::bind("127.0.0.1:3000", dispatcher).await?.serve().await
//! }
//! ```
//!
//! ## Middleware Usage
//!
//! ```rust
//! use streamhub::app::Application;
//! use streamhub::middleware::{JsonBodyParser, RequestLogger};
//!
//! let mut app = Application::new();
//! app.middleware(RequestLogger).middleware(JsonBodyParser);
//! ```

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod logging;
pub mod middleware;
pub mod router;
pub mod server;
pub mod state;
pub mod store;
pub extern crate serde_json;

// Reexport serde_json
pub use serde_json::{json, Value};

pub use app::{Application, Dispatcher};
pub use error::{ServerError, ServerResult};
pub use handler::HandlerFuture;
pub use http::{Method, Request, Response};
pub use middleware::Next;
pub use server::Server;
