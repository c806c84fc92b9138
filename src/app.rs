//! Application is the entry point for assembling a service.
//!
//! Routes, middleware, error handlers and shared state are registered on an
//! [`Application`] during startup. [`Application::build`] freezes them into a
//! [`Dispatcher`], which is shared read-only between connections.
//!
//! # Examples
//!
//! ```rust
//! use streamhub::app::Application;
//! use streamhub::middleware::RequestLogger;
//!
//! let mut app = Application::new();
//! app.middleware(RequestLogger);
//! app.get("/", |_req, res| Box::pin(async move {
//!     res.send(streamhub::json!({ "message": "Hello!" }));
//!     Ok(())
//! }));
//! let dispatcher = app.build();
//! ```

use crate::error::{ServerError, ServerResult};
use crate::handler::{ErrorHandler, Handler, HandlerFuture};
use crate::http::{Method, Request, Response};
use crate::middleware::{ChainOutcome, Middleware, MiddlewareChain, Next};
use crate::router::Router;
use crate::state::State;
use futures::FutureExt;
use serde_json::json;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Instant;
use tracing::{debug, error, info, warn};

pub struct Application {
    router: Router,
    middlewares: MiddlewareChain,
    error_handlers: Vec<Box<dyn ErrorHandler>>,
    state: State,
}

impl Default for Application {
    fn default() -> Self {
        Self::new()
    }
}

impl Application {
    pub fn new() -> Self {
        Self {
            router: Router::new(),
            middlewares: MiddlewareChain::new(),
            error_handlers: Vec::new(),
            state: State::new(),
        }
    }

    /// Makes `value` reachable from every request through `req.state.get::<T>()`.
    pub fn state<T>(&mut self, value: T) -> &mut Self
    where
        T: Send + Sync + 'static,
    {
        if !self.state.insert(value) {
            warn!(
                kind = std::any::type_name::<T>(),
                "state is already shared, value ignored"
            );
        }
        self
    }

    /// Registers a GET route handler
    pub fn get<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut Request, &'a mut Response) -> HandlerFuture<'a> + Send + Sync + 'static,
    {
        self.router.get(path, handler);
        self
    }

    /// Registers a POST route handler
    pub fn post<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut Request, &'a mut Response) -> HandlerFuture<'a> + Send + Sync + 'static,
    {
        self.router.post(path, handler);
        self
    }

    /// Registers a PUT route handler
    pub fn put<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut Request, &'a mut Response) -> HandlerFuture<'a> + Send + Sync + 'static,
    {
        self.router.put(path, handler);
        self
    }

    /// Registers a PATCH route handler
    pub fn patch<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut Request, &'a mut Response) -> HandlerFuture<'a> + Send + Sync + 'static,
    {
        self.router.patch(path, handler);
        self
    }

    /// Registers a DELETE route handler
    pub fn delete<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut Request, &'a mut Response) -> HandlerFuture<'a> + Send + Sync + 'static,
    {
        self.router.delete(path, handler);
        self
    }

    /// Appends a middleware; middleware runs in registration order.
    pub fn middleware(&mut self, middleware: impl Middleware) -> &mut Self {
        self.middlewares.add(middleware);
        self
    }

    /// Appends a closure middleware.
    pub fn middleware_fn<F>(&mut self, middleware: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut Request, &'a mut Response, Next<'a>) -> HandlerFuture<'a>
            + Send
            + Sync
            + 'static,
    {
        self.middlewares.add(middleware);
        self
    }

    /// Appends an error handler. Error handlers run in registration order
    /// until one of them finalizes the response.
    pub fn on_error<F>(&mut self, handler: F) -> &mut Self
    where
        F: for<'a> Fn(&'a ServerError, &'a mut Request, &'a mut Response) -> HandlerFuture<'a>
            + Send
            + Sync
            + 'static,
    {
        self.error_handlers.push(Box::new(handler));
        self
    }

    pub fn build(self) -> Dispatcher {
        Dispatcher {
            router: self.router,
            middlewares: self.middlewares,
            error_handlers: self.error_handlers,
            state: self.state,
        }
    }
}

/// Immutable request pipeline: route table, middleware chain, error handlers.
pub struct Dispatcher {
    router: Router,
    middlewares: MiddlewareChain,
    error_handlers: Vec<Box<dyn ErrorHandler>>,
    state: State,
}

impl Dispatcher {
    /// A request bound to this dispatcher's shared state.
    pub fn request(&self, method: Method, target: &str) -> Request {
        Request::new(method, target).with_state(self.state.clone())
    }

    /// Runs one request through the pipeline. Never fails: every error and
    /// panic is turned into a response by the error pipeline, and a request
    /// nothing answered ends as a 500.
    pub async fn dispatch(&self, req: &mut Request, res: &mut Response) {
        let started = Instant::now();

        let result = match AssertUnwindSafe(self.run(req, res)).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(ServerError::Panic(panic_message(panic))),
        };
        if let Err(err) = result {
            self.handle_error(err, req, res).await;
        }
        if !res.is_finalized() {
            warn!(method = %req.method, path = %req.path, "no response was produced");
            res.status(500)
                .send(json!({ "error": "request was not handled" }));
        }

        info!(
            method = %req.method,
            path = %req.path,
            status = res.status_code(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request completed"
        );
    }

    async fn run(&self, req: &mut Request, res: &mut Response) -> ServerResult<()> {
        let route = self.router.resolve(req.method, &req.path);
        let handler = route.map(|found| {
            req.params = found.params;
            found.handler
        });

        match self.middlewares.run(req, res).await? {
            ChainOutcome::Completed => {}
            ChainOutcome::Finalized => return Ok(()),
            ChainOutcome::Halted => {
                debug!(path = %req.path, "middleware chain halted before the handler");
                return Ok(());
            }
        }

        match handler {
            Some(handler) => handler.call(req, res).await,
            None => {
                res.status(404).json(&json!({ "error": "route not found" }))?;
                Ok(())
            }
        }
    }

    async fn handle_error(&self, err: ServerError, req: &mut Request, res: &mut Response) {
        error!(
            error = %err,
            method = %req.method,
            path = %req.path,
            "request failed"
        );

        for handler in &self.error_handlers {
            let outcome = AssertUnwindSafe(async { handler.call(&err, &mut *req, &mut *res).await })
                .catch_unwind()
                .await;
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(handler_err)) => warn!(error = %handler_err, "error handler failed"),
                Err(panic) => warn!(panic = %panic_message(panic), "error handler panicked"),
            }
            if res.is_finalized() {
                return;
            }
        }

        res.status(500).send(json!({
            "error": "internal server error",
            "message": err.message(),
        }));
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "Unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn echo_id<'a>(req: &'a mut Request, res: &'a mut Response) -> HandlerFuture<'a> {
        let id = req.param("id").unwrap_or_default().to_string();
        res.send(json!({ "id": id }));
        Box::pin(async { Ok(()) })
    }

    fn fails<'a>(_req: &'a mut Request, _res: &'a mut Response) -> HandlerFuture<'a> {
        Box::pin(async { Err(ServerError::Internal("database exploded".to_string())) })
    }

    fn panics<'a>(_req: &'a mut Request, _res: &'a mut Response) -> HandlerFuture<'a> {
        panic!("handler blew up")
    }

    fn gatekeeper<'a>(req: &'a mut Request, res: &'a mut Response, next: Next<'a>) -> HandlerFuture<'a> {
        if req.get_header("x-block").is_some() {
            res.status(401).send(json!({ "error": "blocked" }));
            return Box::pin(async { Ok(()) });
        }
        next.run(req, res)
    }

    fn silent<'a>(req: &'a mut Request, res: &'a mut Response, next: Next<'a>) -> HandlerFuture<'a> {
        if req.get_header("x-silent").is_some() {
            return Box::pin(async { Ok(()) });
        }
        next.run(req, res)
    }

    fn not_found_mapper<'a>(
        err: &'a ServerError,
        _req: &'a mut Request,
        res: &'a mut Response,
    ) -> HandlerFuture<'a> {
        if let ServerError::NotFound = err {
            res.status(404).send(json!({ "error": "missing" }));
        }
        Box::pin(async { Ok(()) })
    }

    fn quiet<'a>(_req: &'a mut Request, _res: &'a mut Response) -> HandlerFuture<'a> {
        Box::pin(async { Ok(()) })
    }

    fn missing<'a>(_req: &'a mut Request, _res: &'a mut Response) -> HandlerFuture<'a> {
        Box::pin(async { Err(ServerError::NotFound) })
    }

    async fn send(dispatcher: &Dispatcher, req: Request) -> Response {
        let mut req = req;
        let mut res = Response::new();
        dispatcher.dispatch(&mut req, &mut res).await;
        res
    }

    #[tokio::test]
    async fn routes_with_params() {
        let mut app = Application::new();
        app.get("/streamers/:id", echo_id);
        let dispatcher = app.build();

        let res = send(&dispatcher, dispatcher.request(Method::GET, "/streamers/17?x=1")).await;
        assert_eq!(res.status_code(), 200);
        assert_eq!(res.body_json().unwrap(), json!({ "id": "17" }));
    }

    #[tokio::test]
    async fn unmatched_route_is_404_and_runs_no_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut app = Application::new();
        app.get("/streamers", move |_req, res| {
            counter.fetch_add(1, Ordering::SeqCst);
            res.send("listed");
            Box::pin(async { Ok(()) })
        });
        let dispatcher = app.build();

        let res = send(&dispatcher, dispatcher.request(Method::GET, "/viewers")).await;
        assert_eq!(res.status_code(), 404);
        assert_eq!(res.body_json().unwrap(), json!({ "error": "route not found" }));

        let res = send(&dispatcher, dispatcher.request(Method::DELETE, "/streamers")).await;
        assert_eq!(res.status_code(), 404);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn middleware_can_short_circuit() {
        let mut app = Application::new();
        app.middleware_fn(gatekeeper).get("/streamers/:id", echo_id);
        let dispatcher = app.build();

        let req = dispatcher
            .request(Method::GET, "/streamers/1")
            .with_header("X-Block", "yes");
        let res = send(&dispatcher, req).await;
        assert_eq!(res.status_code(), 401);

        let res = send(&dispatcher, dispatcher.request(Method::GET, "/streamers/1")).await;
        assert_eq!(res.status_code(), 200);
    }

    #[tokio::test]
    async fn halted_chain_skips_handler_and_answers_500() {
        let mut app = Application::new();
        app.middleware_fn(silent).get("/streamers/:id", echo_id);
        let dispatcher = app.build();

        let req = dispatcher
            .request(Method::GET, "/streamers/1")
            .with_header("x-silent", "1");
        let res = send(&dispatcher, req).await;
        assert_eq!(res.status_code(), 500);
        assert_eq!(
            res.body_json().unwrap(),
            json!({ "error": "request was not handled" })
        );
    }

    #[tokio::test]
    async fn handler_that_writes_nothing_is_a_500() {
        let mut app = Application::new();
        app.get("/quiet", quiet);
        let dispatcher = app.build();

        let res = send(&dispatcher, dispatcher.request(Method::GET, "/quiet")).await;
        assert_eq!(res.status_code(), 500);
    }

    #[tokio::test]
    async fn params_are_visible_to_middleware() {
        let seen = Arc::new(std::sync::Mutex::new(None));
        let captured = Arc::clone(&seen);
        let mut app = Application::new();
        app.middleware_fn(move |req, res, next| {
            *captured.lock().unwrap() = req.param("id").map(str::to_string);
            next.run(req, res)
        });
        app.get("/viewers/:id", echo_id);
        let dispatcher = app.build();

        send(&dispatcher, dispatcher.request(Method::GET, "/viewers/105")).await;
        assert_eq!(seen.lock().unwrap().as_deref(), Some("105"));
    }

    #[tokio::test]
    async fn unhandled_error_falls_back_to_500() {
        let mut app = Application::new();
        app.get("/boom", fails);
        let dispatcher = app.build();

        let res = send(&dispatcher, dispatcher.request(Method::GET, "/boom")).await;
        assert_eq!(res.status_code(), 500);
        assert_eq!(
            res.body_json().unwrap(),
            json!({
                "error": "internal server error",
                "message": "database exploded",
            })
        );
    }

    #[tokio::test]
    async fn panics_are_caught() {
        let mut app = Application::new();
        app.get("/panic", panics);
        let dispatcher = app.build();

        let res = send(&dispatcher, dispatcher.request(Method::GET, "/panic")).await;
        assert_eq!(res.status_code(), 500);
        assert_eq!(res.body_json().unwrap()["message"], "handler blew up");
    }

    #[tokio::test]
    async fn error_handlers_run_in_order_until_finalized() {
        let calls = Arc::new(AtomicUsize::new(0));
        let first = Arc::clone(&calls);
        let mut app = Application::new();
        app.on_error(move |_err, _req, _res| {
            first.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Ok(()) })
        });
        app.on_error(not_found_mapper);
        app.get("/missing", missing).get("/boom", fails);
        let dispatcher = app.build();

        let res = send(&dispatcher, dispatcher.request(Method::GET, "/missing")).await;
        assert_eq!(res.status_code(), 404);
        assert_eq!(res.body_json().unwrap(), json!({ "error": "missing" }));

        // the mapper ignores other errors, so the fallback answers
        let res = send(&dispatcher, dispatcher.request(Method::GET, "/boom")).await;
        assert_eq!(res.status_code(), 500);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn state_reaches_handlers() {
        struct Banner(&'static str);

        let mut app = Application::new();
        app.state(Banner("hello"));
        app.get("/", |req, res| {
            let banner = req.state.get::<Banner>().map_or("none", |b| b.0);
            res.send(banner);
            Box::pin(async { Ok(()) })
        });
        let dispatcher = app.build();

        let res = send(&dispatcher, dispatcher.request(Method::GET, "/")).await;
        assert_eq!(res.body(), "hello");
    }
}
