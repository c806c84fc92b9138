use crate::error::{ServerError, ServerResult};
use crate::http::{Request, Response};
use futures::future::BoxFuture;

/// Future returned by handlers, middleware and error handlers. It borrows the
/// request and response for as long as it runs.
pub type HandlerFuture<'a> = BoxFuture<'a, ServerResult<()>>;

/// A route handler: writes its result into the response.
///
/// Closures and plain functions of the shape
/// `fn(&mut Request, &mut Response) -> HandlerFuture<'_>` implement it:
///
/// ```rust
/// use streamhub::app::Application;
///
/// let mut app = Application::new();
/// app.get("/ping", |_req, res| Box::pin(async move {
///     res.send("pong");
///     Ok(())
/// }));
/// ```
pub trait Handler: Send + Sync + 'static {
    fn call<'a>(&'a self, req: &'a mut Request, res: &'a mut Response) -> HandlerFuture<'a>;
}

impl<F> Handler for F
where
    F: for<'a> Fn(&'a mut Request, &'a mut Response) -> HandlerFuture<'a> + Send + Sync + 'static,
{
    fn call<'a>(&'a self, req: &'a mut Request, res: &'a mut Response) -> HandlerFuture<'a> {
        (self)(req, res)
    }
}

/// Receives every error that escapes the middleware chain or a handler.
/// Returning without finalizing the response passes the error on to the
/// next registered error handler.
pub trait ErrorHandler: Send + Sync + 'static {
    fn call<'a>(
        &'a self,
        err: &'a ServerError,
        req: &'a mut Request,
        res: &'a mut Response,
    ) -> HandlerFuture<'a>;
}

impl<F> ErrorHandler for F
where
    F: for<'a> Fn(&'a ServerError, &'a mut Request, &'a mut Response) -> HandlerFuture<'a>
        + Send
        + Sync
        + 'static,
{
    fn call<'a>(
        &'a self,
        err: &'a ServerError,
        req: &'a mut Request,
        res: &'a mut Response,
    ) -> HandlerFuture<'a> {
        (self)(err, req, res)
    }
}
