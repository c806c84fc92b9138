use crate::handler::HandlerFuture;
use crate::http::{Request, Response};
use crate::middleware::{Middleware, Next};
use tracing::info;

/// Logs every request as it enters the pipeline.
///
/// Completion (status, latency) is logged by the dispatcher once the
/// response has been produced.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestLogger;

impl Middleware for RequestLogger {
    fn call<'a>(
        &'a self,
        req: &'a mut Request,
        res: &'a mut Response,
        next: Next<'a>,
    ) -> HandlerFuture<'a> {
        info!(
            method = %req.method,
            path = %req.path,
            query = ?req.query,
            "incoming request"
        );
        next.run(req, res)
    }
}
