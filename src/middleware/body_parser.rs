use crate::error::ServerResult;
use crate::handler::HandlerFuture;
use crate::http::{Request, Response};
use crate::middleware::{Middleware, Next};
use serde_json::{json, Map, Value};
use tracing::debug;

/// Parses JSON request bodies into `Request::body`.
///
/// Only POST, PUT and PATCH requests whose content type mentions
/// `application/json` are parsed; every other request gets an empty object.
/// A malformed body is answered with 400 and the chain stops there.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBodyParser;

impl Middleware for JsonBodyParser {
    fn call<'a>(
        &'a self,
        req: &'a mut Request,
        res: &'a mut Response,
        next: Next<'a>,
    ) -> HandlerFuture<'a> {
        Box::pin(parse_body(req, res, next))
    }
}

async fn parse_body<'a>(
    req: &'a mut Request,
    res: &'a mut Response,
    next: Next<'a>,
) -> ServerResult<()> {
    req.body = Value::Object(Map::new());

    let is_json = req
        .content_type()
        .map_or(false, |ct| ct.contains("application/json"));
    if !req.method.carries_body() || !is_json || req.raw_body.is_empty() {
        return next.run(req, res).await;
    }

    match serde_json::from_slice::<Value>(&req.raw_body) {
        Ok(body) => {
            req.body = body;
            next.run(req, res).await
        }
        Err(err) => {
            debug!(error = %err, path = %req.path, "rejecting malformed JSON body");
            res.status(400).json(&json!({ "error": "invalid JSON body" }))?;
            Ok(())
        }
    }
}
