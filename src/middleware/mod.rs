mod body_parser;
mod logger;

pub use body_parser::JsonBodyParser;
pub use logger::RequestLogger;

use crate::error::ServerResult;
use crate::handler::HandlerFuture;
use crate::http::{Request, Response};
use std::sync::atomic::{AtomicBool, Ordering};

/// A step in the request pipeline.
///
/// A middleware either hands control on by consuming its [`Next`] or stops
/// the pipeline, usually after finalizing the response.
pub trait Middleware: Send + Sync + 'static {
    fn call<'a>(
        &'a self,
        req: &'a mut Request,
        res: &'a mut Response,
        next: Next<'a>,
    ) -> HandlerFuture<'a>;
}

impl<F> Middleware for F
where
    F: for<'a> Fn(&'a mut Request, &'a mut Response, Next<'a>) -> HandlerFuture<'a>
        + Send
        + Sync
        + 'static,
{
    fn call<'a>(
        &'a self,
        req: &'a mut Request,
        res: &'a mut Response,
        next: Next<'a>,
    ) -> HandlerFuture<'a> {
        (self)(req, res, next)
    }
}

/// Continuation handed to a middleware.
///
/// `run` takes `self` by value, so each middleware can continue the chain at
/// most once.
pub struct Next<'a> {
    remaining: &'a [Box<dyn Middleware>],
    completed: &'a AtomicBool,
}

impl<'a> Next<'a> {
    pub fn run(self, req: &'a mut Request, res: &'a mut Response) -> HandlerFuture<'a> {
        Box::pin(async move {
            if res.is_finalized() {
                return Ok(());
            }
            match self.remaining.split_first() {
                Some((middleware, rest)) => {
                    let next = Next {
                        remaining: rest,
                        completed: self.completed,
                    };
                    middleware.call(req, res, next).await
                }
                None => {
                    self.completed.store(true, Ordering::Release);
                    Ok(())
                }
            }
        })
    }
}

/// How a chain run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainOutcome {
    /// Every middleware continued; the route handler should run.
    Completed,
    /// The response was finalized somewhere in the chain.
    Finalized,
    /// A middleware returned without continuing or finalizing.
    Halted,
}

#[derive(Default)]
pub struct MiddlewareChain {
    middlewares: Vec<Box<dyn Middleware>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self {
            middlewares: Vec::new(),
        }
    }

    pub fn add<M: Middleware>(&mut self, middleware: M) {
        self.middlewares.push(Box::new(middleware));
    }

    pub async fn run(&self, req: &mut Request, res: &mut Response) -> ServerResult<ChainOutcome> {
        let completed = AtomicBool::new(false);
        let next = Next {
            remaining: &self.middlewares,
            completed: &completed,
        };
        next.run(req, res).await?;

        if res.is_finalized() {
            Ok(ChainOutcome::Finalized)
        } else if completed.load(Ordering::Acquire) {
            Ok(ChainOutcome::Completed)
        } else {
            Ok(ChainOutcome::Halted)
        }
    }
}
