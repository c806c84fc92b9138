mod matcher;

pub use matcher::{Pattern, Segment};

use crate::handler::{Handler, HandlerFuture};
use crate::http::{Method, Request, Response};
use std::collections::HashMap;

pub(crate) struct Route {
    pub(crate) pattern: Pattern,
    pub(crate) handler: Box<dyn Handler>,
}

/// Result of looking a request up in the route table.
pub struct RouteMatch<'r> {
    /// The registered pattern, i.e. the effective route key.
    pub pattern: &'r str,
    /// Values captured by `:name` segments; empty for literal routes.
    pub params: HashMap<String, String>,
    pub(crate) handler: &'r dyn Handler,
}

/// Route table: for each method, the registered patterns in registration order.
///
/// Registering the same pattern twice for one method replaces the handler and
/// keeps the original position.
#[derive(Default)]
pub struct Router {
    routes: HashMap<Method, Vec<Route>>,
}

impl Router {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
        }
    }

    pub fn get<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut Request, &'a mut Response) -> HandlerFuture<'a> + Send + Sync + 'static,
    {
        self.add(Method::GET, path, handler);
        self
    }

    pub fn post<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut Request, &'a mut Response) -> HandlerFuture<'a> + Send + Sync + 'static,
    {
        self.add(Method::POST, path, handler);
        self
    }

    pub fn put<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut Request, &'a mut Response) -> HandlerFuture<'a> + Send + Sync + 'static,
    {
        self.add(Method::PUT, path, handler);
        self
    }

    pub fn patch<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut Request, &'a mut Response) -> HandlerFuture<'a> + Send + Sync + 'static,
    {
        self.add(Method::PATCH, path, handler);
        self
    }

    pub fn delete<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut Request, &'a mut Response) -> HandlerFuture<'a> + Send + Sync + 'static,
    {
        self.add(Method::DELETE, path, handler);
        self
    }

    fn add<H: Handler>(&mut self, method: Method, path: &str, handler: H) {
        let routes = self.routes.entry(method).or_default();
        match routes.iter_mut().find(|route| route.pattern.as_str() == path) {
            Some(route) => route.handler = Box::new(handler),
            None => routes.push(Route {
                pattern: Pattern::parse(path),
                handler: Box::new(handler),
            }),
        }
    }

    /// Registered patterns for `method`, in registration order.
    pub fn patterns(&self, method: Method) -> Vec<&str> {
        self.routes
            .get(&method)
            .map(|routes| routes.iter().map(|route| route.pattern.as_str()).collect())
            .unwrap_or_default()
    }

    /// First parameterized pattern for `method` that matches `path`.
    /// Literal patterns are never considered here.
    pub fn match_route(&self, method: Method, path: &str) -> Option<RouteMatch<'_>> {
        self.routes.get(&method)?.iter().find_map(|route| {
            if !route.pattern.is_dynamic() {
                return None;
            }
            route.pattern.matches(path).map(|params| RouteMatch {
                pattern: route.pattern.as_str(),
                params,
                handler: route.handler.as_ref(),
            })
        })
    }

    /// Resolves the handler for a request.
    ///
    /// An exact literal pattern wins; otherwise the first matching
    /// parameterized pattern in registration order. Literals are checked
    /// before any pattern regardless of registration order, so `/a/top`
    /// reaches a `/a/top` route even when `/a/:x` was registered first.
    /// Routers that try patterns first would send it to `/a/:x`.
    pub fn resolve(&self, method: Method, path: &str) -> Option<RouteMatch<'_>> {
        let literal = self.routes.get(&method).and_then(|routes| {
            routes
                .iter()
                .find(|route| !route.pattern.is_dynamic() && route.pattern.as_str() == path)
        });
        match literal {
            Some(route) => Some(RouteMatch {
                pattern: route.pattern.as_str(),
                params: HashMap::new(),
                handler: route.handler.as_ref(),
            }),
            None => self.match_route(method, path),
        }
    }
}
