//! The streamer/viewer CRUD API served on top of the framework.

pub mod samples;
pub mod streamers;
pub mod viewers;

use crate::app::Application;
use crate::error::{ServerError, ServerResult};
use crate::handler::HandlerFuture;
use crate::http::{Request, Response};
use crate::middleware::{JsonBodyParser, RequestLogger};
use crate::store::{JsonStore, Record, Transaction};
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};
use std::path::Path;
use tracing::error;

pub const STREAMERS_FILE: &str = "streamers.json";
pub const VIEWERS_FILE: &str = "viewers.json";

/// The two backing collections, shared through application state.
#[derive(Debug)]
pub struct Stores {
    pub streamers: JsonStore,
    pub viewers: JsonStore,
}

impl Stores {
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Self {
        let data_dir = data_dir.as_ref();
        Self {
            streamers: JsonStore::new(data_dir.join(STREAMERS_FILE), 0),
            viewers: JsonStore::new(data_dir.join(VIEWERS_FILE), 100),
        }
    }
}

/// Assembles the full service: logging and body parsing middleware, the
/// client-error mapper, and every route.
pub fn application(stores: Stores) -> Application {
    let mut app = Application::new();
    app.state(stores)
        .middleware(RequestLogger)
        .middleware(JsonBodyParser)
        .on_error(client_errors);

    app.get("/", index);

    app.get("/streamers", streamers::list)
        .get("/streamers/:id", streamers::get)
        .post("/streamers", streamers::create)
        .put("/streamers/:id", streamers::replace)
        .patch("/streamers/:id", streamers::update)
        .delete("/streamers/:id", streamers::remove);

    app.get("/viewers", viewers::list)
        .get("/viewers/:id", viewers::get)
        .post("/viewers", viewers::create)
        .put("/viewers/:id", viewers::replace)
        .patch("/viewers/:id", viewers::update)
        .delete("/viewers/:id", viewers::remove);

    app
}

/// Answers 4xx errors with their message; server errors are left to the
/// default 500 response.
fn client_errors<'a>(
    err: &'a ServerError,
    _req: &'a mut Request,
    res: &'a mut Response,
) -> HandlerFuture<'a> {
    let status = err.status_code();
    if status < 500 {
        res.status(status).send(json!({ "error": err.message() }));
    }
    Box::pin(async { Ok(()) })
}

fn index<'a>(_req: &'a mut Request, res: &'a mut Response) -> HandlerFuture<'a> {
    res.send(json!({
        "message": "streamhub API is running",
        "endpoints": {
            "streamers": {
                "GET": ["/streamers", "/streamers/:id"],
                "POST": "/streamers",
                "PUT": "/streamers/:id",
                "PATCH": "/streamers/:id",
                "DELETE": "/streamers/:id",
            },
            "viewers": {
                "GET": ["/viewers", "/viewers/:id"],
                "POST": "/viewers",
                "PUT": "/viewers/:id",
                "PATCH": "/viewers/:id",
                "DELETE": "/viewers/:id",
            },
        },
    }));
    Box::pin(async { Ok(()) })
}

pub(crate) fn stores(req: &Request) -> ServerResult<&Stores> {
    req.state
        .get::<Stores>()
        .ok_or_else(|| ServerError::Internal("stores are not configured".to_string()))
}

/// Integer parsing with the leniency clients expect from query strings:
/// leading whitespace and an optional sign, then digits up to the first
/// non-digit (`"42abc"` is 42). No digits at all yields `None`.
pub fn parse_int(input: &str) -> Option<i64> {
    let trimmed = input.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let value: i64 = digits[..end].parse().ok()?;
    Some(if negative { -value } else { value })
}

/// Query parameter that is present and non-empty.
pub(crate) fn query_filter<'r>(req: &'r Request, name: &str) -> Option<&'r str> {
    req.query_param(name).filter(|value| !value.is_empty())
}

pub(crate) fn id_param(req: &Request) -> Option<i64> {
    req.param("id").and_then(parse_int)
}

/// The parsed body as an object, or a 400 response when it is some other JSON value.
pub(crate) fn body_object(req: &Request, res: &mut Response) -> ServerResult<Option<Record>> {
    match &req.body {
        Value::Object(fields) => Ok(Some(fields.clone())),
        _ => {
            res.status(400)
                .json(&json!({ "error": "request body must be a JSON object" }))?;
            Ok(None)
        }
    }
}

/// `fields` with `id` set to the assigned id.
pub(crate) fn with_id(id: i64, fields: Record) -> Record {
    let mut record = Record::new();
    record.insert("id".to_string(), Value::from(id));
    record.extend(fields.into_iter().filter(|(key, _)| key != "id"));
    record
}

/// Overlays `fields` on `record`, leaving the id untouched.
pub(crate) fn merge(record: &mut Record, fields: Record) {
    record.extend(fields.into_iter().filter(|(key, _)| key != "id"));
}

pub(crate) fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn not_found(res: &mut Response, what: &str) -> ServerResult<()> {
    res.status(404)
        .json(&json!({ "error": format!("{what} not found") }))?;
    Ok(())
}

/// Commits `txn` and answers with `status` and `payload`, or with a 500 when
/// the collection could not be written.
pub(crate) async fn commit(
    txn: Transaction<'_>,
    res: &mut Response,
    status: u16,
    payload: &Value,
    failure: &str,
) -> ServerResult<()> {
    match txn.commit().await {
        Ok(()) => {
            res.status(status).json(payload)?;
        }
        Err(err) => {
            error!(error = %err, "{failure}");
            res.status(500).json(&json!({ "error": failure }))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_int_reads_leading_digits() {
        assert_eq!(parse_int("42"), Some(42));
        assert_eq!(parse_int("  7"), Some(7));
        assert_eq!(parse_int("15abc"), Some(15));
        assert_eq!(parse_int("-3"), Some(-3));
        assert_eq!(parse_int("+8"), Some(8));
        assert_eq!(parse_int("abc"), None);
        assert_eq!(parse_int(""), None);
        assert_eq!(parse_int("-"), None);
    }

    #[test]
    fn with_id_overrides_submitted_id() {
        let fields = match json!({ "id": 999, "username": "foo" }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        let record = with_id(5, fields);
        assert_eq!(Value::Object(record), json!({ "id": 5, "username": "foo" }));
    }

    #[test]
    fn merge_keeps_unmentioned_fields_and_id() {
        let mut record = match json!({ "id": 1, "username": "a", "followers": 10 }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        let fields = match json!({ "id": 50, "followers": 20 }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        merge(&mut record, fields);
        assert_eq!(
            Value::Object(record),
            json!({ "id": 1, "username": "a", "followers": 20 })
        );
    }

    #[test]
    fn timestamps_are_utc_millis() {
        let stamp = now_iso();
        assert!(stamp.ends_with('Z'));
        assert_eq!(stamp.len(), "2024-01-01T00:00:00.000Z".len());
    }
}
