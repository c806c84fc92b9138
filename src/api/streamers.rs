use crate::api::{
    body_object, commit, id_param, merge, not_found, now_iso, parse_int, query_filter, samples,
    stores, with_id,
};
use crate::error::ServerResult;
use crate::handler::HandlerFuture;
use crate::http::{Request, Response};
use crate::store::{record_id, Record};
use serde_json::{json, Value};

/// Fields a full replacement (PUT) must carry.
pub const REQUIRED_FIELDS: &[&str] = &[
    "username",
    "displayName",
    "followers",
    "isPartner",
    "categories",
    "language",
];

pub fn list<'a>(req: &'a mut Request, res: &'a mut Response) -> HandlerFuture<'a> {
    Box::pin(list_streamers(req, res))
}

pub fn get<'a>(req: &'a mut Request, res: &'a mut Response) -> HandlerFuture<'a> {
    Box::pin(get_streamer(req, res))
}

pub fn create<'a>(req: &'a mut Request, res: &'a mut Response) -> HandlerFuture<'a> {
    Box::pin(create_streamer(req, res))
}

pub fn replace<'a>(req: &'a mut Request, res: &'a mut Response) -> HandlerFuture<'a> {
    Box::pin(replace_streamer(req, res))
}

pub fn update<'a>(req: &'a mut Request, res: &'a mut Response) -> HandlerFuture<'a> {
    Box::pin(update_streamer(req, res))
}

pub fn remove<'a>(req: &'a mut Request, res: &'a mut Response) -> HandlerFuture<'a> {
    Box::pin(remove_streamer(req, res))
}

async fn list_streamers(req: &mut Request, res: &mut Response) -> ServerResult<()> {
    let mut streamers = stores(req)?.streamers.read_all().await;

    if let Some(language) = query_filter(req, "language") {
        streamers.retain(|s| s.get("language").and_then(Value::as_str) == Some(language));
    }

    if let Some(min) = query_filter(req, "minFollowers") {
        let min = parse_int(min);
        streamers.retain(|s| match (min, s.get("followers").and_then(Value::as_f64)) {
            (Some(min), Some(followers)) => followers >= min as f64,
            _ => false,
        });
    }

    if let Some(category) = query_filter(req, "category") {
        let needle = category.to_lowercase();
        streamers.retain(|s| in_category(s, &needle));
    }

    res.json(&streamers)?;
    Ok(())
}

fn in_category(streamer: &Record, needle: &str) -> bool {
    streamer
        .get("categories")
        .and_then(Value::as_array)
        .map_or(false, |categories| {
            categories
                .iter()
                .filter_map(Value::as_str)
                .any(|c| c.to_lowercase().contains(needle))
        })
}

async fn get_streamer(req: &mut Request, res: &mut Response) -> ServerResult<()> {
    let streamers = stores(req)?.streamers.read_all().await;
    let found = id_param(req).and_then(|id| streamers.iter().find(|s| record_id(s) == Some(id)));

    match found {
        Some(streamer) => {
            res.json(streamer)?;
            Ok(())
        }
        None => not_found(res, "streamer"),
    }
}

async fn create_streamer(req: &mut Request, res: &mut Response) -> ServerResult<()> {
    let Some(fields) = body_object(req, res)? else {
        return Ok(());
    };
    let store = &stores(req)?.streamers;

    let mut txn = store.begin().await;
    let id = txn.next_id();
    let streamer = if fields.is_empty() {
        samples::streamer(id)
    } else {
        with_id(id, fields)
    };
    txn.records.push(streamer.clone());

    commit(txn, res, 201, &Value::Object(streamer), "failed to save streamer").await
}

async fn replace_streamer(req: &mut Request, res: &mut Response) -> ServerResult<()> {
    let store = &stores(req)?.streamers;
    let mut txn = store.begin().await;
    let Some((id, index)) = id_param(req).and_then(|id| Some((id, txn.position(id)?))) else {
        return not_found(res, "streamer");
    };
    let Some(fields) = body_object(req, res)? else {
        return Ok(());
    };

    let missing: Vec<&str> = REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|field| !fields.contains_key(*field))
        .collect();
    if !missing.is_empty() {
        res.status(400).json(&json!({
            "error": "missing required fields",
            "missing": missing,
        }))?;
        return Ok(());
    }

    let streamer = with_id(id, fields);
    txn.records[index] = streamer.clone();
    commit(txn, res, 200, &Value::Object(streamer), "failed to update streamer").await
}

async fn update_streamer(req: &mut Request, res: &mut Response) -> ServerResult<()> {
    let store = &stores(req)?.streamers;
    let mut txn = store.begin().await;
    let Some(index) = id_param(req).and_then(|id| txn.position(id)) else {
        return not_found(res, "streamer");
    };
    let Some(fields) = body_object(req, res)? else {
        return Ok(());
    };

    let streamer = &mut txn.records[index];
    merge(streamer, fields);
    streamer.insert("lastUpdated".to_string(), Value::from(now_iso()));
    let streamer = streamer.clone();

    commit(txn, res, 200, &Value::Object(streamer), "failed to update streamer").await
}

async fn remove_streamer(req: &mut Request, res: &mut Response) -> ServerResult<()> {
    let store = &stores(req)?.streamers;
    let mut txn = store.begin().await;
    let Some(index) = id_param(req).and_then(|id| txn.position(id)) else {
        return not_found(res, "streamer");
    };

    let deleted = txn.records.remove(index);
    let payload = json!({
        "message": "streamer deleted",
        "deletedStreamer": deleted,
    });
    commit(txn, res, 200, &payload, "failed to delete streamer").await
}
