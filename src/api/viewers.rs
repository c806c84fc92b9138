use crate::api::{
    body_object, commit, id_param, merge, not_found, now_iso, parse_int, query_filter, samples,
    stores, with_id,
};
use crate::error::ServerResult;
use crate::handler::HandlerFuture;
use crate::http::{Request, Response};
use crate::store::record_id;
use serde_json::{json, Value};

pub fn list<'a>(req: &'a mut Request, res: &'a mut Response) -> HandlerFuture<'a> {
    Box::pin(list_viewers(req, res))
}

pub fn get<'a>(req: &'a mut Request, res: &'a mut Response) -> HandlerFuture<'a> {
    Box::pin(get_viewer(req, res))
}

pub fn create<'a>(req: &'a mut Request, res: &'a mut Response) -> HandlerFuture<'a> {
    Box::pin(create_viewer(req, res))
}

pub fn replace<'a>(req: &'a mut Request, res: &'a mut Response) -> HandlerFuture<'a> {
    Box::pin(replace_viewer(req, res))
}

pub fn update<'a>(req: &'a mut Request, res: &'a mut Response) -> HandlerFuture<'a> {
    Box::pin(update_viewer(req, res))
}

pub fn remove<'a>(req: &'a mut Request, res: &'a mut Response) -> HandlerFuture<'a> {
    Box::pin(remove_viewer(req, res))
}

async fn list_viewers(req: &mut Request, res: &mut Response) -> ServerResult<()> {
    let mut viewers = stores(req)?.viewers.read_all().await;

    // presence alone switches the filter on; only "true" selects prime viewers
    if let Some(is_prime) = req.query_param("isPrime") {
        let wanted = is_prime == "true";
        viewers.retain(|v| v.get("isPrime").and_then(Value::as_bool) == Some(wanted));
    }

    if let Some(min) = query_filter(req, "minWatchTime") {
        let min = parse_int(min);
        viewers.retain(|v| match (min, v.get("totalWatchTime").and_then(Value::as_f64)) {
            (Some(min), Some(watched)) => watched >= min as f64,
            _ => false,
        });
    }

    res.json(&viewers)?;
    Ok(())
}

async fn get_viewer(req: &mut Request, res: &mut Response) -> ServerResult<()> {
    let viewers = stores(req)?.viewers.read_all().await;
    let found = id_param(req).and_then(|id| viewers.iter().find(|v| record_id(v) == Some(id)));

    match found {
        Some(viewer) => {
            res.json(viewer)?;
            Ok(())
        }
        None => not_found(res, "viewer"),
    }
}

async fn create_viewer(req: &mut Request, res: &mut Response) -> ServerResult<()> {
    let Some(fields) = body_object(req, res)? else {
        return Ok(());
    };
    let store = &stores(req)?.viewers;

    let mut txn = store.begin().await;
    let id = txn.next_id();
    let viewer = if fields.is_empty() {
        samples::viewer(id)
    } else {
        let mut viewer = with_id(id, fields);
        viewer.insert("lastActive".to_string(), Value::from(now_iso()));
        viewer
    };
    txn.records.push(viewer.clone());

    commit(txn, res, 201, &Value::Object(viewer), "failed to save viewer").await
}

async fn replace_viewer(req: &mut Request, res: &mut Response) -> ServerResult<()> {
    let store = &stores(req)?.viewers;
    let mut txn = store.begin().await;
    let Some((id, index)) = id_param(req).and_then(|id| Some((id, txn.position(id)?))) else {
        return not_found(res, "viewer");
    };
    let Some(fields) = body_object(req, res)? else {
        return Ok(());
    };

    let mut viewer = with_id(id, fields);
    viewer.insert("lastActive".to_string(), Value::from(now_iso()));
    txn.records[index] = viewer.clone();

    commit(txn, res, 200, &Value::Object(viewer), "failed to update viewer").await
}

async fn update_viewer(req: &mut Request, res: &mut Response) -> ServerResult<()> {
    let store = &stores(req)?.viewers;
    let mut txn = store.begin().await;
    let Some(index) = id_param(req).and_then(|id| txn.position(id)) else {
        return not_found(res, "viewer");
    };
    let Some(fields) = body_object(req, res)? else {
        return Ok(());
    };

    let viewer = &mut txn.records[index];
    let update_count = viewer
        .get("updateCount")
        .and_then(Value::as_i64)
        .unwrap_or(0)
        + 1;
    merge(viewer, fields);
    viewer.insert("lastActive".to_string(), Value::from(now_iso()));
    viewer.insert("updateCount".to_string(), Value::from(update_count));
    let viewer = viewer.clone();

    commit(txn, res, 200, &Value::Object(viewer), "failed to update viewer").await
}

async fn remove_viewer(req: &mut Request, res: &mut Response) -> ServerResult<()> {
    let store = &stores(req)?.viewers;
    let mut txn = store.begin().await;
    let Some(index) = id_param(req).and_then(|id| txn.position(id)) else {
        return not_found(res, "viewer");
    };

    let deleted = txn.records.remove(index);
    let payload = json!({
        "message": "viewer deleted",
        "deletedViewer": deleted,
    });
    commit(txn, res, 200, &payload, "failed to delete viewer").await
}
