//! Random sample records, created when a POST arrives with an empty body.

use crate::api::now_iso;
use crate::store::Record;
use chrono::{Duration, SecondsFormat, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use serde_json::Value;

const STREAMER_NAMES: &[&str] = &["xQc", "cuteGirl", "avice"];
const STREAMER_LANGUAGES: &[&str] = &["en", "ru"];
const VIEWER_NAMES: &[&str] = &["pro_gamer", "joskiey_chel", "kopac", "fillipov"];
const CATEGORIES: &[&str] = &[
    "Just Chatting",
    "Dota 2",
    "Pool",
    "Hot Tubs",
    "MineCraft",
    "GTA",
];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SampleStreamer {
    id: i64,
    username: String,
    display_name: String,
    followers: u64,
    is_partner: bool,
    streaming_since: String,
    categories: Vec<String>,
    average_viewers: u64,
    language: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SampleViewer {
    id: i64,
    username: String,
    display_name: String,
    subscriptions: Vec<String>,
    subscription_since: Option<String>,
    total_watch_time: u64,
    is_prime: bool,
    preferred_categories: Vec<String>,
    messages_sent: u64,
    last_active: String,
}

pub fn streamer(id: i64) -> Record {
    let mut rng = rand::thread_rng();
    let name = pick(&mut rng, STREAMER_NAMES);
    // up to ~115 days back
    let age_ms = rng.gen_range(0..10_000_000_000i64);
    let since = Utc::now() - Duration::milliseconds(age_ms);

    into_record(SampleStreamer {
        id,
        username: name.to_lowercase(),
        display_name: name.to_string(),
        followers: rng.gen_range(1_000..10_001_000),
        is_partner: rng.gen_bool(0.5),
        streaming_since: since.to_rfc3339_opts(SecondsFormat::Millis, true),
        categories: vec![pick(&mut rng, CATEGORIES).to_string()],
        average_viewers: rng.gen_range(100..50_100),
        language: pick(&mut rng, STREAMER_LANGUAGES).to_string(),
    })
}

pub fn viewer(id: i64) -> Record {
    let mut rng = rand::thread_rng();
    let base = pick(&mut rng, VIEWER_NAMES);

    into_record(SampleViewer {
        id,
        username: format!("{base}_{}", rng.gen_range(0..1000)),
        display_name: capitalize(base),
        subscriptions: Vec::new(),
        subscription_since: None,
        total_watch_time: rng.gen_range(0..5000),
        is_prime: rng.gen_bool(0.3),
        preferred_categories: vec![pick(&mut rng, CATEGORIES).to_string()],
        messages_sent: rng.gen_range(0..10_000),
        last_active: now_iso(),
    })
}

fn pick<R: Rng>(rng: &mut R, items: &[&'static str]) -> &'static str {
    items.choose(rng).copied().unwrap_or_default()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn into_record<T: Serialize>(sample: T) -> Record {
    match serde_json::to_value(sample) {
        Ok(Value::Object(record)) => record,
        _ => Record::new(),
    }
}
