//! Load driver: concurrent visitors, each running a short chat over the SSE endpoint.
//! Run with the gateway up: cargo run --bin stream_load [base_url]

use futures_util::StreamExt;
use reqwest::Client;
use serde_json::json;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
const CONCURRENT_VISITORS: usize = 10;
const TURNS_PER_VISITOR: usize = 3;

const MESSAGES: &[&str] = &[
    "How can you help our sales team?",
    "We are a craft brewery struggling with shelf placement",
    "How do you compare to our current spreadsheets?",
    "What would the ROI be for a regional distributor?",
    "Do you have case studies from other suppliers?",
    "How long does implementation take?",
    "Our depletions forecast is always wrong",
    "Which markets should we expand into next?",
];

/// What one streamed turn ended with.
enum Outcome {
    Complete,
    Error,
    Truncated,
}

async fn run_turn(client: &Client, base: &str, cookie: Option<&str>, message: &str) -> Result<(Outcome, Option<String>), reqwest::Error> {
    let mut request = client
        .post(format!("{}/api/chat/stream", base))
        .json(&json!({ "message": message }));
    if let Some(cookie) = cookie {
        request = request.header(reqwest::header::COOKIE, cookie);
    }
    let response = request.send().await?.error_for_status()?;
    let set_cookie = response
        .headers()
        .get(reqwest::header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::to_string);

    let mut body = String::new();
    let mut chunks = response.bytes_stream();
    while let Some(chunk) = chunks.next().await {
        body.push_str(&String::from_utf8_lossy(&chunk?));
    }
    let outcome = if body.contains("event: complete") {
        Outcome::Complete
    } else if body.contains("event: error") {
        Outcome::Error
    } else {
        Outcome::Truncated
    };
    Ok((outcome, set_cookie))
}

fn percentile(sorted: &[u64], p: f64) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let idx = ((sorted.len() - 1) as f64 * p).round() as usize;
    sorted[idx]
}

#[tokio::main]
async fn main() {
    let base = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    println!(
        "[stream_load] {} visitors x {} turns against {}",
        CONCURRENT_VISITORS, TURNS_PER_VISITOR, base
    );

    let completed = Arc::new(AtomicU32::new(0));
    let errored = Arc::new(AtomicU32::new(0));
    let failed = Arc::new(AtomicU32::new(0));
    let latencies: Arc<Mutex<Vec<u64>>> = Arc::new(Mutex::new(Vec::new()));
    let client = Client::new();

    let mut handles = Vec::new();
    for visitor in 0..CONCURRENT_VISITORS {
        let client = client.clone();
        let base = base.clone();
        let completed = Arc::clone(&completed);
        let errored = Arc::clone(&errored);
        let failed = Arc::clone(&failed);
        let latencies = Arc::clone(&latencies);

        handles.push(tokio::spawn(async move {
            let mut cookie: Option<String> = None;
            for turn in 0..TURNS_PER_VISITOR {
                let message = MESSAGES[(visitor + turn) % MESSAGES.len()];
                let started = Instant::now();
                match run_turn(&client, &base, cookie.as_deref(), message).await {
                    Ok((outcome, set_cookie)) => {
                        if cookie.is_none() {
                            cookie = set_cookie;
                        }
                        match outcome {
                            Outcome::Complete => {
                                completed.fetch_add(1, Ordering::Relaxed);
                                latencies.lock().await.push(started.elapsed().as_millis() as u64);
                            }
                            Outcome::Error => {
                                errored.fetch_add(1, Ordering::Relaxed);
                            }
                            Outcome::Truncated => {
                                failed.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                    }
                    Err(e) => {
                        eprintln!("[stream_load] visitor {} turn {}: {}", visitor, turn, e);
                        failed.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
        }));
    }
    for h in handles {
        let _ = h.await;
    }

    let c = completed.load(Ordering::Relaxed);
    let e = errored.load(Ordering::Relaxed);
    let f = failed.load(Ordering::Relaxed);
    let mut sorted = latencies.lock().await.clone();
    sorted.sort_unstable();
    println!("[stream_load] complete: {} | error events: {} | failed: {}", c, e, f);
    println!(
        "[stream_load] latency p50: {}ms | p95: {}ms | max: {}ms",
        percentile(&sorted, 0.5),
        percentile(&sorted, 0.95),
        sorted.last().copied().unwrap_or(0)
    );
}
