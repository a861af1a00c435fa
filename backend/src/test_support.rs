//! In-process HTTP endpoints standing in for Gemini and OpenWeatherMap in tests.

use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub struct MockEndpoint {
    pub base_url: String,
    hits: Arc<AtomicUsize>,
}

impl MockEndpoint {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Starts a single-worker server on an ephemeral port that answers every request with `handler`.
/// The handler receives the request and its body parsed as JSON (`Null` when not JSON).
pub fn spawn_endpoint<F>(handler: F) -> MockEndpoint
where
    F: Fn(&HttpRequest, serde_json::Value) -> HttpResponse + Send + Sync + 'static,
{
    let handler = Arc::new(handler);
    let hits = Arc::new(AtomicUsize::new(0));
    let server_hits = hits.clone();

    let server = HttpServer::new(move || {
        let handler = handler.clone();
        let hits = server_hits.clone();
        App::new().default_service(web::to(move |req: HttpRequest, body: web::Bytes| {
            let handler = handler.clone();
            let hits = hits.clone();
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                let value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
                handler(&req, value)
            }
        }))
    })
    .workers(1)
    .bind(("127.0.0.1", 0))
    .expect("bind mock endpoint");

    let addr = server.addrs()[0];
    actix_web::rt::spawn(server.run());

    MockEndpoint {
        base_url: format!("http://{}", addr),
        hits,
    }
}
