//! Stub HTTP service shared by the client tests.

use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;

/// What the stub saw for one request.
#[derive(Debug, Clone)]
pub(crate) struct StubRequest {
    pub authorization: Option<String>,
    pub body: String,
}

/// Serve `status` and `body` for every POST to `path` on an ephemeral local
/// port. Returns the base URL and the requests received so far.
pub(crate) async fn serve_stub(
    path: &'static str,
    status: u16,
    body: &'static str,
) -> (String, Arc<Mutex<Vec<StubRequest>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&seen);
    let status = StatusCode::from_u16(status).unwrap();

    let app = Router::new().route(
        path,
        post(move |headers: HeaderMap, payload: Bytes| async move {
            recorder.lock().unwrap().push(StubRequest {
                authorization: headers
                    .get(header::AUTHORIZATION)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string),
                body: String::from_utf8_lossy(&payload).into_owned(),
            });
            (status, [(header::CONTENT_TYPE, "application/json")], body)
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (base_url, seen)
}
