//! Route modules for ScanLens Server

pub mod cache;
pub mod health;
pub mod jobs;
pub mod ocr;
pub mod status;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the full application router
pub fn app(state: AppState) -> Router {
    // The overlay runs inside arbitrary reader origins
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(health::router())
        .merge(ocr::router())
        .merge(jobs::router())
        .merge(cache::router())
        .merge(status::router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
        Router,
    };
    use tower::ServiceExt;

    use crate::cache::CacheStore;
    use crate::config::Config;
    use crate::fetch::MockImageSource;
    use crate::ocr::{BoundingBox, MockEngine, RawLine};
    use crate::state::AppState;

    pub fn png(width: u32, height: u32) -> Vec<u8> {
        let img = image::DynamicImage::ImageRgb8(image::RgbImage::new(width, height));
        let mut buffer = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut buffer), image::ImageFormat::Png)
            .unwrap();
        buffer
    }

    pub fn one_line_engine() -> Arc<MockEngine> {
        Arc::new(MockEngine::new(vec![RawLine::new(
            "こんにちは",
            BoundingBox::new(0.2, 0.1, 0.05, 0.4),
        )]))
    }

    pub fn test_app(source: MockImageSource, engine: Arc<MockEngine>) -> (Router, AppState) {
        test_app_shared(Arc::new(source), engine)
    }

    pub fn test_app_shared(
        source: Arc<MockImageSource>,
        engine: Arc<MockEngine>,
    ) -> (Router, AppState) {
        let mut config = Config::default();
        config.jobs.delay_ms = 0;
        let state = AppState::from_parts(config, CacheStore::in_memory(), source, engine);
        (super::app(state.clone()), state)
    }

    /// Send one request and decode the JSON body (Null when empty)
    pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    pub fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    pub fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }
}
