use std::any::Any;

use axum::response::{IntoResponse, Response};

use crate::error::AppError;
use crate::metrics::PanicMetrics;

/// Turn a panic inside a request handler into a 500 for that request only.
///
/// Used with `tower_http::catch_panic::CatchPanicLayer::custom`; the
/// listener and every other in-flight request keep running.
pub fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };

    PanicMetrics::record_recovered();
    tracing::error!(panic = %detail, "Recovered from panic in request handler");

    AppError::Internal("request handler panicked".to_string()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode, routing::get, Router};
    use tower::ServiceExt;
    use tower_http::catch_panic::CatchPanicLayer;

    async fn boom() -> &'static str {
        panic!("boom")
    }

    fn panicking_app() -> Router {
        Router::new()
            .route("/boom", get(boom))
            .route("/fine", get(|| async { "fine" }))
            .layer(CatchPanicLayer::custom(handle_panic))
    }

    #[tokio::test]
    async fn test_panic_becomes_500() {
        let app = panicking_app();

        let resp = app
            .clone()
            .oneshot(Request::get("/boom").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        // The service keeps serving
        let resp = app
            .oneshot(Request::get("/fine").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[test]
    fn test_panic_payload_kinds() {
        let resp = handle_panic(Box::new("static str"));
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let resp = handle_panic(Box::new(String::from("owned")));
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let resp = handle_panic(Box::new(42_u8));
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
