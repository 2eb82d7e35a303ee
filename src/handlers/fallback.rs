use crate::core::error::ApiError;
use axum::{
    http::{HeaderMap, Uri},
    response::{Html, IntoResponse, Response},
};

pub async fn fallback_handler(uri: Uri, headers: HeaderMap) -> Response {
    let accepts_html = headers
        .get("accept")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("text/html"));

    if accepts_html {
        return Html("Nothing to see here. Try /health.").into_response();
    }

    ApiError::NotFound(format!("no route for {}", uri.path())).into_response()
}
