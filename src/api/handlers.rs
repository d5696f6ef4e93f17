//! Queue read/write endpoints.
//!
//! `PUT /{name}?v=value` pushes, `GET /{name}?timeout=seconds` pops.

use std::time::Duration;

use axum::{
    extract::{Path, RawQuery, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::query::first_value;
use crate::error::{AppError, QueueError, Result};
use crate::queue::Message;
use crate::server::AppState;

/// PUT /{name}?v=... - enqueue a message
pub async fn write_message(
    State(state): State<AppState>,
    Path(name): Path<String>,
    RawQuery(query): RawQuery,
) -> Result<StatusCode> {
    if name.is_empty() {
        return Err(QueueError::EmptyName.into());
    }
    let message = Message::new(first_value(query.as_deref(), "v").unwrap_or_default())?;

    let queue = state.registry.get_or_create(&name)?;
    queue.push(message).await?;

    Ok(StatusCode::OK)
}

/// GET /{name}?timeout=... - dequeue a message, long-polling up to `timeout` seconds
pub async fn read_message(
    State(state): State<AppState>,
    Path(name): Path<String>,
    RawQuery(query): RawQuery,
) -> Result<Response> {
    let raw_timeout = first_value(query.as_deref(), "timeout");
    let raw_timeout = raw_timeout.as_deref().map(String::from_utf8_lossy);
    let timeout = parse_timeout(&name, raw_timeout.as_deref());
    let queue = state.registry.get_or_create(&name)?;

    match queue.pop(timeout).await {
        Some(message) => Ok((StatusCode::OK, message.into_bytes()).into_response()),
        None => Ok(StatusCode::NOT_FOUND.into_response()),
    }
}

/// GET|PUT / - the path carries no queue name
pub async fn missing_name() -> AppError {
    QueueError::EmptyName.into()
}

pub async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

/// Absent, empty, non-positive or unparsable values all mean "do not wait".
fn parse_timeout(queue: &str, raw: Option<&str>) -> Duration {
    let Some(raw) = raw.filter(|s| !s.is_empty()) else {
        return Duration::ZERO;
    };

    match raw.parse::<i64>() {
        Ok(secs) if secs > 0 => Duration::from_secs(secs.unsigned_abs()),
        Ok(_) => Duration::ZERO,
        Err(e) => {
            tracing::warn!(
                queue = %queue,
                timeout = %raw,
                error = %e,
                "Invalid timeout, reading without waiting"
            );
            Duration::ZERO
        }
    }
}
