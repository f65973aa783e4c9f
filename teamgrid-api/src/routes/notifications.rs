/// Notification endpoints
///
/// # Endpoints
///
/// - `GET  /v1/notifications` - List persisted notifications (newest first)
/// - `POST /v1/notifications/:id/read` - Mark a notification read
/// - `GET  /v1/notifications/stream` - Live event stream (SSE)
///
/// Realtime delivery is best-effort; the persisted rows are the durable
/// record a client reconciles against after reconnecting.
///
/// # SSE Event Format
///
/// ```text
/// event: lifecycle
/// data: {"type":"invite_received","org_id":"...","org_name":"Acme","invited_email":"a@example.com"}
/// ```

use crate::{app::AppState, error::{ApiError, ApiResult}};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Extension, Json,
};
use futures::stream::Stream;
use serde::Deserialize;
use std::convert::Infallible;
use std::time::Duration;
use teamgrid_shared::guards::AuthUser;
use teamgrid_shared::models::notification::Notification;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt as _;
use uuid::Uuid;

/// Notification list query parameters
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Maximum number of notifications to return
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    50
}

/// Lists the caller's notifications, newest first
pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<Notification>>> {
    let limit = query.limit.clamp(1, 200);
    let notifications = Notification::list_for_user(&state.db, auth.user_id, limit).await?;
    Ok(Json(notifications))
}

/// Marks one of the caller's notifications as read
///
/// The update is scoped to the caller, so another user's notification ID
/// behaves exactly like a nonexistent one.
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(notification_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let updated = Notification::mark_read(&state.db, notification_id, auth.user_id).await?;
    if !updated {
        return Err(ApiError::NotFound("Notification not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Streams the caller's lifecycle events via SSE
///
/// Registers a connection in the fan-out registry and forwards events as
/// they are published. The subscription guard travels with the stream, so a
/// client disconnect drops the stream and unregisters the connection.
pub async fn stream_notifications(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (guard, rx) = state.registry.subscribe(auth.user_id).await;

    tracing::info!(
        user_id = %auth.user_id,
        connection_id = %guard.connection_id(),
        "Notification stream opened"
    );

    let stream = UnboundedReceiverStream::new(rx).map(move |event| {
        // Owned by the closure so the registration lives exactly as long as
        // the stream.
        let _keepalive = &guard;

        Ok(Event::default()
            .event("lifecycle")
            .json_data(&event)
            .unwrap_or_else(|_| Event::default().event("lifecycle")))
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(25)))
}
