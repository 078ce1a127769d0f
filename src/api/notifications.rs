//! Notification feed endpoint.

use axum::extract::State;

use super::{success, ApiResult};
use crate::models::Notification;
use crate::AppState;

/// GET /api/notifications - Drain pending notifications, oldest first.
pub async fn drain_notifications(State(state): State<AppState>) -> ApiResult<Vec<Notification>> {
    success(state.notifications.drain())
}
