//! Host panel endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use super::{success, ApiResult};
use crate::host::{DialogEvent, DisplayMode, HostPanelView};
use crate::models::HostSummary;
use crate::session::HostPanelQuery;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignHostRequest {
    /// `null` is refused once a host is set; detaching goes through the dialog
    pub host_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayModeRequest {
    pub selected_option: DisplayMode,
}

/// GET /api/collectives/:id/host - Open or re-read the host panel.
pub async fn get_host_panel(
    State(state): State<AppState>,
    Path(collective_id): Path<i64>,
    Query(query): Query<HostPanelQuery>,
) -> ApiResult<HostPanelView> {
    let view = state.shell.open_host_panel(collective_id, query).await?;
    success(view)
}

/// POST /api/collectives/:id/host/assign - Apply to a host.
pub async fn assign_host(
    State(state): State<AppState>,
    Path(collective_id): Path<i64>,
    Json(request): Json<AssignHostRequest>,
) -> ApiResult<HostPanelView> {
    let view = state
        .shell
        .assign_host(collective_id, request.host_id)
        .await?;
    success(view)
}

/// POST /api/collectives/:id/host/withdraw - Ask to withdraw the pending application.
pub async fn request_withdraw(
    State(state): State<AppState>,
    Path(collective_id): Path<i64>,
) -> ApiResult<HostPanelView> {
    dialog(&state, collective_id, DialogEvent::RequestWithdraw).await
}

/// POST /api/collectives/:id/host/remove - Ask to remove the active host.
pub async fn request_remove(
    State(state): State<AppState>,
    Path(collective_id): Path<i64>,
) -> ApiResult<HostPanelView> {
    dialog(&state, collective_id, DialogEvent::RequestRemove).await
}

/// POST /api/collectives/:id/host/confirm - Confirm the open dialog.
pub async fn confirm_dialog(
    State(state): State<AppState>,
    Path(collective_id): Path<i64>,
) -> ApiResult<HostPanelView> {
    dialog(&state, collective_id, DialogEvent::Confirm).await
}

/// POST /api/collectives/:id/host/cancel - Close the open dialog.
pub async fn cancel_dialog(
    State(state): State<AppState>,
    Path(collective_id): Path<i64>,
) -> ApiResult<HostPanelView> {
    dialog(&state, collective_id, DialogEvent::Cancel).await
}

async fn dialog(
    state: &AppState,
    collective_id: i64,
    event: DialogEvent,
) -> ApiResult<HostPanelView> {
    let view = state.shell.host_dialog(collective_id, event).await?;
    success(view)
}

/// PUT /api/collectives/:id/host/display-mode - Switch between the panel's sections.
pub async fn set_display_mode(
    State(state): State<AppState>,
    Path(collective_id): Path<i64>,
    Json(request): Json<DisplayModeRequest>,
) -> ApiResult<HostPanelView> {
    let view = state
        .shell
        .set_display_mode(collective_id, request.selected_option)
        .await?;
    success(view)
}

/// GET /api/collectives/:id/host/suggestions - Hosts matching the collective's tags.
pub async fn suggested_hosts(
    State(state): State<AppState>,
    Path(collective_id): Path<i64>,
) -> ApiResult<Vec<HostSummary>> {
    let hosts = state.shell.suggested_hosts(collective_id).await?;
    success(hosts)
}
