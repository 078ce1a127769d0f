//! Payment popup endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{success, ApiResult};
use crate::errors::AppError;
use crate::models::CardForm;
use crate::payment::PopupView;
use crate::session::OpenPopupRequest;
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenedPopup {
    pub id: Uuid,
    #[serde(flatten)]
    pub view: PopupView,
}

#[derive(Debug, Deserialize)]
pub struct SelectionRequest {
    pub key: String,
}

/// POST /api/payment-popups - Open the popup for a recurring contribution.
pub async fn open_popup(
    State(state): State<AppState>,
    Json(request): Json<OpenPopupRequest>,
) -> ApiResult<OpenedPopup> {
    if request.collective_slug.trim().is_empty() {
        return Err(AppError::Validation(
            "Collective slug is required".to_string(),
        ));
    }
    let (id, view) = state.shell.open_popup(request).await?;
    success(OpenedPopup { id, view })
}

/// GET /api/payment-popups/:id - Current popup view, refreshed from the directory.
pub async fn get_popup(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<PopupView> {
    let view = state.shell.popup_view(id).await?;
    success(view)
}

/// PUT /api/payment-popups/:id/selection - Choose an option.
pub async fn select_option(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<SelectionRequest>,
) -> ApiResult<PopupView> {
    let view = state.shell.select_payment_option(id, &request.key).await?;
    success(view)
}

/// POST /api/payment-popups/:id/add-method - Show the new card form.
pub async fn start_adding_method(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<PopupView> {
    let view = state.shell.start_adding_method(id).await?;
    success(view)
}

/// DELETE /api/payment-popups/:id/add-method - Back to the option list.
pub async fn cancel_adding_method(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<PopupView> {
    let view = state.shell.cancel_adding_method(id).await?;
    success(view)
}

/// PUT /api/payment-popups/:id/card-form - Report the card form's state.
pub async fn update_card_form(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(form): Json<CardForm>,
) -> ApiResult<PopupView> {
    let view = state.shell.update_card_form(id, form).await?;
    success(view)
}

/// POST /api/payment-popups/:id/add-method/submit - Tokenize and save the card.
pub async fn submit_new_method(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<PopupView> {
    let view = state.shell.submit_new_method(id).await?;
    success(view)
}

/// POST /api/payment-popups/:id/confirm - Charge the contribution to the selection.
pub async fn confirm_selection(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<PopupView> {
    let view = state.shell.confirm_selection(id).await?;
    success(view)
}

/// DELETE /api/payment-popups/:id - Dismiss the popup.
pub async fn dismiss_popup(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<()> {
    state.shell.dismiss_popup(id).await?;
    success(())
}
