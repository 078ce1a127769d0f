//! The settings shell.
//!
//! Keeps one host panel per collective and one popup per open payment dialog,
//! dispatches their tickets to the collaborators and reports outcomes to the
//! notifier. A panel or popup is only locked while its state changes, never
//! across a collaborator call.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::errors::AppError;
use crate::host::{
    DialogEvent, DisplayMode, HostAssignment, HostEffect, HostPanelView, HostStatus, HostTicket,
    ProviderCallback, DETACH_THROUGH_DIALOG, SUGGESTED_HOSTS_LIMIT,
};
use crate::models::{CardForm, Contribution, HostSummary, NotificationKind};
use crate::notify::Notifier;
use crate::payment::{
    AddMethodTicket, PaymentMethodSelector, PopupView, Settlement, TOKENIZER_UNAVAILABLE,
};
use crate::upstream::{CollectiveDirectory, SettingsMutations, Tokenizer};

/// Host panel state plus the navigation parameter it writes.
struct HostPanel {
    state: HostAssignment,
    display_mode: DisplayMode,
}

impl HostPanel {
    fn view(&self) -> HostPanelView {
        self.state.view(self.display_mode)
    }
}

/// Parameters of the host panel's first load.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HostPanelQuery {
    pub message: Option<String>,
    #[serde(rename = "CollectiveId")]
    pub collective_id: Option<String>,
    #[serde(rename = "selectedOption")]
    pub selected_option: Option<String>,
}

/// Request to open the payment popup for a recurring contribution.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenPopupRequest {
    pub order_id: i64,
    #[serde(default)]
    pub legacy_payment_method_id: Option<i64>,
    pub collective_slug: String,
}

/// Collaborators wired into the shell.
pub struct Collaborators {
    pub directory: Arc<dyn CollectiveDirectory>,
    pub mutations: Arc<dyn SettingsMutations>,
    pub tokenizer: Arc<dyn Tokenizer>,
    pub notifier: Arc<dyn Notifier>,
}

pub struct SettingsShell {
    directory: Arc<dyn CollectiveDirectory>,
    mutations: Arc<dyn SettingsMutations>,
    tokenizer: Arc<dyn Tokenizer>,
    notifier: Arc<dyn Notifier>,
    request_timeout: Duration,
    host_panels: RwLock<HashMap<i64, Arc<Mutex<HostPanel>>>>,
    popups: RwLock<HashMap<Uuid, Arc<Mutex<PaymentMethodSelector>>>>,
}

impl SettingsShell {
    pub fn new(collaborators: Collaborators, request_timeout: Duration) -> Self {
        Self {
            directory: collaborators.directory,
            mutations: collaborators.mutations,
            tokenizer: collaborators.tokenizer,
            notifier: collaborators.notifier,
            request_timeout,
            host_panels: RwLock::new(HashMap::new()),
            popups: RwLock::new(HashMap::new()),
        }
    }

    /// Run a collaborator call under the request timeout.
    async fn bounded<T, F>(&self, call: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, AppError>>,
    {
        tokio::time::timeout(self.request_timeout, call).await?
    }

    fn report_failure(&self, err: &AppError) {
        if matches!(err, AppError::Remote(_) | AppError::Unavailable(_)) {
            self.notifier
                .notify(NotificationKind::Error, Some(err.message()));
        }
    }

    // ==================== HOST PANEL ====================

    /// Open the panel, or re-read it if already open.
    ///
    /// The provider callback in `query` is only honoured when the panel is created.
    pub async fn open_host_panel(
        &self,
        collective_id: i64,
        query: HostPanelQuery,
    ) -> Result<HostPanelView, AppError> {
        let collective = self.bounded(self.directory.collective(collective_id)).await?;
        let requested_mode = query
            .selected_option
            .as_deref()
            .map(|m| DisplayMode::from_query(Some(m)));

        let existing = self.host_panels.read().await.get(&collective_id).cloned();
        if let Some(panel) = existing {
            let mut guard = panel.lock().await;
            if !guard.state.is_pending() {
                guard.state.refresh(collective);
            }
            if let Some(mode) = requested_mode {
                guard.display_mode = mode;
            }
            return Ok(guard.view());
        }

        let callback =
            ProviderCallback::from_query(query.message.as_deref(), query.collective_id.as_deref());
        let (panel, created) = {
            let mut panels = self.host_panels.write().await;
            match panels.get(&collective_id) {
                Some(panel) => (panel.clone(), false),
                None => {
                    let panel = Arc::new(Mutex::new(HostPanel {
                        state: HostAssignment::new(collective, callback),
                        display_mode: requested_mode.unwrap_or_default(),
                    }));
                    panels.insert(collective_id, panel.clone());
                    (panel, true)
                }
            }
        };

        if created {
            let startup = panel.lock().await.state.take_startup_assignment();
            match startup {
                Ok(Some(ticket)) => {
                    // The panel still renders if the callback's assignment fails.
                    if let Err(err) = self.dispatch_host(&panel, ticket).await {
                        tracing::warn!("Provider callback assignment failed: {}", err);
                    }
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!("Provider callback refused: {}", err);
                    self.notifier
                        .notify(NotificationKind::Error, Some(err.message()));
                }
            }
        }

        let guard = panel.lock().await;
        Ok(guard.view())
    }

    async fn host_panel(&self, collective_id: i64) -> Result<Arc<Mutex<HostPanel>>, AppError> {
        if let Some(panel) = self.host_panels.read().await.get(&collective_id) {
            return Ok(panel.clone());
        }
        self.open_host_panel(collective_id, HostPanelQuery::default())
            .await?;
        self.host_panels
            .read()
            .await
            .get(&collective_id)
            .cloned()
            .ok_or_else(|| AppError::Internal("Host panel vanished after opening".to_string()))
    }

    async fn dispatch_host(
        &self,
        panel: &Arc<Mutex<HostPanel>>,
        ticket: HostTicket,
    ) -> Result<HostPanelView, AppError> {
        tracing::info!(
            "Assigning host {:?} to collective {}",
            ticket.host_id,
            ticket.collective_id
        );
        let result = self
            .bounded(self.mutations.assign_host(ticket.collective_id, ticket.host_id))
            .await;

        let mut guard = panel.lock().await;
        match guard.state.finish(&ticket, result) {
            Ok(effects) => {
                for effect in effects {
                    match effect {
                        HostEffect::SetDisplayMode(mode) => guard.display_mode = mode,
                    }
                }
                Ok(guard.view())
            }
            Err(err) => {
                self.report_failure(&err);
                Err(err)
            }
        }
    }

    pub async fn host_panel_view(&self, collective_id: i64) -> Result<HostPanelView, AppError> {
        let panel = self.host_panel(collective_id).await?;
        let guard = panel.lock().await;
        Ok(guard.view())
    }

    /// Request a new host for the collective.
    ///
    /// `None` is only accepted as a no-op on a collective without a host. A
    /// current host is detached through [`Self::host_dialog`].
    pub async fn assign_host(
        &self,
        collective_id: i64,
        host_id: Option<i64>,
    ) -> Result<HostPanelView, AppError> {
        let panel = self.host_panel(collective_id).await?;
        let ticket = {
            let mut guard = panel.lock().await;
            match host_id {
                Some(host_id) => guard.state.assign(host_id)?,
                None if guard.state.status() == HostStatus::NoHost => None,
                None => return Err(AppError::Guard(DETACH_THROUGH_DIALOG.to_string())),
            }
        };
        match ticket {
            Some(ticket) => self.dispatch_host(&panel, ticket).await,
            None => Ok(panel.lock().await.view()),
        }
    }

    pub async fn host_dialog(
        &self,
        collective_id: i64,
        event: DialogEvent,
    ) -> Result<HostPanelView, AppError> {
        let panel = self.host_panel(collective_id).await?;
        let ticket = panel.lock().await.state.on_dialog(event)?;
        match ticket {
            Some(ticket) => self.dispatch_host(&panel, ticket).await,
            None => Ok(panel.lock().await.view()),
        }
    }

    pub async fn set_display_mode(
        &self,
        collective_id: i64,
        mode: DisplayMode,
    ) -> Result<HostPanelView, AppError> {
        let panel = self.host_panel(collective_id).await?;
        let mut guard = panel.lock().await;
        guard.display_mode = mode;
        Ok(guard.view())
    }

    pub async fn suggested_hosts(&self, collective_id: i64) -> Result<Vec<HostSummary>, AppError> {
        let panel = self.host_panel(collective_id).await?;
        let tags = panel.lock().await.state.collective().tags.clone();
        self.bounded(self.directory.suggest_hosts(&tags, SUGGESTED_HOSTS_LIMIT))
            .await
    }

    // ==================== PAYMENT POPUP ====================

    /// Create a popup and load its options. A failed fetch leaves it loading.
    pub async fn open_popup(&self, request: OpenPopupRequest) -> Result<(Uuid, PopupView), AppError> {
        let id = Uuid::new_v4();
        let contribution = Contribution {
            id: request.order_id,
            legacy_payment_method_id: request.legacy_payment_method_id,
        };
        let popup = Arc::new(Mutex::new(PaymentMethodSelector::new(
            contribution,
            request.collective_slug,
        )));
        self.popups.write().await.insert(id, popup.clone());
        tracing::info!("Opened payment popup {} for order {}", id, request.order_id);

        let view = self.refresh_popup(&popup).await?;
        Ok((id, view))
    }

    async fn popup(&self, id: Uuid) -> Result<Arc<Mutex<PaymentMethodSelector>>, AppError> {
        self.popups
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Payment popup {} not found", id)))
    }

    /// Re-fetch the method list; options are only rebuilt when it changed.
    async fn refresh_popup(
        &self,
        popup: &Arc<Mutex<PaymentMethodSelector>>,
    ) -> Result<PopupView, AppError> {
        let slug = popup.lock().await.collective_slug().to_string();
        match self.bounded(self.directory.payment_methods(&slug)).await {
            Ok(methods) => {
                let mut guard = popup.lock().await;
                if !guard.is_closed() {
                    guard.load_methods(&methods);
                }
                Ok(guard.view())
            }
            Err(err) => {
                tracing::warn!("Failed to load payment methods for {}: {}", slug, err);
                self.notifier
                    .notify(NotificationKind::Error, Some(err.message()));
                Ok(popup.lock().await.view())
            }
        }
    }

    pub async fn popup_view(&self, id: Uuid) -> Result<PopupView, AppError> {
        let popup = self.popup(id).await?;
        self.refresh_popup(&popup).await
    }

    pub async fn select_payment_option(&self, id: Uuid, key: &str) -> Result<PopupView, AppError> {
        let popup = self.popup(id).await?;
        let mut guard = popup.lock().await;
        guard.select(key)?;
        Ok(guard.view())
    }

    pub async fn start_adding_method(&self, id: Uuid) -> Result<PopupView, AppError> {
        let popup = self.popup(id).await?;
        let mut guard = popup.lock().await;
        guard.start_adding_method()?;
        Ok(guard.view())
    }

    pub async fn cancel_adding_method(&self, id: Uuid) -> Result<PopupView, AppError> {
        let popup = self.popup(id).await?;
        let mut guard = popup.lock().await;
        guard.cancel_adding_method()?;
        Ok(guard.view())
    }

    pub async fn update_card_form(&self, id: Uuid, form: CardForm) -> Result<PopupView, AppError> {
        let popup = self.popup(id).await?;
        let mut guard = popup.lock().await;
        guard.update_card_form(form)?;
        Ok(guard.view())
    }

    /// Tokenize the card, add it, then re-fetch the collective's methods.
    pub async fn submit_new_method(&self, id: Uuid) -> Result<PopupView, AppError> {
        let popup = self.popup(id).await?;
        let begun = popup
            .lock()
            .await
            .begin_add_method_submission(self.tokenizer.is_ready());
        let ticket = match begun {
            Ok(Some(ticket)) => ticket,
            Ok(None) => return Ok(popup.lock().await.view()),
            Err(err) => {
                if matches!(err, AppError::Unavailable(_)) {
                    self.notifier.notify(
                        NotificationKind::Error,
                        Some(TOKENIZER_UNAVAILABLE.to_string()),
                    );
                }
                return Err(err);
            }
        };

        let result = self.tokenize_and_add(&ticket).await;
        let settlement = popup.lock().await.finish_add_method_submission(ticket, result);
        match settlement {
            // The card is stored; a failed re-fetch only leaves the old options.
            Settlement::Applied => self.refresh_popup(&popup).await,
            other => self.settle(&popup, other).await,
        }
    }

    async fn tokenize_and_add(&self, ticket: &AddMethodTicket) -> Result<(), AppError> {
        let token = self
            .bounded(self.tokenizer.create_token(&ticket.card_form))
            .await?;
        let new_method = token.into_new_payment_method();
        self.bounded(
            self.mutations
                .add_payment_method(&ticket.collective_slug, new_method),
        )
        .await?;
        Ok(())
    }

    /// Point the contribution at the selected method.
    pub async fn confirm_selection(&self, id: Uuid) -> Result<PopupView, AppError> {
        let popup = self.popup(id).await?;
        let begun = popup.lock().await.begin_confirm()?;
        let ticket = match begun {
            Some(ticket) => ticket,
            None => return Ok(popup.lock().await.view()),
        };

        tracing::info!(
            "Updating order {} to payment method {}",
            ticket.order_id,
            ticket.payment_method_id
        );
        let result = self
            .bounded(
                self.mutations
                    .update_order_payment_method(ticket.order_id, ticket.payment_method_id),
            )
            .await;
        let settlement = popup.lock().await.finish_confirm(ticket, result);
        if settlement == Settlement::Applied {
            self.notifier.notify(NotificationKind::Update, None);
            self.popups.write().await.remove(&id);
        }
        self.settle(&popup, settlement).await
    }

    async fn settle(
        &self,
        popup: &Arc<Mutex<PaymentMethodSelector>>,
        settlement: Settlement,
    ) -> Result<PopupView, AppError> {
        match settlement {
            Settlement::Applied => Ok(popup.lock().await.view()),
            Settlement::Failed(err) => {
                self.notifier
                    .notify(NotificationKind::Error, Some(err.message()));
                Err(err)
            }
            Settlement::Stale => {
                tracing::debug!("Discarding result for a dismissed payment popup");
                Err(AppError::Guard("The payment popup was dismissed".to_string()))
            }
        }
    }

    pub async fn dismiss_popup(&self, id: Uuid) -> Result<(), AppError> {
        let popup = self
            .popups
            .write()
            .await
            .remove(&id)
            .ok_or_else(|| AppError::NotFound(format!("Payment popup {} not found", id)))?;
        popup.lock().await.dismiss();
        tracing::info!("Dismissed payment popup {}", id);
        Ok(())
    }
}
