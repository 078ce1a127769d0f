//! Fiscal host assignment for a collective.
//!
//! [`HostAssignment`] owns the last collective snapshot returned by the
//! directory, the confirmation dialog and the single in-flight host mutation.
//! Every host change goes through [`HostAssignment::assign`] (or the dialog's
//! confirm step), which checks guards and returns a [`HostTicket`] for the
//! caller to dispatch; [`HostAssignment::finish`] applies the server's answer.

mod panel;

pub use panel::*;

use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::Collective;

/// Query-string message the payment provider sends back after onboarding.
pub const PROVIDER_CONNECTED_MESSAGE: &str = "StripeAccountConnected";

pub const EMPTY_BALANCE_FIRST: &str =
    "Empty the collective balance before changing or removing its fiscal host";

pub const DETACH_THROUGH_DIALOG: &str =
    "Withdraw the application or remove the host through the confirmation dialog";

/// Where the collective stands with its fiscal host.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum HostStatus {
    NoHost,
    PendingApplication,
    ActiveHost,
}

impl HostStatus {
    pub fn of(collective: &Collective) -> Self {
        match (&collective.host, collective.is_active) {
            (None, _) => HostStatus::NoHost,
            (Some(_), false) => HostStatus::PendingApplication,
            (Some(_), true) => HostStatus::ActiveHost,
        }
    }
}

/// Confirmation dialog in front of destructive host changes.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum HostDialog {
    Closed,
    ConfirmWithdraw,
    ConfirmRemove,
}

/// User input addressed to the dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogEvent {
    RequestWithdraw,
    RequestRemove,
    Cancel,
    Confirm,
}

/// Actions the panel offers in the current state.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum HostAction {
    AssignHost,
    Withdraw,
    RemoveHost,
}

/// Value of the `selectedOption` navigation parameter.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum DisplayMode {
    #[default]
    NoHost,
    OwnHost,
    FindHost,
}

impl DisplayMode {
    pub fn from_query(value: Option<&str>) -> Self {
        match value {
            Some("ownHost") => DisplayMode::OwnHost,
            Some("findHost") => DisplayMode::FindHost,
            _ => DisplayMode::NoHost,
        }
    }
}

/// "Payment provider connected" callback carried on the panel's first load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderCallback {
    pub host_id: i64,
}

impl ProviderCallback {
    /// Recognise the callback from the raw `message` and `CollectiveId` parameters.
    pub fn from_query(message: Option<&str>, host_id: Option<&str>) -> Option<Self> {
        if message != Some(PROVIDER_CONNECTED_MESSAGE) {
            return None;
        }
        let host_id: i64 = host_id?.trim().parse().ok()?;
        (host_id != 0).then_some(Self { host_id })
    }
}

/// A host mutation the caller must dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostTicket {
    pub collective_id: i64,
    pub host_id: Option<i64>,
}

/// Follow-up the shell performs after a successful mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEffect {
    SetDisplayMode(DisplayMode),
}

#[derive(Debug, Clone)]
pub struct HostAssignment {
    collective: Collective,
    dialog: HostDialog,
    callback: Option<ProviderCallback>,
    in_flight: bool,
}

impl HostAssignment {
    pub fn new(collective: Collective, callback: Option<ProviderCallback>) -> Self {
        Self {
            collective,
            dialog: HostDialog::Closed,
            callback,
            in_flight: false,
        }
    }

    pub fn collective(&self) -> &Collective {
        &self.collective
    }

    pub fn status(&self) -> HostStatus {
        HostStatus::of(&self.collective)
    }

    pub fn dialog(&self) -> HostDialog {
        self.dialog
    }

    pub fn is_pending(&self) -> bool {
        self.in_flight
    }

    /// Replace the snapshot with a fresher one from the directory.
    pub fn refresh(&mut self, collective: Collective) {
        self.collective = collective;
        if self.dialog_guard(self.dialog).is_err() {
            self.dialog = HostDialog::Closed;
        }
    }

    pub fn available_actions(&self) -> Vec<HostAction> {
        match self.status() {
            HostStatus::NoHost => vec![HostAction::AssignHost],
            HostStatus::PendingApplication => vec![HostAction::Withdraw],
            HostStatus::ActiveHost if self.collective.balance == 0 => vec![HostAction::RemoveHost],
            HostStatus::ActiveHost => Vec::new(),
        }
    }

    /// Consume the startup callback. Later calls always return `Ok(None)`.
    pub fn take_startup_assignment(&mut self) -> Result<Option<HostTicket>, AppError> {
        match self.callback.take() {
            Some(callback) => {
                tracing::info!(
                    "Provider callback for collective {} requests host {}",
                    self.collective.id,
                    callback.host_id
                );
                self.assign(callback.host_id)
            }
            None => Ok(None),
        }
    }

    /// Request `host_id` as the collective's host.
    ///
    /// Returns `Ok(None)` when nothing needs dispatching: the host is already
    /// `host_id`, or another host mutation is still in flight. Detaching is only
    /// reachable by confirming the withdraw or remove dialog.
    pub fn assign(&mut self, host_id: i64) -> Result<Option<HostTicket>, AppError> {
        self.dialog = HostDialog::Closed;
        self.request(Some(host_id))
    }

    fn request(&mut self, host_id: Option<i64>) -> Result<Option<HostTicket>, AppError> {
        if host_id == self.collective.host_id() || self.in_flight {
            return Ok(None);
        }
        if self.status() == HostStatus::ActiveHost && self.collective.balance != 0 {
            return Err(AppError::Guard(EMPTY_BALANCE_FIRST.to_string()));
        }

        self.in_flight = true;
        Ok(Some(HostTicket {
            collective_id: self.collective.id,
            host_id,
        }))
    }

    /// Single transition function for the confirmation dialog.
    ///
    /// Only `Confirm` can produce a ticket.
    pub fn on_dialog(&mut self, event: DialogEvent) -> Result<Option<HostTicket>, AppError> {
        match event {
            DialogEvent::RequestWithdraw => self.open(HostDialog::ConfirmWithdraw),
            DialogEvent::RequestRemove => self.open(HostDialog::ConfirmRemove),
            DialogEvent::Cancel => {
                self.dialog = HostDialog::Closed;
                Ok(None)
            }
            DialogEvent::Confirm => {
                if self.dialog == HostDialog::Closed {
                    return Err(AppError::Guard("There is nothing to confirm".to_string()));
                }
                let guarded = self.dialog_guard(self.dialog);
                self.dialog = HostDialog::Closed;
                guarded?;
                self.request(None)
            }
        }
    }

    fn open(&mut self, dialog: HostDialog) -> Result<Option<HostTicket>, AppError> {
        self.dialog_guard(dialog)?;
        self.dialog = dialog;
        Ok(None)
    }

    fn dialog_guard(&self, dialog: HostDialog) -> Result<(), AppError> {
        match (dialog, self.status()) {
            (HostDialog::Closed, _) => Ok(()),
            (HostDialog::ConfirmWithdraw, HostStatus::PendingApplication) => Ok(()),
            (HostDialog::ConfirmWithdraw, _) => Err(AppError::Guard(
                "There is no pending host application to withdraw".to_string(),
            )),
            (HostDialog::ConfirmRemove, HostStatus::ActiveHost) => {
                if self.collective.balance == 0 {
                    Ok(())
                } else {
                    Err(AppError::Guard(EMPTY_BALANCE_FIRST.to_string()))
                }
            }
            (HostDialog::ConfirmRemove, _) => Err(AppError::Guard(
                "There is no active fiscal host to remove".to_string(),
            )),
        }
    }

    /// Apply the mutation result. On failure the previous snapshot is kept.
    pub fn finish(
        &mut self,
        ticket: &HostTicket,
        result: Result<Collective, AppError>,
    ) -> Result<Vec<HostEffect>, AppError> {
        self.in_flight = false;
        let collective = result?;
        self.collective = collective;

        let mut effects = Vec::new();
        if ticket.host_id.is_none() {
            effects.push(HostEffect::SetDisplayMode(DisplayMode::NoHost));
        }
        Ok(effects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HostSummary;

    fn collective(host: Option<i64>, is_active: bool, balance: i64) -> Collective {
        Collective {
            id: 12,
            slug: "webpack".to_string(),
            name: "Webpack".to_string(),
            host: host.map(|id| HostSummary {
                id,
                name: "Open Source Collective".to_string(),
                hosted_collectives: 3,
            }),
            is_active,
            balance,
            currency: "USD".to_string(),
            tags: Vec::new(),
            members: Vec::new(),
        }
    }

    fn ticket(host_id: Option<i64>) -> HostTicket {
        HostTicket {
            collective_id: 12,
            host_id,
        }
    }

    #[test]
    fn test_status_from_snapshot() {
        assert_eq!(HostStatus::of(&collective(None, false, 0)), HostStatus::NoHost);
        assert_eq!(
            HostStatus::of(&collective(Some(9), false, 0)),
            HostStatus::PendingApplication
        );
        assert_eq!(HostStatus::of(&collective(Some(9), true, 0)), HostStatus::ActiveHost);
    }

    #[test]
    fn test_assign_from_no_host() {
        let mut state = HostAssignment::new(collective(None, false, 0), None);
        assert_eq!(state.available_actions(), vec![HostAction::AssignHost]);

        assert_eq!(state.assign(5).unwrap(), Some(ticket(Some(5))));
        assert!(state.is_pending());
        assert_eq!(state.assign(6).unwrap(), None);

        let effects = state
            .finish(&ticket(Some(5)), Ok(collective(Some(5), false, 0)))
            .unwrap();
        assert!(effects.is_empty());
        assert_eq!(state.status(), HostStatus::PendingApplication);
    }

    #[test]
    fn test_assign_same_host_is_noop_in_every_state() {
        for (active, balance) in [(false, 0), (true, 700)] {
            let mut state = HostAssignment::new(collective(Some(9), active, balance), None);
            assert_eq!(state.assign(9).unwrap(), None);
            assert!(!state.is_pending());
        }
    }

    #[test]
    fn test_remove_active_host_with_empty_balance() {
        let mut state = HostAssignment::new(collective(Some(9), true, 0), None);
        assert_eq!(state.available_actions(), vec![HostAction::RemoveHost]);

        assert_eq!(state.on_dialog(DialogEvent::RequestRemove).unwrap(), None);
        assert_eq!(state.dialog(), HostDialog::ConfirmRemove);

        let issued = state.on_dialog(DialogEvent::Confirm).unwrap();
        assert_eq!(issued, Some(ticket(None)));
        assert_eq!(state.dialog(), HostDialog::Closed);

        let effects = state.finish(&ticket(None), Ok(collective(None, false, 0))).unwrap();
        assert_eq!(effects, vec![HostEffect::SetDisplayMode(DisplayMode::NoHost)]);
        assert_eq!(state.status(), HostStatus::NoHost);
    }

    #[test]
    fn test_remove_refused_with_balance() {
        for balance in [1500, 1, -20] {
            let mut state = HostAssignment::new(collective(Some(9), true, balance), None);
            assert!(state.available_actions().is_empty());

            let err = state.on_dialog(DialogEvent::RequestRemove).unwrap_err();
            assert_eq!(err, AppError::Guard(EMPTY_BALANCE_FIRST.to_string()));
            assert_eq!(state.dialog(), HostDialog::Closed);
            assert!(matches!(state.assign(5), Err(AppError::Guard(_))));
            assert_eq!(state.collective().host_id(), Some(9));
            assert!(!state.is_pending());
        }
    }

    #[test]
    fn test_withdraw_only_while_pending() {
        let mut active = HostAssignment::new(collective(Some(9), true, 0), None);
        assert!(matches!(
            active.on_dialog(DialogEvent::RequestWithdraw),
            Err(AppError::Guard(_))
        ));

        let mut pending = HostAssignment::new(collective(Some(9), false, 0), None);
        pending.on_dialog(DialogEvent::RequestWithdraw).unwrap();
        assert_eq!(pending.dialog(), HostDialog::ConfirmWithdraw);
        pending.on_dialog(DialogEvent::Cancel).unwrap();
        assert_eq!(pending.dialog(), HostDialog::Closed);
        assert!(matches!(
            pending.on_dialog(DialogEvent::Confirm),
            Err(AppError::Guard(_))
        ));

        pending.on_dialog(DialogEvent::RequestWithdraw).unwrap();
        assert_eq!(
            pending.on_dialog(DialogEvent::Confirm).unwrap(),
            Some(ticket(None))
        );
    }

    #[test]
    fn test_failed_mutation_keeps_host() {
        let mut state = HostAssignment::new(collective(Some(9), false, 0), None);
        state.on_dialog(DialogEvent::RequestWithdraw).unwrap();
        let issued = state.on_dialog(DialogEvent::Confirm).unwrap().unwrap();

        let err = AppError::Remote("Host application not found".to_string());
        assert_eq!(state.finish(&issued, Err(err.clone())).unwrap_err(), err);
        assert_eq!(state.dialog(), HostDialog::Closed);
        assert_eq!(state.collective().host_id(), Some(9));
        assert!(!state.is_pending());
    }

    #[test]
    fn test_refresh_closes_dialog_that_no_longer_applies() {
        let mut state = HostAssignment::new(collective(Some(9), true, 0), None);
        state.on_dialog(DialogEvent::RequestRemove).unwrap();

        state.refresh(collective(Some(9), true, 200));
        assert_eq!(state.dialog(), HostDialog::Closed);
    }

    #[test]
    fn test_provider_callback_is_consumed_once() {
        let callback = ProviderCallback::from_query(Some("StripeAccountConnected"), Some("44"));
        let mut state = HostAssignment::new(collective(None, false, 0), callback);

        assert_eq!(state.take_startup_assignment().unwrap(), Some(ticket(Some(44))));
        state
            .finish(&ticket(Some(44)), Ok(collective(Some(44), true, 0)))
            .unwrap();
        assert_eq!(state.take_startup_assignment().unwrap(), None);
    }

    #[test]
    fn test_provider_callback_for_current_host_does_nothing() {
        let callback = ProviderCallback::from_query(Some("StripeAccountConnected"), Some("9"));
        let mut state = HostAssignment::new(collective(Some(9), true, 0), callback);
        assert_eq!(state.take_startup_assignment().unwrap(), None);
        assert!(!state.is_pending());
    }

    #[test]
    fn test_provider_callback_parsing() {
        assert_eq!(
            ProviderCallback::from_query(Some("StripeAccountConnected"), Some("7")),
            Some(ProviderCallback { host_id: 7 })
        );
        assert_eq!(ProviderCallback::from_query(Some("StripeAccountConnected"), Some("0")), None);
        assert_eq!(ProviderCallback::from_query(Some("StripeAccountConnected"), Some("x")), None);
        assert_eq!(ProviderCallback::from_query(Some("Other"), Some("7")), None);
        assert_eq!(ProviderCallback::from_query(None, Some("7")), None);
    }

    #[test]
    fn test_display_mode_from_query() {
        assert_eq!(DisplayMode::from_query(Some("findHost")), DisplayMode::FindHost);
        assert_eq!(DisplayMode::from_query(Some("ownHost")), DisplayMode::OwnHost);
        assert_eq!(DisplayMode::from_query(Some("bogus")), DisplayMode::NoHost);
        assert_eq!(DisplayMode::from_query(None), DisplayMode::NoHost);
    }
}
