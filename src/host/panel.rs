//! Read model of the host settings panel.

use serde::Serialize;

use super::{DisplayMode, HostAction, HostAssignment, HostDialog, HostStatus};
use crate::format::{format_currency, format_long_date};
use crate::models::HostSummary;

/// Number of hosts suggested while looking for a fiscal host.
pub const SUGGESTED_HOSTS_LIMIT: usize = 6;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DialogView {
    pub kind: HostDialog,
    pub title: String,
    pub body: String,
    pub confirm_label: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostPanelView {
    pub collective_id: i64,
    pub status: HostStatus,
    pub host: Option<HostSummary>,
    pub actions: Vec<HostAction>,
    pub notices: Vec<String>,
    pub dialog: Option<DialogView>,
    pub pending: bool,
    pub selected_option: DisplayMode,
    /// Set while looking for a host and the collective has tags
    pub suggestions_description: Option<String>,
}

impl HostAssignment {
    pub fn view(&self, selected_option: DisplayMode) -> HostPanelView {
        let collective = self.collective();
        let host_name = collective.host.as_ref().map(|h| h.name.as_str()).unwrap_or("");

        let suggestions_description = (self.status() == HostStatus::NoHost
            && selected_option == DisplayMode::FindHost
            && !collective.tags.is_empty())
        .then(|| {
            format!(
                "Based on the tags of your Collective ({})",
                collective.tags.join(", ")
            )
        });

        HostPanelView {
            collective_id: collective.id,
            status: self.status(),
            host: collective.host.clone(),
            actions: self.available_actions(),
            notices: self.notices(),
            dialog: dialog_view(self.dialog(), host_name),
            pending: self.is_pending(),
            selected_option,
            suggestions_description,
        }
    }

    fn notices(&self) -> Vec<String> {
        let collective = self.collective();
        let Some(host) = &collective.host else {
            return Vec::new();
        };

        match self.status() {
            HostStatus::PendingApplication => {
                let applied_on = collective
                    .host_membership()
                    .map(|m| format!(" on {}", format_long_date(&m.created_at)))
                    .unwrap_or_default();
                vec![format!(
                    "You have applied to be hosted by {}{}. Your application is being reviewed.",
                    host.name, applied_on
                )]
            }
            HostStatus::ActiveHost => {
                let hosting = match host.hosted_collectives {
                    1 => "one collective".to_string(),
                    n => format!("{} collectives", n),
                };
                let mut notices = vec![format!(
                    "Your fiscal host is {}. It is currently hosting {}",
                    host.name, hosting
                )];
                if collective.balance > 0 {
                    notices.push(format!(
                        "Your host currently holds {} on behalf of your Collective.",
                        format_currency(collective.balance, &collective.currency)
                    ));
                    notices.push(
                        "If you would like to change fiscal host, you first need to empty your \
                         Collective balance. You can do this by submitting expenses, or by \
                         transferring funds to another Collective or to your host."
                            .to_string(),
                    );
                } else if collective.balance == 0 {
                    notices.push(
                        "Once removed, your Collective won't be able to accept financial \
                         contributions anymore. You will be able to apply to another host."
                            .to_string(),
                    );
                }
                notices
            }
            HostStatus::NoHost => Vec::new(),
        }
    }
}

fn dialog_view(dialog: HostDialog, name: &str) -> Option<DialogView> {
    match dialog {
        HostDialog::Closed => None,
        HostDialog::ConfirmWithdraw => Some(DialogView {
            kind: dialog,
            title: format!("Withdraw application from {}", name),
            body: format!("Are you sure you want to withdraw application from {}?", name),
            confirm_label: "Withdraw",
        }),
        HostDialog::ConfirmRemove => Some(DialogView {
            kind: dialog,
            title: format!("Remove {}", name),
            body: format!("Are you sure you want to remove {}?", name),
            confirm_label: "Remove",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::DialogEvent;
    use crate::models::{Collective, MemberRole, Membership};
    use chrono::{TimeZone, Utc};

    fn collective(is_active: bool, balance: i64, hosted: u32) -> Collective {
        Collective {
            id: 12,
            slug: "webpack".to_string(),
            name: "Webpack".to_string(),
            host: Some(HostSummary {
                id: 9,
                name: "Open Source Collective".to_string(),
                hosted_collectives: hosted,
            }),
            is_active,
            balance,
            currency: "USD".to_string(),
            tags: vec!["javascript".to_string(), "tooling".to_string()],
            members: vec![Membership {
                role: MemberRole::Host,
                created_at: Utc.with_ymd_and_hms(2019, 3, 4, 10, 0, 0).unwrap(),
            }],
        }
    }

    #[test]
    fn test_pending_notice_mentions_application_date() {
        let state = HostAssignment::new(collective(false, 0, 10), None);
        let view = state.view(DisplayMode::NoHost);

        assert_eq!(
            view.notices,
            vec![
                "You have applied to be hosted by Open Source Collective on March 4, 2019. \
                 Your application is being reviewed."
                    .to_string()
            ]
        );
        assert_eq!(view.actions, vec![HostAction::Withdraw]);
    }

    #[test]
    fn test_active_notices_with_balance() {
        let state = HostAssignment::new(collective(true, 1500, 1), None);
        let view = state.view(DisplayMode::NoHost);

        assert_eq!(
            view.notices[0],
            "Your fiscal host is Open Source Collective. It is currently hosting one collective"
        );
        assert_eq!(
            view.notices[1],
            "Your host currently holds $15.00 on behalf of your Collective."
        );
        assert!(view.actions.is_empty());
    }

    #[test]
    fn test_remove_dialog_text() {
        let mut state = HostAssignment::new(collective(true, 0, 42), None);
        state.on_dialog(DialogEvent::RequestRemove).unwrap();
        let view = state.view(DisplayMode::NoHost);

        assert!(view.notices[0].ends_with("hosting 42 collectives"));
        let dialog = view.dialog.unwrap();
        assert_eq!(dialog.title, "Remove Open Source Collective");
        assert_eq!(dialog.body, "Are you sure you want to remove Open Source Collective?");
        assert_eq!(dialog.confirm_label, "Remove");
    }

    #[test]
    fn test_suggestions_description_only_when_finding_host() {
        let mut without_host = collective(false, 0, 0);
        without_host.host = None;
        without_host.members.clear();
        let state = HostAssignment::new(without_host, None);

        assert_eq!(
            state.view(DisplayMode::FindHost).suggestions_description.as_deref(),
            Some("Based on the tags of your Collective (javascript, tooling)")
        );
        assert!(state.view(DisplayMode::OwnHost).suggestions_description.is_none());
        assert!(state.view(DisplayMode::FindHost).notices.is_empty());
    }
}
