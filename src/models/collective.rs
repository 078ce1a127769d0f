//! Collective model with its fiscal host and memberships.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role a membership grants inside a collective.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberRole {
    Host,
    Admin,
    Member,
    Backer,
    #[serde(other)]
    Other,
}

/// A membership record linking the collective to another account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub role: MemberRole,
    pub created_at: DateTime<Utc>,
}

/// The fiscal host as seen from a hosted collective.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HostSummary {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub hosted_collectives: u32,
}

/// A funded entity whose host settings are being edited.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Collective {
    pub id: i64,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub host: Option<HostSummary>,
    #[serde(default)]
    pub is_active: bool,
    /// Balance held by the host, in the currency's minor unit
    #[serde(default)]
    pub balance: i64,
    pub currency: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub members: Vec<Membership>,
}

impl Collective {
    pub fn host_id(&self) -> Option<i64> {
        self.host.as_ref().map(|h| h.id)
    }

    /// The membership that binds the collective to its host, if any.
    pub fn host_membership(&self) -> Option<&Membership> {
        self.members.iter().find(|m| m.role == MemberRole::Host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collective_from_wire() {
        let collective: Collective = serde_json::from_value(serde_json::json!({
            "id": 12,
            "slug": "webpack",
            "name": "Webpack",
            "host": { "id": 9, "name": "Open Source Collective", "hostedCollectives": 2400 },
            "isActive": true,
            "balance": 1500,
            "currency": "USD",
            "members": [
                { "role": "ADMIN", "createdAt": "2019-02-01T10:00:00Z" },
                { "role": "HOST", "createdAt": "2019-03-04T10:00:00Z" },
                { "role": "FUNDRAISER", "createdAt": "2019-05-01T10:00:00Z" }
            ]
        }))
        .unwrap();

        assert_eq!(collective.host_id(), Some(9));
        assert!(collective.tags.is_empty());
        assert_eq!(collective.members[2].role, MemberRole::Other);
        let membership = collective.host_membership().unwrap();
        assert_eq!(membership.created_at.to_rfc3339(), "2019-03-04T10:00:00+00:00");
    }

    #[test]
    fn test_collective_without_host() {
        let collective: Collective = serde_json::from_value(serde_json::json!({
            "id": 3,
            "slug": "tiny",
            "name": "Tiny",
            "host": null,
            "currency": "EUR"
        }))
        .unwrap();

        assert_eq!(collective.host_id(), None);
        assert!(!collective.is_active);
        assert!(collective.host_membership().is_none());
    }
}
