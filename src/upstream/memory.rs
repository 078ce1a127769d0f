//! In-memory directory seeded from a JSON fixture.
//!
//! Stands in for the remote API in development and tests. Nothing is written back
//! to the fixture file.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tokio::sync::RwLock;

use super::{CollectiveDirectory, SettingsMutations};
use crate::errors::AppError;
use crate::models::{
    Collective, Contribution, HostSummary, MemberRole, Membership, NewPaymentMethod,
    PaymentMethod, PaymentMethodKind,
};

/// Cards have no stored balance; they report a nominal one so they stay usable.
pub const CARD_NOMINAL_BALANCE: i64 = 10_000_000;

/// A fiscal host that collectives can apply to.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostRecord {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub hosted_collectives: u32,
    /// Applications are approved immediately (own host or open host)
    #[serde(default)]
    pub auto_approve: bool,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl HostRecord {
    fn summary(&self) -> HostSummary {
        HostSummary {
            id: self.id,
            name: self.name.clone(),
            hosted_collectives: self.hosted_collectives,
        }
    }
}

/// Fixture file layout.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fixture {
    #[serde(default)]
    pub hosts: Vec<HostRecord>,
    #[serde(default)]
    pub collectives: Vec<Collective>,
    /// Payment methods keyed by collective slug
    #[serde(default)]
    pub payment_methods: HashMap<String, Vec<PaymentMethod>>,
    #[serde(default)]
    pub orders: Vec<Contribution>,
}

pub struct InMemoryDirectory {
    data: RwLock<Fixture>,
}

impl InMemoryDirectory {
    pub fn new(fixture: Fixture) -> Self {
        Self {
            data: RwLock::new(fixture),
        }
    }

    /// Load a fixture file; a missing file yields an empty directory.
    pub async fn from_fixture_file(path: &Path) -> Result<Self, AppError> {
        let fixture = match tokio::fs::read_to_string(path).await {
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("Fixture {:?} not found, starting with an empty directory", path);
                Fixture::default()
            }
            Err(e) => return Err(e.into()),
        };
        tracing::info!(
            "Loaded {} collectives and {} hosts from fixture",
            fixture.collectives.len(),
            fixture.hosts.len()
        );
        Ok(Self::new(fixture))
    }

    /// Current payment method of an order, as last written.
    #[cfg(test)]
    pub async fn order(&self, order_id: i64) -> Option<Contribution> {
        let data = self.data.read().await;
        data.orders.iter().find(|o| o.id == order_id).cloned()
    }
}

#[async_trait]
impl CollectiveDirectory for InMemoryDirectory {
    async fn collective(&self, collective_id: i64) -> Result<Collective, AppError> {
        let data = self.data.read().await;
        data.collectives
            .iter()
            .find(|c| c.id == collective_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Collective {} not found", collective_id)))
    }

    async fn payment_methods(&self, collective_slug: &str) -> Result<Vec<PaymentMethod>, AppError> {
        let data = self.data.read().await;
        if !data.collectives.iter().any(|c| c.slug == collective_slug) {
            return Err(AppError::NotFound(format!(
                "Collective {} not found",
                collective_slug
            )));
        }
        Ok(data
            .payment_methods
            .get(collective_slug)
            .cloned()
            .unwrap_or_default())
    }

    async fn suggest_hosts(
        &self,
        tags: &[String],
        limit: usize,
    ) -> Result<Vec<HostSummary>, AppError> {
        let data = self.data.read().await;
        let mut ranked: Vec<(usize, &HostRecord)> = data
            .hosts
            .iter()
            .map(|h| (h.tags.iter().filter(|t| tags.contains(t)).count(), h))
            .filter(|(shared, _)| tags.is_empty() || *shared > 0)
            .collect();
        ranked.sort_by(|(a_shared, a), (b_shared, b)| {
            b_shared
                .cmp(a_shared)
                .then(b.hosted_collectives.cmp(&a.hosted_collectives))
        });
        Ok(ranked
            .into_iter()
            .take(limit)
            .map(|(_, h)| h.summary())
            .collect())
    }
}

#[async_trait]
impl SettingsMutations for InMemoryDirectory {
    async fn assign_host(
        &self,
        collective_id: i64,
        host_id: Option<i64>,
    ) -> Result<Collective, AppError> {
        let mut data = self.data.write().await;
        let host = match host_id {
            Some(id) => Some(
                data.hosts
                    .iter()
                    .find(|h| h.id == id)
                    .cloned()
                    .ok_or_else(|| AppError::Remote(format!("Host {} does not exist", id)))?,
            ),
            None => None,
        };
        let collective = data
            .collectives
            .iter_mut()
            .find(|c| c.id == collective_id)
            .ok_or_else(|| AppError::Remote(format!("Collective {} does not exist", collective_id)))?;

        if collective.is_active && collective.balance != 0 {
            return Err(AppError::Remote(
                "Unable to change host: your collective still has a balance".to_string(),
            ));
        }

        collective.members.retain(|m| m.role != MemberRole::Host);
        match host {
            Some(host) => {
                collective.is_active = host.auto_approve;
                collective.host = Some(host.summary());
                collective.members.push(Membership {
                    role: MemberRole::Host,
                    created_at: Utc::now(),
                });
            }
            None => {
                collective.is_active = false;
                collective.host = None;
            }
        }
        tracing::info!(
            "Collective {} host set to {:?} (active: {})",
            collective_id,
            host_id,
            collective.is_active
        );
        Ok(collective.clone())
    }

    async fn add_payment_method(
        &self,
        collective_slug: &str,
        new_method: NewPaymentMethod,
    ) -> Result<i64, AppError> {
        let mut data = self.data.write().await;
        let owner = data
            .collectives
            .iter()
            .find(|c| c.slug == collective_slug)
            .map(|c| (c.id, c.currency.clone()))
            .ok_or_else(|| {
                AppError::Remote(format!("Collective {} does not exist", collective_slug))
            })?;

        let next_id = data
            .payment_methods
            .values()
            .flatten()
            .map(|pm| pm.id)
            .max()
            .unwrap_or(0)
            + 1;

        data.payment_methods
            .entry(collective_slug.to_string())
            .or_default()
            .push(PaymentMethod {
                id: next_id,
                kind: PaymentMethodKind::CreditCard {
                    card: Some(new_method.data),
                },
                name: Some(new_method.name),
                balance: CARD_NOMINAL_BALANCE,
                currency: owner.1,
                expiry_date: None,
                collective_id: owner.0,
                subscription_ids: Vec::new(),
            });
        tracing::info!("Added payment method {} for {}", next_id, collective_slug);
        Ok(next_id)
    }

    async fn update_order_payment_method(
        &self,
        order_id: i64,
        payment_method_id: i64,
    ) -> Result<(), AppError> {
        let mut data = self.data.write().await;
        if !data
            .payment_methods
            .values()
            .flatten()
            .any(|pm| pm.id == payment_method_id)
        {
            return Err(AppError::Remote(format!(
                "Payment method {} does not exist",
                payment_method_id
            )));
        }

        let order = data
            .orders
            .iter_mut()
            .find(|o| o.id == order_id)
            .ok_or_else(|| AppError::Remote(format!("Order {} does not exist", order_id)))?;
        let previous = order.legacy_payment_method_id.replace(payment_method_id);

        for pm in data.payment_methods.values_mut().flatten() {
            if Some(pm.id) == previous {
                pm.subscription_ids.retain(|id| *id != order_id);
            }
            if pm.id == payment_method_id && !pm.subscription_ids.contains(&order_id) {
                pm.subscription_ids.push(order_id);
            }
        }
        Ok(())
    }
}
