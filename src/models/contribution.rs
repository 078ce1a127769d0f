//! Recurring contribution reference used by the payment popup.

use serde::{Deserialize, Serialize};

/// A recurring contribution (order) whose payment method is being changed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Contribution {
    /// Order identifier used by the update mutation
    pub id: i64,
    /// Payment method currently charged by this contribution
    #[serde(default)]
    pub legacy_payment_method_id: Option<i64>,
}
