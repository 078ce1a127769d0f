//! Payment method model for recurring contributions.

use serde::{Deserialize, Serialize};

/// Card metadata returned by the payment processor.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct CardData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp_month: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp_year: Option<i32>,
}

/// What kind of funding source a payment method is.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PaymentMethodKind {
    CreditCard { card: Option<CardData> },
    VirtualCard,
    Prepaid,
    Collective,
    /// A type string this service does not know how to present.
    Other(String),
}

impl PaymentMethodKind {
    pub fn from_wire(kind: &str, data: Option<CardData>) -> Self {
        match kind {
            "creditcard" => PaymentMethodKind::CreditCard { card: data },
            "virtualcard" => PaymentMethodKind::VirtualCard,
            "prepaid" => PaymentMethodKind::Prepaid,
            "collective" => PaymentMethodKind::Collective,
            other => PaymentMethodKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            PaymentMethodKind::CreditCard { .. } => "creditcard",
            PaymentMethodKind::VirtualCard => "virtualcard",
            PaymentMethodKind::Prepaid => "prepaid",
            PaymentMethodKind::Collective => "collective",
            PaymentMethodKind::Other(kind) => kind,
        }
    }
}

/// A stored funding source owned by a collective.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(from = "PaymentMethodRecord", into = "PaymentMethodRecord")]
pub struct PaymentMethod {
    pub id: i64,
    pub kind: PaymentMethodKind,
    pub name: Option<String>,
    /// Remaining balance in the currency's minor unit
    pub balance: i64,
    pub currency: String,
    pub expiry_date: Option<String>,
    pub collective_id: i64,
    /// Orders with an active subscription charged to this method
    pub subscription_ids: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IdRef {
    id: i64,
}

/// Wire shape of a payment method as the query collaborator returns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaymentMethodRecord {
    id: i64,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<CardData>,
    #[serde(default)]
    balance: i64,
    currency: String,
    #[serde(default)]
    expiry_date: Option<String>,
    collective: IdRef,
    #[serde(default)]
    subscriptions: Vec<IdRef>,
}

impl From<PaymentMethodRecord> for PaymentMethod {
    fn from(record: PaymentMethodRecord) -> Self {
        Self {
            id: record.id,
            kind: PaymentMethodKind::from_wire(&record.kind, record.data),
            name: record.name,
            balance: record.balance,
            currency: record.currency,
            expiry_date: record.expiry_date,
            collective_id: record.collective.id,
            subscription_ids: record.subscriptions.into_iter().map(|s| s.id).collect(),
        }
    }
}

impl From<PaymentMethod> for PaymentMethodRecord {
    fn from(pm: PaymentMethod) -> Self {
        let kind = pm.kind.as_str().to_string();
        let data = match pm.kind {
            PaymentMethodKind::CreditCard { card } => card,
            _ => None,
        };
        Self {
            id: pm.id,
            kind,
            name: pm.name,
            data,
            balance: pm.balance,
            currency: pm.currency,
            expiry_date: pm.expiry_date,
            collective: IdRef {
                id: pm.collective_id,
            },
            subscriptions: pm
                .subscription_ids
                .into_iter()
                .map(|id| IdRef { id })
                .collect(),
        }
    }
}

/// Input of the add-payment-method mutation, built from a card token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewPaymentMethod {
    pub name: String,
    pub token: String,
    pub data: CardData,
}

/// Card form state as reported by the embedded processor form.
///
/// Only `complete` matters to the popup; the other fields travel to the tokenizer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CardForm {
    pub complete: bool,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub last4: Option<String>,
    #[serde(default)]
    pub exp_month: Option<u32>,
    #[serde(default)]
    pub exp_year: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credit_card_keeps_card_data() {
        let pm: PaymentMethod = serde_json::from_value(serde_json::json!({
            "id": 7,
            "type": "creditcard",
            "name": "4242",
            "data": { "brand": "Visa", "expMonth": 3, "expYear": 2027 },
            "balance": 100000,
            "currency": "USD",
            "collective": { "id": 40 },
            "subscriptions": [{ "id": 501 }, { "id": 502 }]
        }))
        .unwrap();

        let card = match &pm.kind {
            PaymentMethodKind::CreditCard { card } => card.clone().unwrap(),
            other => panic!("unexpected kind {:?}", other),
        };
        assert_eq!(card.brand.as_deref(), Some("Visa"));
        assert_eq!(pm.collective_id, 40);
        assert_eq!(pm.subscription_ids, vec![501, 502]);
    }

    #[test]
    fn test_unknown_type_is_preserved() {
        let pm: PaymentMethod = serde_json::from_value(serde_json::json!({
            "id": 8,
            "type": "paypal",
            "currency": "EUR",
            "collective": { "id": 1 }
        }))
        .unwrap();

        assert_eq!(pm.kind, PaymentMethodKind::Other("paypal".to_string()));
        assert_eq!(pm.balance, 0);

        let value = serde_json::to_value(&pm).unwrap();
        assert_eq!(value["type"], "paypal");
        assert_eq!(value["collective"]["id"], 1);
    }
}
