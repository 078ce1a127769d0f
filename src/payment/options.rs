//! Ranked, annotated payment options derived from a collective's payment methods.

use std::collections::HashSet;

use serde::Serialize;

use crate::format::{format_card_expiry, format_currency, format_month_year};
use crate::models::{PaymentMethod, PaymentMethodKind};

/// Balances below this amount (minor units) cannot be used to pay.
pub const MIN_USABLE_BALANCE: i64 = 50;

/// Icon the UI draws next to an option.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PaymentIcon {
    CreditCard,
    GiftCard,
    MoneyCheck,
}

/// One selectable row of the payment popup.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOption {
    pub key: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<PaymentIcon>,
    pub disabled: bool,
    pub payment_method_id: i64,
    pub collective_id: i64,
    /// Whether the contribution is currently charged to this method
    pub is_current: bool,
}

pub fn option_key(payment_method_id: i64) -> String {
    format!("pm-{}", payment_method_id)
}

/// Build the option list for a contribution currently charged to `current_id`.
///
/// Options are deduplicated by key (first occurrence wins) and the current
/// method, if present, is moved to the front without reordering the rest.
pub fn build_options(methods: &[PaymentMethod], current_id: Option<i64>) -> Vec<PaymentOption> {
    let mut seen = HashSet::with_capacity(methods.len());
    let mut options: Vec<PaymentOption> = methods
        .iter()
        .map(|pm| to_option(pm, current_id))
        .filter(|option| seen.insert(option.key.clone()))
        .collect();

    let mut matches = options.iter().enumerate().filter(|(_, o)| o.is_current);
    let first_match = matches.next().map(|(idx, _)| idx);
    debug_assert!(
        matches.next().is_none(),
        "more than one option matches the current payment method"
    );

    if let Some(idx) = first_match {
        let current = options.remove(idx);
        options.insert(0, current);
    }
    options
}

/// The option the contribution is currently charged to, if it is still listed.
pub fn resolve_default(options: &[PaymentOption], current_id: Option<i64>) -> Option<&PaymentOption> {
    let current_id = current_id?;
    options.iter().find(|o| o.payment_method_id == current_id)
}

fn to_option(pm: &PaymentMethod, current_id: Option<i64>) -> PaymentOption {
    PaymentOption {
        key: option_key(pm.id),
        title: payment_method_title(pm),
        subtitle: payment_method_subtitle(pm),
        icon: payment_method_icon(&pm.kind),
        disabled: pm.balance < MIN_USABLE_BALANCE,
        payment_method_id: pm.id,
        collective_id: pm.collective_id,
        is_current: current_id == Some(pm.id),
    }
}

pub fn payment_method_icon(kind: &PaymentMethodKind) -> Option<PaymentIcon> {
    match kind {
        PaymentMethodKind::CreditCard { .. } => Some(PaymentIcon::CreditCard),
        PaymentMethodKind::VirtualCard => Some(PaymentIcon::GiftCard),
        PaymentMethodKind::Prepaid => Some(PaymentIcon::MoneyCheck),
        PaymentMethodKind::Collective | PaymentMethodKind::Other(_) => None,
    }
}

pub fn payment_method_title(pm: &PaymentMethod) -> String {
    let name = pm.name.as_deref().filter(|n| !n.trim().is_empty());
    match &pm.kind {
        PaymentMethodKind::CreditCard { card } => {
            let brand = card
                .as_ref()
                .and_then(|c| c.brand.as_deref())
                .unwrap_or("Card");
            match name {
                Some(last4) => format!("{} **** {}", brand, last4),
                None => brand.to_string(),
            }
        }
        PaymentMethodKind::VirtualCard => name.unwrap_or("Gift card").to_string(),
        PaymentMethodKind::Prepaid => name.unwrap_or("Prepaid budget").to_string(),
        PaymentMethodKind::Collective => name.unwrap_or("Collective balance").to_string(),
        PaymentMethodKind::Other(kind) => name.unwrap_or(kind).to_string(),
    }
}

pub fn payment_method_subtitle(pm: &PaymentMethod) -> Option<String> {
    let balance = || format_currency(pm.balance, &pm.currency);
    match &pm.kind {
        PaymentMethodKind::CreditCard { card } => {
            let from_card = card
                .as_ref()
                .and_then(|c| Some(format_card_expiry(c.exp_month?, c.exp_year?)));
            match from_card.or_else(|| pm.expiry_date.clone()) {
                Some(expiry) => Some(format!("Expires on {}", expiry)),
                None => Some("Expires on".to_string()),
            }
        }
        PaymentMethodKind::VirtualCard => {
            if pm.balance < MIN_USABLE_BALANCE {
                Some(format!(
                    "{} left, balance less than {} cannot be used",
                    balance(),
                    format_currency(MIN_USABLE_BALANCE, &pm.currency)
                ))
            } else if let Some(expiry) = &pm.expiry_date {
                Some(format!("{} left, expires {}", balance(), format_month_year(expiry)))
            } else {
                Some(format!("{} left", balance()))
            }
        }
        PaymentMethodKind::Prepaid | PaymentMethodKind::Collective => {
            Some(format!("{} left", balance()))
        }
        PaymentMethodKind::Other(_) => None,
    }
}
