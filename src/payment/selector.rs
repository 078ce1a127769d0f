//! Payment popup state: the ranked options, the user's choice and the
//! add-new-method sub-flow.
//!
//! Remote work is split in two phases. `begin_*` validates the request and
//! marks its button pending, handing back a ticket; the caller releases the
//! popup while the collaborator runs, then passes the outcome to `finish_*`.
//! A ticket issued before the popup was dismissed settles as [`Settlement::Stale`].

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::Serialize;

use super::options::{build_options, resolve_default, PaymentOption};
use crate::errors::AppError;
use crate::models::{CardForm, Contribution, PaymentMethod};

/// Advisory shown when the card tokenizer never finished initialising.
pub const TOKENIZER_UNAVAILABLE: &str =
    "There was a problem initializing the payment form. Please reload the page and try again";

/// Which half of the popup is showing.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SelectorMode {
    Selecting,
    AddingMethod,
}

/// Buttons currently waiting on a collaborator.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PendingButtons {
    pub add_method: bool,
    pub confirm: bool,
}

/// Outcome of applying a collaborator result to the popup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    Applied,
    Failed(AppError),
    /// The popup was dismissed while the request was in flight.
    Stale,
}

/// Issued by [`PaymentMethodSelector::begin_add_method_submission`].
#[derive(Debug, Clone)]
pub struct AddMethodTicket {
    generation: u64,
    pub collective_slug: String,
    pub card_form: CardForm,
}

/// Issued by [`PaymentMethodSelector::begin_confirm`].
#[derive(Debug, Clone)]
pub struct ConfirmTicket {
    generation: u64,
    pub order_id: i64,
    pub payment_method_id: i64,
}

#[derive(Debug, Clone)]
struct OptionCache {
    fingerprint: u64,
    options: Vec<PaymentOption>,
    default_key: Option<String>,
}

/// Serializable snapshot of the popup.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PopupView {
    pub order_id: i64,
    pub collective_slug: String,
    pub title: &'static str,
    pub mode: SelectorMode,
    pub loading: bool,
    pub options: Vec<PaymentOption>,
    pub default_key: Option<String>,
    pub active_selection: Option<String>,
    pub card_form_complete: bool,
    pub pending: PendingButtons,
    pub closed: bool,
}

/// Selection state for one recurring contribution's payment popup.
#[derive(Debug, Clone)]
pub struct PaymentMethodSelector {
    contribution: Contribution,
    collective_slug: String,
    cache: Option<OptionCache>,
    selection: Option<String>,
    mode: SelectorMode,
    card_form: Option<CardForm>,
    pending: PendingButtons,
    generation: u64,
    closed: bool,
}

impl PaymentMethodSelector {
    pub fn new(contribution: Contribution, collective_slug: impl Into<String>) -> Self {
        Self {
            contribution,
            collective_slug: collective_slug.into(),
            cache: None,
            selection: None,
            mode: SelectorMode::Selecting,
            card_form: None,
            pending: PendingButtons::default(),
            generation: 0,
            closed: false,
        }
    }

    pub fn collective_slug(&self) -> &str {
        &self.collective_slug
    }

    pub fn mode(&self) -> SelectorMode {
        self.mode
    }

    pub fn pending(&self) -> PendingButtons {
        self.pending
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Feed a freshly fetched method list. Returns whether the options were rebuilt.
    pub fn load_methods(&mut self, methods: &[PaymentMethod]) -> bool {
        let fingerprint = fingerprint(methods);
        if self.cache.as_ref().map(|c| c.fingerprint) == Some(fingerprint) {
            return false;
        }

        let current = self.contribution.legacy_payment_method_id;
        let options = build_options(methods, current);
        let default_key = resolve_default(&options, current).map(|o| o.key.clone());
        tracing::debug!(
            "Rebuilt {} payment options for order {}",
            options.len(),
            self.contribution.id
        );

        if let Some(key) = &self.selection {
            if !options.iter().any(|o| &o.key == key && !o.disabled) {
                self.selection = None;
            }
        }
        self.cache = Some(OptionCache {
            fingerprint,
            options,
            default_key,
        });
        true
    }

    /// `None` while the method list has not been loaded yet.
    pub fn options(&self) -> Option<&[PaymentOption]> {
        self.cache.as_ref().map(|c| c.options.as_slice())
    }

    pub fn default_option(&self) -> Option<&PaymentOption> {
        let cache = self.cache.as_ref()?;
        let key = cache.default_key.as_ref()?;
        cache.options.iter().find(|o| &o.key == key)
    }

    /// The user's choice as displayed; hidden while adding a new method.
    pub fn active_selection(&self) -> Option<&PaymentOption> {
        if self.mode == SelectorMode::AddingMethod {
            return None;
        }
        self.retained_selection()
    }

    fn retained_selection(&self) -> Option<&PaymentOption> {
        let key = self.selection.as_ref()?;
        self.options()?.iter().find(|o| &o.key == key)
    }

    pub fn select(&mut self, key: &str) -> Result<(), AppError> {
        self.ensure_open()?;
        if self.mode == SelectorMode::AddingMethod {
            return Err(AppError::Guard(
                "Finish or cancel adding a payment method first".to_string(),
            ));
        }
        let options = self
            .options()
            .ok_or_else(|| AppError::Guard("Payment methods are still loading".to_string()))?;
        let option = options
            .iter()
            .find(|o| o.key == key)
            .ok_or_else(|| AppError::Validation(format!("Unknown payment option {}", key)))?;
        if option.disabled {
            return Err(AppError::Guard(format!(
                "Payment option {} has an unusable balance",
                key
            )));
        }
        self.selection = Some(option.key.clone());
        Ok(())
    }

    pub fn start_adding_method(&mut self) -> Result<(), AppError> {
        self.ensure_open()?;
        self.mode = SelectorMode::AddingMethod;
        Ok(())
    }

    /// Leave the sub-flow and drop whatever the card form reported.
    pub fn cancel_adding_method(&mut self) -> Result<(), AppError> {
        self.ensure_open()?;
        self.mode = SelectorMode::Selecting;
        self.card_form = None;
        Ok(())
    }

    pub fn update_card_form(&mut self, form: CardForm) -> Result<(), AppError> {
        self.ensure_open()?;
        if self.mode != SelectorMode::AddingMethod {
            return Err(AppError::Guard(
                "The card form is only shown while adding a payment method".to_string(),
            ));
        }
        self.card_form = Some(form);
        Ok(())
    }

    /// Validate a new-card submission. `Ok(None)` means one is already in flight.
    pub fn begin_add_method_submission(
        &mut self,
        tokenizer_ready: bool,
    ) -> Result<Option<AddMethodTicket>, AppError> {
        self.ensure_open()?;
        if self.mode != SelectorMode::AddingMethod {
            return Err(AppError::Guard("Not adding a payment method".to_string()));
        }
        if self.pending.add_method {
            return Ok(None);
        }
        let card_form = match &self.card_form {
            Some(form) if form.complete => form.clone(),
            _ => return Err(AppError::Guard("Card details are incomplete".to_string())),
        };
        if !tokenizer_ready {
            return Err(AppError::Unavailable(TOKENIZER_UNAVAILABLE.to_string()));
        }

        self.pending.add_method = true;
        Ok(Some(AddMethodTicket {
            generation: self.generation,
            collective_slug: self.collective_slug.clone(),
            card_form,
        }))
    }

    /// Apply the outcome of tokenize + add.
    ///
    /// Success leaves add mode even though the options are stale until the
    /// caller re-fetches them; the stored card must not be submitted again.
    pub fn finish_add_method_submission(
        &mut self,
        ticket: AddMethodTicket,
        result: Result<(), AppError>,
    ) -> Settlement {
        if ticket.generation != self.generation {
            return Settlement::Stale;
        }
        self.pending.add_method = false;
        match result {
            Ok(()) => {
                self.mode = SelectorMode::Selecting;
                self.card_form = None;
                Settlement::Applied
            }
            Err(err) => Settlement::Failed(err),
        }
    }

    /// Validate the "update" button. `Ok(None)` means one is already in flight.
    pub fn begin_confirm(&mut self) -> Result<Option<ConfirmTicket>, AppError> {
        self.ensure_open()?;
        if self.mode == SelectorMode::AddingMethod {
            return Err(AppError::Guard(
                "Finish or cancel adding a payment method first".to_string(),
            ));
        }
        if self.pending.confirm {
            return Ok(None);
        }
        let payment_method_id = self
            .retained_selection()
            .map(|o| o.payment_method_id)
            .ok_or_else(|| AppError::Guard("Select a payment method first".to_string()))?;

        self.pending.confirm = true;
        Ok(Some(ConfirmTicket {
            generation: self.generation,
            order_id: self.contribution.id,
            payment_method_id,
        }))
    }

    pub fn finish_confirm(
        &mut self,
        ticket: ConfirmTicket,
        result: Result<(), AppError>,
    ) -> Settlement {
        if ticket.generation != self.generation {
            return Settlement::Stale;
        }
        self.pending.confirm = false;
        match result {
            Ok(()) => {
                self.contribution.legacy_payment_method_id = Some(ticket.payment_method_id);
                self.closed = true;
                Settlement::Applied
            }
            Err(err) => Settlement::Failed(err),
        }
    }

    /// Close the popup; results still in flight will settle as stale.
    pub fn dismiss(&mut self) {
        self.closed = true;
        self.generation += 1;
        self.pending = PendingButtons::default();
    }

    pub fn view(&self) -> PopupView {
        PopupView {
            order_id: self.contribution.id,
            collective_slug: self.collective_slug.clone(),
            title: match self.mode {
                SelectorMode::Selecting => "Update payment method",
                SelectorMode::AddingMethod => "Add new payment method",
            },
            mode: self.mode(),
            loading: self.cache.is_none(),
            options: self.options().map(<[_]>::to_vec).unwrap_or_default(),
            default_key: self.default_option().map(|o| o.key.clone()),
            active_selection: self.active_selection().map(|o| o.key.clone()),
            card_form_complete: self.card_form.as_ref().is_some_and(|f| f.complete),
            pending: self.pending(),
            closed: self.is_closed(),
        }
    }

    fn ensure_open(&self) -> Result<(), AppError> {
        if self.closed {
            return Err(AppError::Guard("The payment popup is closed".to_string()));
        }
        Ok(())
    }
}

fn fingerprint(methods: &[PaymentMethod]) -> u64 {
    let mut hasher = DefaultHasher::new();
    methods.hash(&mut hasher);
    hasher.finish()
}
