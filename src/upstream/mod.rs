//! Collaborators the settings shell talks to.
//!
//! The directory answers queries, the mutation port changes hosts and payment
//! methods, and the tokenizer turns card input into an opaque token. Each is a
//! trait object so the shell does not care where the data lives.

mod memory;
mod tokenizer;

pub use memory::*;
pub use tokenizer::*;

use async_trait::async_trait;

use crate::errors::AppError;
use crate::models::{CardForm, Collective, HostSummary, NewPaymentMethod, PaymentMethod};

/// Read side: collectives, their payment methods and candidate hosts.
#[async_trait]
pub trait CollectiveDirectory: Send + Sync {
    async fn collective(&self, collective_id: i64) -> Result<Collective, AppError>;

    async fn payment_methods(&self, collective_slug: &str) -> Result<Vec<PaymentMethod>, AppError>;

    /// Hosts ranked by how many of `tags` they share, at most `limit`.
    async fn suggest_hosts(
        &self,
        tags: &[String],
        limit: usize,
    ) -> Result<Vec<HostSummary>, AppError>;
}

/// Write side. The server decides whether a new host application is approved.
#[async_trait]
pub trait SettingsMutations: Send + Sync {
    async fn assign_host(
        &self,
        collective_id: i64,
        host_id: Option<i64>,
    ) -> Result<Collective, AppError>;

    /// Returns the id of the created payment method.
    async fn add_payment_method(
        &self,
        collective_slug: &str,
        new_method: NewPaymentMethod,
    ) -> Result<i64, AppError>;

    async fn update_order_payment_method(
        &self,
        order_id: i64,
        payment_method_id: i64,
    ) -> Result<(), AppError>;
}

/// Card tokenization performed by the payment processor.
#[async_trait]
pub trait Tokenizer: Send + Sync {
    /// Whether the processor library finished initialising.
    fn is_ready(&self) -> bool;

    async fn create_token(&self, form: &CardForm) -> Result<CardToken, AppError>;
}
