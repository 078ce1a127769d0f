//! Card tokens and the local tokenizer used outside production.

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::Tokenizer;
use crate::errors::AppError;
use crate::models::{CardData, CardForm, NewPaymentMethod};

/// Opaque single-use reference to card details.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CardToken {
    pub id: String,
    pub brand: String,
    pub last4: String,
    pub exp_month: u32,
    pub exp_year: i32,
}

impl CardToken {
    /// The subset of the token the add-payment-method mutation accepts.
    pub fn into_new_payment_method(self) -> NewPaymentMethod {
        NewPaymentMethod {
            name: self.last4,
            token: self.id,
            data: CardData {
                brand: Some(self.brand),
                exp_month: Some(self.exp_month),
                exp_year: Some(self.exp_year),
            },
        }
    }
}

/// Issues `tok_` tokens after the same checks a processor form performs.
pub struct LocalTokenizer {
    ready: bool,
}

impl LocalTokenizer {
    pub fn new(ready: bool) -> Self {
        Self { ready }
    }
}

#[async_trait]
impl Tokenizer for LocalTokenizer {
    fn is_ready(&self) -> bool {
        self.ready
    }

    async fn create_token(&self, form: &CardForm) -> Result<CardToken, AppError> {
        if !self.ready {
            return Err(AppError::Unavailable(
                "Card tokenizer is not initialised".to_string(),
            ));
        }
        if !form.complete {
            return Err(AppError::Remote("Your card number is incomplete.".to_string()));
        }

        let last4 = form
            .last4
            .as_deref()
            .filter(|l| l.len() == 4 && l.chars().all(|c| c.is_ascii_digit()))
            .ok_or_else(|| AppError::Remote("Your card number is invalid.".to_string()))?;
        let (exp_month, exp_year) = match (form.exp_month, form.exp_year) {
            (Some(month), Some(year)) if (1..=12).contains(&month) => (month, year),
            _ => {
                return Err(AppError::Remote(
                    "Your card's expiration date is invalid.".to_string(),
                ))
            }
        };

        let today = Utc::now().date_naive();
        if (exp_year, exp_month) < (today.year(), today.month()) {
            return Err(AppError::Remote(
                "Your card's expiration year is in the past.".to_string(),
            ));
        }

        let token = CardToken {
            id: format!("tok_{}", Uuid::new_v4().simple()),
            brand: form.brand.clone().unwrap_or_else(|| "Card".to_string()),
            last4: last4.to_string(),
            exp_month,
            exp_year,
        };
        tracing::debug!("Issued card token ending in {}", token.last4);
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(last4: &str, exp_year: i32) -> CardForm {
        CardForm {
            complete: true,
            brand: Some("Visa".to_string()),
            last4: Some(last4.to_string()),
            exp_month: Some(12),
            exp_year: Some(exp_year),
        }
    }

    #[tokio::test]
    async fn test_issues_token() {
        let tokenizer = LocalTokenizer::new(true);
        let token = tokenizer.create_token(&form("4242", 2099)).await.unwrap();

        assert!(token.id.starts_with("tok_"));
        let new_method = token.into_new_payment_method();
        assert_eq!(new_method.name, "4242");
        assert_eq!(new_method.data.brand.as_deref(), Some("Visa"));
        assert_eq!(new_method.data.exp_year, Some(2099));
    }

    #[tokio::test]
    async fn test_rejects_bad_input() {
        let tokenizer = LocalTokenizer::new(true);

        let expired = tokenizer.create_token(&form("4242", 2001)).await.unwrap_err();
        assert_eq!(
            expired,
            AppError::Remote("Your card's expiration year is in the past.".to_string())
        );
        assert!(tokenizer.create_token(&form("42x2", 2099)).await.is_err());
    }

    #[tokio::test]
    async fn test_not_ready() {
        let tokenizer = LocalTokenizer::new(false);
        assert!(!tokenizer.is_ready());
        assert!(matches!(
            tokenizer.create_token(&form("4242", 2099)).await,
            Err(AppError::Unavailable(_))
        ));
    }
}
