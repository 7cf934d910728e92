//! Payment gateway: provider adapters, transaction ledger and webhook
//! reconciliation.

pub mod flutterwave;
mod handlers;
mod model;
pub mod paystack;
mod provider;
mod registry;
mod service;
mod store;

pub use flutterwave::{FlutterwaveConfig, FlutterwaveProvider};
pub use handlers::OrderPlacedHandler;
pub use model::{
    CANCELLED_AT, EntityType, InitiateTransaction, Transaction, TransactionFilter,
    TransactionStatus,
};
pub use paystack::{PaystackConfig, PaystackProvider};
pub use provider::{
    ChargeRequest, ChargeUpdate, Initiated, PaymentProvider, WebhookEvent, WebhookHeaders,
};
pub use registry::{PROVIDER_HEADER, ProviderRegistry, ProviderRegistryBuilder};
pub use service::{PaymentGateway, WebhookReceipt};
pub use store::{InMemoryTransactionStore, TransactionStore};

use common::{Money, TransactionId};
use thiserror::Error;

use crate::error::ErrorKind;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("{0}")]
    Validation(String),

    #[error("unsupported payment provider")]
    UnsupportedProvider,

    #[error("Invalid {provider} webhook signature")]
    InvalidSignature { provider: &'static str },

    #[error("Malformed {provider} webhook: {reason}")]
    MalformedWebhook {
        provider: &'static str,
        reason: String,
    },

    #[error("No {provider} transaction with reference {reference}")]
    TransactionNotFound { provider: String, reference: String },

    #[error("Transaction not found: {0}")]
    NotFound(TransactionId),

    #[error("A pending {entity_type} transaction already exists for {entity_id}")]
    DuplicatePending {
        entity_id: String,
        entity_type: EntityType,
    },

    #[error("Transaction {reference} expected {expected}, provider reported {actual}")]
    AmountMismatch {
        reference: String,
        expected: Money,
        actual: Money,
    },

    #[error("{provider} request failed: {reason}")]
    Provider {
        provider: &'static str,
        reason: String,
    },

    #[error("Provider registry error: {0}")]
    Registry(String),

    #[error("Failed to publish payment event: {0}")]
    Publish(String),

    #[error("Transaction store error: {0}")]
    Store(String),
}

impl PaymentError {
    pub fn provider(provider: &'static str, reason: impl std::fmt::Display) -> Self {
        PaymentError::Provider {
            provider,
            reason: reason.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PaymentError::Validation(_)
            | PaymentError::UnsupportedProvider
            | PaymentError::InvalidSignature { .. }
            | PaymentError::MalformedWebhook { .. }
            | PaymentError::AmountMismatch { .. } => ErrorKind::Validation,
            PaymentError::TransactionNotFound { .. } | PaymentError::NotFound(_) => {
                ErrorKind::NotFound
            }
            PaymentError::DuplicatePending { .. } => ErrorKind::Conflict,
            PaymentError::Provider { .. } => ErrorKind::Downstream,
            PaymentError::Registry(_) | PaymentError::Publish(_) | PaymentError::Store(_) => {
                ErrorKind::Internal
            }
        }
    }
}
