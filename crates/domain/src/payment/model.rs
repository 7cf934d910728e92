use std::collections::HashMap;

use chrono::{DateTime, Utc};
use common::{Money, TransactionId};
use event_bus::events;
use serde::{Deserialize, Serialize};

/// Status of a payment transaction.
///
/// ```text
/// Pending ──┬──► Success
///           ├──► Failed ────┐
///           └──► Abandoned ─┴──► Success (late provider confirmation)
/// ```
/// `Success` and `RefundDue` are final. A success reported for a
/// transaction this service cancelled is stored as `RefundDue` instead: the
/// entity it paid for was already rolled back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    #[default]
    Pending,
    Success,
    Failed,
    Abandoned,
    RefundDue,
}

impl TransactionStatus {
    pub fn can_transition_to(&self, next: TransactionStatus) -> bool {
        match (self, next) {
            (TransactionStatus::Success | TransactionStatus::RefundDue, _) => false,
            (_, TransactionStatus::Success) => true,
            (TransactionStatus::Pending, TransactionStatus::Failed)
            | (TransactionStatus::Pending, TransactionStatus::Abandoned) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Success => "success",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Abandoned => "abandoned",
            TransactionStatus::RefundDue => "refund_due",
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(TransactionStatus::Pending),
            "success" => Ok(TransactionStatus::Success),
            "failed" => Ok(TransactionStatus::Failed),
            "abandoned" => Ok(TransactionStatus::Abandoned),
            "refund_due" => Ok(TransactionStatus::RefundDue),
            other => Err(format!("unknown transaction status '{other}'")),
        }
    }
}

/// What a transaction pays for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    #[serde(rename = "vendor-subscription")]
    VendorSubscription,
    #[serde(rename = "order")]
    Order,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::VendorSubscription => "vendor-subscription",
            EntityType::Order => "order",
        }
    }

    /// Event published when a transaction for this entity succeeds.
    pub fn paid_event(&self) -> &'static str {
        match self {
            EntityType::VendorSubscription => events::VENDOR_SUBSCRIPTION_PAID_FOR,
            EntityType::Order => events::ORDER_PAID_FOR,
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "vendor-subscription" | "vendor" => Ok(EntityType::VendorSubscription),
            "order" => Ok(EntityType::Order),
            other => Err(format!("unknown entity type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: TransactionId,
    pub provider: String,
    /// Reference shared with the provider; unique per provider.
    pub reference: String,
    pub entity_id: String,
    pub entity_type: EntityType,
    pub amount: Money,
    pub email: String,
    pub status: TransactionStatus,
    pub payment_url: String,
    pub metadata: HashMap<String, String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Metadata key stamped when this service cancels a pending transaction.
pub const CANCELLED_AT: &str = "cancelledAt";

impl Transaction {
    /// True when this service, not the provider, abandoned the transaction.
    pub fn was_cancelled(&self) -> bool {
        self.metadata.contains_key(CANCELLED_AT)
    }
}

/// Input for `InitiateTransaction`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateTransaction {
    pub amount: Money,
    pub entity_id: String,
    pub entity_type: EntityType,
    /// Payer's email, required by both providers.
    pub email: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionFilter {
    pub status: Option<TransactionStatus>,
    pub provider: Option<String>,
    pub entity_type: Option<EntityType>,
}

impl TransactionFilter {
    pub fn matches(&self, tx: &Transaction) -> bool {
        self.status.is_none_or(|s| tx.status == s)
            && self
                .provider
                .as_ref()
                .is_none_or(|p| tx.provider.eq_ignore_ascii_case(p))
            && self.entity_type.is_none_or(|e| tx.entity_type == e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_is_final() {
        use TransactionStatus::*;
        assert!(Pending.can_transition_to(Success));
        assert!(Pending.can_transition_to(Failed));
        assert!(Pending.can_transition_to(Abandoned));
        assert!(Failed.can_transition_to(Success));
        assert!(Abandoned.can_transition_to(Success));
        assert!(!Success.can_transition_to(Failed));
        assert!(!Success.can_transition_to(Success));
        assert!(!Failed.can_transition_to(Abandoned));
        assert!(!RefundDue.can_transition_to(Success));
        assert!(!RefundDue.can_transition_to(Failed));
    }

    #[test]
    fn test_entity_type_wire_names() {
        assert_eq!(
            serde_json::to_value(EntityType::VendorSubscription).unwrap(),
            "vendor-subscription"
        );
        assert_eq!("ORDER".parse::<EntityType>().unwrap(), EntityType::Order);
        assert_eq!(
            EntityType::VendorSubscription.paid_event(),
            "payment.vendor_subscription_paid_for"
        );
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(
            "Success".parse::<TransactionStatus>().unwrap(),
            TransactionStatus::Success
        );
        assert_eq!(
            "refund_due".parse::<TransactionStatus>().unwrap(),
            TransactionStatus::RefundDue
        );
        assert_eq!(TransactionStatus::RefundDue.to_string(), "refund_due");
        assert!("paid".parse::<TransactionStatus>().is_err());
    }
}
