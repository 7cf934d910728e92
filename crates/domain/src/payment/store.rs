use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::TransactionId;
use tokio::sync::RwLock;

use super::{EntityType, PaymentError, Transaction, TransactionFilter, TransactionStatus};

#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Inserts a transaction. A second `Pending` transaction for the same
    /// entity fails with `DuplicatePending`.
    async fn insert(&self, tx: Transaction) -> Result<Transaction, PaymentError>;

    async fn get(&self, id: TransactionId) -> Result<Option<Transaction>, PaymentError>;

    async fn find_by_reference(&self, reference: &str)
    -> Result<Option<Transaction>, PaymentError>;

    async fn find_pending_for_entity(
        &self,
        entity_id: &str,
        entity_type: EntityType,
    ) -> Result<Option<Transaction>, PaymentError>;

    /// All transactions for an entity, oldest first.
    async fn find_by_entity(
        &self,
        entity_id: &str,
        entity_type: EntityType,
    ) -> Result<Vec<Transaction>, PaymentError>;

    async fn update(&self, tx: Transaction) -> Result<(), PaymentError>;

    /// Matching transactions, newest first.
    async fn list(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>, PaymentError>;
}

/// In-memory transaction ledger.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTransactionStore {
    transactions: Arc<RwLock<HashMap<TransactionId, Transaction>>>,
}

impl InMemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn pending_count(&self) -> usize {
        self.transactions
            .read()
            .await
            .values()
            .filter(|t| t.status == TransactionStatus::Pending)
            .count()
    }
}

#[async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn insert(&self, tx: Transaction) -> Result<Transaction, PaymentError> {
        let mut transactions = self.transactions.write().await;
        if tx.status == TransactionStatus::Pending
            && transactions.values().any(|t| {
                t.status == TransactionStatus::Pending
                    && t.entity_type == tx.entity_type
                    && t.entity_id == tx.entity_id
            })
        {
            return Err(PaymentError::DuplicatePending {
                entity_id: tx.entity_id,
                entity_type: tx.entity_type,
            });
        }
        if transactions.values().any(|t| t.reference == tx.reference) {
            return Err(PaymentError::Store(format!(
                "duplicate reference {}",
                tx.reference
            )));
        }
        transactions.insert(tx.id, tx.clone());
        Ok(tx)
    }

    async fn get(&self, id: TransactionId) -> Result<Option<Transaction>, PaymentError> {
        Ok(self.transactions.read().await.get(&id).cloned())
    }

    async fn find_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Transaction>, PaymentError> {
        Ok(self
            .transactions
            .read()
            .await
            .values()
            .find(|t| t.reference == reference)
            .cloned())
    }

    async fn find_pending_for_entity(
        &self,
        entity_id: &str,
        entity_type: EntityType,
    ) -> Result<Option<Transaction>, PaymentError> {
        Ok(self
            .transactions
            .read()
            .await
            .values()
            .find(|t| {
                t.status == TransactionStatus::Pending
                    && t.entity_type == entity_type
                    && t.entity_id == entity_id
            })
            .cloned())
    }

    async fn find_by_entity(
        &self,
        entity_id: &str,
        entity_type: EntityType,
    ) -> Result<Vec<Transaction>, PaymentError> {
        let mut found: Vec<_> = self
            .transactions
            .read()
            .await
            .values()
            .filter(|t| t.entity_type == entity_type && t.entity_id == entity_id)
            .cloned()
            .collect();
        found.sort_by_key(|t| t.created_at);
        Ok(found)
    }

    async fn update(&self, tx: Transaction) -> Result<(), PaymentError> {
        let mut transactions = self.transactions.write().await;
        match transactions.get_mut(&tx.id) {
            Some(existing) => {
                *existing = tx;
                Ok(())
            }
            None => Err(PaymentError::NotFound(tx.id)),
        }
    }

    async fn list(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>, PaymentError> {
        let mut found: Vec<_> = self
            .transactions
            .read()
            .await
            .values()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }
}
