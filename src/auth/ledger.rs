/// Token Ledger
///
/// Server-side record of issued access tokens. A token stays usable only
/// while its row is valid here, so revoking a user's rows invalidates their
/// sessions before the tokens expire.

use std::sync::Arc;
use uuid::Uuid;

use crate::domain::IssuedToken;
use crate::error::AppError;
use crate::store::TokenStore;

#[derive(Clone)]
pub struct TokenLedger {
    store: Arc<dyn TokenStore>,
}

impl TokenLedger {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self { store }
    }

    /// Record a freshly issued token as valid for `owner`
    pub async fn record_issued_token(
        &self,
        owner: Uuid,
        raw_value: String,
    ) -> Result<IssuedToken, AppError> {
        let token = self.store.insert(IssuedToken::new(owner, raw_value)).await?;
        tracing::debug!(user_id = %owner, token_id = %token.id, "Recorded issued token");
        Ok(token)
    }

    /// Rows of `owner` with `expired = false OR revoked = false`.
    ///
    /// A row with only one of the two flags set is still returned.
    pub async fn find_valid_tokens_for_user(&self, owner: Uuid) -> Result<Vec<IssuedToken>, AppError> {
        self.store.find_valid_by_user(owner).await
    }

    /// Mark every valid row of `owner` expired and revoked
    ///
    /// # Returns
    /// Number of rows touched (0 when there were none)
    pub async fn revoke_all(&self, owner: Uuid) -> Result<u64, AppError> {
        let revoked = self.store.revoke_all_valid_by_user(owner).await?;
        if revoked > 0 {
            tracing::info!(user_id = %owner, revoked, "Revoked user tokens");
        }
        Ok(revoked)
    }

    pub async fn find_by_raw_value(&self, raw_value: &str) -> Result<Option<IssuedToken>, AppError> {
        self.store.find_by_raw_value(raw_value).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryTokenStore;

    fn ledger() -> (TokenLedger, InMemoryTokenStore) {
        let store = InMemoryTokenStore::new();
        (TokenLedger::new(Arc::new(store.clone())), store)
    }

    #[tokio::test]
    async fn test_recorded_token_is_valid() {
        let (ledger, _) = ledger();
        let owner = Uuid::new_v4();

        let token = ledger.record_issued_token(owner, "t0".to_string()).await.unwrap();

        assert!(token.is_valid());
        assert_eq!(ledger.find_valid_tokens_for_user(owner).await.unwrap().len(), 1);
        assert_eq!(
            ledger.find_by_raw_value("t0").await.unwrap().map(|t| t.id),
            Some(token.id)
        );
    }

    #[tokio::test]
    async fn test_revoke_all_empties_valid_set() {
        let (ledger, store) = ledger();
        let owner = Uuid::new_v4();
        let other = Uuid::new_v4();
        ledger.record_issued_token(owner, "a".to_string()).await.unwrap();
        ledger.record_issued_token(owner, "b".to_string()).await.unwrap();
        ledger.record_issued_token(other, "c".to_string()).await.unwrap();

        assert_eq!(ledger.revoke_all(owner).await.unwrap(), 2);

        assert!(ledger.find_valid_tokens_for_user(owner).await.unwrap().is_empty());
        assert!(store
            .all_for_user(owner)
            .await
            .iter()
            .all(|t| t.expired && t.revoked));
        assert_eq!(ledger.find_valid_tokens_for_user(other).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_revoke_all_without_tokens_is_noop() {
        let (ledger, _) = ledger();
        assert_eq!(ledger.revoke_all(Uuid::new_v4()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_half_revoked_row_still_listed_as_valid() {
        let store = InMemoryTokenStore::new();
        let ledger = TokenLedger::new(Arc::new(store.clone()));
        let owner = Uuid::new_v4();

        let mut token = IssuedToken::new(owner, "half".to_string());
        token.revoked = true;
        store.insert(token).await.unwrap();

        let listed = ledger.find_valid_tokens_for_user(owner).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(!listed[0].is_valid());

        assert_eq!(ledger.revoke_all(owner).await.unwrap(), 1);
        assert!(ledger.find_valid_tokens_for_user(owner).await.unwrap().is_empty());
    }
}
