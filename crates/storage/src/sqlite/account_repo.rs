use super::SqliteRepository;
use super::mapping::{db_err, map_account_row};
use crate::repository::{AccountRecord, AccountRepository, StorageError};

#[async_trait::async_trait]
impl AccountRepository for SqliteRepository {
    async fn insert_account(&self, account: &AccountRecord) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO accounts (learner_id, email, password_salt, password_hash, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(account.learner_id.to_string())
        .bind(account.email.as_str())
        .bind(account.password_salt.as_str())
        .bind(account.password_hash.as_str())
        .bind(account.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn find_account_by_email(
        &self,
        email: &str,
    ) -> Result<Option<AccountRecord>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT learner_id, email, password_salt, password_hash, created_at
            FROM accounts WHERE email = ?1
            ",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(map_account_row).transpose()
    }
}
