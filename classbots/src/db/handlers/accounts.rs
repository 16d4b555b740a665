//! Database repository for accounts.

use crate::db::{
    errors::{DbError, Result},
    models::accounts::{AccountCreateDBRequest, AccountDBResponse},
};
use crate::types::{UserId, abbrev_uuid};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection};
use tracing::instrument;
use uuid::Uuid;

// Database entity model
#[derive(Debug, Clone, FromRow)]
struct Account {
    pub id: UserId,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<Account> for AccountDBResponse {
    type Error = DbError;

    fn try_from(account: Account) -> Result<Self> {
        Ok(Self {
            id: account.id,
            email: account.email,
            password_hash: account.password_hash,
            role: account.role.parse()?,
            created_at: account.created_at,
        })
    }
}

pub struct Accounts<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Accounts<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Create an account with a fresh id
    #[instrument(skip(self, request), fields(email = %request.email, role = %request.role), err)]
    pub async fn create(&mut self, request: &AccountCreateDBRequest) -> Result<AccountDBResponse> {
        self.create_with_id(Uuid::new_v4(), request).await
    }

    /// Create an account with a caller supplied id (student profiles share the account id)
    #[instrument(skip(self, request), fields(account_id = %abbrev_uuid(&id), role = %request.role), err)]
    pub async fn create_with_id(&mut self, id: UserId, request: &AccountCreateDBRequest) -> Result<AccountDBResponse> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (id, email, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.email)
        .bind(&request.password_hash)
        .bind(request.role.as_str())
        .fetch_one(&mut *self.db)
        .await?;

        AccountDBResponse::try_from(account)
    }

    #[instrument(skip(self), fields(account_id = %abbrev_uuid(&id)), err)]
    pub async fn get_by_id(&mut self, id: UserId) -> Result<Option<AccountDBResponse>> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        account.map(AccountDBResponse::try_from).transpose()
    }

    /// Case-insensitive email lookup
    #[instrument(skip(self), err)]
    pub async fn get_by_email(&mut self, email: &str) -> Result<Option<AccountDBResponse>> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(&mut *self.db)
            .await?;

        account.map(AccountDBResponse::try_from).transpose()
    }

    #[instrument(skip(self, password_hash), fields(account_id = %abbrev_uuid(&id)), err)]
    pub async fn update_password_hash(&mut self, id: UserId, password_hash: &str) -> Result<()> {
        let result = sqlx::query("UPDATE accounts SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&mut *self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }
}

#[cfg(all(test, feature = "postgres-tests"))]
mod tests {
    use super::*;
    use crate::types::Role;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_email_lookup_is_case_insensitive(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Accounts::new(&mut conn);

        let created = repo
            .create(&AccountCreateDBRequest {
                email: "Teacher@Example.com".to_string(),
                password_hash: "hash".to_string(),
                role: Role::Teacher,
            })
            .await
            .unwrap();

        let found = repo.get_by_email("teacher@example.com").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.role, Role::Teacher);
        assert_eq!(repo.get_by_id(created.id).await.unwrap().map(|a| a.id), Some(created.id));
        assert!(repo.get_by_id(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_duplicate_email_rejected(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Accounts::new(&mut conn);

        let request = AccountCreateDBRequest {
            email: "student1@student.classbots.local".to_string(),
            password_hash: "hash".to_string(),
            role: Role::Student,
        };
        repo.create(&request).await.unwrap();

        let err = repo.create(&request).await.unwrap_err();
        assert!(err.is_unique_violation(Some("accounts_email_lower_idx")));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_password_hash_missing_account(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Accounts::new(&mut conn);

        let result = repo.update_password_hash(Uuid::new_v4(), "hash").await;
        assert!(matches!(result, Err(DbError::NotFound)));
    }
}
