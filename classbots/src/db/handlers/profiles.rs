//! Database repository for student profiles.

use crate::db::{
    errors::{DbError, Result},
    models::profiles::{StudentProfileCreateDBRequest, StudentProfileDBResponse},
};
use crate::types::{UserId, abbrev_uuid};
use sqlx::PgConnection;
use tracing::instrument;

pub struct StudentProfiles<'c> {
    db: &'c mut PgConnection,
}

impl<'c> StudentProfiles<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Create the profile for an existing student account
    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&user_id), username = %request.username), err)]
    pub async fn create(&mut self, user_id: UserId, request: &StudentProfileCreateDBRequest) -> Result<StudentProfileDBResponse> {
        let profile = sqlx::query_as::<_, StudentProfileDBResponse>(
            r#"
            INSERT INTO student_profiles (user_id, username, display_name, pin_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&request.username)
        .bind(&request.display_name)
        .bind(&request.pin_hash)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(profile)
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn get_by_user_id(&mut self, user_id: UserId) -> Result<Option<StudentProfileDBResponse>> {
        let profile = sqlx::query_as::<_, StudentProfileDBResponse>("SELECT * FROM student_profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(profile)
    }

    /// Case-insensitive username lookup
    #[instrument(skip(self), err)]
    pub async fn get_by_username(&mut self, username: &str) -> Result<Option<StudentProfileDBResponse>> {
        let profile = sqlx::query_as::<_, StudentProfileDBResponse>("SELECT * FROM student_profiles WHERE LOWER(username) = LOWER($1)")
            .bind(username)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(profile)
    }

    #[instrument(skip(self, pin_hash), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn update_pin_hash(&mut self, user_id: UserId, pin_hash: &str) -> Result<()> {
        let result = sqlx::query("UPDATE student_profiles SET pin_hash = $2 WHERE user_id = $1")
            .bind(user_id)
            .bind(pin_hash)
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
    use crate::db::handlers::Accounts;
    use crate::db::models::accounts::AccountCreateDBRequest;
    use crate::types::Role;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_username_lookup_is_case_insensitive(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let account = Accounts::new(&mut conn)
            .create(&AccountCreateDBRequest {
                email: "student1@student.classbots.local".to_string(),
                password_hash: "hash".to_string(),
                role: Role::Student,
            })
            .await
            .unwrap();

        let mut repo = StudentProfiles::new(&mut conn);
        repo.create(
            account.id,
            &StudentProfileCreateDBRequest {
                username: "student1".to_string(),
                display_name: "Student One".to_string(),
                pin_hash: "pin-hash".to_string(),
            },
        )
        .await
        .unwrap();

        let found = repo.get_by_username("STUDENT1").await.unwrap().unwrap();
        assert_eq!(found.user_id, account.id);
        assert!(repo.get_by_username("student2").await.unwrap().is_none());

        repo.update_pin_hash(account.id, "new-hash").await.unwrap();
        let updated = repo.get_by_user_id(account.id).await.unwrap().unwrap();
        assert_eq!(updated.pin_hash, "new-hash");
    }
}
