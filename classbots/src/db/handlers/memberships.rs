//! Database repository for room memberships.

use crate::db::{
    errors::Result,
    models::memberships::{MembershipDBResponse, RoomMemberDBResponse},
};
use crate::types::{RoomId, UserId, abbrev_uuid};
use sqlx::PgConnection;
use tracing::instrument;

pub struct Memberships<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Memberships<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self), fields(room_id = %abbrev_uuid(&room_id), student_id = %abbrev_uuid(&student_id)), err)]
    pub async fn get(&mut self, room_id: RoomId, student_id: UserId) -> Result<Option<MembershipDBResponse>> {
        let membership =
            sqlx::query_as::<_, MembershipDBResponse>("SELECT * FROM room_memberships WHERE room_id = $1 AND student_id = $2")
                .bind(room_id)
                .bind(student_id)
                .fetch_optional(&mut *self.db)
                .await?;

        Ok(membership)
    }

    /// Plain insert. A second insert for the same pair fails with a unique violation on
    /// `room_memberships_pkey`.
    #[instrument(skip(self), fields(room_id = %abbrev_uuid(&room_id), student_id = %abbrev_uuid(&student_id)), err)]
    pub async fn insert(&mut self, room_id: RoomId, student_id: UserId) -> Result<MembershipDBResponse> {
        let membership = sqlx::query_as::<_, MembershipDBResponse>(
            r#"
            INSERT INTO room_memberships (room_id, student_id)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(room_id)
        .bind(student_id)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(membership)
    }

    #[instrument(skip(self), fields(room_id = %abbrev_uuid(&room_id)), err)]
    pub async fn list_for_room(&mut self, room_id: RoomId) -> Result<Vec<RoomMemberDBResponse>> {
        let members = sqlx::query_as::<_, RoomMemberDBResponse>(
            r#"
            SELECT m.student_id, p.username, p.display_name, m.joined_at
            FROM room_memberships m
            LEFT JOIN student_profiles p ON p.user_id = m.student_id
            WHERE m.room_id = $1
            ORDER BY m.joined_at ASC
            "#,
        )
        .bind(room_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(members)
    }
}

#[cfg(all(test, feature = "postgres-tests"))]
mod tests {
    use super::*;
    use crate::db::errors::DbError;
    use crate::db::handlers::{Accounts, Repository, Rooms, StudentProfiles};
    use crate::db::models::{
        accounts::AccountCreateDBRequest, profiles::StudentProfileCreateDBRequest, rooms::RoomCreateDBRequest,
    };
    use crate::types::Role;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_second_insert_is_unique_violation(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut accounts = Accounts::new(&mut conn);
        let teacher = accounts
            .create(&AccountCreateDBRequest {
                email: "teacher@example.com".to_string(),
                password_hash: "hash".to_string(),
                role: Role::Teacher,
            })
            .await
            .unwrap();
        let student = accounts
            .create(&AccountCreateDBRequest {
                email: "student1@student.classbots.local".to_string(),
                password_hash: "hash".to_string(),
                role: Role::Student,
            })
            .await
            .unwrap();
        StudentProfiles::new(&mut conn)
            .create(
                student.id,
                &StudentProfileCreateDBRequest {
                    username: "student1".to_string(),
                    display_name: "Student One".to_string(),
                    pin_hash: "hash".to_string(),
                },
            )
            .await
            .unwrap();
        let room = Rooms::new(&mut conn)
            .create(&RoomCreateDBRequest {
                room_code: "AB12CD".to_string(),
                room_name: "Biology".to_string(),
                teacher_id: teacher.id,
            })
            .await
            .unwrap();

        let mut repo = Memberships::new(&mut conn);
        assert!(repo.get(room.id, student.id).await.unwrap().is_none());
        repo.insert(room.id, student.id).await.unwrap();

        let err = repo.insert(room.id, student.id).await.unwrap_err();
        assert!(err.is_unique_violation(Some("room_memberships_pkey")));

        let members = repo.list_for_room(room.id).await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].student_id, student.id);
        assert_eq!(members[0].username.as_deref(), Some("student1"));

        // Accounts without a student profile cannot be members
        let err = repo.insert(room.id, teacher.id).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }
}
