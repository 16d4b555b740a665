//! Idempotent room membership.

use tracing::instrument;

use crate::{
    errors::Result,
    store::{MembershipStore, constraints},
    types::{RoomId, UserId},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipOutcome {
    /// This call inserted the membership row
    Created,
    /// The row already existed, or a concurrent caller inserted it first
    AlreadyMember,
}

impl MembershipOutcome {
    pub fn newly_joined(self) -> bool {
        self == MembershipOutcome::Created
    }
}

/// Make sure `student_id` is a member of `room_id`.
///
/// Check-then-insert. Two concurrent callers can both miss the check; the loser's insert hits
/// the membership primary key and is reported as [`MembershipOutcome::AlreadyMember`].
#[instrument(skip(store), err)]
pub async fn reconcile_membership<S>(store: &S, room_id: RoomId, student_id: UserId) -> Result<MembershipOutcome>
where
    S: MembershipStore + ?Sized,
{
    if store.find_membership(room_id, student_id).await?.is_some() {
        return Ok(MembershipOutcome::AlreadyMember);
    }

    match store.insert_membership(room_id, student_id).await {
        Ok(_) => {
            tracing::info!("Student joined room");
            Ok(MembershipOutcome::Created)
        }
        Err(e) if e.is_unique_violation(Some(constraints::MEMBERSHIP_PKEY)) => {
            tracing::debug!("Membership inserted concurrently");
            Ok(MembershipOutcome::AlreadyMember)
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::errors::Result as DbResult,
        db::models::memberships::{MembershipDBResponse, RoomMemberDBResponse},
        store::InMemoryDatastore,
        test_utils::{create_test_config, seed_room, seed_student, seed_teacher},
    };
    use async_trait::async_trait;

    /// Never sees an existing row, as if every check raced with another writer
    struct RacingStore(InMemoryDatastore);

    #[async_trait]
    impl MembershipStore for RacingStore {
        async fn find_membership(&self, _room_id: RoomId, _student_id: UserId) -> DbResult<Option<MembershipDBResponse>> {
            Ok(None)
        }

        async fn insert_membership(&self, room_id: RoomId, student_id: UserId) -> DbResult<MembershipDBResponse> {
            self.0.insert_membership(room_id, student_id).await
        }

        async fn list_room_members(&self, room_id: RoomId) -> DbResult<Vec<RoomMemberDBResponse>> {
            self.0.list_room_members(room_id).await
        }
    }

    async fn seeded() -> (InMemoryDatastore, RoomId, UserId) {
        let config = create_test_config();
        let store = InMemoryDatastore::new();
        let teacher = seed_teacher(&store, &config, "t@school.test", "password123").await;
        let room = seed_room(&store, teacher.id, "AB12CD", true).await;
        let student = seed_student(&store, &config, "student1", "1234").await;
        (store, room.id, student.user_id)
    }

    #[tokio::test]
    async fn test_reconcile_is_idempotent() {
        let (store, room_id, student_id) = seeded().await;

        let first = reconcile_membership(&store, room_id, student_id).await.unwrap();
        let second = reconcile_membership(&store, room_id, student_id).await.unwrap();

        assert_eq!(first, MembershipOutcome::Created);
        assert_eq!(second, MembershipOutcome::AlreadyMember);
        assert_eq!(store.list_room_members(room_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_lost_insert_race_is_swallowed() {
        let (store, room_id, student_id) = seeded().await;
        let racing = RacingStore(store.clone());

        assert_eq!(
            reconcile_membership(&racing, room_id, student_id).await.unwrap(),
            MembershipOutcome::Created
        );
        // The check misses, the insert collides with the primary key
        assert_eq!(
            reconcile_membership(&racing, room_id, student_id).await.unwrap(),
            MembershipOutcome::AlreadyMember
        );
        assert_eq!(store.list_room_members(room_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_other_failures_propagate() {
        let (store, _room_id, student_id) = seeded().await;

        // Unknown room violates the foreign key, which is not a benign race
        let err = reconcile_membership(&store, uuid::Uuid::new_v4(), student_id)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
    }
}
