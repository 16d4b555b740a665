//! Room lookup by code and the activity gate.

use tracing::instrument;

use crate::{
    access::RoomCode,
    cache::TaggedCache,
    db::models::rooms::RoomDBResponse,
    errors::{Error, Result},
    store::RoomStore,
    types::{RoomId, UserId},
};

/// Cache of rooms keyed by code
pub type RoomCache = TaggedCache<RoomDBResponse>;

fn code_key(code: &RoomCode) -> String {
    format!("room-code:{code}")
}

/// Tag carried by every cached view of a room
pub fn room_tag(id: RoomId) -> String {
    format!("room:{id}")
}

/// Tag carried by every cached room a teacher owns
pub fn teacher_tag(id: UserId) -> String {
    format!("teacher:{id}")
}

/// Inactive rooms exist but reject joins
pub fn ensure_active(room: &RoomDBResponse) -> Result<()> {
    if room.is_active { Ok(()) } else { Err(Error::RoomInactive) }
}

/// Resolves room codes, reading through the room cache.
///
/// Only rooms that exist are cached. A miss always goes to the store, so a room created after
/// a failed lookup is visible immediately.
pub struct RoomLookup<'a, S: ?Sized> {
    store: &'a S,
    cache: &'a RoomCache,
}

impl<'a, S> RoomLookup<'a, S>
where
    S: RoomStore + ?Sized,
{
    pub fn new(store: &'a S, cache: &'a RoomCache) -> Self {
        Self { store, cache }
    }

    /// The room for `code`, active or not. Missing rooms are a 404.
    #[instrument(skip(self), fields(code = %code), err(level = "debug"))]
    pub async fn find(&self, code: &RoomCode) -> Result<RoomDBResponse> {
        let key = code_key(code);
        if let Some(room) = self.cache.get(&key).await {
            tracing::trace!("Room cache hit");
            return Ok(room);
        }

        let room = self.store.find_room_by_code(code).await?.ok_or_else(|| Error::NotFound {
            resource: "Room".to_string(),
            id: code.to_string(),
        })?;

        self.cache
            .insert(key, room.clone(), vec![room_tag(room.id), teacher_tag(room.teacher_id)])
            .await;
        Ok(room)
    }

    /// The room for `code`, failing with 404 when missing and 400 when inactive
    pub async fn find_active(&self, code: &RoomCode) -> Result<RoomDBResponse> {
        let room = self.find(code).await?;
        ensure_active(&room)?;
        Ok(room)
    }
}

/// Drop every cached view of a room after it changes
pub async fn invalidate_room(cache: &RoomCache, id: RoomId) {
    cache.invalidate_tag(&room_tag(id)).await;
}
