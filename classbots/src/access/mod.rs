//! Room access control for students.
//!
//! A student reaches a room's chatbots through four checks, each in its own module:
//!
//! 1. [`room_code`]: the code is six characters from `[A-Z0-9]` after uppercasing
//! 2. [`rooms`]: the code names an existing room (404 otherwise) which is active (400 otherwise)
//! 3. [`membership`]: the student is linked to the room, creating the link on first access
//! 4. [`pin`]: the student proved who they are with username + PIN
//!
//! All of them work against the [`Datastore`](crate::store::Datastore) capability so they can be
//! exercised against [`InMemoryDatastore`](crate::store::InMemoryDatastore) in tests.

pub mod membership;
pub mod pin;
pub mod room_code;
pub mod rooms;

pub use membership::{MembershipOutcome, reconcile_membership};
pub use pin::{CredentialSource, PinAuthenticator};
pub use room_code::{InvalidRoomCode, ROOM_CODE_LENGTH, RoomCode};
pub use rooms::{RoomCache, RoomLookup};
