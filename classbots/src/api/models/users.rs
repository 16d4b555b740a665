//! API request/response models for users.

use crate::errors::Error;
use crate::types::{Operation, Resource, Role, UserId};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The authenticated caller, as decoded from the session token
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CurrentUser {
    #[schema(value_type = String, format = "uuid")]
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub display_name: Option<String>,
}

impl CurrentUser {
    pub fn is_teacher(&self) -> bool {
        self.role == Role::Teacher
    }

    /// Fails with 403 unless the caller is a teacher
    pub fn require_teacher(&self, action: Operation, resource: Resource) -> Result<(), Error> {
        if self.is_teacher() {
            Ok(())
        } else {
            Err(Error::InsufficientPermissions { action, resource })
        }
    }

    /// Fails with 403 unless the caller is a student
    pub fn require_student(&self, action: Operation, resource: Resource) -> Result<(), Error> {
        if self.role == Role::Student {
            Ok(())
        } else {
            Err(Error::InsufficientPermissions { action, resource })
        }
    }

    /// Fails with 403 unless the caller is the teacher owning the resource
    pub fn require_owner(&self, owner_id: UserId, action: Operation, resource: Resource) -> Result<(), Error> {
        if self.is_teacher() && self.id == owner_id {
            Ok(())
        } else {
            Err(Error::InsufficientPermissions { action, resource })
        }
    }
}
