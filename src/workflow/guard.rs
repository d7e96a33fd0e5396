//! Ownership and role checks applied before every mutation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, Result};
use crate::workflow::status::ReviewStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl FromStr for Role {
    type Err = RegistryError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(RegistryError::invalid_field(
                "role",
                format!("unknown role {other:?}"),
            )),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => f.write_str("user"),
            Role::Admin => f.write_str("admin"),
        }
    }
}

/// The authenticated caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: String,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }

    pub fn user(user_id: impl Into<String>) -> Self {
        Self::new(user_id, Role::User)
    }

    pub fn admin(user_id: impl Into<String>) -> Self {
        Self::new(user_id, Role::Admin)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn owns(&self, owner_user_id: &str) -> bool {
        self.user_id == owner_user_id
    }

    /// Status changes and deletes of live rows
    pub fn require_admin(&self, action: &str) -> Result<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(RegistryError::forbidden(format!("only an admin may {action}")))
        }
    }

    /// Reads of a single entity, deletes of staged entities, submissions
    pub fn require_owner_or_admin(&self, owner_user_id: &str, action: &str) -> Result<()> {
        if self.is_admin() || self.owns(owner_user_id) {
            Ok(())
        } else {
            Err(RegistryError::forbidden(format!(
                "only the owner or an admin may {action}"
            )))
        }
    }

    /// Edits of a staged draft: owner or admin, and only while the draft is pending
    pub fn require_staged_edit(&self, owner_user_id: &str, status: ReviewStatus) -> Result<()> {
        self.require_owner_or_admin(owner_user_id, "edit this draft")?;
        if status != ReviewStatus::Pending {
            return Err(RegistryError::forbidden(format!(
                "draft is {status} and can no longer be edited"
            )));
        }
        Ok(())
    }

    /// Edits of a live organization: owner only, and only while pending
    pub fn require_live_edit(&self, owner_user_id: &str, status: ReviewStatus) -> Result<()> {
        if status != ReviewStatus::Pending {
            return Err(RegistryError::forbidden(format!(
                "organization is {status} and can no longer be edited"
            )));
        }
        if !self.owns(owner_user_id) {
            return Err(RegistryError::forbidden(
                "only the owner may edit this organization",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_admin_only_actions() {
        assert!(Actor::admin("root").require_admin("delete organizations").is_ok());
        let err = Actor::user("u1").require_admin("delete organizations").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }

    #[test]
    fn test_owner_or_admin() {
        assert!(Actor::user("u1").require_owner_or_admin("u1", "read").is_ok());
        assert!(Actor::admin("root").require_owner_or_admin("u1", "read").is_ok());
        assert!(Actor::user("u2").require_owner_or_admin("u1", "read").is_err());
    }

    #[test]
    fn test_staged_edit_requires_pending() {
        let owner = Actor::user("u1");
        assert!(owner.require_staged_edit("u1", ReviewStatus::Pending).is_ok());
        assert!(owner.require_staged_edit("u1", ReviewStatus::Rejected).is_err());
        assert!(Actor::admin("root").require_staged_edit("u1", ReviewStatus::Pending).is_ok());
        assert!(Actor::user("u2").require_staged_edit("u1", ReviewStatus::Pending).is_err());
    }

    #[test]
    fn test_live_edit_is_owner_only_even_for_admins() {
        assert!(Actor::user("u1").require_live_edit("u1", ReviewStatus::Pending).is_ok());
        assert!(Actor::admin("root").require_live_edit("u1", ReviewStatus::Pending).is_err());
        for status in [ReviewStatus::Approved, ReviewStatus::Rejected] {
            let err = Actor::user("u1").require_live_edit("u1", status).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Forbidden);
        }
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("Admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("user".parse::<Role>().unwrap(), Role::User);
        assert!("superuser".parse::<Role>().is_err());
    }
}
