use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};
use utoipa::ToSchema;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Role {
    Admin = 1,
    Hr = 2,
    Employee = 3,
    System = 4,
    ApiUser = 5,
    Finance = 6,
    Executive = 7,
}

impl Role {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::Admin),
            2 => Some(Role::Hr),
            3 => Some(Role::Employee),
            4 => Some(Role::System),
            5 => Some(Role::ApiUser),
            6 => Some(Role::Finance),
            7 => Some(Role::Executive),
            _ => None,
        }
    }

    /// Approval authority carried by this role, if any. Admin carries none.
    pub fn approval_tier(self) -> Option<ApprovalTier> {
        match self {
            Role::Hr => Some(ApprovalTier::Hr),
            Role::Finance | Role::Executive => Some(ApprovalTier::Release),
            _ => None,
        }
    }
}

/// The two authorities a payslip passes through before cash leaves the company.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, AsRefStr, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ApprovalTier {
    Hr,
    Release,
}

/// Caller identity handed to every engine call. Built server-side from a
/// verified token, never from client-supplied role claims.
#[derive(Debug, Clone)]
pub struct Actor {
    pub user_id: u64,
    pub username: String,
    pub tier: Option<ApprovalTier>,
}

impl Actor {
    pub fn new(user_id: u64, username: impl Into<String>, tier: Option<ApprovalTier>) -> Self {
        Self {
            user_id,
            username: username.into(),
            tier,
        }
    }

    #[cfg(test)]
    pub fn hr(user_id: u64, username: impl Into<String>) -> Self {
        Self::new(user_id, username, Some(ApprovalTier::Hr))
    }

    #[cfg(test)]
    pub fn release(user_id: u64, username: impl Into<String>) -> Self {
        Self::new(user_id, username, Some(ApprovalTier::Release))
    }
}
