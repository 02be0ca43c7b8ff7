use serde::{Deserialize, Serialize};

use crate::domain::{UserDraft, UserId, UserRecord};

/// Collection route, relative to the configured base URL.
pub const USERS_ROUTE: &str = "/api/users";

pub fn user_route(id: &UserId) -> String {
    format!("{USERS_ROUTE}/{id}")
}

/// Request body for create and full-field replace. The identifier is never
/// part of the payload; updates address it through the URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPayload {
    pub username: String,
    pub phone: String,
}

impl From<&UserDraft> for UserPayload {
    fn from(draft: &UserDraft) -> Self {
        Self {
            username: draft.username.clone(),
            phone: draft.phone.clone(),
        }
    }
}

impl From<&UserRecord> for UserPayload {
    fn from(record: &UserRecord) -> Self {
        Self {
            username: record.username.clone(),
            phone: record.phone.clone(),
        }
    }
}
