use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DraftError;

/// Server-assigned user identifier.
///
/// The client never constructs one on its own; it only echoes back what the
/// server handed out, either as a JSON number or a JSON string. Numbers keep
/// their JSON form, so ids past `i64::MAX` or with a fraction survive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    Number(serde_json::Number),
    Text(String),
}

impl UserId {
    /// True when `typed` is exactly how this id is displayed. Typed ids are
    /// matched this way instead of being parsed, so `007` never turns into 7.
    pub fn matches_text(&self, typed: &str) -> bool {
        match self {
            Self::Number(id) => id.to_string() == typed,
            Self::Text(id) => id == typed,
        }
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(id) => write!(f, "{id}"),
            Self::Text(id) => f.write_str(id),
        }
    }
}

impl From<i64> for UserId {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    pub phone: String,
}

impl UserRecord {
    pub fn fields(&self) -> UserDraft {
        UserDraft {
            username: self.username.clone(),
            phone: self.phone.clone(),
        }
    }
}

/// Unsaved form input for a user that has no identifier yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDraft {
    pub username: String,
    pub phone: String,
}

impl UserDraft {
    pub fn new(username: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            phone: phone.into(),
        }
    }

    pub fn validate(&self) -> Result<(), DraftError> {
        if self.username.is_empty() || self.phone.is_empty() {
            return Err(DraftError::MissingRequiredFields);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_accepts_numbers_and_strings() {
        let numeric: UserRecord =
            serde_json::from_str(r#"{"id":1,"username":"Jane","phone":"555-0001"}"#)
                .expect("numeric id");
        assert_eq!(numeric.id, UserId::from(1));
        assert_eq!(numeric.id.to_string(), "1");

        let opaque: UserRecord =
            serde_json::from_str(r#"{"id":"a1b2","username":"Bob","phone":"555-0002"}"#)
                .expect("string id");
        assert_eq!(opaque.id, UserId::Text("a1b2".into()));
        assert_eq!(opaque.id.to_string(), "a1b2");
    }

    #[test]
    fn user_id_keeps_numbers_outside_i64() {
        let ids: Vec<UserId> =
            serde_json::from_str("[18446744073709551615, 1.5, -3]").expect("numeric ids");
        let shown: Vec<String> = ids.iter().map(ToString::to_string).collect();
        assert_eq!(shown, ["18446744073709551615", "1.5", "-3"]);
        assert_eq!(
            serde_json::to_string(&ids).expect("serialize"),
            "[18446744073709551615,1.5,-3]"
        );
    }

    #[test]
    fn typed_ids_match_display_text_only() {
        let padded = UserId::Text("007".into());
        assert!(padded.matches_text("007"));
        assert!(!padded.matches_text("7"));
        assert!(!UserId::from(7).matches_text("007"));

        let numeric_text = UserId::Text("42".into());
        assert!(numeric_text.matches_text("42"));
        assert_ne!(numeric_text, UserId::from(42));
        assert!(UserId::from(42).matches_text("42"));
    }

    #[test]
    fn draft_requires_both_fields() {
        assert!(UserDraft::new("Jane", "555-0001").validate().is_ok());
        assert_eq!(
            UserDraft::new("", "555-0001").validate(),
            Err(DraftError::MissingRequiredFields)
        );
        assert_eq!(
            UserDraft::new("Jane", "").validate(),
            Err(DraftError::MissingRequiredFields)
        );
        assert!(UserDraft::default().validate().is_err());
    }
}
