//! Book and user records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kinds of record that support soft deletion and batch purging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Books,
    Users,
}

impl RecordKind {
    /// Every purgeable kind, in purge order.
    pub const ALL: [RecordKind; 2] = [RecordKind::Books, RecordKind::Users];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Books => "books",
            RecordKind::Users => "users",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub uid: String,
    pub name: String,
    pub email: String,
    /// Argon2 PHC string. Never serialized.
    #[serde(skip_serializing)]
    pub pass_hash: String,
    pub deleted: bool,
}

/// A book owned by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Book {
    pub bid: String,
    pub label: String,
    pub author: String,
    pub deleted: bool,
    pub user_uid: String,
    pub created_at: DateTime<Utc>,
}

/// Data needed to create a user. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub pass_hash: String,
}

/// Replacement values for an existing user.
#[derive(Debug, Clone)]
pub struct UserUpdate {
    pub name: String,
    pub email: String,
    pub pass_hash: String,
}

/// Data needed to create a book.
#[derive(Debug, Clone)]
pub struct NewBook {
    pub label: String,
    pub author: String,
    pub user_uid: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_kind_names() {
        assert_eq!(RecordKind::Books.to_string(), "books");
        assert_eq!(RecordKind::Users.as_str(), "users");
        assert_eq!(serde_json::to_string(&RecordKind::Books).unwrap(), "\"books\"");
    }

    #[test]
    fn test_user_serialization_hides_hash() {
        let user = User {
            uid: "u1".into(),
            name: "Sergei".into(),
            email: "reader@example.com".into(),
            pass_hash: "$argon2id$secret".into(),
            deleted: false,
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("pass_hash").is_none());
        assert_eq!(json["email"], "reader@example.com");
    }
}
