//! Core type definitions for modlog

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a new random identifier
            pub fn new() -> Self {
                $name(Uuid::new_v4())
            }

            /// Parse from a UUID string
            pub fn from_string(s: &str) -> crate::Result<Self> {
                Uuid::parse_str(s.trim()).map($name).map_err(|e| {
                    crate::ModlogError::InvalidArgument(format!(
                        "Invalid {} '{}': {}",
                        stringify!($name),
                        s,
                        e
                    ))
                })
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

macro_rules! external_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            /// Create from a string
            pub fn from_string(s: impl Into<String>) -> Self {
                $name(s.into())
            }

            /// Get the string value
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a comment
    CommentId
);
uuid_id!(
    /// Unique identifier for a comment report
    ReportId
);
uuid_id!(
    /// Unique identifier for a moderation action
    ActionId
);
uuid_id!(
    /// Unique identifier for a changelog entry
    ChangeId
);
uuid_id!(
    /// Correlation id shared by every entry written by one fan-out operation
    BulkOperationId
);

external_id!(
    /// User account identifier (owned by the auth layer)
    UserId
);
external_id!(
    /// Project identifier
    ProjectId
);
external_id!(
    /// Task identifier
    TaskId
);
external_id!(
    /// Need identifier
    NeedId
);
external_id!(
    /// Identifier of a report entity in the moderation app (not a comment report)
    ExternalReportId
);
external_id!(
    /// Project membership identifier
    MembershipId
);
external_id!(
    /// Decision identifier
    DecisionId
);

/// The user performing an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    #[serde(default)]
    pub is_staff: bool,
    #[serde(default)]
    pub is_superuser: bool,
}

impl Actor {
    /// A regular user with no platform-wide rights
    pub fn user(id: impl Into<String>) -> Self {
        Self {
            id: UserId::from_string(id),
            is_staff: false,
            is_superuser: false,
        }
    }

    /// A platform staff member
    pub fn staff(id: impl Into<String>) -> Self {
        Self {
            is_staff: true,
            ..Self::user(id)
        }
    }

    /// A superuser
    pub fn superuser(id: impl Into<String>) -> Self {
        Self {
            is_superuser: true,
            ..Self::user(id)
        }
    }

    /// Staff or superuser
    pub fn is_platform_moderator(&self) -> bool {
        self.is_staff || self.is_superuser
    }
}

/// Truncate text to `max_chars` characters, appending "..." when cut
pub fn excerpt(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comment_id_uniqueness() {
        let id1 = CommentId::new();
        let id2 = CommentId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_uuid_id_parse() {
        let id = ReportId::new();
        let parsed = ReportId::from_string(&id.to_string()).unwrap();
        assert_eq!(id, parsed);

        let err = CommentId::from_string("not-a-uuid").unwrap_err();
        assert!(err.to_string().contains("CommentId"));
    }

    #[test]
    fn test_external_id() {
        let user = UserId::from_string("alice");
        assert_eq!(user.as_str(), "alice");
        assert_eq!(user.to_string(), "alice");
    }

    #[test]
    fn test_actor_roles() {
        assert!(!Actor::user("u").is_platform_moderator());
        assert!(Actor::staff("s").is_platform_moderator());
        assert!(Actor::superuser("root").is_platform_moderator());
    }

    #[test]
    fn test_excerpt() {
        assert_eq!(excerpt("short", 10), "short");
        assert_eq!(excerpt("abcdefghij", 4), "abcd...");
        assert_eq!(excerpt("héllo wörld", 5), "héllo...");
    }

    #[test]
    fn test_ids_as_json_map_keys() {
        let mut map = std::collections::HashMap::new();
        map.insert(CommentId::new(), 1);
        let json = serde_json::to_string(&map).unwrap();
        let back: std::collections::HashMap<CommentId, i32> = serde_json::from_str(&json).unwrap();
        assert_eq!(map, back);
    }
}
