use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

const GENERATED_ROOM_LEN: usize = 6;

#[derive(Debug, Serialize, Deserialize, Clone, Hash, Eq, PartialEq)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    /// Short random alphanumeric token for a freshly created room.
    pub fn generate() -> Self {
        let mut token = Uuid::new_v4().simple().to_string();
        token.truncate(GENERATED_ROOM_LEN);
        Self(token)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for RoomId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
