use serde::{Deserialize, Serialize};

/// Session key the host's identity is stored under.
pub const USER_SESSION_KEY: &str = "user";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSession {
    pub user_id: String,
}
