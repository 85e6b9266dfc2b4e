use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A calendar owner being synchronized. Only the cursor fields change after
/// the row is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub user_id: Uuid,
    pub current_delta: Option<String>,
    pub previous_delta: Option<String>,
    pub subscription_id: Option<String>,
    pub subscription_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn has_cursor(&self) -> bool {
        self.current_delta.is_some()
    }
}
