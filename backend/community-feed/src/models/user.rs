use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Profile record from the `users` collection; read-only to this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub display_name: String,
}

/// Snapshot of the signed-in user, handed to the controllers at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: Uuid,
    pub display_name: Option<String>,
    pub email: Option<String>,
}

impl Identity {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            display_name: None,
            email: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Name shown in the header: display name, then email, then the raw id.
    pub fn label(&self) -> String {
        [self.display_name.as_deref(), self.email.as_deref()]
            .into_iter()
            .flatten()
            .find(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.user_id.to_string())
    }
}
