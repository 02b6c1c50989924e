use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: Uuid,
    pub full_name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct UserPreferences {
    pub user_id: Uuid,
    pub receive_notifications: bool,
    pub preferred_language: String,
}

impl UserPreferences {
    pub fn defaults_for(user_id: Uuid) -> Self {
        Self {
            user_id,
            receive_notifications: true,
            preferred_language: "English".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileWithPreferences {
    pub profile: Profile,
    pub preferences: UserPreferences,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProfileUpdate {
    #[validate(length(max = 120))]
    pub full_name: Option<String>,
    pub receive_notifications: Option<bool>,
    #[validate(length(min = 2, max = 40))]
    pub preferred_language: Option<String>,
}
