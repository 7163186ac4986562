use serde::{Deserialize, Serialize};

use super::form::FormType;

/// A message shown to users. `user_id` is `None` for broadcasts.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: i64,
    pub user_id: Option<String>,
    pub form_type: FormType,
    pub message: String,
    pub is_read: bool,
    pub created_at: String,
}

impl Notification {
    pub fn is_visible_to(&self, user_id: Option<&str>) -> bool {
        match &self.user_id {
            None => true,
            Some(owner) => Some(owner.as_str()) == user_id,
        }
    }
}
