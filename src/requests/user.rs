use crate::models::user::UserStatus;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct UserStatusRequest {
    pub status: String,
}

impl UserStatusRequest {
    pub fn parsed(&self) -> Option<UserStatus> {
        self.status.parse().ok()
    }
}
