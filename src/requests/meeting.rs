use crate::models::meeting::MeetingStatus;
use crate::requests::{clean_optional, ValidationError};
use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct MeetingRequest {
    pub title: String,
    pub agenda: Option<String>,
    pub venue: Option<String>,
    pub scheduled_at: DateTime<Utc>,
}

impl MeetingRequest {
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::new("Meeting title is required"));
        }
        if self.scheduled_at <= now {
            return Err(ValidationError::new("Meetings must be scheduled in the future"));
        }
        Ok(())
    }

    pub fn agenda(&self) -> Option<String> {
        clean_optional(&self.agenda)
    }

    pub fn venue(&self) -> Option<String> {
        clean_optional(&self.venue)
    }
}

#[derive(Debug, Deserialize)]
pub struct MeetingStatusRequest {
    pub status: MeetingStatus,
    pub minutes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MeetingQuery {
    #[serde(default)]
    pub upcoming: bool,
}
