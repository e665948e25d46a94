use crate::database::connection::DbPool;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum MeetingError {
    #[error("Meeting with ID {id} not found")]
    NotFound { id: Uuid },
    #[error("Meeting is already {status:?}")]
    AlreadyClosed { status: MeetingStatus },
    #[error("A meeting can only be moved to completed or cancelled")]
    InvalidStatus,
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "meeting_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MeetingStatus {
    Scheduled,
    Completed,
    Cancelled,
}

impl MeetingStatus {
    pub fn check_transition(self, next: MeetingStatus) -> Result<(), MeetingError> {
        if self != MeetingStatus::Scheduled {
            return Err(MeetingError::AlreadyClosed { status: self });
        }
        if next == MeetingStatus::Scheduled {
            return Err(MeetingError::InvalidStatus);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Meeting {
    pub id: Uuid,
    pub chama_id: Uuid,
    pub title: String,
    pub agenda: Option<String>,
    pub venue: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub status: MeetingStatus,
    pub minutes: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateMeeting {
    pub chama_id: Uuid,
    pub title: String,
    pub agenda: Option<String>,
    pub venue: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub created_by: Uuid,
}

impl Meeting {
    pub async fn create(pool: &DbPool, meeting: CreateMeeting) -> Result<Self, MeetingError> {
        let now = Utc::now();

        let meeting = sqlx::query_as::<_, Meeting>(
            "INSERT INTO meetings (id, chama_id, title, agenda, venue, scheduled_at, status, created_by, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(meeting.chama_id)
        .bind(meeting.title)
        .bind(meeting.agenda)
        .bind(meeting.venue)
        .bind(meeting.scheduled_at)
        .bind(MeetingStatus::Scheduled)
        .bind(meeting.created_by)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await?;

        Ok(meeting)
    }

    pub async fn find_by_id(pool: &DbPool, id: Uuid) -> Result<Option<Self>, MeetingError> {
        let meeting = sqlx::query_as::<_, Meeting>("SELECT * FROM meetings WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(meeting)
    }

    /// Upcoming meetings come soonest first; the full history newest first.
    pub async fn find_by_chama(
        pool: &DbPool,
        chama_id: Uuid,
        upcoming_only: bool,
    ) -> Result<Vec<Self>, MeetingError> {
        let meetings = if upcoming_only {
            sqlx::query_as::<_, Meeting>(
                "SELECT * FROM meetings
                 WHERE chama_id = $1 AND status = 'scheduled' AND scheduled_at >= $2
                 ORDER BY scheduled_at ASC",
            )
            .bind(chama_id)
            .bind(Utc::now())
            .fetch_all(pool)
            .await?
        } else {
            sqlx::query_as::<_, Meeting>(
                "SELECT * FROM meetings WHERE chama_id = $1 ORDER BY scheduled_at DESC",
            )
            .bind(chama_id)
            .fetch_all(pool)
            .await?
        };

        Ok(meetings)
    }

    pub async fn update_status(
        pool: &DbPool,
        id: Uuid,
        status: MeetingStatus,
        minutes: Option<String>,
    ) -> Result<Self, MeetingError> {
        let existing = Self::find_by_id(pool, id)
            .await?
            .ok_or(MeetingError::NotFound { id })?;

        existing.status.check_transition(status)?;

        let updated = sqlx::query_as::<_, Meeting>(
            "UPDATE meetings
             SET status = $2, minutes = COALESCE($3, minutes), updated_at = $4
             WHERE id = $1 AND status = 'scheduled'
             RETURNING *",
        )
        .bind(id)
        .bind(status)
        .bind(minutes)
        .bind(Utc::now())
        .fetch_optional(pool)
        .await?;

        updated.ok_or(MeetingError::AlreadyClosed {
            status: existing.status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheduled_meetings_can_close_once() {
        assert!(MeetingStatus::Scheduled.check_transition(MeetingStatus::Completed).is_ok());
        assert!(MeetingStatus::Scheduled.check_transition(MeetingStatus::Cancelled).is_ok());
        assert!(matches!(
            MeetingStatus::Scheduled.check_transition(MeetingStatus::Scheduled),
            Err(MeetingError::InvalidStatus)
        ));
        assert!(matches!(
            MeetingStatus::Cancelled.check_transition(MeetingStatus::Completed),
            Err(MeetingError::AlreadyClosed { status: MeetingStatus::Cancelled })
        ));
    }
}
