//! FocusSession entity - the session-of-record owned by the session service.

use crate::domain::foundation::{FocusMinutes, SessionId, Timestamp, UserId};

use super::{SessionCreated, SessionDeleted, SessionError, SessionUpdated};

/// A single block of focused work.
///
/// `duration_minutes` is derived from start and end time and is zero while
/// the session is still open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusSession {
    id: SessionId,
    user_id: UserId,
    topic: String,
    start_time: Timestamp,
    end_time: Option<Timestamp>,
    duration_minutes: FocusMinutes,
    is_daily_goal_achieved: bool,
}

impl FocusSession {
    /// Starts a new open session.
    pub fn start(
        id: SessionId,
        user_id: UserId,
        topic: impl Into<String>,
        start_time: Timestamp,
    ) -> Result<Self, SessionError> {
        let topic = validate_topic(topic.into())?;
        Ok(Self {
            id,
            user_id,
            topic,
            start_time,
            end_time: None,
            duration_minutes: FocusMinutes::ZERO,
            is_daily_goal_achieved: false,
        })
    }

    /// Rebuilds a session from persisted state.
    #[allow(clippy::too_many_arguments)]
    pub fn reconstitute(
        id: SessionId,
        user_id: UserId,
        topic: String,
        start_time: Timestamp,
        end_time: Option<Timestamp>,
        duration_minutes: FocusMinutes,
        is_daily_goal_achieved: bool,
    ) -> Self {
        Self {
            id,
            user_id,
            topic,
            start_time,
            end_time,
            duration_minutes,
            is_daily_goal_achieved,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn start_time(&self) -> &Timestamp {
        &self.start_time
    }

    pub fn end_time(&self) -> Option<&Timestamp> {
        self.end_time.as_ref()
    }

    pub fn duration_minutes(&self) -> FocusMinutes {
        self.duration_minutes
    }

    pub fn is_daily_goal_achieved(&self) -> bool {
        self.is_daily_goal_achieved
    }

    /// Fails with `Forbidden` unless `user_id` owns this session.
    pub fn authorize(&self, user_id: &UserId) -> Result<(), SessionError> {
        if &self.user_id != user_id {
            return Err(SessionError::forbidden());
        }
        Ok(())
    }

    /// Applies an edit and recomputes the duration.
    pub fn update(
        &mut self,
        topic: impl Into<String>,
        end_time: Option<Timestamp>,
    ) -> Result<(), SessionError> {
        if let Some(end) = end_time.as_ref() {
            if end.is_before(&self.start_time) {
                return Err(SessionError::validation(
                    "end_time",
                    "End time cannot be before start time",
                ));
            }
        }
        self.topic = validate_topic(topic.into())?;
        self.end_time = end_time;
        self.duration_minutes = FocusMinutes::between(&self.start_time, self.end_time.as_ref());
        Ok(())
    }

    /// Flags this session as the one that crossed the daily goal.
    ///
    /// Returns `false` when the flag was already set.
    pub fn mark_daily_goal_achieved(&mut self) -> bool {
        let changed = !self.is_daily_goal_achieved;
        self.is_daily_goal_achieved = true;
        changed
    }

    pub fn created_event(&self) -> SessionCreated {
        SessionCreated {
            session_id: self.id,
            user_id: self.user_id.clone(),
            topic: self.topic.clone(),
            start_time: self.start_time,
        }
    }

    pub fn updated_event(&self, updated_at: Timestamp) -> SessionUpdated {
        SessionUpdated {
            session_id: self.id,
            user_id: self.user_id.clone(),
            topic: self.topic.clone(),
            start_time: self.start_time,
            end_time: self.end_time,
            duration_minutes: self.duration_minutes,
            updated_at,
        }
    }

    pub fn deleted_event(&self, deleted_at: Timestamp) -> SessionDeleted {
        SessionDeleted {
            session_id: self.id,
            user_id: self.user_id.clone(),
            deleted_at,
        }
    }
}

fn validate_topic(topic: String) -> Result<String, SessionError> {
    let trimmed = topic.trim();
    if trimmed.is_empty() {
        return Err(SessionError::validation("topic", "Topic cannot be empty"));
    }
    if trimmed.chars().count() > 200 {
        return Err(SessionError::validation(
            "topic",
            "Topic cannot exceed 200 characters",
        ));
    }
    Ok(trimmed.to_string())
}
