//! Session-specific error types.

use crate::domain::foundation::{DomainError, ErrorCode, SessionId};

/// Session-specific errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Session was not found.
    NotFound(SessionId),
    /// User is not authorized.
    Forbidden,
    /// Internal caller presented a missing or wrong API key.
    Unauthorized,
    /// Validation failed.
    ValidationFailed { field: String, message: String },
    /// Infrastructure error.
    Infrastructure(String),
}

impl SessionError {
    pub fn not_found(id: SessionId) -> Self {
        SessionError::NotFound(id)
    }
    pub fn forbidden() -> Self {
        SessionError::Forbidden
    }
    pub fn unauthorized() -> Self {
        SessionError::Unauthorized
    }
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        SessionError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }
    pub fn infrastructure(message: impl Into<String>) -> Self {
        SessionError::Infrastructure(message.into())
    }
    pub fn code(&self) -> ErrorCode {
        match self {
            SessionError::NotFound(_) => ErrorCode::SessionNotFound,
            SessionError::Forbidden => ErrorCode::Forbidden,
            SessionError::Unauthorized => ErrorCode::Unauthorized,
            SessionError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            SessionError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }
    pub fn message(&self) -> String {
        match self {
            SessionError::NotFound(id) => format!("Session not found: {}", id),
            SessionError::Forbidden => "Permission denied".to_string(),
            SessionError::Unauthorized => "Invalid internal API key".to_string(),
            SessionError::ValidationFailed { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            SessionError::Infrastructure(msg) => format!("Error: {}", msg),
        }
    }
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for SessionError {}

impl From<DomainError> for SessionError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::Forbidden => SessionError::Forbidden,
            ErrorCode::Unauthorized => SessionError::Unauthorized,
            ErrorCode::ValidationFailed => SessionError::ValidationFailed {
                field: err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                message: err.message,
            },
            _ => SessionError::Infrastructure(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_includes_id() {
        let id = SessionId::new();
        let err = SessionError::not_found(id);
        assert_eq!(err.code(), ErrorCode::SessionNotFound);
        assert!(err.to_string().contains(&id.to_string()));
    }

    #[test]
    fn serialization_failures_become_infrastructure_errors() {
        let err: SessionError =
            DomainError::new(ErrorCode::SerializationError, "bad payload").into();
        assert!(matches!(err, SessionError::Infrastructure(_)));
    }

    #[test]
    fn validation_errors_keep_field() {
        let err: SessionError = DomainError::validation("topic", "empty").into();
        assert_eq!(
            err,
            SessionError::ValidationFailed {
                field: "topic".to_string(),
                message: "empty".to_string()
            }
        );
    }
}
