use thiserror::Error;

/// Machine-readable error codes carried in backend error bodies.
///
/// The backend historically signalled the multi-session case through its
/// message text alone; the decode layer maps that legacy message onto
/// `SessionConflict` so callers only ever see the typed code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCode {
    SessionConflict,
    InvalidCredentials,
    NotFound,
    Validation,
    Other(String),
}

impl ErrorCode {
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_uppercase().as_str() {
            "SESSION_CONFLICT" => ErrorCode::SessionConflict,
            "INVALID_CREDENTIALS" => ErrorCode::InvalidCredentials,
            "NOT_FOUND" => ErrorCode::NotFound,
            "VALIDATION" => ErrorCode::Validation,
            _ => ErrorCode::Other(raw.to_string()),
        }
    }
}

/// Errors from the HTTP boundary.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// 401 without a conflict code: the session is no longer accepted.
    #[error("not authorized")]
    Unauthorized,

    /// The account became active in another session; this one must end.
    #[error("account is active in another session")]
    SessionConflict,

    #[error("backend rejected the request ({code:?}): {message}")]
    Backend { code: ErrorCode, message: String },

    #[error("malformed response body: {0}")]
    Decode(String),
}

/// Errors from the quiz session state machine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("quiz has no questions")]
    EmptyQuiz,

    #[error("question index {0} is out of range")]
    OutOfRange(usize),

    /// Navigation hit the first or last question. Callers that want the
    /// clamped no-op behavior can simply ignore this.
    #[error("already at the edge of the quiz")]
    Boundary,

    #[error("this quiz only moves forward")]
    LinearOnly,

    #[error("session is completed")]
    Closed,

    #[error("time expired for question {0}")]
    QuestionLocked(usize),

    #[error("this quiz does not allow retakes")]
    RetakeNotAllowed,

    #[error("session is not completed yet")]
    NotCompleted,
}

/// Errors from the local advisory cache.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("corrupt stored value for {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

/// Client-side form validation failure; every offending field is listed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid form: {}", issues.join("; "))]
pub struct ValidationError {
    pub issues: Vec<String>,
}

/// Umbrella error for operations that cross layer boundaries.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_parse_known() {
        assert_eq!(ErrorCode::parse("SESSION_CONFLICT"), ErrorCode::SessionConflict);
        assert_eq!(ErrorCode::parse("session_conflict"), ErrorCode::SessionConflict);
        assert_eq!(
            ErrorCode::parse("INVALID_CREDENTIALS"),
            ErrorCode::InvalidCredentials
        );
    }

    #[test]
    fn test_error_code_parse_unknown() {
        assert_eq!(
            ErrorCode::parse("RATE_LIMITED"),
            ErrorCode::Other("RATE_LIMITED".to_string())
        );
    }

    #[test]
    fn test_validation_error_display_lists_all_issues() {
        let err = ValidationError {
            issues: vec!["email is required".to_string(), "passwords do not match".to_string()],
        };
        let text = err.to_string();
        assert!(text.contains("email is required"));
        assert!(text.contains("passwords do not match"));
    }
}
