//! Error types for the booking bot.

/// Top-level error type for roombot.
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    /// Configuration error (missing ids, malformed values).
    #[error("config error: {0}")]
    Config(String),

    /// The app credentials were rejected by the token endpoint.
    #[error("auth error: {0}")]
    Auth(String),

    /// Transport-level HTTP failure (connect, timeout, non-JSON body).
    #[error("HTTP error: {0}")]
    Http(String),

    /// The platform answered with a non-zero business code.
    #[error("{operation} failed, code: {code}, msg: {msg}, log_id: {}", log_id.as_deref().unwrap_or("-"))]
    Api {
        /// Human-readable name of the failed operation.
        operation: String,
        /// Platform error code.
        code: i64,
        /// Platform error message.
        msg: String,
        /// Request log id reported by the platform, for support tickets.
        log_id: Option<String>,
    },

    /// A table row or response payload did not have the expected shape.
    #[error("record error: {0}")]
    Record(String),

    /// The room-config table has no enabled rooms.
    #[error(
        "room config table is empty; run `roombot init-rooms` to initialise it, then enable rooms"
    )]
    NoRoomsConfigured,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BookingError {
    /// Returns `true` for errors that require operator intervention.
    ///
    /// Everything else is treated as transient: the current cycle fails and
    /// the next one retries.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::Auth(_) | Self::NoRoomsConfigured
        )
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, BookingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_api_includes_log_id() {
        let err = BookingError::Api {
            operation: "create calendar event".into(),
            code: 190_004,
            msg: "invalid calendar".into(),
            log_id: Some("2024abc".into()),
        };
        assert_eq!(
            err.to_string(),
            "create calendar event failed, code: 190004, msg: invalid calendar, log_id: 2024abc"
        );
    }

    #[test]
    fn display_api_without_log_id() {
        let err = BookingError::Api {
            operation: "list records".into(),
            code: 1,
            msg: "boom".into(),
            log_id: None,
        };
        assert!(err.to_string().ends_with("log_id: -"));
    }

    #[test]
    fn fatal_classification() {
        assert!(BookingError::NoRoomsConfigured.is_fatal());
        assert!(BookingError::Auth("bad secret".into()).is_fatal());
        assert!(BookingError::Config("missing app_id".into()).is_fatal());
        assert!(!BookingError::Http("timeout".into()).is_fatal());
        assert!(!BookingError::Record("bad row".into()).is_fatal());
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<BookingError>();
    }
}
