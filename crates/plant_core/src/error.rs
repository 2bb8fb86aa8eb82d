use thiserror::Error;

use crate::notifications::NotificationError;
use crate::storage::StorageError;

pub type Result<T, E = CareError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum CareError {
    #[error("failed to read `{key}` from storage: {source}")]
    StorageRead {
        key: String,
        #[source]
        source: StorageError,
    },
    #[error("failed to write `{key}` to storage: {source}")]
    StorageWrite {
        key: String,
        #[source]
        source: StorageError,
    },
    #[error("stored `{key}` could not be decoded: {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{kind} `{id}` not found")]
    NotFound { kind: &'static str, id: String },
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("notification error: {0}")]
    Notification(String),
}

impl From<NotificationError> for CareError {
    fn from(err: NotificationError) -> Self {
        Self::Notification(err.0)
    }
}

impl CareError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Short text suitable for an alert shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            Self::StorageRead { .. } | Self::Serialization { .. } => {
                "Could not load your plants. Please try again.".to_string()
            }
            Self::StorageWrite { .. } => "Could not save your changes. Please try again.".to_string(),
            Self::NotFound { kind, .. } => format!("That {kind} no longer exists."),
            Self::Validation(message) => message.clone(),
            Self::Notification(_) => "Could not schedule reminders.".to_string(),
        }
    }
}
