use thiserror::Error;

/// Malformed configuration input.
///
/// Always detected locally, before anything is sent to a device.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("sensor group id must not be empty")]
    EmptyGroupId,

    #[error("duplicate sensor group id '{0}'")]
    DuplicateGroupId(String),

    #[error("sensor group '{0}' has no sensor paths")]
    EmptyPathSet(String),

    #[error("sensor group '{0}' contains an empty sensor path")]
    EmptyPath(String),

    #[error("sensor group '{group}' lists path '{path}' more than once")]
    DuplicatePath { group: String, path: String },

    #[error("subscription id must not be empty")]
    EmptySubscriptionId,

    #[error("duplicate subscription id '{0}'")]
    DuplicateSubscriptionId(String),

    #[error("subscription '{0}' has no sensor profiles")]
    EmptyProfileSet(String),

    #[error("subscription '{subscription}' references unknown sensor group '{group}'")]
    UnknownSensorGroup { subscription: String, group: String },

    #[error("subscription '{subscription}' profiles sensor group '{group}' more than once")]
    DuplicateProfile { subscription: String, group: String },

    #[error("subscription '{subscription}' has a non-positive sample interval for '{group}'")]
    NonPositiveInterval { subscription: String, group: String },

    #[error("subscription '{subscription}' has a zero heartbeat interval for '{group}'")]
    NonPositiveHeartbeat { subscription: String, group: String },
}

/// The tree could not be turned into a wire payload.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("configuration tree failed validation: {0}")]
    Invalid(#[from] ValidationError),

    #[error("'{0}' entry has no key value")]
    MissingKey(&'static str),

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}
