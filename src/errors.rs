use thiserror::Error;

/// Enumerates high-level errors returned by this library.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Represents an SQL error.
    #[error("SQLx error")]
    Sqlx { source: sqlx::Error },

    /// Represents a record that could not be serialized for storage.
    #[error("JSON serialization error")]
    Json { source: serde_json::Error },

    /// The CREATE_RIDE envelope carried no ride payload.
    #[error("ride details missing")]
    RideMissing,

    /// The DELETE_RIDE payload carried no ride identifier.
    #[error("missing rideId")]
    RideIdMissing,

    /// The GET_USER_RIDES envelope carried no user.
    #[error("missing userId")]
    UserIdMissing,

    /// The action name is not one the dispatcher knows.
    #[error("invalid action or missing request body")]
    UnknownAction { action: String },
}
