use serde::Serialize;
use warp::reject;

use crate::errors::BackendError;

/// The four action names the dispatcher accepts, echoed back to
/// callers that send anything else.
pub const EXPECTED_ACTIONS: &[&str] = &[
    "CREATE_RIDE",
    "GET_MATCHED_RIDES",
    "GET_USER_RIDES",
    "DELETE_RIDE",
];

/// A [`BackendError`] paired with the operation it interrupted. The
/// context is logged, never serialized; callers get the uniform error
/// body from [`flatten`](Rejection::flatten).
#[derive(Debug)]
pub struct Rejection {
    pub(crate) context: Context,
    pub(crate) error: BackendError,
}

impl Rejection {
    pub fn new(context: Context, error: BackendError) -> Self {
        Rejection { context, error }
    }

    pub fn flatten(&self) -> FlattenedRejection {
        FlattenedRejection {
            error: format!("{}", self.error),
            expected_actions: match self.error {
                BackendError::UnknownAction { .. } => Some(EXPECTED_ACTIONS),
                _ => None,
            },
        }
    }
}

impl reject::Reject for Rejection {}

/// The uniform error body: `{ "error": ... }`, plus the accepted
/// action names when the caller sent an unknown one.
#[derive(Debug, Serialize)]
pub struct FlattenedRejection {
    pub(crate) error: String,

    #[serde(rename = "expectedActions", skip_serializing_if = "Option::is_none")]
    pub(crate) expected_actions: Option<&'static [&'static str]>,
}

#[derive(Clone, Debug)]
pub enum Context {
    CreateRide,
    MatchedRides,
    UserRides { user_id: Option<String> },
    DeleteRide { ride_id: Option<String> },
    Dispatch { action: String },
}

impl Context {
    pub fn create_ride() -> Context {
        Context::CreateRide
    }

    pub fn matched_rides() -> Context {
        Context::MatchedRides
    }

    pub fn user_rides(user_id: Option<String>) -> Context {
        Context::UserRides { user_id }
    }

    pub fn delete_ride(ride_id: Option<String>) -> Context {
        Context::DeleteRide { ride_id }
    }

    pub fn dispatch(action: String) -> Context {
        Context::Dispatch { action }
    }
}
