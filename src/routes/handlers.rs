use std::time::{Duration, Instant};

use bytes::Bytes;
use serde::Deserialize;
use serde_json::{Map, Value};
use slog::debug;
use time::OffsetDateTime;
use warp::{
    http::StatusCode,
    reject,
    reply::{json, with_header, with_status, Reply},
};

use crate::environment::Environment;
use crate::errors::BackendError;
use crate::normalize;
use crate::ride::{RideFilter, RidePatch, RideRecord};
use crate::routes::{
    rejection::{Context, Rejection},
    response::SuccessResponse,
};
use crate::{matching, matching::MatchQuery};

const SERVER_TIMING_HEADER: &str = "server-timing";
type RouteResult = Result<Box<dyn Reply>, reject::Rejection>;

macro_rules! timed {
    ($($expression:stmt);+) => {
        let start = Instant::now();

        // TODO when `try` blocks are stabilized, we can wrap the body
        // and return the headers even on errors
        let result = { $($expression)+ };

        Ok(Box::new(with_header(
            result,
            SERVER_TIMING_HEADER,
            format_server_timing(start.elapsed()),
        )) as Box<dyn Reply>)
    };
}

/// The request envelope. Parsed leniently: a malformed or empty body
/// dispatches like a missing action name rather than failing at the
/// transport level.
#[derive(Debug, Default, Deserialize)]
pub struct ActionRequest {
    action: Option<String>,

    ride: Option<Map<String, Value>>,

    #[serde(rename = "userId")]
    user_id: Option<String>,
}

pub async fn dispatch(environment: Environment, body: Bytes) -> RouteResult {
    let request: ActionRequest = serde_json::from_slice(&body).unwrap_or_default();

    debug!(environment.logger, "Dispatching action...";
           "action" => request.action.as_deref().unwrap_or(""),
           "user_id" => request.user_id.as_deref().unwrap_or("anonymous"));

    match request.action.as_deref() {
        Some("CREATE_RIDE") => create_ride(environment, request).await,
        Some("GET_MATCHED_RIDES") => matched_rides(environment, request).await,
        Some("GET_USER_RIDES") => user_rides(environment, request).await,
        Some("DELETE_RIDE") => delete_ride(environment, request).await,
        other => {
            let action = other.unwrap_or("").to_owned();

            Err(Rejection::new(
                Context::dispatch(action.clone()),
                BackendError::UnknownAction { action },
            )
            .into())
        }
    }
}

pub async fn health(_environment: Environment) -> RouteResult {
    timed! {
        json(&SuccessResponse::Health {
            status: "ok",
            message: "ride-matching service is live",
        })
    }
}

async fn create_ride(environment: Environment, request: ActionRequest) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::create_ride(), e);

        let payload = request
            .ride
            .ok_or(BackendError::RideMissing)
            .map_err(error_handler)?;

        let user_id = request.user_id.unwrap_or_else(|| "anonymous".to_owned());
        let normalized = normalize::normalize_ride_input(&payload);
        let record = RideRecord::new(normalized, user_id, OffsetDateTime::now_utc());

        debug!(environment.logger, "Creating ride..."; "user_id" => record.user_id.as_str());
        let created = environment
            .store
            .insert(record)
            .await
            .map_err(error_handler)?;

        let response = SuccessResponse::Created {
            success: true,
            id: created.id.clone(),
            ride: created,
        };

        with_status(json(&response), StatusCode::OK)
    }
}

async fn matched_rides(environment: Environment, request: ActionRequest) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::matched_rides(), e);

        // Any subset of the query fields may be present; an empty
        // query simply matches nothing above the threshold.
        let query: MatchQuery = request
            .ride
            .as_ref()
            .map(normalize::normalize_match_query)
            .unwrap_or_default();

        debug!(environment.logger, "Matching rides...";
               "pickup" => query.pickup.as_deref().unwrap_or(""),
               "dropoff" => query.dropoff.as_deref().unwrap_or(""));

        let active = environment
            .store
            .find(RideFilter::active())
            .await
            .map_err(error_handler)?;

        let rides = matching::rank_rides(&query, active);

        json(&SuccessResponse::Matches { rides })
    }
}

async fn user_rides(environment: Environment, request: ActionRequest) -> RouteResult {
    timed! {
        let context_user = request.user_id.clone();
        let error_handler =
            move |e: BackendError| Rejection::new(Context::user_rides(context_user.clone()), e);

        let user_id = request
            .user_id
            .ok_or(BackendError::UserIdMissing)
            .map_err(&error_handler)?;

        debug!(environment.logger, "Listing user rides..."; "user_id" => user_id.as_str());

        let rides = environment
            .store
            .find(RideFilter::active_for_user(user_id))
            .await
            .map_err(&error_handler)?;

        json(&SuccessResponse::Rides { rides })
    }
}

async fn delete_ride(environment: Environment, request: ActionRequest) -> RouteResult {
    timed! {
        let ride_id = request
            .ride
            .as_ref()
            .and_then(|ride| ride.get("rideId").or_else(|| ride.get("ride_id")))
            .and_then(Value::as_str)
            .map(str::to_owned);

        let error_handler =
            |e: BackendError| Rejection::new(Context::delete_ride(ride_id.clone()), e);

        let id = ride_id
            .clone()
            .ok_or(BackendError::RideIdMissing)
            .map_err(&error_handler)?;

        debug!(environment.logger, "Cancelling ride..."; "id" => id.as_str());

        // Soft delete: the record is never physically removed. An
        // identifier that matches nothing reports success=false.
        let success = environment
            .store
            .update(&id, RidePatch::cancellation(OffsetDateTime::now_utc()))
            .await
            .map_err(&error_handler)?;

        json(&SuccessResponse::Deleted { success })
    }
}

fn format_server_timing(seconds: Duration) -> String {
    format!("handler;dur={}", seconds.as_secs_f64() * 1000.0)
}
