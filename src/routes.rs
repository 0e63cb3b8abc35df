use std::sync::Arc;

use slog::{error, Logger};
use warp::filters::BoxedFilter;
use warp::http::StatusCode;
use warp::reject;
use warp::reply::{json, with_status, Json, Reply, WithStatus};
use warp::Filter;

use crate::environment::Environment;
use crate::errors::BackendError;

mod handlers;
pub mod rejection;
mod response;

type Route = BoxedFilter<(Box<dyn Reply>,)>;

/// The action endpoint: every operation arrives as a POST envelope
/// `{ action, ride?, userId? }`. Body size is enforced by the HTTP
/// gateway; the body itself is parsed leniently in the handler.
pub fn make_action_route(environment: Environment) -> Route {
    warp::any()
        .map(move || environment.clone())
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::bytes())
        .and_then(handlers::dispatch)
        .boxed()
}

/// The liveness probe: a bare GET returns `{ status: "ok", ... }`.
pub fn make_health_route(environment: Environment) -> Route {
    warp::any()
        .map(move || environment.clone())
        .and(warp::path::end())
        .and(warp::get())
        .and_then(handlers::health)
        .boxed()
}

pub async fn format_rejection(
    logger: Arc<Logger>,
    rej: reject::Rejection,
) -> Result<WithStatus<Json>, reject::Rejection> {
    if let Some(r) = rej.find::<rejection::Rejection>() {
        let e = &r.error;
        error!(logger, "Backend error"; "context" => ?r.context, "error" => ?e, "status" => %status_code_for(e), "message" => %e);
        let flattened = r.flatten();

        return Ok(with_status(json(&flattened), status_code_for(e)));
    }

    Err(rej)
}

fn status_code_for(e: &BackendError) -> StatusCode {
    use BackendError::*;

    match e {
        RideMissing | RideIdMissing | UserIdMissing | UnknownAction { .. } => {
            StatusCode::BAD_REQUEST
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
