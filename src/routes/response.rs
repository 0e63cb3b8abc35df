use serde::Serialize;

use crate::ride::{MatchedRide, RideRecord};

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SuccessResponse<'a> {
    Created {
        success: bool,
        id: Option<String>,
        ride: RideRecord,
    },
    Matches {
        rides: Vec<MatchedRide>,
    },
    Rides {
        rides: Vec<RideRecord>,
    },
    Deleted {
        success: bool,
    },
    Health {
        status: &'a str,
        message: &'a str,
    },
}
