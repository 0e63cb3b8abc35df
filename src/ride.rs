use serde::Serialize;
use serde_json::{Map, Value};
use time::OffsetDateTime;

/// A single ride in the store, in the canonical shape. Optional fields
/// serialize as explicit nulls so clients see a uniform record
/// regardless of which store produced it.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RideRecord {
    /// The store-assigned identifier. `None` until inserted.
    pub id: Option<String>,

    pub ride_name: Option<String>,

    pub pickup: Option<String>,

    pub dropoff: Option<String>,

    /// The scheduled time, kept as the opaque string the client sent.
    pub time: Option<String>,

    /// "solo", "shared" or "offer".
    #[serde(rename = "type")]
    pub ride_type: Option<String>,

    pub estimated_fare: Option<String>,

    pub driver_name: Option<String>,

    pub vehicle: Option<String>,

    pub seats: Option<String>,

    /// Free text or a "lat, lng" pair.
    pub location: Option<String>,

    pub status: RideStatus,

    /// "anonymous" when the caller supplied no user.
    pub user_id: String,

    #[serde(with = "timestamp")]
    pub created_at: OffsetDateTime,

    #[serde(with = "optional_timestamp")]
    pub updated_at: Option<OffsetDateTime>,

    /// Extension fields the client passed that we don't interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,

    /// The source document as the store returned it, for advanced
    /// clients. Never a primary field.
    #[serde(rename = "_raw", skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,
}

impl RideRecord {
    /// Stamps a normalized submission into a record ready for insertion.
    pub fn new(ride: NewRide, user_id: String, created_at: OffsetDateTime) -> Self {
        RideRecord {
            id: None,
            ride_name: ride.ride_name,
            pickup: ride.pickup,
            dropoff: ride.dropoff,
            time: ride.time,
            ride_type: ride.ride_type,
            estimated_fare: ride.estimated_fare,
            driver_name: ride.driver_name,
            vehicle: ride.vehicle,
            seats: ride.seats,
            location: ride.location,
            status: RideStatus::Active,
            user_id,
            created_at,
            updated_at: None,
            extra: ride.extra,
            raw: None,
        }
    }
}

/// The lifecycle state of a ride. Transitions are one-directional:
/// active rides can be cancelled, cancelled rides stay cancelled.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RideStatus {
    Active,
    Cancelled,
}

impl RideStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RideStatus::Active => "active",
            RideStatus::Cancelled => "cancelled",
        }
    }

    /// Parses a stored status label. Anything that isn't explicitly
    /// cancelled counts as active, matching the filter semantics of
    /// the store.
    pub fn from_label(label: &str) -> Self {
        if label == "cancelled" {
            RideStatus::Cancelled
        } else {
            RideStatus::Active
        }
    }
}

/// A ride submission after normalization, before the dispatcher stamps
/// identity and lifecycle fields onto it.
#[derive(Clone, Debug, Default)]
pub struct NewRide {
    pub ride_name: Option<String>,
    pub pickup: Option<String>,
    pub dropoff: Option<String>,
    pub time: Option<String>,
    pub ride_type: Option<String>,
    pub estimated_fare: Option<String>,
    pub driver_name: Option<String>,
    pub vehicle: Option<String>,
    pub seats: Option<String>,
    pub location: Option<String>,
    pub extra: Map<String, Value>,
}

/// A ride plus its relevance to a match query. Computed fresh per
/// query, never persisted.
#[derive(Clone, Debug, Serialize)]
pub struct MatchedRide {
    #[serde(flatten)]
    pub ride: RideRecord,

    #[serde(rename = "matchScore")]
    pub match_score: f64,
}

/// An equality filter over the typed top-level fields of a ride. An
/// empty filter matches every record.
#[derive(Clone, Debug, Default)]
pub struct RideFilter {
    pub status: Option<RideStatus>,
    pub user_id: Option<String>,
    pub sort: Option<SortOrder>,
}

impl RideFilter {
    /// All active rides, in retrieval order.
    pub fn active() -> Self {
        RideFilter {
            status: Some(RideStatus::Active),
            ..Default::default()
        }
    }

    /// A user's active rides, newest first.
    pub fn active_for_user(user_id: impl Into<String>) -> Self {
        RideFilter {
            status: Some(RideStatus::Active),
            user_id: Some(user_id.into()),
            sort: Some(SortOrder {
                field: SortField::CreatedAt,
                descending: true,
            }),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct SortOrder {
    pub field: SortField,
    pub descending: bool,
}

#[derive(Clone, Copy, Debug)]
pub enum SortField {
    CreatedAt,
}

/// A partial update merged into an existing ride by
/// [`RideStore::update`](crate::store::RideStore::update).
#[derive(Clone, Debug, Default)]
pub struct RidePatch {
    pub status: Option<RideStatus>,
    pub updated_at: Option<OffsetDateTime>,
}

impl RidePatch {
    /// The soft-delete patch.
    pub fn cancellation(at: OffsetDateTime) -> Self {
        RidePatch {
            status: Some(RideStatus::Cancelled),
            updated_at: Some(at),
        }
    }
}

pub(crate) mod timestamp {
    use serde::Serializer;
    use time::OffsetDateTime;

    pub fn serialize<S>(value: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where S: Serializer {
        serializer.serialize_i64(value.unix_timestamp())
    }
}

pub(crate) mod optional_timestamp {
    use serde::Serializer;
    use time::OffsetDateTime;

    pub fn serialize<S>(value: &Option<OffsetDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where S: Serializer {
        match value {
            Some(value) => serializer.serialize_some(&value.unix_timestamp()),
            None => serializer.serialize_none(),
        }
    }
}
