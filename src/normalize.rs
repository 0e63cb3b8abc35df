//! Translation between the shapes clients and stores use for rides and
//! the canonical [`RideRecord`] shape.
//!
//! Callers submit fields in application-style camelCase, store-style
//! snake_case or a handful of legacy aliases. Each canonical field is
//! resolved through a fixed precedence list; keys we don't recognize
//! are preserved as extension fields but can never override a
//! canonical one.

use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::matching::MatchQuery;
use crate::ride::{NewRide, RideRecord, RideStatus};

const RIDE_NAME_ALIASES: &[&str] = &["rideName", "ride_name", "name"];
const PICKUP_ALIASES: &[&str] = &["pickup", "pickup_location", "from_location"];
const DROPOFF_ALIASES: &[&str] = &["dropoff", "dropoff_location", "to_location"];
const TIME_ALIASES: &[&str] = &["time", "ride_date", "scheduled_date", "date"];
const TYPE_ALIASES: &[&str] = &["type", "ride_type", "mode"];
const FARE_ALIASES: &[&str] = &["estimatedFare", "fare_estimate", "fare"];
const DRIVER_ALIASES: &[&str] = &["driverName", "driver_name"];
const VEHICLE_ALIASES: &[&str] = &["vehicle", "vehicle_details"];
const SEATS_ALIASES: &[&str] = &["seats", "seats_available"];
const LOCATION_ALIASES: &[&str] = &["location", "coords"];
const USER_ID_ALIASES: &[&str] = &["userId", "user_id"];
const CREATED_AT_ALIASES: &[&str] = &["createdAt", "created_at"];
const UPDATED_AT_ALIASES: &[&str] = &["updatedAt", "updated_at"];

const LOCATION_LAT_KEY: &str = "location_lat";
const LOCATION_LNG_KEY: &str = "location_lng";

/// Keys that are assigned by the dispatcher or the serializer and must
/// not enter the extension bag, or duplicate keys would appear in
/// responses.
const RESERVED_KEYS: &[&str] = &["id", "_id", "status", "matchScore", "_raw", "rideId", "ride_id"];

/// Derives the canonical ride shape from a submission in any supported
/// naming convention. Pure; the input is not mutated.
pub fn normalize_ride_input(input: &Map<String, Value>) -> NewRide {
    NewRide {
        ride_name: resolve(input, RIDE_NAME_ALIASES),
        pickup: resolve(input, PICKUP_ALIASES),
        dropoff: resolve(input, DROPOFF_ALIASES),
        time: resolve(input, TIME_ALIASES),
        ride_type: resolve(input, TYPE_ALIASES),
        estimated_fare: resolve(input, FARE_ALIASES),
        driver_name: resolve(input, DRIVER_ALIASES),
        vehicle: resolve(input, VEHICLE_ALIASES),
        seats: resolve(input, SEATS_ALIASES),
        location: resolve_location(input),
        extra: extension_fields(input),
    }
}

/// Extracts the match query fields from a `GET_MATCHED_RIDES` payload,
/// applying the same alias rules as ride submissions.
pub fn normalize_match_query(input: &Map<String, Value>) -> MatchQuery {
    MatchQuery {
        pickup: resolve(input, PICKUP_ALIASES),
        dropoff: resolve(input, DROPOFF_ALIASES),
        location: resolve_location(input),
    }
}

/// Maps a store-native document to the canonical record shape,
/// attaching the source document under `raw`.
///
/// Mapping an already-mapped record again yields the same canonical
/// fields: the canonical names head every alias list, so they win on
/// the second pass too.
pub fn map_stored_ride(doc: &Value) -> RideRecord {
    let empty = Map::new();
    let fields = doc.as_object().unwrap_or(&empty);

    RideRecord {
        id: extract_id(fields),
        ride_name: resolve(fields, RIDE_NAME_ALIASES),
        pickup: resolve(fields, PICKUP_ALIASES),
        dropoff: resolve(fields, DROPOFF_ALIASES),
        time: resolve(fields, TIME_ALIASES),
        ride_type: resolve(fields, TYPE_ALIASES),
        estimated_fare: resolve(fields, FARE_ALIASES),
        driver_name: resolve(fields, DRIVER_ALIASES),
        vehicle: resolve(fields, VEHICLE_ALIASES),
        seats: resolve(fields, SEATS_ALIASES),
        location: resolve_location(fields),
        status: fields
            .get("status")
            .and_then(Value::as_str)
            .map(RideStatus::from_label)
            .unwrap_or(RideStatus::Active),
        user_id: resolve(fields, USER_ID_ALIASES).unwrap_or_else(|| "anonymous".to_owned()),
        created_at: extract_timestamp(fields, CREATED_AT_ALIASES)
            .unwrap_or_else(OffsetDateTime::unix_epoch),
        updated_at: extract_timestamp(fields, UPDATED_AT_ALIASES),
        extra: extension_fields(fields),
        raw: Some(doc.clone()),
    }
}

/// Pulls the identifier out of a store document. Stores disagree on
/// the shape: a plain `id` string, an `_id` that stringifies, or a
/// structured `{"$oid": ...}` wrapper.
pub fn extract_id(fields: &Map<String, Value>) -> Option<String> {
    if let Some(Value::String(id)) = fields.get("id") {
        return Some(id.clone());
    }

    match fields.get("_id") {
        Some(Value::String(id)) => Some(id.clone()),
        Some(Value::Number(id)) => Some(id.to_string()),
        Some(Value::Object(wrapper)) => wrapper
            .get("$oid")
            .and_then(Value::as_str)
            .map(str::to_owned),
        _ => None,
    }
}

fn resolve(fields: &Map<String, Value>, aliases: &[&str]) -> Option<String> {
    first_value(fields, aliases).and_then(scalar_string)
}

fn first_value<'a>(fields: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    aliases
        .iter()
        .find_map(|key| fields.get(*key).filter(|value| !value.is_null()))
}

/// Strings pass through and numbers are stringified; structured values
/// don't populate canonical string fields.
fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A textual `location` wins; otherwise a `location_lat`/`location_lng`
/// pair is synthesized as `"lat, lng"`; the legacy `coords` alias comes
/// last.
fn resolve_location(fields: &Map<String, Value>) -> Option<String> {
    if let Some(location) = fields
        .get("location")
        .filter(|value| !value.is_null())
        .and_then(scalar_string)
    {
        return Some(location);
    }

    let lat = fields
        .get(LOCATION_LAT_KEY)
        .filter(|value| !value.is_null())
        .and_then(scalar_string);
    let lng = fields
        .get(LOCATION_LNG_KEY)
        .filter(|value| !value.is_null())
        .and_then(scalar_string);

    if let (Some(lat), Some(lng)) = (lat, lng) {
        return Some(format!("{}, {}", lat, lng));
    }

    fields
        .get("coords")
        .filter(|value| !value.is_null())
        .and_then(scalar_string)
}

fn extract_timestamp(fields: &Map<String, Value>, aliases: &[&str]) -> Option<OffsetDateTime> {
    first_value(fields, aliases)?
        .as_i64()
        .map(OffsetDateTime::from_unix_timestamp)
}

fn extension_fields(fields: &Map<String, Value>) -> Map<String, Value> {
    fields
        .iter()
        .filter(|(key, _)| !consumed_key(key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn consumed_key(key: &str) -> bool {
    RIDE_NAME_ALIASES.contains(&key)
        || PICKUP_ALIASES.contains(&key)
        || DROPOFF_ALIASES.contains(&key)
        || TIME_ALIASES.contains(&key)
        || TYPE_ALIASES.contains(&key)
        || FARE_ALIASES.contains(&key)
        || DRIVER_ALIASES.contains(&key)
        || VEHICLE_ALIASES.contains(&key)
        || SEATS_ALIASES.contains(&key)
        || LOCATION_ALIASES.contains(&key)
        || USER_ID_ALIASES.contains(&key)
        || CREATED_AT_ALIASES.contains(&key)
        || UPDATED_AT_ALIASES.contains(&key)
        || RESERVED_KEYS.contains(&key)
        || key == LOCATION_LAT_KEY
        || key == LOCATION_LNG_KEY
}
