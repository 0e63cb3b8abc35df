use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::{Map, Value};
use sqlx::postgres::PgPool;
use sqlx::types::Json;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::errors::BackendError;
use crate::ride::{RideFilter, RidePatch, RideRecord, RideStatus, SortField};
use crate::store::RideStore;

/// The durable store, backed by a `rides` table (see `migrations/`).
pub struct PgRideStore {
    pool: PgPool,
}

impl PgRideStore {
    pub fn new(pool: PgPool) -> Self {
        PgRideStore { pool }
    }

    pub async fn connect(connection_string: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPool::connect(connection_string).await?;

        Ok(PgRideStore::new(pool))
    }
}

// these can be simplified once async functions in traits are stabilized
impl RideStore for PgRideStore {
    fn insert(&self, mut ride: RideRecord) -> BoxFuture<Result<RideRecord, BackendError>> {
        async move {
            let id = Uuid::new_v4();

            sqlx::query(include_str!("queries/insert_ride.sql"))
                .bind(id)
                .bind(ride.ride_name.clone())
                .bind(ride.pickup.clone())
                .bind(ride.dropoff.clone())
                .bind(ride.time.clone())
                .bind(ride.ride_type.clone())
                .bind(ride.estimated_fare.clone())
                .bind(ride.driver_name.clone())
                .bind(ride.vehicle.clone())
                .bind(ride.seats.clone())
                .bind(ride.location.clone())
                .bind(ride.status.as_str())
                .bind(ride.user_id.clone())
                .bind(ride.created_at)
                .bind(ride.updated_at)
                .bind(Json(ride.extra.clone()))
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

            ride.id = Some(id.to_string());

            Ok(ride)
        }
        .boxed()
    }

    fn find(&self, filter: RideFilter) -> BoxFuture<Result<Vec<RideRecord>, BackendError>> {
        async move {
            let mut sql = include_str!("queries/find_rides.sql").to_owned();

            if let Some(sort) = filter.sort {
                sql.push_str(" ORDER BY ");
                sql.push_str(match sort.field {
                    SortField::CreatedAt => "created_at",
                });

                if sort.descending {
                    sql.push_str(" DESC");
                }
            }

            let rows = sqlx::query_as::<_, RideRow>(&sql)
                .bind(filter.status.map(|status| status.as_str().to_owned()))
                .bind(filter.user_id)
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

            Ok(rows.into_iter().map(RideRecord::from).collect())
        }
        .boxed()
    }

    fn update(&self, id: &str, patch: RidePatch) -> BoxFuture<Result<bool, BackendError>> {
        // An identifier that isn't a UUID cannot match any row, so it
        // reports the same no-op as an unknown one.
        let id = Uuid::parse_str(id).ok();

        async move {
            let id = match id {
                Some(id) => id,
                None => return Ok(false),
            };

            let result = sqlx::query(include_str!("queries/update_ride.sql"))
                .bind(id)
                .bind(patch.status.map(|status| status.as_str().to_owned()))
                .bind(patch.updated_at)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

            Ok(result.rows_affected() > 0)
        }
        .boxed()
    }
}

#[derive(sqlx::FromRow)]
struct RideRow {
    id: Uuid,
    ride_name: Option<String>,
    pickup: Option<String>,
    dropoff: Option<String>,
    ride_time: Option<String>,
    ride_type: Option<String>,
    estimated_fare: Option<String>,
    driver_name: Option<String>,
    vehicle: Option<String>,
    seats: Option<String>,
    location: Option<String>,
    status: String,
    user_id: String,
    created_at: OffsetDateTime,
    updated_at: Option<OffsetDateTime>,
    extra: Json<Map<String, Value>>,
}

impl From<RideRow> for RideRecord {
    fn from(row: RideRow) -> Self {
        RideRecord {
            id: Some(row.id.to_string()),
            ride_name: row.ride_name,
            pickup: row.pickup,
            dropoff: row.dropoff,
            time: row.ride_time,
            ride_type: row.ride_type,
            estimated_fare: row.estimated_fare,
            driver_name: row.driver_name,
            vehicle: row.vehicle,
            seats: row.seats,
            location: row.location,
            status: RideStatus::from_label(&row.status),
            user_id: row.user_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
            extra: row.extra.0,
            raw: None,
        }
    }
}

fn map_sqlx_error(source: sqlx::Error) -> BackendError {
    BackendError::Sqlx { source }
}
