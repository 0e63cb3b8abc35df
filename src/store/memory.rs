//! A process-lifetime substitute store, selected when no database is
//! configured. Rides live in a lock-guarded list of raw documents and
//! are lost on restart; production deployments must configure a
//! durable store.

use std::sync::RwLock;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use uuid::Uuid;

use crate::errors::BackendError;
use crate::normalize::{extract_id, map_stored_ride};
use crate::ride::{RideFilter, RidePatch, RideRecord, SortField};
use crate::store::RideStore;

#[derive(Default)]
pub struct MemoryRideStore {
    rides: RwLock<Vec<Value>>,
}

impl MemoryRideStore {
    pub fn new() -> Self {
        Default::default()
    }
}

impl RideStore for MemoryRideStore {
    fn insert(&self, ride: RideRecord) -> BoxFuture<Result<RideRecord, BackendError>> {
        async move { insert(self, ride) }.boxed()
    }

    fn find(&self, filter: RideFilter) -> BoxFuture<Result<Vec<RideRecord>, BackendError>> {
        async move { find(self, filter) }.boxed()
    }

    fn update(&self, id: &str, patch: RidePatch) -> BoxFuture<Result<bool, BackendError>> {
        let id = id.to_owned();

        async move { update(self, &id, patch) }.boxed()
    }
}

fn insert(store: &MemoryRideStore, mut ride: RideRecord) -> Result<RideRecord, BackendError> {
    ride.id = Some(Uuid::new_v4().to_string());

    let doc = serde_json::to_value(&ride).map_err(|source| BackendError::Json { source })?;
    store.rides.write().unwrap().push(doc);

    Ok(ride)
}

fn find(store: &MemoryRideStore, filter: RideFilter) -> Result<Vec<RideRecord>, BackendError> {
    let mut records: Vec<RideRecord> = store
        .rides
        .read()
        .unwrap()
        .iter()
        .map(map_stored_ride)
        .collect();

    records.retain(|record| {
        filter.status.map_or(true, |status| record.status == status)
            && filter
                .user_id
                .as_ref()
                .map_or(true, |user_id| &record.user_id == user_id)
    });

    if let Some(sort) = filter.sort {
        records.sort_by(|a, b| {
            let ordering = match sort.field {
                SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            };

            if sort.descending {
                ordering.reverse()
            } else {
                ordering
            }
        });
    }

    Ok(records)
}

fn update(store: &MemoryRideStore, id: &str, patch: RidePatch) -> Result<bool, BackendError> {
    let mut rides = store.rides.write().unwrap();

    let index = rides
        .iter()
        .position(|doc| doc.as_object().and_then(extract_id).as_deref() == Some(id));

    let index = match index {
        Some(index) => index,
        None => return Ok(false),
    };

    if let Some(fields) = rides[index].as_object_mut() {
        if let Some(status) = patch.status {
            fields.insert("status".to_owned(), Value::from(status.as_str()));
        }

        if let Some(updated_at) = patch.updated_at {
            fields.insert("updatedAt".to_owned(), Value::from(updated_at.unix_timestamp()));
        }
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use time::OffsetDateTime;

    use super::MemoryRideStore;
    use crate::ride::{NewRide, RideFilter, RidePatch, RideRecord, RideStatus};
    use crate::store::RideStore;

    fn record(pickup: &str, user_id: &str, created_at: i64) -> RideRecord {
        RideRecord::new(
            NewRide {
                pickup: Some(pickup.to_owned()),
                ..Default::default()
            },
            user_id.to_owned(),
            OffsetDateTime::from_unix_timestamp(created_at),
        )
    }

    #[tokio::test]
    async fn insert_assigns_an_identifier() {
        let store = MemoryRideStore::new();

        let ride = store
            .insert(record("Koramangala", "u-1", 100))
            .await
            .expect("insert ride");

        assert!(ride.id.is_some());
    }

    #[tokio::test]
    async fn find_filters_and_sorts() {
        let store = MemoryRideStore::new();

        store.insert(record("a", "u-1", 100)).await.expect("insert");
        store.insert(record("b", "u-1", 200)).await.expect("insert");
        store.insert(record("c", "u-2", 300)).await.expect("insert");

        let rides = store
            .find(RideFilter::active_for_user("u-1"))
            .await
            .expect("find rides");

        assert_eq!(rides.len(), 2);
        // Newest first.
        assert_eq!(rides[0].pickup.as_deref(), Some("b"));
        assert_eq!(rides[1].pickup.as_deref(), Some("a"));

        let all = store.find(RideFilter::default()).await.expect("find all");
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn update_merges_a_patch_and_reports_misses() {
        let store = MemoryRideStore::new();

        let ride = store.insert(record("a", "u-1", 100)).await.expect("insert");
        let id = ride.id.expect("inserted ride has an id");

        let now = OffsetDateTime::from_unix_timestamp(500);
        let updated = store
            .update(&id, RidePatch::cancellation(now))
            .await
            .expect("update ride");
        assert!(updated);

        let active = store.find(RideFilter::active()).await.expect("find active");
        assert!(active.is_empty());

        let all = store.find(RideFilter::default()).await.expect("find all");
        assert_eq!(all[0].status, RideStatus::Cancelled);
        assert_eq!(all[0].updated_at, Some(now));

        let missed = store
            .update("no-such-ride", RidePatch::cancellation(now))
            .await
            .expect("update unknown ride");
        assert!(!missed);
    }

    #[tokio::test]
    async fn foreign_documents_are_mapped_on_read() {
        let store = MemoryRideStore::new();

        // Simulates a document written by another client in store
        // shape rather than canonical shape.
        store.rides.write().unwrap().push(json!({
            "_id": { "$oid": "507f1f77" },
            "pickup_location": "Hebbal",
            "status": "active",
            "user_id": "u-7",
            "created_at": 100
        }));

        let rides = store.find(RideFilter::active()).await.expect("find active");

        assert_eq!(rides.len(), 1);
        assert_eq!(rides[0].id.as_deref(), Some("507f1f77"));
        assert_eq!(rides[0].pickup.as_deref(), Some("Hebbal"));
        assert_eq!(rides[0].user_id, "u-7");
    }
}
