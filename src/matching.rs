//! Scoring and ranking of candidate rides against a match query.
//!
//! A candidate scores up to 100 points: 40 for pickup text similarity,
//! 40 for dropoff text similarity and 20 for coordinate proximity. A
//! term contributes nothing when either side of it is missing.

use crate::ride::{MatchedRide, RideRecord};

const PICKUP_WEIGHT: f64 = 40.0;
const DROPOFF_WEIGHT: f64 = 40.0;
const PROXIMITY_WEIGHT: f64 = 20.0;

/// Candidates at or below this total are not worth returning.
const SCORE_THRESHOLD: f64 = 30.0;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Distances under this are a full proximity match.
const NEAR_KM: f64 = 2.0;

/// Distances over this contribute nothing.
const FAR_KM: f64 = 10.0;

/// The fields a caller can match on. Any subset may be present.
#[derive(Clone, Debug, Default)]
pub struct MatchQuery {
    pub pickup: Option<String>,
    pub dropoff: Option<String>,
    pub location: Option<String>,
}

/// Scores the candidates, drops implausible matches and returns the
/// rest ranked by score. Equal scores are ordered by ride identifier
/// so the ranking is deterministic regardless of retrieval order.
pub fn rank_rides(query: &MatchQuery, rides: Vec<RideRecord>) -> Vec<MatchedRide> {
    let mut matches: Vec<MatchedRide> = rides
        .into_iter()
        .map(|ride| {
            let match_score = match_score(query, &ride);
            MatchedRide { ride, match_score }
        })
        .filter(|m| m.match_score > SCORE_THRESHOLD)
        .collect();

    matches.sort_by(|a, b| {
        b.match_score
            .partial_cmp(&a.match_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.ride.id.cmp(&b.ride.id))
    });

    matches
}

/// Computes the composite score of one candidate in `[0, 100]`.
pub fn match_score(query: &MatchQuery, ride: &RideRecord) -> f64 {
    let mut score = 0.0;

    if let (Some(wanted), Some(offered)) = (&query.pickup, &ride.pickup) {
        score += text_similarity(wanted, offered) * PICKUP_WEIGHT;
    }

    if let (Some(wanted), Some(offered)) = (&query.dropoff, &ride.dropoff) {
        score += text_similarity(wanted, offered) * DROPOFF_WEIGHT;
    }

    if let (Some(wanted), Some(offered)) = (&query.location, &ride.location) {
        score += location_proximity(wanted, offered) * PROXIMITY_WEIGHT;
    }

    score
}

/// Word-overlap ratio between two location descriptions, in `[0, 1]`.
///
/// Both sides are case-insensitified and split on whitespace into word
/// sets. A word matches when it contains, or is contained in, some
/// word on the other side. The larger of the two directed match counts
/// is divided by the larger word count, which makes the ratio
/// symmetric.
pub fn text_similarity(a: &str, b: &str) -> f64 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();

    let a_words: Vec<&str> = dedup_words(&a);
    let b_words: Vec<&str> = dedup_words(&b);

    if a_words.is_empty() || b_words.is_empty() {
        return 0.0;
    }

    let forward = directed_matches(&a_words, &b_words);
    let backward = directed_matches(&b_words, &a_words);

    forward.max(backward) as f64 / a_words.len().max(b_words.len()) as f64
}

fn dedup_words(text: &str) -> Vec<&str> {
    let mut words: Vec<&str> = text.split_whitespace().collect();
    words.sort_unstable();
    words.dedup();
    words
}

fn directed_matches(from: &[&str], to: &[&str]) -> usize {
    from.iter()
        .filter(|word| {
            to.iter()
                .any(|other| other.contains(**word) || word.contains(other))
        })
        .count()
}

/// Proximity of two `"lat, lng"` strings, in `[0, 1]`. Anything that
/// doesn't parse as exactly two finite decimals contributes nothing.
pub fn location_proximity(a: &str, b: &str) -> f64 {
    let (a, b) = match (parse_coordinates(a), parse_coordinates(b)) {
        (Some(a), Some(b)) => (a, b),
        _ => return 0.0,
    };

    let distance = haversine_km(a, b);

    if distance < NEAR_KM {
        1.0
    } else if distance > FAR_KM {
        0.0
    } else {
        1.0 - (distance - NEAR_KM) / (FAR_KM - NEAR_KM)
    }
}

fn parse_coordinates(text: &str) -> Option<(f64, f64)> {
    let mut parts = text.split(',');

    let lat: f64 = parts.next()?.trim().parse().ok()?;
    let lng: f64 = parts.next()?.trim().parse().ok()?;

    if parts.next().is_some() || !lat.is_finite() || !lng.is_finite() {
        return None;
    }

    Some((lat, lng))
}

/// Great-circle distance in kilometers.
fn haversine_km((lat1, lng1): (f64, f64), (lat2, lng2): (f64, f64)) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);

    EARTH_RADIUS_KM * 2.0 * a.sqrt().atan2((1.0 - a).sqrt())
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use time::OffsetDateTime;

    use super::{
        location_proximity, match_score, rank_rides, text_similarity, MatchQuery,
    };
    use crate::ride::{NewRide, RideRecord};

    const EPSILON: f64 = 1e-3;

    /// Degrees of latitude corresponding to the given distance along a
    /// meridian.
    fn degrees_for_km(km: f64) -> f64 {
        km * 180.0 / (std::f64::consts::PI * super::EARTH_RADIUS_KM)
    }

    fn ride(
        id: &str,
        pickup: Option<&str>,
        dropoff: Option<&str>,
        location: Option<&str>,
    ) -> RideRecord {
        let mut record = RideRecord::new(
            NewRide {
                pickup: pickup.map(str::to_owned),
                dropoff: dropoff.map(str::to_owned),
                location: location.map(str::to_owned),
                ..Default::default()
            },
            "u-1".to_owned(),
            OffsetDateTime::unix_epoch(),
        );
        record.id = Some(id.to_owned());
        record
    }

    #[test]
    fn identical_text_is_a_full_match() {
        assert!((text_similarity("Whitefield", "whitefield") - 1.0).abs() < EPSILON);
    }

    #[test]
    fn disjoint_text_does_not_match() {
        assert!(text_similarity("Jayanagar", "Whitefield") < EPSILON);
    }

    #[test]
    fn substring_words_match_in_either_direction() {
        let partial = text_similarity("Koramangala", "Koramangala 5th block");
        assert!((partial - 1.0 / 3.0).abs() < EPSILON);

        let reversed = text_similarity("Koramangala 5th block", "Koramangala");
        assert!((partial - reversed).abs() < EPSILON);
    }

    proptest! {
        #[test]
        fn similarity_is_symmetric(a in "[a-c ]{0,16}", b in "[a-c ]{0,16}") {
            let forward = text_similarity(&a, &b);
            let backward = text_similarity(&b, &a);

            prop_assert!((forward - backward).abs() < 1e-9);
            prop_assert!((0.0..=1.0).contains(&forward));
        }
    }

    #[test]
    fn proximity_ramps_between_two_and_ten_kilometers() {
        let origin = "0, 0";
        let near = format!("{}, 0", degrees_for_km(1.5));
        let mid = format!("{}, 0", degrees_for_km(6.0));
        let far = format!("{}, 0", degrees_for_km(15.0));

        assert!((location_proximity(origin, &near) - 1.0).abs() < EPSILON);
        assert!((location_proximity(origin, &mid) - 0.5).abs() < EPSILON);
        assert!(location_proximity(origin, &far) < EPSILON);
    }

    #[test]
    fn unparsable_coordinates_contribute_nothing() {
        assert_eq!(location_proximity("downtown", "12.9, 77.6"), 0.0);
        assert_eq!(location_proximity("12.9, 77.6, 3", "12.9, 77.6"), 0.0);
        assert_eq!(location_proximity("inf, 77.6", "12.9, 77.6"), 0.0);
    }

    #[test]
    fn exact_pickup_and_dropoff_without_location_score_eighty() {
        let query = MatchQuery {
            pickup: Some("Koramangala".to_owned()),
            dropoff: Some("Whitefield".to_owned()),
            location: None,
        };
        let candidate = ride("a", Some("Koramangala"), Some("Whitefield"), None);

        assert!((match_score(&query, &candidate) - 80.0).abs() < EPSILON);
    }

    #[test]
    fn ranking_keeps_plausible_matches_only() {
        let query = MatchQuery {
            pickup: Some("Koramangala".to_owned()),
            dropoff: Some("Whitefield".to_owned()),
            location: None,
        };

        let rides = vec![
            ride("a", Some("Koramangala 5th block"), Some("Whitefield"), None),
            ride("b", Some("Hebbal"), Some("Yelahanka"), None),
        ];

        let ranked = rank_rides(&query, rides);

        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].ride.id.as_deref(), Some("a"));
        assert!(ranked[0].match_score >= 30.0);
    }

    #[test]
    fn equal_scores_order_by_identifier() {
        let query = MatchQuery {
            pickup: Some("Majestic".to_owned()),
            dropoff: Some("Airport".to_owned()),
            location: None,
        };

        let rides = vec![
            ride("b", Some("Majestic"), Some("Airport"), None),
            ride("a", Some("Majestic"), Some("Airport"), None),
        ];

        let ranked = rank_rides(&query, rides);

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].ride.id.as_deref(), Some("a"));
        assert_eq!(ranked[1].ride.id.as_deref(), Some("b"));
    }

    #[test]
    fn an_empty_query_matches_nothing() {
        let rides = vec![ride("a", Some("Koramangala"), Some("Whitefield"), None)];
        assert!(rank_rides(&MatchQuery::default(), rides).is_empty());
    }
}
