use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A physical material roll tracked in the warehouse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Roll {
    /// Store-assigned positive identifier.
    pub id: i64,
    pub length: f64,
    pub weight: f64,
    /// Set once when the roll enters stock, immutable thereafter.
    pub added_at: DateTime<Utc>,
    /// Absent while the roll is in stock; once set it is never cleared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remove_at: Option<DateTime<Utc>>,
}

impl Roll {
    /// Returns `true` while the roll is still in stock.
    pub fn is_active(&self) -> bool {
        self.remove_at.is_none()
    }

    /// Time the roll spent in stock, available once it has been removed.
    pub fn storage_duration(&self) -> Option<Duration> {
        self.remove_at.map(|removed| removed - self.added_at)
    }

    /// Returns `true` when the roll's active interval overlaps `[start, end]`.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.added_at <= end && self.remove_at.map_or(true, |removed| removed >= start)
    }

    /// Returns `true` when the roll was in stock at the given instant.
    pub fn active_at(&self, at: DateTime<Utc>) -> bool {
        self.added_at <= at && self.remove_at.map_or(true, |removed| removed >= at)
    }
}

/// Optional inclusive bounds narrowing the roll collection.
///
/// Unspecified bounds impose no constraint; supplied bounds combine
/// with logical AND across dimensions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RollFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_from: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_to: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub removed_from: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub removed_to: Option<DateTime<Utc>>,
}

impl RollFilter {
    /// Returns `true` when a `remove_at` bound was supplied.
    pub fn constrains_removal(&self) -> bool {
        self.removed_from.is_some() || self.removed_to.is_some()
    }
}

/// Count and total weight of the rolls in stock on one day of a scan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySnapshot {
    pub date: DateTime<Utc>,
    pub count: u64,
    pub total_weight: f64,
}

/// Derived report over a date range; recomputed on every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollStatistics {
    pub added_count: u64,
    pub removed_count: u64,
    pub average_length: f64,
    pub average_weight: f64,
    pub min_length: f64,
    pub max_length: f64,
    pub min_weight: f64,
    pub max_weight: f64,
    pub total_weight: f64,
    /// Shortest time a removed roll spent in stock, in whole seconds.
    #[serde(with = "duration_seconds")]
    pub min_storage_duration: Duration,
    /// Longest time a removed roll spent in stock, in whole seconds.
    #[serde(with = "duration_seconds")]
    pub max_storage_duration: Duration,
    pub day_of_min_count: DateTime<Utc>,
    pub day_of_max_count: DateTime<Utc>,
    pub day_of_min_total_weight: DateTime<Utc>,
    pub day_of_max_total_weight: DateTime<Utc>,
}

/// Serializes a [`Duration`] as whole seconds on the wire.
pub mod duration_seconds {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(value.num_seconds())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        i64::deserialize(deserializer).map(Duration::seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw)
            .expect("valid timestamp")
            .with_timezone(&Utc)
    }

    #[test]
    fn active_roll_omits_remove_at_on_the_wire() {
        let roll = Roll {
            id: 1,
            length: 10.0,
            weight: 5.0,
            added_at: ts("2026-01-01T00:00:00Z"),
            remove_at: None,
        };
        let json = serde_json::to_value(&roll).expect("serialize");
        assert!(json.get("remove_at").is_none());

        let parsed: Roll = serde_json::from_value(json).expect("deserialize");
        assert_eq!(parsed, roll);
        assert!(parsed.is_active());
    }

    #[test]
    fn storage_duration_requires_removal() {
        let mut roll = Roll {
            id: 1,
            length: 10.0,
            weight: 5.0,
            added_at: ts("2026-01-01T00:00:00Z"),
            remove_at: None,
        };
        assert_eq!(roll.storage_duration(), None);

        roll.remove_at = Some(ts("2026-01-03T00:00:00Z"));
        assert_eq!(roll.storage_duration(), Some(Duration::days(2)));
    }

    #[test]
    fn overlap_covers_open_ended_rolls() {
        let roll = Roll {
            id: 1,
            length: 1.0,
            weight: 1.0,
            added_at: ts("2026-01-05T00:00:00Z"),
            remove_at: None,
        };
        assert!(roll.overlaps(ts("2026-01-01T00:00:00Z"), ts("2026-01-05T00:00:00Z")));
        assert!(!roll.overlaps(ts("2026-01-01T00:00:00Z"), ts("2026-01-04T00:00:00Z")));
    }

    #[test]
    fn durations_round_trip_as_seconds() {
        let stats = RollStatistics {
            added_count: 1,
            removed_count: 1,
            average_length: 10.0,
            average_weight: 5.0,
            min_length: 10.0,
            max_length: 10.0,
            min_weight: 5.0,
            max_weight: 5.0,
            total_weight: 5.0,
            min_storage_duration: Duration::hours(6),
            max_storage_duration: Duration::days(2),
            day_of_min_count: ts("2026-01-01T00:00:00Z"),
            day_of_max_count: ts("2026-01-02T00:00:00Z"),
            day_of_min_total_weight: ts("2026-01-01T00:00:00Z"),
            day_of_max_total_weight: ts("2026-01-02T00:00:00Z"),
        };
        let json = serde_json::to_value(&stats).expect("serialize");
        assert_eq!(json["min_storage_duration"].as_i64(), Some(6 * 3600));
        assert_eq!(json["max_storage_duration"].as_i64(), Some(2 * 86400));

        let parsed: RollStatistics = serde_json::from_value(json).expect("deserialize");
        assert_eq!(parsed, stats);
    }
}
