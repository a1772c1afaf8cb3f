use chrono::{DateTime, Duration, Utc};

use crate::error::{DomainError, DomainResult};
use crate::types::{DailySnapshot, Roll, RollStatistics};

/// Lazily yields each day of an inclusive range, one day at a time.
///
/// Restart a scan by constructing a fresh range; nothing is buffered.
pub struct DayRange {
    next: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl DayRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { next: start, end }
    }
}

impl Iterator for DayRange {
    type Item = DateTime<Utc>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next > self.end {
            return None;
        }
        let current = self.next;
        self.next = current + Duration::days(1);
        Some(current)
    }
}

/// Computes the statistics report over a full record snapshot.
pub struct StatisticsEngine;

impl StatisticsEngine {
    /// Builds the report for the inclusive range `[start, end]`.
    ///
    /// Whole-period aggregates come first, then a day-by-day scan
    /// selects the four notable days; on ties the earliest day wins.
    pub fn compute(
        rolls: &[Roll],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<RollStatistics> {
        let in_period: Vec<&Roll> = rolls.iter().filter(|r| r.overlaps(start, end)).collect();

        let mut extremes: Option<DayExtremes> = None;
        for day in DayRange::new(start, end) {
            let snapshot = Self::snapshot(&in_period, day);
            match &mut extremes {
                None => extremes = Some(DayExtremes::new(snapshot)),
                Some(tracker) => tracker.observe(snapshot),
            }
        }
        // An inverted range yields no days to scan.
        let Some(extremes) = extremes else {
            return Err(DomainError::validation(
                "statistics range is inverted: start_date is after end_date",
            ));
        };

        let added_count = rolls
            .iter()
            .filter(|r| r.added_at >= start && r.added_at <= end)
            .count() as u64;
        let removed_count = rolls
            .iter()
            .filter(|r| r.remove_at.map_or(false, |t| t >= start && t <= end))
            .count() as u64;

        let count = in_period.len();
        let total_length: f64 = in_period.iter().map(|r| r.length).sum();
        let total_weight: f64 = in_period.iter().map(|r| r.weight).sum();
        let (average_length, average_weight) = if count == 0 {
            (0.0, 0.0)
        } else {
            (total_length / count as f64, total_weight / count as f64)
        };

        let (min_duration, max_duration) = duration_bounds(&in_period);

        Ok(RollStatistics {
            added_count,
            removed_count,
            average_length,
            average_weight,
            min_length: extreme(in_period.iter().map(|r| r.length), f64::min),
            max_length: extreme(in_period.iter().map(|r| r.length), f64::max),
            min_weight: extreme(in_period.iter().map(|r| r.weight), f64::min),
            max_weight: extreme(in_period.iter().map(|r| r.weight), f64::max),
            total_weight,
            min_storage_duration: min_duration,
            max_storage_duration: max_duration,
            day_of_min_count: extremes.min_count.date,
            day_of_max_count: extremes.max_count.date,
            day_of_min_total_weight: extremes.min_weight.date,
            day_of_max_total_weight: extremes.max_weight.date,
        })
    }

    fn snapshot(in_period: &[&Roll], day: DateTime<Utc>) -> DailySnapshot {
        let mut count = 0u64;
        let mut total_weight = 0.0f64;
        for roll in in_period {
            if roll.active_at(day) {
                count += 1;
                total_weight += roll.weight;
            }
        }
        DailySnapshot {
            date: day,
            count,
            total_weight,
        }
    }
}

/// Running extremes over an ascending sequence of daily snapshots.
///
/// Comparisons are strict, so the first minimal or maximal day seen is
/// the one reported.
struct DayExtremes {
    min_count: DailySnapshot,
    max_count: DailySnapshot,
    min_weight: DailySnapshot,
    max_weight: DailySnapshot,
}

impl DayExtremes {
    fn new(first: DailySnapshot) -> Self {
        Self {
            min_count: first.clone(),
            max_count: first.clone(),
            min_weight: first.clone(),
            max_weight: first,
        }
    }

    fn observe(&mut self, snapshot: DailySnapshot) {
        if snapshot.count < self.min_count.count {
            self.min_count = snapshot.clone();
        }
        if snapshot.count > self.max_count.count {
            self.max_count = snapshot.clone();
        }
        if snapshot.total_weight < self.min_weight.total_weight {
            self.min_weight = snapshot.clone();
        }
        if snapshot.total_weight > self.max_weight.total_weight {
            self.max_weight = snapshot;
        }
    }
}

fn extreme(values: impl Iterator<Item = f64>, pick: fn(f64, f64) -> f64) -> f64 {
    let mut out = None;
    for value in values {
        out = Some(match out {
            None => value,
            Some(current) => pick(current, value),
        });
    }
    out.unwrap_or(0.0)
}

fn duration_bounds(in_period: &[&Roll]) -> (Duration, Duration) {
    let mut bounds: Option<(Duration, Duration)> = None;
    for duration in in_period.iter().filter_map(|r| r.storage_duration()) {
        bounds = Some(match bounds {
            None => (duration, duration),
            Some((lo, hi)) => (lo.min(duration), hi.max(duration)),
        });
    }
    bounds.unwrap_or((Duration::zero(), Duration::zero()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw)
            .expect("valid timestamp")
            .with_timezone(&Utc)
    }

    fn roll(id: i64, length: f64, weight: f64, added: &str, removed: Option<&str>) -> Roll {
        Roll {
            id,
            length,
            weight,
            added_at: ts(added),
            remove_at: removed.map(ts),
        }
    }

    #[test]
    fn day_range_is_inclusive() {
        let days: Vec<_> =
            DayRange::new(ts("2026-01-01T06:00:00Z"), ts("2026-01-03T06:00:00Z")).collect();
        assert_eq!(
            days,
            vec![
                ts("2026-01-01T06:00:00Z"),
                ts("2026-01-02T06:00:00Z"),
                ts("2026-01-03T06:00:00Z"),
            ]
        );
    }

    #[test]
    fn day_range_yields_single_day_when_bounds_coincide() {
        let days: Vec<_> =
            DayRange::new(ts("2026-01-01T00:00:00Z"), ts("2026-01-01T00:00:00Z")).collect();
        assert_eq!(days.len(), 1);
    }

    #[test]
    fn day_range_is_empty_when_inverted() {
        let mut days = DayRange::new(ts("2026-01-02T00:00:00Z"), ts("2026-01-01T00:00:00Z"));
        assert!(days.next().is_none());
    }

    #[test]
    fn report_matches_the_reference_scenario() {
        // One roll added two days before the range end and removed a day
        // later, one still in stock.
        let rolls = vec![
            roll(
                1,
                10.0,
                5.0,
                "2026-03-08T12:00:00Z",
                Some("2026-03-09T12:00:00Z"),
            ),
            roll(2, 20.0, 10.0, "2026-03-09T12:00:00Z", None),
        ];
        let stats = StatisticsEngine::compute(
            &rolls,
            ts("2026-03-07T12:00:00Z"),
            ts("2026-03-10T12:00:00Z"),
        )
        .expect("report");

        assert_eq!(stats.added_count, 2);
        assert_eq!(stats.removed_count, 1);
        assert_eq!(stats.average_length, 15.0);
        assert_eq!(stats.average_weight, 7.5);
        assert_eq!(stats.max_length, 20.0);
        assert_eq!(stats.min_length, 10.0);
        assert_eq!(stats.max_weight, 10.0);
        assert_eq!(stats.min_weight, 5.0);
        assert_eq!(stats.total_weight, 15.0);
        assert!(stats.total_weight > 0.0);
        assert_eq!(stats.min_storage_duration, Duration::days(1));
        assert_eq!(stats.max_storage_duration, Duration::days(1));
    }

    #[test]
    fn empty_period_yields_zeros() {
        let stats = StatisticsEngine::compute(
            &[],
            ts("2026-01-01T00:00:00Z"),
            ts("2026-01-03T00:00:00Z"),
        )
        .expect("report");

        assert_eq!(stats.added_count, 0);
        assert_eq!(stats.removed_count, 0);
        assert_eq!(stats.average_length, 0.0);
        assert_eq!(stats.average_weight, 0.0);
        assert_eq!(stats.min_length, 0.0);
        assert_eq!(stats.max_length, 0.0);
        assert_eq!(stats.total_weight, 0.0);
        assert_eq!(stats.min_storage_duration, Duration::zero());
        assert_eq!(stats.max_storage_duration, Duration::zero());
        // With nothing in stock every day ties; the earliest wins.
        assert_eq!(stats.day_of_min_count, ts("2026-01-01T00:00:00Z"));
        assert_eq!(stats.day_of_max_count, ts("2026-01-01T00:00:00Z"));
    }

    #[test]
    fn roll_removed_before_the_range_is_ignored() {
        let rolls = vec![roll(
            1,
            10.0,
            5.0,
            "2025-12-01T00:00:00Z",
            Some("2025-12-15T00:00:00Z"),
        )];
        let stats = StatisticsEngine::compute(
            &rolls,
            ts("2026-01-01T00:00:00Z"),
            ts("2026-01-02T00:00:00Z"),
        )
        .expect("report");

        assert_eq!(stats.added_count, 0);
        assert_eq!(stats.removed_count, 0);
        assert_eq!(stats.average_length, 0.0);
        assert_eq!(stats.total_weight, 0.0);
    }

    #[test]
    fn notable_days_track_the_daily_scan() {
        // Day 1: roll 1 only. Day 2: both (roll 1 leaves that day).
        // Days 3 and 4: roll 2 only.
        let rolls = vec![
            roll(
                1,
                10.0,
                5.0,
                "2026-01-01T00:00:00Z",
                Some("2026-01-02T00:00:00Z"),
            ),
            roll(2, 20.0, 10.0, "2026-01-02T00:00:00Z", None),
        ];
        let stats = StatisticsEngine::compute(
            &rolls,
            ts("2026-01-01T00:00:00Z"),
            ts("2026-01-04T00:00:00Z"),
        )
        .expect("report");

        assert_eq!(stats.day_of_max_count, ts("2026-01-02T00:00:00Z"));
        assert_eq!(stats.day_of_max_total_weight, ts("2026-01-02T00:00:00Z"));
        // Count 1 happens on days 1, 3 and 4; the scan keeps the first.
        assert_eq!(stats.day_of_min_count, ts("2026-01-01T00:00:00Z"));
        // Weight 5 on day 1 undercuts weight 10 on days 3 and 4.
        assert_eq!(stats.day_of_min_total_weight, ts("2026-01-01T00:00:00Z"));
    }

    #[test]
    fn inverted_range_is_rejected() {
        let err = StatisticsEngine::compute(
            &[],
            ts("2026-01-02T00:00:00Z"),
            ts("2026-01-01T00:00:00Z"),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn computing_twice_yields_identical_reports() {
        let rolls = vec![
            roll(
                1,
                10.0,
                5.0,
                "2026-01-01T00:00:00Z",
                Some("2026-01-02T00:00:00Z"),
            ),
            roll(2, 20.0, 10.0, "2026-01-02T00:00:00Z", None),
        ];
        let start = ts("2026-01-01T00:00:00Z");
        let end = ts("2026-01-04T00:00:00Z");
        let first = StatisticsEngine::compute(&rolls, start, end).expect("report");
        let second = StatisticsEngine::compute(&rolls, start, end).expect("report");
        assert_eq!(first, second);
    }
}
