use std::sync::Arc;

use chrono::{DateTime, Utc};
use metrics::counter;

use roll_stock_core::{
    DomainError, DomainResult, FilterEngine, Roll, RollFilter, RollStatistics, StatisticsEngine,
};
use roll_stock_storage::{Database, NewRoll, RollStoreError};

/// Applies lifecycle rules and read paths over the record store.
///
/// Every call re-reads the full record set, so results are consistent
/// only within a single call. The fetch-check-write sequence in
/// [`RollService::remove`] is not transactional; the store serializes
/// individual writes but two concurrent removals of the same id race.
#[derive(Clone)]
pub struct RollService {
    database: Database,
    clock: Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>,
}

impl RollService {
    pub fn new(database: Database) -> Self {
        Self {
            database,
            clock: Arc::new(Utc::now),
        }
    }

    #[cfg(test)]
    pub fn with_clock(mut self, clock: Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>) -> Self {
        self.clock = clock;
        self
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Returns the rolls matching every supplied bound.
    pub async fn list(&self, filter: &RollFilter) -> DomainResult<Vec<Roll>> {
        FilterEngine::validate(filter)?;
        let rolls = self
            .database
            .rolls()
            .list_all()
            .await
            .map_err(store_failure)?;
        FilterEngine::apply(rolls, filter)
    }

    /// Fetches a single roll by its positive id.
    pub async fn get(&self, id: i64) -> DomainResult<Roll> {
        if id <= 0 {
            return Err(DomainError::validation("id must be positive"));
        }
        let roll = self
            .database
            .rolls()
            .find_by_id(id)
            .await
            .map_err(store_failure)?;
        roll.ok_or(DomainError::NotFound)
    }

    /// Creates a roll entering stock now and persists it once.
    pub async fn add(&self, length: f64, weight: f64) -> DomainResult<Roll> {
        let record = NewRoll {
            length,
            weight,
            added_at: self.now(),
        };
        let roll = self
            .database
            .rolls()
            .insert(&record)
            .await
            .map_err(store_failure)?;
        counter!("roll_lifecycle_transitions_total", "op" => "add").increment(1);
        Ok(roll)
    }

    /// Marks a roll as removed at the supplied instant. Removal is terminal.
    pub async fn remove(&self, id: i64, remove_at: DateTime<Utc>) -> DomainResult<Roll> {
        let mut roll = self.get(id).await?;
        if roll.remove_at.is_some() {
            return Err(DomainError::conflict("roll has already been removed"));
        }
        if remove_at < roll.added_at {
            return Err(DomainError::validation(
                "remove_at precedes the roll's added_at",
            ));
        }
        roll.remove_at = Some(remove_at);
        self.database
            .rolls()
            .update(&roll)
            .await
            .map_err(store_failure)?;
        counter!("roll_lifecycle_transitions_total", "op" => "remove").increment(1);
        Ok(roll)
    }

    /// Recomputes the statistics report for the inclusive range.
    pub async fn statistics(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<RollStatistics> {
        let rolls = self
            .database
            .rolls()
            .list_all()
            .await
            .map_err(store_failure)?;
        StatisticsEngine::compute(&rolls, start, end)
    }
}

fn store_failure(err: RollStoreError) -> DomainError {
    match err {
        RollStoreError::CheckViolation => {
            DomainError::validation("length and weight must be positive")
        }
        RollStoreError::MissingRoll => DomainError::NotFound,
        other => DomainError::internal(other),
    }
}
