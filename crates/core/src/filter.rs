use crate::error::{DomainError, DomainResult};
use crate::types::{Roll, RollFilter};

/// Narrows a record snapshot to the rolls matching every supplied bound.
pub struct FilterEngine;

impl FilterEngine {
    /// Validates the filter and applies it to the full record set.
    ///
    /// An empty result is surfaced as [`DomainError::NotFound`] rather
    /// than an empty success; an unfiltered empty store takes the same
    /// path.
    pub fn apply(rolls: Vec<Roll>, filter: &RollFilter) -> DomainResult<Vec<Roll>> {
        Self::validate(filter)?;

        let matched: Vec<Roll> = rolls
            .into_iter()
            .filter(|roll| Self::matches(filter, roll))
            .collect();

        if matched.is_empty() {
            return Err(DomainError::NotFound);
        }
        Ok(matched)
    }

    /// Rejects any bound pair supplied with `min > max`, naming the pair.
    pub fn validate(filter: &RollFilter) -> DomainResult<()> {
        ensure_ordered("id", &filter.min_id, &filter.max_id)?;
        ensure_ordered("length", &filter.min_length, &filter.max_length)?;
        ensure_ordered("weight", &filter.min_weight, &filter.max_weight)?;
        ensure_ordered("added_at", &filter.added_from, &filter.added_to)?;
        ensure_ordered("remove_at", &filter.removed_from, &filter.removed_to)?;
        Ok(())
    }

    fn matches(filter: &RollFilter, roll: &Roll) -> bool {
        if !within(roll.id, filter.min_id, filter.max_id) {
            return false;
        }
        if !within(roll.length, filter.min_length, filter.max_length) {
            return false;
        }
        if !within(roll.weight, filter.min_weight, filter.max_weight) {
            return false;
        }
        if !within(roll.added_at, filter.added_from, filter.added_to) {
            return false;
        }
        if filter.constrains_removal() {
            // A roll that never left stock cannot match a removal bound.
            let Some(removed) = roll.remove_at else {
                return false;
            };
            if !within(removed, filter.removed_from, filter.removed_to) {
                return false;
            }
        }
        true
    }
}

fn ensure_ordered<T: PartialOrd>(name: &str, min: &Option<T>, max: &Option<T>) -> DomainResult<()> {
    if let (Some(lo), Some(hi)) = (min, max) {
        if lo > hi {
            return Err(DomainError::validation(format!(
                "{name} bounds are inverted: min exceeds max"
            )));
        }
    }
    Ok(())
}

fn within<T: PartialOrd>(value: T, min: Option<T>, max: Option<T>) -> bool {
    if let Some(lo) = min {
        if value < lo {
            return false;
        }
    }
    if let Some(hi) = max {
        if value > hi {
            return false;
        }
    }
    true
}
