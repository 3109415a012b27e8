//! In-memory timer store owned by the daemon's control loop.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::identity::{IdentityError, IdentityGenerator, TimerId};

/// A named countdown with a fixed expiry instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timer {
    pub id: TimerId,
    pub description: String,
    pub expiry: DateTime<Utc>,
}

/// Errors from store lookups.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("no timer with identity {0}")]
    NotFound(TimerId),
}

/// The set of live timers, keyed by identity.
///
/// Listings and expiry sweeps are ordered by expiry instant, soonest first,
/// with the identity as tie-breaker so equal expiries keep creation order.
#[derive(Default)]
pub struct TimerStore {
    timers: HashMap<TimerId, Timer>,
    ids: IdentityGenerator,
}

impl TimerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new timer and return its identity.
    pub fn add(
        &mut self,
        description: impl Into<String>,
        expiry: DateTime<Utc>,
    ) -> Result<TimerId, IdentityError> {
        let id = self.ids.next_id()?;
        self.timers.insert(
            id,
            Timer {
                id,
                description: description.into(),
                expiry,
            },
        );
        Ok(id)
    }

    /// Replace the description of an existing timer.
    pub fn describe(
        &mut self,
        id: &TimerId,
        description: impl Into<String>,
    ) -> Result<(), StoreError> {
        let timer = self.timers.get_mut(id).ok_or(StoreError::NotFound(*id))?;
        timer.description = description.into();
        Ok(())
    }

    /// Delete a timer, returning it.
    pub fn remove(&mut self, id: &TimerId) -> Result<Timer, StoreError> {
        self.timers.remove(id).ok_or(StoreError::NotFound(*id))
    }

    #[cfg(test)]
    pub(crate) fn get(&self, id: &TimerId) -> Option<&Timer> {
        self.timers.get(id)
    }

    /// All live timers, soonest expiry first.
    pub fn list(&self) -> Vec<&Timer> {
        let mut timers: Vec<&Timer> = self.timers.values().collect();
        timers.sort_by_key(|t| (t.expiry, t.id));
        timers
    }

    /// Remove and return every timer whose expiry is at or before `now`,
    /// soonest first.
    pub fn take_expired(&mut self, now: DateTime<Utc>) -> Vec<Timer> {
        let due: Vec<TimerId> = self
            .timers
            .values()
            .filter(|t| t.expiry <= now)
            .map(|t| t.id)
            .collect();

        let mut expired: Vec<Timer> = due
            .iter()
            .filter_map(|id| self.timers.remove(id))
            .collect();
        expired.sort_by_key(|t| (t.expiry, t.id));
        expired
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}
