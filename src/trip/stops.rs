use std::ops::Index;

use serde::{Deserialize, Serialize};

use crate::trip::{DriverLocation, LocationSearchResult, StopSource, TripStop};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Towards index 0.
    Up,
    Down,
}

impl From<&LocationSearchResult> for TripStop {
    fn from(value: &LocationSearchResult) -> Self {
        TripStop::new(value.label.clone(), value.coordinate, StopSource::Search)
    }
}

impl From<&DriverLocation> for TripStop {
    fn from(value: &DriverLocation) -> Self {
        TripStop::new(value.name.clone(), value.coordinate, StopSource::Current)
    }
}

/// Ordered waypoints of a trip, start first.
///
/// Every edit returns a new list and leaves `self` untouched, so a snapshot
/// handed to a view can never change under it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StopList(Vec<TripStop>);

impl From<Vec<TripStop>> for StopList {
    fn from(value: Vec<TripStop>) -> Self {
        Self(value)
    }
}

impl Index<usize> for StopList {
    type Output = TripStop;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl StopList {
    pub fn new() -> Self {
        Default::default()
    }

    /// A list holding only the driver's current location.
    pub fn seeded(default_location: &DriverLocation) -> Self {
        Self(vec![default_location.into()])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[TripStop] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<TripStop> {
        self.0.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TripStop> {
        self.0.iter()
    }

    /// A route needs at least a start and one destination.
    pub fn is_plannable(&self) -> bool {
        self.0.len() >= 2
    }

    #[must_use]
    pub fn add_stop(&self, location: &LocationSearchResult) -> Self {
        let mut next = self.0.clone();
        next.push(location.into());
        Self(next)
    }

    /// Replaces the start, or inserts it when the list is empty.
    #[must_use]
    pub fn set_start(&self, location: &LocationSearchResult) -> Self {
        self.with_start(location.into())
    }

    /// Puts the driver's current location back as the start.
    ///
    /// Any other stop still tagged as the current location (it can be moved
    /// away from index 0) is retagged as a search stop so the list keeps a
    /// single current stop.
    #[must_use]
    pub fn reset_start(&self, default_location: &DriverLocation) -> Self {
        let mut next = self.with_start(default_location.into());
        next.0
            .iter_mut()
            .skip(1)
            .filter(|stop| stop.source == StopSource::Current)
            .for_each(|stop| stop.source = StopSource::Search);
        next
    }

    /// Swaps a stop with its neighbour. Out of range moves leave the list as is.
    #[must_use]
    pub fn move_stop(&self, index: usize, direction: Direction) -> Self {
        let target = match direction {
            Direction::Up => index.checked_sub(1),
            Direction::Down => index.checked_add(1),
        };
        match target {
            Some(target) if index < self.0.len() && target < self.0.len() => {
                let mut next = self.0.clone();
                next.swap(index, target);
                Self(next)
            }
            _ => self.clone(),
        }
    }

    /// Removes a stop. The start (index 0) cannot be removed this way.
    #[must_use]
    pub fn remove_stop(&self, index: usize) -> Self {
        if index == 0 || index >= self.0.len() {
            return self.clone();
        }
        let mut next = self.0.clone();
        next.remove(index);
        Self(next)
    }

    fn with_start(&self, stop: TripStop) -> Self {
        let mut next = self.0.clone();
        match next.first_mut() {
            Some(first) => *first = stop,
            None => next.push(stop),
        }
        Self(next)
    }
}
