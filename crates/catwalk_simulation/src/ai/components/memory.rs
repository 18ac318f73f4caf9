//! Player tracking memory: last known position, sight history, prediction.

use std::collections::VecDeque;

use bevy::prelude::*;

const DEFAULT_HISTORY_CAPACITY: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SightSample {
    pub position: Vec2,
    /// Fixed-clock seconds
    pub time: f64,
}

/// Fixed-capacity buffer of recent sightings, oldest evicted first.
#[derive(Debug, Clone, PartialEq)]
pub struct SightHistory {
    samples: VecDeque<SightSample>,
    capacity: usize,
}

impl Default for SightHistory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

impl SightHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn push(&mut self, position: Vec2, time: f64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(SightSample { position, time });
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn newest(&self) -> Option<SightSample> {
        self.samples.back().copied()
    }

    /// Velocity from the two newest samples; None with < 2 samples or no time between them.
    pub fn velocity(&self) -> Option<Vec2> {
        let count = self.samples.len();
        if count < 2 {
            return None;
        }
        let previous = self.samples[count - 2];
        let newest = self.samples[count - 1];
        let dt = (newest.time - previous.time) as f32;
        (dt > f32::EPSILON).then(|| (newest.position - previous.position) / dt)
    }

    /// Newest position extrapolated `horizon` seconds ahead.
    pub fn extrapolate(&self, horizon: f32) -> Option<Vec2> {
        let newest = self.newest()?;
        let velocity = self.velocity()?;
        Some(newest.position + velocity * horizon)
    }
}

/// What a guard remembers about the player.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackingMemory {
    pub last_known_position: Vec2,
    /// Seconds since the player was last visible (reset on chase start)
    pub time_since_seen: f32,
    pub in_sight: bool,
    pub history: SightHistory,
    /// Nav-snapped extrapolation, refreshed on every sighting
    pub predicted_position: Option<Vec2>,
}

impl TrackingMemory {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            history: SightHistory::with_capacity(capacity),
            ..default()
        }
    }

    /// Folds a sighting in. A new continuous sighting starts a fresh history
    /// so velocity is never estimated across a gap.
    pub fn observe(&mut self, position: Vec2, now: f64) {
        if !self.in_sight {
            self.history.clear();
            self.predicted_position = None;
        }
        self.in_sight = true;
        self.history.push(position, now);
        self.last_known_position = position;
        self.time_since_seen = 0.0;
    }

    pub fn unseen(&mut self, dt: f32) {
        self.in_sight = false;
        self.time_since_seen += dt;
    }

    /// Forget everything, keeping the configured capacity.
    pub fn clear(&mut self) {
        *self = Self::with_capacity(self.history.capacity());
    }
}
