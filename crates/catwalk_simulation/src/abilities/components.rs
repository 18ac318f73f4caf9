//! Ability components and tuning (call, hairball).

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Call + hairball tuning.
#[derive(Debug, Clone, Copy, PartialEq, Reflect, Serialize, Deserialize)]
#[serde(default)]
pub struct AbilityConfig {
    pub min_call_radius: f32,
    pub max_call_radius: f32,
    /// Hold time to reach the max radius (seconds)
    pub call_charge_time: f32,
    pub call_cooldown: f32,
    pub hairball_cooldown: f32,
    /// Live hairballs one player may own at once
    pub max_active_hairballs: usize,
}

impl Default for AbilityConfig {
    fn default() -> Self {
        Self {
            min_call_radius: 2.0,
            max_call_radius: 10.0,
            call_charge_time: 1.5,
            call_cooldown: 3.0,
            hairball_cooldown: 2.0,
            max_active_hairballs: 3,
        }
    }
}

impl AbilityConfig {
    /// Radius after holding the call for `hold` seconds:
    /// lerp(min, max, clamp01(hold / charge_time)).
    pub fn call_radius(&self, hold: f32) -> f32 {
        let t = if self.call_charge_time > 0.0 {
            (hold / self.call_charge_time).clamp(0.0, 1.0)
        } else {
            1.0
        };
        self.min_call_radius + (self.max_call_radius - self.min_call_radius) * t
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Reflect, Serialize, Deserialize)]
#[serde(default)]
pub struct HairballConfig {
    /// Throw speed (m/s)
    pub speed: f32,
    pub lifetime: f32,
    /// Landed trap trigger radius
    pub stun_radius: f32,
    pub stun_duration: f32,
    /// In-flight hit radius
    pub contact_radius: f32,
}

impl Default for HairballConfig {
    fn default() -> Self {
        Self {
            speed: 8.0,
            lifetime: 5.0,
            stun_radius: 1.5,
            stun_duration: 2.0,
            contact_radius: 0.5,
        }
    }
}

/// Player ability state. Times are on the fixed clock.
#[derive(Component, Debug, Clone, PartialEq, Default)]
pub struct PlayerAbilities {
    pub config: AbilityConfig,
    pub hairball: HairballConfig,

    /// Some while the call button is held
    pub charge_started_at: Option<f64>,
    /// Hold time of the current charge (refreshed every tick)
    pub hold_time: f32,
    /// Radius the call would have if released now
    pub current_radius: f32,
    pub last_call_at: Option<f64>,
    pub last_hairball_at: Option<f64>,

    // Counters
    pub calls_used: u32,
    pub guards_distracted: u32,
    pub hairballs_thrown: u32,
}

impl PlayerAbilities {
    pub fn new(config: AbilityConfig, hairball: HairballConfig) -> Self {
        Self {
            config,
            hairball,
            ..default()
        }
    }

    pub fn is_charging(&self) -> bool {
        self.charge_started_at.is_some()
    }

    pub fn call_ready(&self, now: f64) -> bool {
        self.last_call_at
            .is_none_or(|at| now - at >= self.config.call_cooldown as f64)
    }

    pub fn hairball_ready(&self, now: f64) -> bool {
        self.last_hairball_at
            .is_none_or(|at| now - at >= self.config.hairball_cooldown as f64)
    }
}

/// Thrown or dropped hairball. Flying while `velocity` is non-zero and
/// not landed; a landed hairball is a static trap.
#[derive(Component, Debug, Clone, PartialEq)]
#[require(Transform)]
pub struct Hairball {
    pub owner: Entity,
    pub velocity: Vec2,
    pub age: f32,
    pub landed: bool,
    pub config: HairballConfig,
}

impl Hairball {
    pub fn thrown(owner: Entity, direction: Vec2, config: HairballConfig) -> Self {
        Self {
            owner,
            velocity: direction.normalize_or_zero() * config.speed,
            age: 0.0,
            landed: false,
            config,
        }
    }

    pub fn dropped(owner: Entity, config: HairballConfig) -> Self {
        Self {
            owner,
            velocity: Vec2::ZERO,
            age: 0.0,
            landed: true,
            config,
        }
    }

    pub fn is_flying(&self) -> bool {
        !self.landed
    }
}
