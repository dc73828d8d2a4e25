use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// How passive drag is applied when neither accelerate nor brake is held.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DragModel {
    /// Multiply by the drag factor once per tick, whatever `dt` is.
    PerTick,
    /// Multiply by `drag ^ (dt * reference_hz)`, so the decay only depends on elapsed time.
    TimeScaled { reference_hz: f32 },
}

/// Handling constants of the kart and its interactions with the track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub max_speed: f32,
    pub acceleration: f32,
    /// Braking decelerates this many times faster than accelerating.
    pub brake_factor: f32,
    pub steering_speed: f32,
    /// Share of steering authority lost at `max_speed`.
    pub steer_falloff: f32,
    pub steer_gain: f32,
    pub drag: f32,
    pub drag_model: DragModel,
    /// Below this `|speed|` drag snaps the kart to rest.
    pub rest_epsilon: f32,
    /// The kart must go faster than `max_speed / drift_speed_divisor` to drift.
    pub drift_speed_divisor: f32,
    pub drift_charge_rate: f32,
    pub gravity: f32,
    pub half_height: f32,
    pub probe_distance: f32,
    pub collision_radius: f32,
    pub collision_slowdown: f32,
    pub shake_duration: f32,
    pub shake_speed: f32,
    pub pickup_radius: f32,
    pub boost_amount: f32,
    pub boost_duration: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            max_speed: 25.0,
            acceleration: 0.8,
            brake_factor: 2.0,
            steering_speed: 3.0,
            steer_falloff: 0.7,
            steer_gain: 50.0,
            drag: 0.98,
            drag_model: DragModel::PerTick,
            rest_epsilon: 1e-3,
            drift_speed_divisor: 3.0,
            drift_charge_rate: 2.0,
            gravity: 15.0,
            half_height: 0.5,
            probe_distance: 1.0,
            collision_radius: 2.5,
            collision_slowdown: 0.3,
            shake_duration: 0.5,
            shake_speed: 10.0,
            pickup_radius: 2.0,
            boost_amount: 15.0,
            boost_duration: 1.5,
        }
    }
}

impl Tuning {
    pub fn validate(&self) -> Result<()> {
        let values = [
            ("max_speed", self.max_speed),
            ("acceleration", self.acceleration),
            ("brake_factor", self.brake_factor),
            ("steering_speed", self.steering_speed),
            ("steer_falloff", self.steer_falloff),
            ("steer_gain", self.steer_gain),
            ("drag", self.drag),
            ("rest_epsilon", self.rest_epsilon),
            ("drift_speed_divisor", self.drift_speed_divisor),
            ("drift_charge_rate", self.drift_charge_rate),
            ("gravity", self.gravity),
            ("half_height", self.half_height),
            ("probe_distance", self.probe_distance),
            ("collision_radius", self.collision_radius),
            ("collision_slowdown", self.collision_slowdown),
            ("shake_duration", self.shake_duration),
            ("shake_speed", self.shake_speed),
            ("pickup_radius", self.pickup_radius),
            ("boost_amount", self.boost_amount),
            ("boost_duration", self.boost_duration),
        ];

        if let Some((name, _)) = values.iter().find(|(_, v)| !v.is_finite()) {
            return Err(Error::InvalidTuning(format!("{name} must be finite")));
        }
        if self.max_speed <= 0.0 {
            return Err(Error::InvalidTuning("max_speed must be positive".into()));
        }
        if self.drift_speed_divisor <= 0.0 {
            return Err(Error::InvalidTuning(
                "drift_speed_divisor must be positive".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.drag) {
            return Err(Error::InvalidTuning("drag must be within [0, 1]".into()));
        }
        if let DragModel::TimeScaled { reference_hz } = self.drag_model {
            if !reference_hz.is_finite() || reference_hz <= 0.0 {
                return Err(Error::InvalidTuning(
                    "drag reference_hz must be positive".into(),
                ));
            }
        }
        if self.boost_duration < 0.0 {
            return Err(Error::InvalidTuning(
                "boost_duration must not be negative".into(),
            ));
        }
        Ok(())
    }

    /// Speed a kart with `max_speed` must strictly exceed to enter a drift.
    pub fn drift_min_speed(&self, max_speed: f32) -> f32 {
        max_speed / self.drift_speed_divisor
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackConfig {
    pub segments: u32,
    pub radius: f32,
    pub half_width: f32,
    pub base_height: f32,
    pub hill_amplitude: f32,
    pub hill_frequency: f32,
    /// Offset from the segment centre to its top face.
    pub slab_top: f32,
    pub prop_count: u32,
    /// Draws above this value become obstacles, the rest item boxes.
    pub obstacle_roll: f64,
    pub prop_min_distance: f32,
    pub prop_max_distance: f32,
    pub prop_height_jitter: f32,
    pub seed: u64,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            segments: 36,
            radius: 25.0,
            half_width: 4.0,
            base_height: -0.5,
            hill_amplitude: 2.0,
            hill_frequency: 3.0,
            slab_top: 0.05,
            prop_count: 15,
            obstacle_roll: 0.6,
            prop_min_distance: 15.0,
            prop_max_distance: 22.0,
            prop_height_jitter: 0.5,
            seed: 64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub follow_distance: f32,
    pub height: f32,
    pub lerp_rate: f32,
    pub target_pitch: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            follow_distance: 8.0,
            height: 4.0,
            lerp_rate: 6.0,
            target_pitch: 15.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub tuning: Tuning,
    pub track: TrackConfig,
    pub camera: CameraConfig,
    pub tick_rate: u32,
    pub ticks: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tuning: Tuning::default(),
            track: TrackConfig::default(),
            camera: CameraConfig::default(),
            tick_rate: 60,
            ticks: 1800,
        }
    }
}

impl SimConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<()> {
        self.tuning.validate()?;
        if self.tick_rate == 0 {
            return Err(Error::InvalidTuning("tick_rate must be positive".into()));
        }
        if self.track.prop_min_distance > self.track.prop_max_distance {
            return Err(Error::InvalidTuning(
                "prop_min_distance exceeds prop_max_distance".into(),
            ));
        }
        Ok(())
    }

    pub fn tick_dt(&self) -> f32 {
        1.0 / self.tick_rate as f32
    }
}
