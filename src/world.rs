use glam::Vec3;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObstacleId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObstacleHandle {
    pub id: ObstacleId,
    pub position: Vec3,
}

pub trait GroundProbe {
    /// Height of the surface under `position`, if one lies within `max_distance`.
    fn ground_height(&self, position: Vec3, max_distance: f32) -> Option<f32>;
}

pub trait ObstacleQuery {
    fn nearby(&self, position: Vec3, radius: f32) -> Vec<ObstacleHandle>;
}

/// Fire-and-forget visual disturbances.
pub trait EffectSink {
    fn shake(&mut self, obstacle: ObstacleId, duration: f32, speed: f32);
}

impl<F> GroundProbe for F
where
    F: Fn(Vec3, f32) -> Option<f32>,
{
    fn ground_height(&self, position: Vec3, max_distance: f32) -> Option<f32> {
        self(position, max_distance)
    }
}

impl ObstacleQuery for [ObstacleHandle] {
    fn nearby(&self, position: Vec3, radius: f32) -> Vec<ObstacleHandle> {
        self.iter()
            .filter(|o| o.position.distance(position) < radius)
            .copied()
            .collect()
    }
}

impl ObstacleQuery for Vec<ObstacleHandle> {
    fn nearby(&self, position: Vec3, radius: f32) -> Vec<ObstacleHandle> {
        self.as_slice().nearby(position, radius)
    }
}

impl EffectSink for Vec<(ObstacleId, f32, f32)> {
    fn shake(&mut self, obstacle: ObstacleId, duration: f32, speed: f32) {
        self.push((obstacle, duration, speed));
    }
}
