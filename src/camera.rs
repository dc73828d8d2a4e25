use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::config::CameraConfig;
use crate::kart::Kart;

/// Chase camera trailing behind and above the kart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChaseCamera {
    pub position: Vec3,
    /// Degrees, positive looks down.
    pub pitch: f32,
    /// Unit vector from the camera toward the kart.
    pub look: Vec3,
}

impl ChaseCamera {
    pub fn behind(kart: &Kart, config: &CameraConfig) -> Self {
        let position = target(kart, config);
        Self {
            position,
            pitch: config.target_pitch,
            look: (kart.position - position).normalize_or_zero(),
        }
    }

    pub fn follow(&mut self, kart: &Kart, config: &CameraConfig, dt: f32) {
        if !dt.is_finite() || dt <= 0.0 {
            return;
        }
        let t = (config.lerp_rate * dt).min(1.0);
        self.position = self.position.lerp(target(kart, config), t);
        self.pitch += (config.target_pitch - self.pitch) * t;
        self.look = (kart.position - self.position).normalize_or_zero();
    }
}

fn target(kart: &Kart, config: &CameraConfig) -> Vec3 {
    kart.position - kart.forward() * config.follow_distance + Vec3::Y * config.height
}
