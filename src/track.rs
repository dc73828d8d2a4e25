use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::config::TrackConfig;
use crate::world::{GroundProbe, ObstacleHandle, ObstacleId, ObstacleQuery};

/// Props sit this far above the sampled ground height.
const PROP_LIFT: f32 = 0.5;

#[derive(Debug, Clone)]
pub struct Track {
    config: TrackConfig,
    obstacles: Vec<ObstacleHandle>,
    item_boxes: Vec<Vec3>,
    rng: StdRng,
}

impl Track {
    pub fn generate(config: &TrackConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut obstacles = Vec::new();
        let mut item_boxes = Vec::new();

        for _ in 0..config.prop_count {
            let position = scatter(&mut rng, config);
            if rng.gen::<f64>() > config.obstacle_roll {
                obstacles.push(ObstacleHandle {
                    id: ObstacleId(obstacles.len()),
                    position,
                });
            } else {
                item_boxes.push(position);
            }
        }

        debug!(
            obstacles = obstacles.len(),
            item_boxes = item_boxes.len(),
            seed = config.seed,
            "track generated"
        );

        Self {
            config: config.clone(),
            obstacles,
            item_boxes,
            rng,
        }
    }

    pub fn obstacles(&self) -> &[ObstacleHandle] {
        &self.obstacles
    }

    pub fn item_boxes(&self) -> &[Vec3] {
        &self.item_boxes
    }

    fn segment_angle(&self, index: u32) -> f32 {
        index as f32 / self.config.segments.max(1) as f32 * 360.0
    }

    /// Top face height of segment `index`.
    pub fn segment_height(&self, index: u32) -> f32 {
        let angle = self.segment_angle(index).to_radians();
        self.config.base_height
            + (angle * self.config.hill_frequency).sin() * self.config.hill_amplitude
            + self.config.slab_top
    }

    /// Road height at planar `(x, z)`, or `None` off the road band.
    pub fn surface_at(&self, x: f32, z: f32) -> Option<f32> {
        let from_centre = (x * x + z * z).sqrt();
        if (from_centre - self.config.radius).abs() > self.config.half_width {
            return None;
        }

        let segments = self.config.segments.max(1);
        let angle = z.atan2(x).to_degrees().rem_euclid(360.0);
        let step = 360.0 / segments as f32;
        let index = (angle / step).round() as u32 % segments;
        Some(self.segment_height(index))
    }

    /// Spawn and reset point: on top of the first segment, facing along the ring.
    pub fn origin(&self, half_height: f32) -> Vec3 {
        Vec3::new(self.config.radius, self.segment_height(0) + half_height, 0.0)
    }

    /// Take every item box within `radius` of `position`.
    ///
    /// Each taken box is moved to a fresh random spot. Returns their indices.
    pub fn take_item_boxes(&mut self, position: Vec3, radius: f32) -> Vec<usize> {
        let taken: Vec<usize> = self
            .item_boxes
            .iter()
            .enumerate()
            .filter(|(_, b)| b.distance(position) < radius)
            .map(|(index, _)| index)
            .collect();
        for &index in &taken {
            self.item_boxes[index] = scatter(&mut self.rng, &self.config);
        }
        taken
    }
}

fn scatter(rng: &mut StdRng, config: &TrackConfig) -> Vec3 {
    let angle = (rng.gen_range(0..=360) as f32).to_radians();
    let distance = rng.gen_range(config.prop_min_distance..=config.prop_max_distance);
    let jitter = config.prop_height_jitter.abs();
    let y = rng.gen_range(-jitter..=jitter);
    Vec3::new(
        angle.cos() * distance,
        y + PROP_LIFT,
        angle.sin() * distance,
    )
}

impl GroundProbe for Track {
    fn ground_height(&self, position: Vec3, max_distance: f32) -> Option<f32> {
        let height = self.surface_at(position.x, position.z)?;
        ((position.y - height).abs() <= max_distance).then_some(height)
    }
}

impl ObstacleQuery for Track {
    fn nearby(&self, position: Vec3, radius: f32) -> Vec<ObstacleHandle> {
        self.obstacles.nearby(position, radius)
    }
}
