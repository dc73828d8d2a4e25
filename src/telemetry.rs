use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::kart::{Item, Kart};
use crate::world::ObstacleId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    Collision { obstacle: ObstacleId },
    DriftReleased { boost: f32 },
    ItemPickedUp { item: Item, item_box: usize },
    ItemUsed { item: Item },
    BoostReverted { amount: f32 },
    Landed,
    Reset { cancelled_tasks: usize },
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub tick: u64,
    pub time: f64,
    pub position: Vec3,
    pub heading: f32,
    pub speed: f32,
    pub drift_boost: f32,
    pub drifting: bool,
    pub grounded: bool,
    pub held_item: Option<Item>,
    pub camera: Vec3,
    pub events: Vec<Event>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub ticks: u64,
    pub distance: f32,
    pub top_speed: f32,
    pub collisions: u32,
    pub drift_releases: u32,
    pub items_used: u32,
    pub resets: u32,
}

#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct Telemetry {
    pub frames: Vec<Frame>,
    pub summary: Summary,
    #[serde(skip)]
    last_position: Option<Vec3>,
}

impl Telemetry {
    pub fn record(
        &mut self,
        tick: u64,
        time: f64,
        kart: &Kart,
        camera: Vec3,
        events: Vec<Event>,
    ) {
        let summary = &mut self.summary;
        summary.ticks += 1;
        summary.top_speed = summary.top_speed.max(kart.speed);
        for event in &events {
            match event {
                Event::Collision { .. } => summary.collisions += 1,
                Event::DriftReleased { .. } => summary.drift_releases += 1,
                Event::ItemUsed { .. } => summary.items_used += 1,
                Event::Reset { .. } => {
                    summary.resets += 1;
                    self.last_position = None;
                }
                _ => {}
            }
        }
        if let Some(last) = self.last_position {
            summary.distance += last.distance(kart.position);
        }
        self.last_position = Some(kart.position);

        self.frames.push(Frame {
            tick,
            time,
            position: kart.position,
            heading: kart.heading,
            speed: kart.speed,
            drift_boost: kart.drift_boost,
            drifting: kart.is_drifting,
            grounded: kart.grounded,
            held_item: kart.held_item,
            camera,
            events,
        });
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Write the run to `dir/run_<unix seconds>.json`.
    pub fn export(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        let time_now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let path = dir.join(format!("run_{time_now}.json"));

        File::create(&path)?.write_all(self.to_json()?.as_bytes())?;
        info!(path = %path.display(), frames = self.frames.len(), "telemetry exported");
        Ok(path)
    }
}
