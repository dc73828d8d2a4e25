use tracing::{debug, info, warn};

use crate::camera::ChaseCamera;
use crate::config::SimConfig;
use crate::input::Controls;
use crate::kart::{Item, Kart, KartId};
use crate::motion::{self, Surroundings, Tick};
use crate::schedule::{Deferred, Scheduler};
use crate::telemetry::{Event, Telemetry};
use crate::track::Track;
use crate::world::{EffectSink, ObstacleId};

/// Shake requests recorded for whoever renders the scene.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Shakes(pub Vec<(ObstacleId, f32, f32)>);

impl EffectSink for Shakes {
    fn shake(&mut self, obstacle: ObstacleId, duration: f32, speed: f32) {
        self.0.push((obstacle, duration, speed));
    }
}

pub struct Session {
    config: SimConfig,
    track: Track,
    kart: Kart,
    scheduler: Scheduler,
    camera: ChaseCamera,
    shakes: Shakes,
    telemetry: Telemetry,
    tick: u64,
}

impl Session {
    pub fn new(config: SimConfig) -> Self {
        let track = Track::generate(&config.track);
        let kart = Kart::new(
            KartId(0),
            &config.tuning,
            track.origin(config.tuning.half_height),
        );
        let camera = ChaseCamera::behind(&kart, &config.camera);

        info!(
            obstacles = track.obstacles().len(),
            item_boxes = track.item_boxes().len(),
            origin = ?kart.position,
            "session started"
        );

        Self {
            config,
            track,
            kart,
            scheduler: Scheduler::new(),
            camera,
            shakes: Shakes::default(),
            telemetry: Telemetry::default(),
            tick: 0,
        }
    }

    pub fn kart(&self) -> &Kart {
        &self.kart
    }

    pub fn kart_mut(&mut self) -> &mut Kart {
        &mut self.kart
    }

    pub fn track(&self) -> &Track {
        &self.track
    }

    pub fn track_mut(&mut self) -> &mut Track {
        &mut self.track
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    /// Drains shake requests emitted since the last call.
    pub fn take_shakes(&mut self) -> Vec<(ObstacleId, f32, f32)> {
        std::mem::take(&mut self.shakes.0)
    }

    pub fn time(&self) -> f64 {
        self.scheduler.now()
    }

    /// Back to the track origin, at rest, with no boost revert left pending.
    ///
    /// Returns how many pending tasks were cancelled.
    pub fn reset_kart(&mut self) -> usize {
        let cancelled = self.scheduler.cancel_owner(self.kart.id).len();
        self.kart
            .reset(self.track.origin(self.config.tuning.half_height));
        info!(kart = ?self.kart.id, cancelled, "kart reset");
        cancelled
    }

    /// Runs one tick. A requested reset is applied even when `dt` is invalid
    /// and the rest of the tick is skipped.
    pub fn tick(&mut self, dt: f32, controls: Controls) -> Tick {
        let mut events = Vec::new();

        if controls.reset {
            let cancelled_tasks = self.reset_kart();
            events.push(Event::Reset { cancelled_tasks });
        }

        if !dt.is_finite() || dt <= 0.0 {
            return Tick::Skipped;
        }

        self.scheduler.advance(f64::from(dt));
        for fired in self.scheduler.drain_due() {
            if fired.owner != self.kart.id {
                continue;
            }
            match fired.work {
                Deferred::RevertBoost { amount } => {
                    revert_boost(&mut self.kart, amount);
                    events.push(Event::BoostReverted { amount });
                }
            }
        }

        let mut surroundings = Surroundings {
            ground: &self.track,
            obstacles: &self.track,
            effects: &mut self.shakes,
        };
        let outcome = motion::step(
            &mut self.kart,
            &self.config.tuning,
            dt,
            controls,
            &mut surroundings,
        );

        match &outcome {
            Tick::Advanced(report) => {
                if let Some(boost) = report.drift_released {
                    events.push(Event::DriftReleased { boost });
                }
                events.extend(
                    report
                        .collisions
                        .iter()
                        .map(|hit| Event::Collision { obstacle: hit.id }),
                );
                if report.landed {
                    events.push(Event::Landed);
                }
                if let Some(item) = report.item_used {
                    self.schedule_revert(item);
                    events.push(Event::ItemUsed { item });
                }
            }
            Tick::Rejected => events.push(Event::Rejected),
            Tick::Skipped => {}
        }

        events.extend(self.pick_up_items());

        self.camera.follow(&self.kart, &self.config.camera, dt);
        self.telemetry.record(
            self.tick,
            self.scheduler.now(),
            &self.kart,
            self.camera.position,
            events,
        );
        self.tick += 1;

        outcome
    }

    fn schedule_revert(&mut self, item: Item) {
        match item {
            Item::Boost => {
                let amount = self.config.tuning.boost_amount;
                let handle = self.scheduler.schedule(
                    self.kart.id,
                    f64::from(self.config.tuning.boost_duration),
                    Deferred::RevertBoost { amount },
                );
                debug!(kart = ?self.kart.id, ?handle, amount, "boost revert scheduled");
            }
        }
    }

    fn pick_up_items(&mut self) -> Vec<Event> {
        let taken = self
            .track
            .take_item_boxes(self.kart.position, self.config.tuning.pickup_radius);
        taken
            .into_iter()
            .map(|item_box| {
                if self.kart.held_item.is_some() {
                    debug!(item_box, "item box taken while already holding an item");
                }
                let item = Item::Boost;
                self.kart.held_item = Some(item);
                Event::ItemPickedUp { item, item_box }
            })
            .collect()
    }
}

fn revert_boost(kart: &mut Kart, amount: f32) {
    if kart.item_boost <= 0.0 {
        warn!(kart = ?kart.id, amount, "boost revert with no active boost");
        return;
    }
    let amount = amount.min(kart.item_boost);
    kart.item_boost -= amount;
    // Only what is left of the forward speed; a revert never reverses the kart.
    kart.speed -= amount.min(kart.speed.max(0.0));
    kart.clamp_speed();
}
