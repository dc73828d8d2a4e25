use tracing::{debug, warn};

use crate::config::{DragModel, Tuning};
use crate::input::Controls;
use crate::kart::{Item, Kart};
use crate::world::{EffectSink, GroundProbe, ObstacleHandle, ObstacleQuery};

/// What the kart can sense and disturb during a tick.
pub struct Surroundings<'a> {
    pub ground: &'a dyn GroundProbe,
    pub obstacles: &'a dyn ObstacleQuery,
    pub effects: &'a mut dyn EffectSink,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct TickReport {
    pub drift_released: Option<f32>,
    pub collisions: Vec<ObstacleHandle>,
    pub item_used: Option<Item>,
    pub landed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Tick {
    /// `dt` was zero, negative or not finite.
    Skipped,
    /// The tick would have left non-finite values in the kart and was rolled back.
    Rejected,
    Advanced(TickReport),
}

pub fn step(
    kart: &mut Kart,
    tuning: &Tuning,
    dt: f32,
    controls: Controls,
    surroundings: &mut Surroundings<'_>,
) -> Tick {
    if !dt.is_finite() || dt <= 0.0 {
        return Tick::Skipped;
    }

    let before = kart.clone();
    let was_grounded = kart.grounded;

    integrate_speed(kart, tuning, dt, controls);
    steer(kart, tuning, dt, controls);
    let drift_released = update_drift(kart, tuning, dt, controls);

    let travel = kart.forward() * (kart.speed * dt);
    kart.position += travel;

    resolve_vertical(kart, tuning, dt, surroundings.ground);
    let collisions = collide(kart, tuning, surroundings.obstacles);
    let item_used = use_item(kart, tuning, controls);

    if !kart.is_finite() {
        warn!(kart = ?before.id, dt, "tick produced non-finite state, rolling back");
        *kart = before;
        return Tick::Rejected;
    }

    for hit in &collisions {
        surroundings
            .effects
            .shake(hit.id, tuning.shake_duration, tuning.shake_speed);
    }

    Tick::Advanced(TickReport {
        drift_released,
        collisions,
        item_used,
        landed: !was_grounded && kart.grounded,
    })
}

fn integrate_speed(kart: &mut Kart, tuning: &Tuning, dt: f32, controls: Controls) {
    if controls.accelerate {
        kart.speed += kart.acceleration * dt;
    } else if controls.brake {
        kart.speed -= kart.acceleration * tuning.brake_factor * dt;
    } else {
        kart.speed *= match tuning.drag_model {
            DragModel::PerTick => tuning.drag,
            DragModel::TimeScaled { reference_hz } => tuning.drag.powf(dt * reference_hz),
        };
        if kart.speed.abs() < tuning.rest_epsilon {
            kart.speed = 0.0;
        }
    }
    kart.clamp_speed();
}

fn steer(kart: &mut Kart, tuning: &Tuning, dt: f32, controls: Controls) {
    let authority = 1.0 - kart.speed.abs() / kart.max_speed * tuning.steer_falloff;
    let rate = tuning.steering_speed * authority * tuning.steer_gain * dt;

    if controls.steer_left {
        kart.heading -= rate;
    }
    if controls.steer_right {
        kart.heading += rate;
    }
    kart.heading = kart.heading.rem_euclid(360.0);
}

/// Returns the boost granted if the kart just came out of a drift.
fn update_drift(kart: &mut Kart, tuning: &Tuning, dt: f32, controls: Controls) -> Option<f32> {
    let eligible = controls.drift
        && kart.speed.abs() > tuning.drift_min_speed(kart.max_speed)
        && kart.grounded;

    if eligible {
        kart.is_drifting = true;
        kart.drift_boost += tuning.drift_charge_rate * dt;
        return None;
    }

    let released = if kart.is_drifting && kart.drift_boost > 0.0 {
        let boost = kart.drift_boost;
        kart.speed += boost;
        kart.drift_boost = 0.0;
        debug!(kart = ?kart.id, boost, speed = kart.speed, "drift released");
        Some(boost)
    } else {
        None
    };
    kart.is_drifting = false;
    released
}

fn resolve_vertical(kart: &mut Kart, tuning: &Tuning, dt: f32, ground: &dyn GroundProbe) {
    match ground.ground_height(kart.position, tuning.probe_distance) {
        Some(height) => {
            kart.grounded = true;
            kart.vertical_velocity = 0.0;
            kart.position.y = height + tuning.half_height;
        }
        None => {
            kart.grounded = false;
            kart.vertical_velocity -= tuning.gravity * dt;
            kart.position.y += kart.vertical_velocity * dt;
        }
    }
}

fn collide(kart: &mut Kart, tuning: &Tuning, obstacles: &dyn ObstacleQuery) -> Vec<ObstacleHandle> {
    let hits: Vec<_> = obstacles
        .nearby(kart.position, tuning.collision_radius)
        .into_iter()
        .filter(|o| o.position.distance(kart.position) < tuning.collision_radius)
        .collect();

    for hit in &hits {
        kart.speed *= tuning.collision_slowdown;
        debug!(kart = ?kart.id, obstacle = ?hit.id, speed = kart.speed, "obstacle hit");
    }
    hits
}

fn use_item(kart: &mut Kart, tuning: &Tuning, controls: Controls) -> Option<Item> {
    if !controls.use_item {
        return None;
    }
    let item = kart.held_item.take()?;
    match item {
        Item::Boost => {
            kart.speed += tuning.boost_amount;
            kart.item_boost += tuning.boost_amount;
        }
    }
    Some(item)
}

#[cfg(test)]
mod tests {
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use glam::Vec3;

    use super::*;
    use crate::kart::KartId;
    use crate::world::stubs::{FlatGround, NoGround, NoObstacles};
    use crate::world::ObstacleId;

    const DT: f32 = 1.0 / 60.0;

    fn kart() -> Kart {
        Kart::new(KartId(0), &Tuning::default(), Vec3::new(0.0, 0.5, 0.0))
    }

    fn tick_with(
        kart: &mut Kart,
        tuning: &Tuning,
        dt: f32,
        controls: Controls,
        ground: &dyn GroundProbe,
        obstacles: &dyn ObstacleQuery,
    ) -> (Tick, Vec<(ObstacleId, f32, f32)>) {
        let mut shakes: Vec<(ObstacleId, f32, f32)> = Vec::new();
        let mut surroundings = Surroundings {
            ground,
            obstacles,
            effects: &mut shakes,
        };
        let tick = step(kart, tuning, dt, controls, &mut surroundings);
        (tick, shakes)
    }

    fn tick(kart: &mut Kart, tuning: &Tuning, dt: f32, controls: Controls) -> Tick {
        tick_with(kart, tuning, dt, controls, &FlatGround(0.0), &NoObstacles).0
    }

    fn advanced(tick: Tick) -> TickReport {
        match tick {
            Tick::Advanced(report) => report,
            other => panic!("expected an advanced tick, got {other:?}"),
        }
    }

    #[test]
    fn test_accelerate_integrates_speed() {
        let tuning = Tuning::default();
        let mut kart = kart();
        tick(&mut kart, &tuning, 0.5, Controls::accelerate());
        assert_relative_eq!(kart.speed, 0.4);
    }

    #[test]
    fn test_brake_is_twice_as_strong() {
        let tuning = Tuning::default();
        let mut kart = kart();
        kart.speed = 10.0;
        tick(&mut kart, &tuning, 0.5, Controls::brake());
        assert_relative_eq!(kart.speed, 9.2);
    }

    #[test]
    fn test_speed_never_exceeds_cap_while_accelerating() {
        let tuning = Tuning::default();
        for dt in [DT, 0.1, 0.5, 3.0] {
            let mut kart = kart();
            for _ in 0..2_000 {
                tick(&mut kart, &tuning, dt, Controls::accelerate());
                assert!(kart.speed <= kart.max_speed + kart.drift_boost);
            }
            assert_eq!(kart.speed, kart.max_speed);
        }
    }

    #[test]
    fn test_speed_never_below_reverse_cap_while_braking() {
        let tuning = Tuning::default();
        for dt in [DT, 0.1, 0.5, 3.0] {
            let mut kart = kart();
            for _ in 0..2_000 {
                tick(&mut kart, &tuning, dt, Controls::brake());
                assert!(kart.speed >= -kart.max_speed / 2.0);
            }
            assert_eq!(kart.speed, -12.5);
        }
    }

    #[test]
    fn test_drag_decays_without_changing_sign() {
        let tuning = Tuning::default();
        for start in [20.0_f32, -10.0] {
            let mut kart = kart();
            kart.speed = start;
            let mut previous = kart.speed.abs();
            for _ in 0..1_000 {
                tick(&mut kart, &tuning, DT, Controls::NONE);
                let current = kart.speed.abs();
                if previous > 0.0 {
                    assert!(current < previous);
                } else {
                    assert_eq!(current, 0.0);
                }
                assert!(kart.speed == 0.0 || kart.speed.signum() == start.signum());
                previous = current;
            }
            assert_eq!(kart.speed, 0.0);
        }
    }

    #[test]
    fn test_per_tick_drag_ignores_dt() {
        let tuning = Tuning::default();
        let mut short = kart();
        let mut long = kart();
        short.speed = 10.0;
        long.speed = 10.0;
        tick(&mut short, &tuning, DT, Controls::NONE);
        tick(&mut long, &tuning, 0.5, Controls::NONE);
        assert_eq!(short.speed, long.speed);
    }

    #[test]
    fn test_time_scaled_drag_depends_on_elapsed_time() {
        let tuning = Tuning {
            drag_model: DragModel::TimeScaled { reference_hz: 60.0 },
            ..Tuning::default()
        };
        let mut fine = kart();
        let mut coarse = kart();
        fine.speed = 10.0;
        coarse.speed = 10.0;
        for _ in 0..6 {
            tick(&mut fine, &tuning, 1.0 / 60.0, Controls::NONE);
        }
        tick(&mut coarse, &tuning, 0.1, Controls::NONE);
        assert_relative_eq!(fine.speed, coarse.speed, max_relative = 1e-4);
        assert_relative_eq!(coarse.speed, 10.0 * 0.98_f32.powi(6), max_relative = 1e-4);
    }

    #[test]
    fn test_steering_authority_drops_with_speed() {
        let tuning = Tuning::default();
        let steer_right = Controls {
            steer_right: true,
            ..Controls::NONE
        };

        let mut parked = kart();
        tick(&mut parked, &tuning, 0.1, steer_right);
        assert_relative_eq!(parked.heading, 15.0);

        let mut flat_out = kart();
        flat_out.speed = 25.0;
        tick(
            &mut flat_out,
            &tuning,
            0.1,
            Controls {
                accelerate: true,
                ..steer_right
            },
        );
        assert_relative_eq!(flat_out.heading, 15.0 * 0.3, max_relative = 1e-5);
    }

    #[test]
    fn test_left_and_right_cancel() {
        let tuning = Tuning::default();
        let mut kart = kart();
        kart.heading = 30.0;
        let both = Controls {
            steer_left: true,
            steer_right: true,
            ..Controls::NONE
        };
        tick(&mut kart, &tuning, DT, both);
        assert_abs_diff_eq!(kart.heading, 30.0, epsilon = 1e-4);
    }

    #[test]
    fn test_heading_wraps() {
        let tuning = Tuning::default();
        let mut kart = kart();
        let steer_left = Controls {
            steer_left: true,
            ..Controls::NONE
        };
        tick(&mut kart, &tuning, 0.1, steer_left);
        assert_relative_eq!(kart.heading, 345.0);
    }

    #[test]
    fn test_drift_boost_granted_once_on_release() {
        let tuning = Tuning::default();
        let mut kart = kart();
        kart.speed = 20.0;
        let drifting = Controls::accelerate().with_drift();

        let ticks = 90;
        for _ in 0..ticks {
            let report = advanced(tick(&mut kart, &tuning, DT, drifting));
            assert!(kart.is_drifting);
            assert_eq!(report.drift_released, None);
        }
        let held_for = ticks as f32 * DT;
        assert_relative_eq!(kart.drift_boost, 2.0 * held_for, max_relative = 1e-4);

        let before_release = kart.speed;
        let banked = kart.drift_boost;
        let report = advanced(tick(&mut kart, &tuning, DT, Controls::NONE));

        let dragged = (before_release * tuning.drag).min(kart.max_speed + banked);
        assert_eq!(report.drift_released, Some(banked));
        assert_relative_eq!(kart.speed, dragged + banked, max_relative = 1e-5);
        assert_eq!(kart.drift_boost, 0.0);
        assert!(!kart.is_drifting);

        let after = kart.speed;
        let report = advanced(tick(&mut kart, &tuning, DT, Controls::NONE));
        assert_eq!(report.drift_released, None);
        assert!(kart.speed < after);
    }

    #[test]
    fn test_drift_requires_strictly_more_than_a_third_of_max_speed() {
        let tuning = Tuning {
            drag: 1.0,
            ..Tuning::default()
        };
        let drift = Controls::NONE.with_drift();

        let mut at_threshold = kart();
        at_threshold.speed = at_threshold.max_speed / 3.0;
        tick(&mut at_threshold, &tuning, DT, drift);
        assert!(!at_threshold.is_drifting);
        assert_eq!(at_threshold.drift_boost, 0.0);

        let mut above = kart();
        above.speed = above.max_speed / 3.0 + 0.01;
        tick(&mut above, &tuning, DT, drift);
        assert!(above.is_drifting);
        assert!(above.drift_boost > 0.0);
    }

    #[test]
    fn test_drift_requires_ground() {
        let tuning = Tuning::default();
        let mut kart = kart();
        kart.speed = 20.0;
        kart.grounded = false;
        tick_with(
            &mut kart,
            &tuning,
            DT,
            Controls::accelerate().with_drift(),
            &NoGround,
            &NoObstacles,
        );
        assert!(!kart.is_drifting);
        assert_eq!(kart.drift_boost, 0.0);
    }

    #[test]
    fn test_moves_along_heading() {
        let tuning = Tuning {
            drag: 1.0,
            ..Tuning::default()
        };
        let mut kart = kart();
        kart.speed = 10.0;
        kart.heading = 90.0;
        tick(&mut kart, &tuning, 0.5, Controls::NONE);
        assert_abs_diff_eq!(kart.position.x, 5.0, epsilon = 1e-4);
        assert_abs_diff_eq!(kart.position.z, 0.0, epsilon = 1e-4);
    }

    #[test]
    fn test_ground_snap() {
        let tuning = Tuning::default();
        let mut kart = kart();
        kart.position.y = 2.9;
        let h = 2.5;
        tick_with(&mut kart, &tuning, DT, Controls::NONE, &FlatGround(h), &NoObstacles);
        assert!(kart.grounded);
        assert_eq!(kart.position.y, h + tuning.half_height);
        assert_eq!(kart.vertical_velocity, 0.0);
    }

    #[test]
    fn test_free_fall_accelerates() {
        let tuning = Tuning::default();
        let mut kart = kart();
        tick_with(&mut kart, &tuning, 0.1, Controls::NONE, &NoGround, &NoObstacles);
        assert!(!kart.grounded);
        assert_relative_eq!(kart.vertical_velocity, -1.5);
        assert_abs_diff_eq!(kart.position.y, 0.35, epsilon = 1e-5);

        tick_with(&mut kart, &tuning, 0.1, Controls::NONE, &NoGround, &NoObstacles);
        assert_abs_diff_eq!(kart.vertical_velocity, -3.0, epsilon = 1e-5);
        assert_abs_diff_eq!(kart.position.y, 0.05, epsilon = 1e-5);
    }

    #[test]
    fn test_landing_is_reported() {
        let tuning = Tuning::default();
        let mut kart = kart();
        kart.grounded = false;
        kart.vertical_velocity = -4.0;
        let (tick, _) =
            tick_with(&mut kart, &tuning, DT, Controls::NONE, &FlatGround(0.0), &NoObstacles);
        assert!(advanced(tick).landed);
        assert_eq!(kart.vertical_velocity, 0.0);
    }

    #[test]
    fn test_obstacle_hit_slows_and_shakes() {
        let tuning = Tuning {
            drag: 1.0,
            ..Tuning::default()
        };
        let mut kart = kart();
        kart.speed = 10.0;
        let obstacles = vec![
            ObstacleHandle { id: ObstacleId(3), position: Vec3::new(1.0, 0.5, 0.0) },
            ObstacleHandle { id: ObstacleId(4), position: Vec3::new(40.0, 0.5, 0.0) },
        ];

        let (tick, shakes) =
            tick_with(&mut kart, &tuning, DT, Controls::NONE, &FlatGround(0.0), &obstacles);

        assert_eq!(advanced(tick).collisions.len(), 1);
        assert_relative_eq!(kart.speed, 3.0, max_relative = 1e-6);
        assert_eq!(shakes, vec![(ObstacleId(3), 0.5, 10.0)]);
    }

    #[test]
    fn test_boost_item_used_once() {
        let tuning = Tuning {
            drag: 1.0,
            ..Tuning::default()
        };
        let mut kart = kart();
        kart.speed = 10.0;
        kart.held_item = Some(Item::Boost);
        let use_item = Controls::NONE.with_use_item();

        let report = advanced(tick(&mut kart, &tuning, DT, use_item));
        assert_eq!(report.item_used, Some(Item::Boost));
        assert_eq!(kart.held_item, None);
        assert_relative_eq!(kart.speed, 25.0);
        assert_eq!(kart.item_boost, 15.0);

        let report = advanced(tick(&mut kart, &tuning, DT, use_item));
        assert_eq!(report.item_used, None);
        assert_relative_eq!(kart.speed, 25.0);
    }

    #[test]
    fn test_item_boost_survives_speed_clamp() {
        let tuning = Tuning::default();
        let mut kart = kart();
        kart.speed = 25.0;
        kart.held_item = Some(Item::Boost);
        tick(&mut kart, &tuning, DT, Controls::accelerate().with_use_item());
        tick(&mut kart, &tuning, DT, Controls::accelerate());
        assert!(kart.speed > kart.max_speed);
    }

    #[test]
    fn test_invalid_dt_is_a_no_op() {
        let tuning = Tuning::default();
        let mut kart = kart();
        kart.speed = 12.0;
        kart.held_item = Some(Item::Boost);
        let before = kart.clone();
        let everything = Controls {
            accelerate: true,
            brake: true,
            steer_left: true,
            steer_right: false,
            drift: true,
            use_item: true,
            reset: false,
        };

        for dt in [0.0, -0.5, f32::NAN, f32::INFINITY] {
            assert_eq!(tick(&mut kart, &tuning, dt, everything), Tick::Skipped);
            assert_eq!(kart, before);
        }
    }

    #[test]
    fn test_nan_ground_rolls_back() {
        let tuning = Tuning::default();
        let mut kart = kart();
        kart.speed = 5.0;
        let before = kart.clone();
        let poisoned = |_: Vec3, _: f32| Some(f32::NAN);
        let (tick, shakes) =
            tick_with(&mut kart, &tuning, DT, Controls::accelerate(), &poisoned, &NoObstacles);
        assert_eq!(tick, Tick::Rejected);
        assert_eq!(kart, before);
        assert!(shakes.is_empty());
    }
}
