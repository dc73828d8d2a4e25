use glam::Vec3;
use mlua::prelude::LuaError;
use mlua::{IntoLua, Lua, Value};
use serde::{Deserialize, Serialize};

use crate::config::Tuning;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KartId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Item {
    Boost,
}

impl Item {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Boost => "boost",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kart {
    pub id: KartId,
    pub position: Vec3,
    /// Degrees about +Y; 0 faces +Z, positive turns toward +X.
    pub heading: f32,
    pub speed: f32,
    pub max_speed: f32,
    pub acceleration: f32,
    pub drift_boost: f32,
    pub is_drifting: bool,
    pub grounded: bool,
    pub vertical_velocity: f32,
    /// Bonus from boost items that have not been reverted yet.
    pub item_boost: f32,
    pub held_item: Option<Item>,
}

impl Kart {
    pub fn new(id: KartId, tuning: &Tuning, origin: Vec3) -> Self {
        Self {
            id,
            position: origin,
            heading: 0.0,
            speed: 0.0,
            max_speed: tuning.max_speed,
            acceleration: tuning.acceleration,
            drift_boost: 0.0,
            is_drifting: false,
            grounded: true,
            vertical_velocity: 0.0,
            item_boost: 0.0,
            held_item: None,
        }
    }

    pub fn forward(&self) -> Vec3 {
        let (sin, cos) = self.heading.to_radians().sin_cos();
        Vec3::new(sin, 0.0, cos)
    }

    pub fn min_speed(&self) -> f32 {
        -self.max_speed / 2.0
    }

    /// Top of the speed clamp, including whatever boosts are currently banked.
    pub fn speed_cap(&self) -> f32 {
        self.max_speed + self.drift_boost + self.item_boost
    }

    pub fn clamp_speed(&mut self) {
        self.speed = self.speed.clamp(self.min_speed(), self.speed_cap());
    }

    /// Put the kart back at `origin`, at rest and facing the default way.
    ///
    /// Pending deferred work is owned by the scheduler; callers cancel it
    /// alongside this (see `Session::reset_kart`).
    pub fn reset(&mut self, origin: Vec3) {
        self.position = origin;
        self.heading = 0.0;
        self.speed = 0.0;
        self.drift_boost = 0.0;
        self.is_drifting = false;
        self.grounded = true;
        self.vertical_velocity = 0.0;
        self.item_boost = 0.0;
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite()
            && self.heading.is_finite()
            && self.speed.is_finite()
            && self.drift_boost.is_finite()
            && self.vertical_velocity.is_finite()
            && self.item_boost.is_finite()
    }
}

impl<'lua, 'a> IntoLua<'lua> for &'a Kart {
    fn into_lua(self, lua: &'lua Lua) -> color_eyre::Result<Value<'lua>, LuaError> {
        let table = lua.create_table()?;
        table.set("x", self.position.x)?;
        table.set("y", self.position.y)?;
        table.set("z", self.position.z)?;
        table.set("heading", self.heading)?;
        table.set("speed", self.speed)?;
        table.set("max_speed", self.max_speed)?;
        table.set("drift_boost", self.drift_boost)?;
        table.set("drifting", self.is_drifting)?;
        table.set("grounded", self.grounded)?;
        table.set("item", self.held_item.map(Item::name))?;
        Ok(Value::Table(table))
    }
}
