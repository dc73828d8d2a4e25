use mlua::{Error as LuaError, FromLua, Lua, Table, Value};
use serde::{Deserialize, Serialize};

/// Controls held during one tick.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Controls {
    pub accelerate: bool,
    pub brake: bool,
    pub steer_left: bool,
    pub steer_right: bool,
    pub drift: bool,
    pub use_item: bool,
    /// Put the kart back on the track origin before the tick runs.
    pub reset: bool,
}

impl Controls {
    pub const NONE: Self = Self {
        accelerate: false,
        brake: false,
        steer_left: false,
        steer_right: false,
        drift: false,
        use_item: false,
        reset: false,
    };

    pub const fn accelerate() -> Self {
        Self {
            accelerate: true,
            ..Self::NONE
        }
    }

    pub const fn brake() -> Self {
        Self {
            brake: true,
            ..Self::NONE
        }
    }

    pub const fn with_drift(mut self) -> Self {
        self.drift = true;
        self
    }

    pub const fn with_use_item(mut self) -> Self {
        self.use_item = true;
        self
    }
}

fn flag(table: &Table<'_>, key: &str) -> mlua::Result<bool> {
    Ok(table.get::<_, Option<bool>>(key)?.unwrap_or(false))
}

impl<'lua> FromLua<'lua> for Controls {
    fn from_lua(value: Value<'lua>, _lua: &'lua Lua) -> Result<Self, LuaError> {
        match value {
            Value::Nil => Ok(Self::NONE),
            Value::Table(table) => Ok(Self {
                accelerate: flag(&table, "accelerate")?,
                brake: flag(&table, "brake")?,
                steer_left: flag(&table, "steer_left")?,
                steer_right: flag(&table, "steer_right")?,
                drift: flag(&table, "drift")?,
                use_item: flag(&table, "use_item")?,
                reset: flag(&table, "reset")?,
            }),
            other => Err(LuaError::FromLuaConversionError {
                from: other.type_name(),
                to: "Controls",
                message: Some("expected a table of control flags".to_string()),
            }),
        }
    }
}
