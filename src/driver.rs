use std::path::Path;

use mlua::{Function, Lua};

use crate::error::{Error, Result};
use crate::input::Controls;
use crate::kart::Kart;

const ENTRY_POINT: &str = "drive";

/// Decides which controls are held for the next tick.
pub trait Driver {
    fn controls(&mut self, kart: &Kart, time: f64) -> Result<Controls>;
}

/// Holds the same controls forever.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixedDriver(pub Controls);

impl Driver for FixedDriver {
    fn controls(&mut self, _: &Kart, _: f64) -> Result<Controls> {
        Ok(self.0)
    }
}

/// Runs a Lua chunk that defines `drive(kart, time)` and returns a table of
/// control flags, e.g. `{ accelerate = true, drift = kart.speed > 12 }`.
pub struct ScriptedDriver {
    lua: Lua,
}

impl ScriptedDriver {
    pub fn new(name: &str, script: &str) -> Result<Self> {
        let lua = Lua::new();
        lua.load(script).set_name(name).exec()?;

        let defined = lua
            .globals()
            .get::<_, Option<Function>>(ENTRY_POINT)?
            .is_some();
        if !defined {
            return Err(Error::MissingEntryPoint(ENTRY_POINT));
        }
        Ok(Self { lua })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let script = std::fs::read_to_string(path)?;
        Self::new(&path.display().to_string(), &script)
    }
}

impl Driver for ScriptedDriver {
    fn controls(&mut self, kart: &Kart, time: f64) -> Result<Controls> {
        let drive: Function = self.lua.globals().get(ENTRY_POINT)?;
        Ok(drive.call::<_, Controls>((kart, time))?)
    }
}
