#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::cast_precision_loss)]

pub mod camera;
pub mod config;
pub mod driver;
pub mod error;
pub mod input;
pub mod kart;
pub mod motion;
pub mod schedule;
pub mod session;
pub mod telemetry;
pub mod track;
pub mod world;

pub use config::{SimConfig, Tuning};
pub use error::{Error, Result};
pub use input::Controls;
pub use kart::{Item, Kart, KartId};
pub use session::Session;
