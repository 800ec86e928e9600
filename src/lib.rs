#![allow(clippy::implicit_hasher)]
#![allow(unknown_lints)]
#![allow(clippy::manual_is_multiple_of)]

pub mod config;
pub mod constants;
pub mod geometry;
pub mod logging;
pub mod models;
pub mod movement;
pub mod registry;
pub mod reservation;
pub mod simulation;
pub mod time;
pub mod timetable;

#[cfg(test)]
mod test_support;

pub use config::SimulationConfig;
pub use simulation::{SignalAspect, Simulation, TrainSnapshot};
