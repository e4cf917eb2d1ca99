//! Sensor-to-activity pipeline: motion windows in, debounced activity labels,
//! per-day durations and calorie estimates out.

pub mod commands;
pub mod database;
pub mod models;
pub mod services;
pub mod utils;
