//! Headless scorekeeping core for board-game companion apps, exposing the
//! session state, mutation services, and persistence gateway consumed by the
//! platform view shells.

pub mod config;
pub mod dao;
pub mod error;
pub mod services;
pub mod state;
