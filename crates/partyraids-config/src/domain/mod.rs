//! Raid definition model.

pub mod raid;
pub mod raids_config;
