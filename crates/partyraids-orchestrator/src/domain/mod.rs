pub mod commands;
pub mod managed_world;
pub mod registry;
