pub mod command_handlers;
pub mod raids_manager;
