//! Party Raids — dungeon template archives.
//!
//! A dungeon template is a zipped world tree stored as
//! `<dungeons>/<id>.zip`. Templates are produced by packaging a live world
//! and consumed by extracting them into a fresh world folder.

pub mod application;
pub mod domain;

pub use application::repository::DungeonRepository;
