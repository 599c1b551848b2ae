//! Return-location store for players pulled into raid worlds.
//!
//! `LocationManager` keeps the in-memory map and mirrors it to a
//! `DocumentStore` after every mutation; `YamlDocumentStore` is the on-disk
//! backing used in production.

mod location_manager;
mod yaml_document_store;

pub use location_manager::LocationManager;
pub use yaml_document_store::{LOCATIONS_SECTION, YamlDocumentStore};
