//! Loading raid definitions from YAML.

pub mod parser;
