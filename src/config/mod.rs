// src/config/mod.rs

//! Agent configuration.
//!
//! - `model.rs` is the TOML-backed data model.
//! - `loader.rs` reads a config file from disk.
//! - `validate.rs` turns the raw model into a checked [`ConfigFile`].

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_or_default};
pub use model::{ConfigFile, OutputSection, ProcessSection, RawConfigFile};
pub use validate::parse_duration;
