// src/config/mod.rs

//! Configuration loading and validation for migrun.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate it (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, resolve_config};
pub use model::{
    CommandSection, ConfigFile, DiscoverySection, PROJECT_PLACEHOLDER, RawConfigFile,
    StatusSection,
};
