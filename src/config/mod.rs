// src/config/mod.rs

//! Configuration loading and validation for execwatch.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Turn the raw model into validated settings (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{
    ConfigFile, GatewayConfig, GatewayProfile, GatewaySection, MonitorSection, ProfileKind,
    RawConfigFile,
};
pub use validate::parse_duration;
