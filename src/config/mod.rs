// src/config/mod.rs

//! Plan file loading and validation for taskswarm.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a plan file from disk (`loader.rs`).
//! - Validate basic invariants like DAG correctness (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_plan_path, load_and_validate, load_from_path, plan_id_from_path};
pub use model::{ConfigSection, PlanFile, RawPlanFile, SubtaskConfig};
