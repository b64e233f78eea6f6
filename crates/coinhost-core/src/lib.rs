//! # coinhost-core
//! Shared types, address codec and collaborator traits for coinhost.

pub mod address;
pub mod constants;
pub mod error;
pub mod params;
pub mod traits;
pub mod types;
